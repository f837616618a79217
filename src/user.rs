//! Code for creating users and fetching them from the database.

use std::fmt::Display;

use rusqlite::{Connection, Row};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::{Email, Error, PasswordHash, db::get_timestamp};

/// A newtype wrapper for integer user IDs.
///
/// This helps disambiguate user IDs from other types of IDs, leading to better compile time
/// errors, and more flexible generics that can have distinct implementations for multiple ID types.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize, Hash)]
pub struct UserID(i64);

impl UserID {
    /// Create a new user ID.
    pub fn new(id: i64) -> Self {
        Self(id)
    }

    /// Cast the user ID to a 64 bit integer.
    pub fn as_i64(&self) -> i64 {
        self.0
    }
}

impl Display for UserID {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        self.0.fmt(f)
    }
}

/// A registered user of the application.
#[derive(Debug, Clone, PartialEq)]
pub struct User {
    /// The user's ID in the application database.
    pub id: UserID,
    /// The email address the user logs in with. Unique across users.
    pub email: Email,
    /// The name shown on the dashboard.
    pub name: String,
    /// The user's password hash.
    pub password_hash: PasswordHash,
    /// The phone number entered during registration.
    pub phone_number: String,
    /// The country calling code entered during registration, e.g. "+64".
    pub country_code: String,
    /// When the user registered, assigned by the database.
    pub created_at: OffsetDateTime,
}

/// The data needed to register a new user.
#[derive(Debug, Clone)]
pub struct NewUser {
    /// The user's email address.
    pub email: Email,
    /// The hash of the user's password.
    pub password_hash: PasswordHash,
    /// The user's phone number.
    pub phone_number: String,
    /// The user's country calling code.
    pub country_code: String,
}

const USER_COLUMNS: &str = "id, email, name, password, phone_number, country_code, created_at";

fn map_user_row(row: &Row) -> Result<User, rusqlite::Error> {
    let id = UserID::new(row.get(0)?);
    let email = Email::new_unchecked(row.get(1)?);
    let name = row.get(2)?;
    let raw_password_hash: String = row.get(3)?;
    let phone_number = row.get(4)?;
    let country_code = row.get(5)?;
    let created_at = get_timestamp(row, 6)?;

    Ok(User {
        id,
        email,
        name,
        password_hash: PasswordHash::new_unchecked(&raw_password_hash),
        phone_number,
        country_code,
        created_at,
    })
}

/// Create and insert a new user into the database.
///
/// The user's name defaults to the local part of their email address.
///
/// # Errors
///
/// Returns a:
/// - [Error::DuplicateEmail] if another user already has the same email address.
/// - [Error::SqlError] if some other SQL related error occurred.
pub fn create_user(new_user: NewUser, connection: &Connection) -> Result<User, Error> {
    let name = new_user.email.local_part().to_owned();

    connection
        .prepare(&format!(
            "INSERT INTO users (email, name, password, phone_number, country_code) \
            VALUES (?1, ?2, ?3, ?4, ?5) \
            RETURNING {USER_COLUMNS}"
        ))?
        .query_row(
            (
                new_user.email.as_str(),
                &name,
                new_user.password_hash.as_str(),
                &new_user.phone_number,
                &new_user.country_code,
            ),
            map_user_row,
        )
        .map_err(|error| error.into())
}

/// Get the user from the database with an ID equal to `user_id`.
///
/// # Errors
///
/// This function will return an error if:
/// - `user_id` does not belong to a registered user ([Error::NotFound]).
/// - there was an error trying to access the store.
pub fn get_user_by_id(user_id: UserID, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!("SELECT {USER_COLUMNS} FROM users WHERE id = :id"))?
        .query_row(&[(":id", &user_id.as_i64())], map_user_row)
        .map_err(|error| error.into())
}

/// Get the user whose email address exactly matches `email`.
///
/// # Errors
///
/// This function will return an error if:
/// - no user is registered with `email` ([Error::NotFound]).
/// - there was an error trying to access the store.
pub fn get_user_by_email(email: &str, connection: &Connection) -> Result<User, Error> {
    connection
        .prepare(&format!(
            "SELECT {USER_COLUMNS} FROM users WHERE email = :email"
        ))?
        .query_row(&[(":email", &email)], map_user_row)
        .map_err(|error| error.into())
}

/// Check whether a user has already registered with `email`.
///
/// # Errors
///
/// Returns a [Error::SqlError] if an SQL related error occurred.
pub fn email_exists(email: &str, connection: &Connection) -> Result<bool, Error> {
    connection
        .query_row(
            "SELECT EXISTS(SELECT 1 FROM users WHERE email = ?1)",
            (email,),
            |row| row.get(0),
        )
        .map_err(|error| error.into())
}
