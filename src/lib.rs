//! SecureBank is a small banking demo web app.
//!
//! Users register with an email address and password, log in, and land on a
//! dashboard that shows their bank account and its most recent transactions.
//! The account, along with a few sample transactions, is created the first
//! time a user opens the dashboard.
//!
//! This library provides the HTTP routes, which directly serve HTML pages, and
//! the SQLite persistence behind them.

#![warn(missing_docs)]

use std::{net::SocketAddr, time::Duration};

use axum::response::{IntoResponse, Response};
use axum_server::Handle;
use tokio::signal;

mod account;
mod alert;
mod app_state;
mod auth;
mod config;
mod dashboard;
mod db;
mod email;
mod endpoints;
mod flash;
mod home;
mod html;
mod internal_server_error;
mod log_in;
mod log_out;
mod logging;
mod navigation;
mod not_found;
mod password;
mod redirect;
mod register_user;
mod routing;
mod transaction;
mod user;

#[cfg(test)]
mod test_utils;

pub use account::{BankAccount, ensure_account_for_user, find_account_by_user};
pub use app_state::AppState;
pub use auth::mark_cookies_secure;
pub use config::{SECRET_KEY_ENV, load_secret_key};
pub use db::initialize as initialize_db;
pub use email::Email;
pub use logging::logging_middleware;
pub use password::{PasswordHash, ValidatedPassword};
pub use routing::build_router;
pub use transaction::{Transaction, TransactionType, list_recent_transactions};
pub use user::{User, UserID, get_user_by_email, get_user_by_id};

use crate::{internal_server_error::InternalServerError, not_found::get_404_not_found_response};

/// An async task that waits for either the ctrl+c or terminate signal, whichever comes first, and
/// then signals the server to shut down gracefully.
///
/// `handle` is a handle to an Axum `Server`.
pub async fn graceful_shutdown(handle: Handle<SocketAddr>) {
    let ctrl_c = async {
        signal::ctrl_c()
            .await
            .expect("failed to install Ctrl+C handler");
    };

    #[cfg(unix)]
    let terminate = async {
        signal::unix::signal(signal::unix::SignalKind::terminate())
            .expect("failed to install signal handler")
            .recv()
            .await;
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            tracing::info!("Received ctrl+c signal, shutting down.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
        _ = terminate => {
            tracing::info!("Received terminate signal, shutting down.");
            handle.graceful_shutdown(Some(Duration::from_secs(1)));
        },
    }
}

/// The errors that may occur in the application.
#[derive(Debug, thiserror::Error, PartialEq)]
pub enum Error {
    /// The email address entered during registration is not a valid email
    /// address.
    #[error("Invalid email format")]
    InvalidEmail,

    /// The password entered during registration is shorter than eight
    /// characters.
    #[error("Password must be at least 8 characters long")]
    PasswordTooShort,

    /// The email address is already used by another user.
    #[error("Email already registered")]
    DuplicateEmail,

    /// The email and password did not match a registered user.
    ///
    /// This error deliberately does not say which of the two was wrong.
    #[error("Invalid email or password")]
    InvalidCredentials,

    /// An unexpected error occurred with the underlying hashing library.
    ///
    /// The error string should only be logged for debugging on the server.
    /// When communicating with the application client this error should be
    /// replaced with a general error type indicating an internal server error.
    #[error("hashing failed: {0}")]
    HashingError(String),

    /// The session cookie is missing, could not be decrypted, or has expired.
    #[error("the session cookie is missing or invalid")]
    InvalidSession,

    /// The session token could not be serialized into a cookie.
    #[error("could not create the session token: {0}")]
    SessionTokenError(String),

    /// The requested resource was not found.
    ///
    /// Internally, this error may occur when a query returns no rows.
    #[error("the requested resource could not be found")]
    NotFound,

    /// An unhandled/unexpected SQL error.
    #[error("an unexpected SQL error occurred: {0}")]
    SqlError(rusqlite::Error),

    /// Could not acquire the database lock
    #[error("could not acquire the database lock")]
    DatabaseLockError,

    /// The secret used to sign and encrypt cookies was not configured.
    #[error("the environment variable SECRET_KEY must be set to a non-empty value")]
    MissingSecretKey,
}

impl From<rusqlite::Error> for Error {
    fn from(value: rusqlite::Error) -> Self {
        match value {
            // Code 2067 occurs when a UNIQUE constraint failed.
            rusqlite::Error::SqliteFailure(sql_error, Some(ref desc))
                if sql_error.extended_code == 2067 && desc.ends_with("users.email") =>
            {
                Error::DuplicateEmail
            }
            rusqlite::Error::QueryReturnedNoRows => Error::NotFound,
            error => {
                tracing::error!("an unhandled SQL error occurred: {}", error);
                Error::SqlError(error)
            }
        }
    }
}

impl IntoResponse for Error {
    fn into_response(self) -> Response {
        match self {
            Error::NotFound => get_404_not_found_response(),
            // Any errors that are not handled above are not intended to be shown to the client.
            error => {
                tracing::error!("An unexpected error occurred: {}", error);
                InternalServerError::default().into_response()
            }
        }
    }
}
