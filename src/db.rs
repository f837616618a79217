//! Database setup: connection settings and the schema migrations.
//!
//! Migrations are plain SQL files in the `migrations/` directory that are
//! embedded into the binary. The version of the last applied migration is
//! stored in SQLite's `user_version` pragma, so [initialize] only runs the
//! files that have not been applied yet.

use std::time::Duration;

use rusqlite::{Connection, Row, types::Type};
use time::{OffsetDateTime, format_description::well_known::Rfc3339};

use crate::Error;

/// The schema migrations in the order they must be applied.
///
/// The migration version is the position in this list plus one.
const MIGRATIONS: [(&str, &str); 3] = [
    (
        "create_users",
        include_str!("../migrations/0001_create_users.sql"),
    ),
    (
        "create_bank_accounts",
        include_str!("../migrations/0002_create_bank_accounts.sql"),
    ),
    (
        "create_transactions",
        include_str!("../migrations/0003_create_transactions.sql"),
    ),
];

/// How long to wait for another process to release a lock on the database file.
const BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configure the connection and bring the schema up to date.
///
/// Calling this function on a database that is already up to date has no effect.
///
/// # Errors
/// Returns an error if a migration fails, in which case that migration is rolled back.
pub fn initialize(connection: &Connection) -> Result<(), Error> {
    connection.pragma_update(None, "foreign_keys", true)?;
    connection.busy_timeout(BUSY_TIMEOUT)?;

    let current_version = schema_version(connection)?;

    for (index, (name, sql)) in MIGRATIONS.iter().enumerate() {
        let version = index as i64 + 1;

        if version <= current_version {
            continue;
        }

        let transaction = connection.unchecked_transaction()?;
        transaction.execute_batch(sql)?;
        transaction.pragma_update(None, "user_version", version)?;
        transaction.commit()?;

        tracing::info!("Applied migration {version:04}_{name}");
    }

    Ok(())
}

/// Get the version of the last migration applied to the database.
pub fn schema_version(connection: &Connection) -> Result<i64, Error> {
    connection
        .pragma_query_value(None, "user_version", |row| row.get(0))
        .map_err(|error| error.into())
}

/// Read a timestamp stored as RFC 3339 text from column `index` of `row`.
pub fn get_timestamp(row: &Row, index: usize) -> Result<OffsetDateTime, rusqlite::Error> {
    let raw_timestamp: String = row.get(index)?;

    OffsetDateTime::parse(&raw_timestamp, &Rfc3339).map_err(|error| {
        rusqlite::Error::FromSqlConversionFailure(index, Type::Text, Box::new(error))
    })
}
