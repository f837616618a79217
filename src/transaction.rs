//! Ledger entries that belong to a bank account.
//!
//! Transactions are only ever created and listed; they are never updated or
//! deleted. The amount is signed: positive for money coming in, negative for
//! money going out.

use std::fmt::Display;

use rusqlite::{
    Connection, Row, ToSql,
    types::{FromSql, FromSqlResult, ToSqlOutput, ValueRef},
};
use time::OffsetDateTime;

use crate::{Error, account::AccountId, db::get_timestamp};

/// Alias for the integer type used for transaction IDs.
pub type TransactionId = i64;

/// The kind of a transaction.
///
/// The database stores the kind as free text, so a tag that is not one of the
/// known kinds is kept as-is in [TransactionType::Other].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TransactionType {
    /// Money paid into the account.
    Deposit,
    /// Money taken out of the account.
    Withdrawal,
    /// Money moved to or from another account.
    Transfer,
    /// Any other tag found in the database.
    Other(String),
}

impl TransactionType {
    /// The tag stored in the database.
    pub fn as_str(&self) -> &str {
        match self {
            TransactionType::Deposit => "deposit",
            TransactionType::Withdrawal => "withdrawal",
            TransactionType::Transfer => "transfer",
            TransactionType::Other(tag) => tag,
        }
    }
}

impl From<&str> for TransactionType {
    fn from(tag: &str) -> Self {
        match tag {
            "deposit" => TransactionType::Deposit,
            "withdrawal" => TransactionType::Withdrawal,
            "transfer" => TransactionType::Transfer,
            other => TransactionType::Other(other.to_owned()),
        }
    }
}

impl Display for TransactionType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl ToSql for TransactionType {
    fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
        Ok(ToSqlOutput::from(self.as_str()))
    }
}

impl FromSql for TransactionType {
    fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
        value.as_str().map(TransactionType::from)
    }
}

/// An entry in an account's ledger.
#[derive(Debug, Clone, PartialEq)]
pub struct Transaction {
    /// The ID of the transaction.
    pub id: TransactionId,
    /// The account the transaction belongs to.
    pub account_id: AccountId,
    /// The signed amount of money.
    pub amount: f64,
    /// What kind of transaction this is.
    pub transaction_type: TransactionType,
    /// A text description of what the transaction was for.
    pub description: Option<String>,
    /// When the transaction was recorded, assigned by the database.
    pub created_at: OffsetDateTime,
}

impl Transaction {
    /// Start building a new transaction.
    pub fn build(amount: f64, transaction_type: TransactionType) -> TransactionBuilder {
        TransactionBuilder {
            amount,
            transaction_type,
            description: None,
        }
    }
}

/// The data for a transaction that has not been inserted yet.
#[derive(Debug, Clone, PartialEq)]
pub struct TransactionBuilder {
    amount: f64,
    transaction_type: TransactionType,
    description: Option<String>,
}

impl TransactionBuilder {
    /// Set the description for the transaction.
    pub fn description(mut self, description: &str) -> Self {
        self.description = Some(description.to_owned());
        self
    }
}

const TRANSACTION_COLUMNS: &str =
    "id, account_id, amount, transaction_type, description, created_at";

fn map_transaction_row(row: &Row) -> Result<Transaction, rusqlite::Error> {
    Ok(Transaction {
        id: row.get(0)?,
        account_id: row.get(1)?,
        amount: row.get(2)?,
        transaction_type: row.get(3)?,
        description: row.get(4)?,
        created_at: get_timestamp(row, 5)?,
    })
}

/// Insert a new transaction for the account `account_id`.
///
/// # Errors
/// This function will return an error if `account_id` does not refer to an
/// account, or if there is some other SQL error.
pub fn create_transaction(
    account_id: AccountId,
    builder: TransactionBuilder,
    connection: &Connection,
) -> Result<Transaction, Error> {
    connection
        .prepare(&format!(
            "INSERT INTO transactions (account_id, amount, transaction_type, description) \
            VALUES (?1, ?2, ?3, ?4) \
            RETURNING {TRANSACTION_COLUMNS}"
        ))?
        .query_row(
            (
                account_id,
                builder.amount,
                &builder.transaction_type,
                &builder.description,
            ),
            map_transaction_row,
        )
        .map_err(|error| error.into())
}

/// Get up to `limit` of the most recently created transactions for `account_id`,
/// newest first.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn list_recent_transactions(
    account_id: AccountId,
    limit: u32,
    connection: &Connection,
) -> Result<Vec<Transaction>, Error> {
    connection
        .prepare(&format!(
            "SELECT {TRANSACTION_COLUMNS} FROM transactions \
            WHERE account_id = :account_id \
            ORDER BY created_at DESC, id DESC \
            LIMIT :limit"
        ))?
        .query_map(
            &[(":account_id", &account_id), (":limit", &i64::from(limit))],
            map_transaction_row,
        )?
        .map(|maybe_transaction| maybe_transaction.map_err(Error::from))
        .collect()
}
