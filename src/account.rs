//! Bank accounts and the provisioning that creates them on demand.
//!
//! A user has no account until they first open the dashboard. At that point
//! [ensure_account_for_user] creates the account with an opening balance and
//! a few sample transactions.

use rusqlite::{Connection, OptionalExtension, Row, TransactionBehavior};

use crate::{
    Error, UserID,
    transaction::{Transaction, TransactionBuilder, TransactionType, create_transaction},
};

/// Alias for the integer type used for account IDs.
pub type AccountId = i64;

/// The balance a newly provisioned account starts with.
pub const OPENING_BALANCE: f64 = 1000.0;

/// A user's bank account.
#[derive(Debug, Clone, PartialEq)]
pub struct BankAccount {
    /// The id for the account.
    pub id: AccountId,
    /// The user that owns the account.
    pub user_id: UserID,
    /// The account number shown to the user.
    pub account_number: String,
    /// The balance.
    pub balance: f64,
}

/// The account number for the account owned by `user_id`.
///
/// For example, the user with ID 7 gets the account number "123400075678".
pub fn account_number_for(user_id: UserID) -> String {
    format!("1234{:04}5678", user_id.as_i64())
}

fn sample_transactions() -> [TransactionBuilder; 3] {
    [
        Transaction::build(500.0, TransactionType::Deposit).description("Initial deposit"),
        Transaction::build(-50.0, TransactionType::Withdrawal).description("ATM Withdrawal"),
        Transaction::build(200.0, TransactionType::Deposit).description("Salary"),
    ]
}

fn map_account_row(row: &Row) -> Result<BankAccount, rusqlite::Error> {
    let id = row.get(0)?;
    let user_id = UserID::new(row.get(1)?);
    let account_number = row.get(2)?;
    let balance = row.get(3)?;

    Ok(BankAccount {
        id,
        user_id,
        account_number,
        balance,
    })
}

/// Get the account owned by `user_id`, or `None` if the user does not have one yet.
///
/// # Errors
/// This function will return an error if there is an SQL error.
pub fn find_account_by_user(
    user_id: UserID,
    connection: &Connection,
) -> Result<Option<BankAccount>, Error> {
    connection
        .query_row(
            "SELECT id, user_id, account_number, balance FROM bank_accounts WHERE user_id = ?1",
            (user_id.as_i64(),),
            map_account_row,
        )
        .optional()
        .map_err(|error| error.into())
}

/// Get the account owned by `user_id`, creating it first if needed.
///
/// The insert, the sample transactions and the final fetch all happen in one
/// immediate SQL transaction. The sample transactions are only added by the
/// call whose insert created the account, so calling this function any number
/// of times, from any number of requests, leaves exactly one account with
/// exactly three transactions.
///
/// # Errors
/// This function will return an error if `user_id` does not refer to a user,
/// or if there is some other SQL error. Nothing is written when an error occurs.
pub fn ensure_account_for_user(
    user_id: UserID,
    connection: &mut Connection,
) -> Result<BankAccount, Error> {
    let transaction = connection.transaction_with_behavior(TransactionBehavior::Immediate)?;

    let rows_inserted = transaction.execute(
        "INSERT INTO bank_accounts (user_id, account_number, balance) VALUES (?1, ?2, ?3) \
        ON CONFLICT(user_id) DO NOTHING",
        (
            user_id.as_i64(),
            account_number_for(user_id),
            OPENING_BALANCE,
        ),
    )?;

    if rows_inserted == 1 {
        let account_id = transaction.last_insert_rowid();

        for sample in sample_transactions() {
            create_transaction(account_id, sample, &transaction)?;
        }

        tracing::info!("Provisioned account {account_id} for user {user_id}");
    }

    let account = find_account_by_user(user_id, &transaction)?.ok_or(Error::NotFound)?;
    transaction.commit()?;

    Ok(account)
}

#[cfg(test)]
mod account_number_tests {
    use crate::UserID;

    use super::account_number_for;

    #[test]
    fn pads_user_id_to_four_digits() {
        assert_eq!(account_number_for(UserID::new(7)), "123400075678");
        assert_eq!(account_number_for(UserID::new(1234)), "123412345678");
    }

    #[test]
    fn wider_ids_are_not_truncated() {
        assert_eq!(account_number_for(UserID::new(12345)), "1234123455678");
    }
}
