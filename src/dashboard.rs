//! This file defines the dashboard route and its handlers.
//!
//! Opening the dashboard for the first time creates the user's bank account.

use std::sync::{Arc, Mutex};

use axum::{
    Extension,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRequest;
use maud::{Markup, html};
use rusqlite::Connection;
use time::{format_description::BorrowedFormatItem, macros::format_description};

use crate::{
    AppState, Error,
    account::{BankAccount, ensure_account_for_user},
    alert::Alert,
    auth::clear_session_cookie,
    endpoints,
    flash::{set_flash, take_flash},
    html::{
        PAGE_CONTAINER_STYLE, TABLE_CELL_STYLE, TABLE_HEADER_STYLE, TABLE_ROW_STYLE, base,
        flash_message, format_currency,
    },
    navigation::NavBar,
    redirect::redirect,
    transaction::{Transaction, list_recent_transactions},
    user::{User, UserID, get_user_by_id},
};

/// The most transactions shown on the dashboard.
pub const RECENT_TRANSACTION_LIMIT: u32 = 5;

/// The message shown when the session belongs to a user that no longer exists.
pub const USER_NOT_FOUND_MSG: &str = "User not found";

const DATE_FORMAT: &[BorrowedFormatItem] =
    format_description!("[year]-[month]-[day] [hour]:[minute]");

/// The state needed for the dashboard page.
#[derive(Debug, Clone)]
pub struct DashboardState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for DashboardState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<DashboardState> for Key {
    fn from_ref(state: &DashboardState) -> Self {
        state.cookie_key.clone()
    }
}

fn profile_card(user: &User, account: &BankAccount) -> Markup {
    html! {
        div class="w-full max-w-2xl p-6 mb-6 bg-white rounded-lg shadow dark:bg-gray-800"
        {
            h2 class="mb-4 text-xl font-bold" { "Welcome, " (user.name) }

            dl class="grid grid-cols-2 gap-2 text-sm"
            {
                dt class="font-semibold" { "Email" }
                dd data-field="email" { (user.email.as_str()) }

                dt class="font-semibold" { "Phone" }
                dd data-field="phone" { (user.country_code) " " (user.phone_number) }

                dt class="font-semibold" { "Account number" }
                dd data-field="account-number" { (account.account_number) }

                dt class="font-semibold" { "Balance" }
                dd data-field="balance" class="text-lg font-bold" { (format_currency(account.balance)) }
            }
        }
    }
}

fn transactions_table(transactions: &[Transaction]) -> Markup {
    html! {
        div class="w-full max-w-2xl overflow-x-auto shadow-md rounded-lg"
        {
            table class="w-full text-sm text-left text-gray-500 dark:text-gray-400"
            {
                caption class="p-5 text-lg font-semibold text-left text-gray-900 bg-white dark:text-white dark:bg-gray-800"
                {
                    "Recent Transactions"
                }

                thead class=(TABLE_HEADER_STYLE)
                {
                    tr
                    {
                        th scope="col" class=(TABLE_CELL_STYLE) { "Date" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Description" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Type" }
                        th scope="col" class=(TABLE_CELL_STYLE) { "Amount" }
                    }
                }

                tbody
                {
                    @for transaction in transactions {
                        tr class=(TABLE_ROW_STYLE) data-transaction-id=(transaction.id)
                        {
                            td class=(TABLE_CELL_STYLE)
                            {
                                (transaction.created_at.format(DATE_FORMAT).unwrap_or_default())
                            }
                            td class=(TABLE_CELL_STYLE)
                            {
                                (transaction.description.as_deref().unwrap_or_default())
                            }
                            td class=(TABLE_CELL_STYLE) { (transaction.transaction_type.as_str()) }
                            td class={ (TABLE_CELL_STYLE) " text-right" }
                            {
                                (format_currency(transaction.amount))
                            }
                        }
                    }

                    @if transactions.is_empty() {
                        tr class=(TABLE_ROW_STYLE)
                        {
                            td colspan="4" class={ (TABLE_CELL_STYLE) " text-center" }
                            {
                                "No transactions yet."
                            }
                        }
                    }
                }
            }
        }
    }
}

fn dashboard_view(
    user: &User,
    account: &BankAccount,
    transactions: &[Transaction],
    alert: Option<Alert>,
) -> Markup {
    let nav_bar = NavBar::new(endpoints::DASHBOARD_VIEW).into_html();

    let content = html! {
        (nav_bar)
        (flash_message(alert))

        div class=(PAGE_CONTAINER_STYLE)
        {
            (profile_card(user, account))
            (transactions_table(transactions))
        }
    };

    base("Dashboard", &content)
}

/// Display the user's profile, their account and its most recent transactions.
///
/// The account is created the first time this page is opened. If the user in
/// the session no longer exists, the session is cleared and the client is sent
/// to the log-in page.
pub async fn get_dashboard_page(
    State(state): State<DashboardState>,
    HxRequest(is_htmx): HxRequest,
    Extension(user_id): Extension<UserID>,
    jar: PrivateCookieJar,
) -> Response {
    let mut connection = match state.db_connection.lock() {
        Ok(connection) => connection,
        Err(_) => return Error::DatabaseLockError.into_response(),
    };

    let user = match get_user_by_id(user_id, &connection) {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::warn!("Session refers to user {user_id} which does not exist");
            let jar = clear_session_cookie(jar);
            let jar = set_flash(jar, Alert::error(USER_NOT_FOUND_MSG));
            return (jar, redirect(is_htmx, endpoints::LOG_IN_VIEW)).into_response();
        }
        Err(error) => return error.into_response(),
    };

    let account = match ensure_account_for_user(user.id, &mut connection) {
        Ok(account) => account,
        Err(error) => return error.into_response(),
    };

    let transactions =
        match list_recent_transactions(account.id, RECENT_TRANSACTION_LIMIT, &connection) {
            Ok(transactions) => transactions,
            Err(error) => return error.into_response(),
        };
    drop(connection);

    let (jar, alert) = take_flash(jar);

    (jar, dashboard_view(&user, &account, &transactions, alert)).into_response()
}

#[cfg(test)]
mod dashboard_route_tests {
    use axum::{Extension, extract::State, http::StatusCode, response::Response};
    use axum_extra::extract::PrivateCookieJar;
    use axum_htmx::HxRequest;
    use scraper::{Html, Selector};

    use crate::{
        AppState, Email, PasswordHash,
        account::find_account_by_user,
        endpoints,
        test_utils::{assert_valid_html, get_test_app_state, parse_html_document},
        transaction::{Transaction, TransactionType, create_transaction},
        user::{NewUser, User, UserID, create_user},
    };

    use super::{DashboardState, get_dashboard_page};

    fn create_test_user(state: &AppState) -> User {
        create_user(
            NewUser {
                email: Email::new("jane.doe@example.com").unwrap(),
                password_hash: PasswordHash::new_unchecked("hunter2"),
                phone_number: "0211234567".to_owned(),
                country_code: "+64".to_owned(),
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap()
    }

    async fn get_dashboard(state: &AppState, user_id: UserID) -> Response {
        get_dashboard_page(
            State(DashboardState {
                cookie_key: state.cookie_key.clone(),
                db_connection: state.db_connection.clone(),
            }),
            HxRequest(false),
            Extension(user_id),
            PrivateCookieJar::new(state.cookie_key.clone()),
        )
        .await
    }

    fn count(state: &AppState, table: &str) -> i64 {
        state
            .db_connection
            .lock()
            .unwrap()
            .query_row(&format!("SELECT COUNT(*) FROM {table}"), [], |row| {
                row.get(0)
            })
            .unwrap()
    }

    #[track_caller]
    fn field_text(document: &Html, field: &str) -> String {
        let selector = Selector::parse(&format!("dd[data-field={field}]")).unwrap();
        document
            .select(&selector)
            .next()
            .unwrap_or_else(|| panic!("No field {field} found"))
            .text()
            .collect::<String>()
            .trim()
            .to_owned()
    }

    fn transaction_descriptions(document: &Html) -> Vec<String> {
        let row_selector = Selector::parse("tbody tr[data-transaction-id]").unwrap();
        let cell_selector = Selector::parse("td").unwrap();

        document
            .select(&row_selector)
            .map(|row| {
                row.select(&cell_selector)
                    .nth(1)
                    .expect("row should have a description cell")
                    .text()
                    .collect::<String>()
                    .trim()
                    .to_owned()
            })
            .collect()
    }

    #[tokio::test]
    async fn first_visit_provisions_account() {
        let state = get_test_app_state();
        let user = create_test_user(&state);

        let response = get_dashboard(&state, user.id).await;

        assert_eq!(response.status(), StatusCode::OK);
        let document = parse_html_document(response).await;
        assert_valid_html(&document);
        assert_eq!(field_text(&document, "email"), "jane.doe@example.com");
        assert_eq!(field_text(&document, "phone"), "+64 0211234567");
        assert_eq!(field_text(&document, "account-number"), "123400015678");
        assert_eq!(field_text(&document, "balance"), "$1,000.00");
        assert_eq!(
            transaction_descriptions(&document),
            vec!["Salary", "ATM Withdrawal", "Initial deposit"]
        );
        let heading = document
            .select(&Selector::parse("h2").unwrap())
            .next()
            .unwrap()
            .text()
            .collect::<String>();
        assert_eq!(heading, "Welcome, jane.doe");

        assert_eq!(count(&state, "bank_accounts"), 1);
        assert_eq!(count(&state, "transactions"), 3);
    }

    #[tokio::test]
    async fn repeat_visits_do_not_provision_again() {
        let state = get_test_app_state();
        let user = create_test_user(&state);

        get_dashboard(&state, user.id).await;
        let response = get_dashboard(&state, user.id).await;

        assert_eq!(response.status(), StatusCode::OK);
        assert_eq!(count(&state, "bank_accounts"), 1);
        assert_eq!(count(&state, "transactions"), 3);
    }

    #[tokio::test]
    async fn shows_at_most_five_transactions() {
        let state = get_test_app_state();
        let user = create_test_user(&state);
        get_dashboard(&state, user.id).await;
        {
            let connection = state.db_connection.lock().unwrap();
            let account = find_account_by_user(user.id, &connection).unwrap().unwrap();
            for i in 0..4 {
                create_transaction(
                    account.id,
                    Transaction::build(-10.0, TransactionType::Transfer)
                        .description(&format!("Transfer {i}")),
                    &connection,
                )
                .unwrap();
            }
        }

        let response = get_dashboard(&state, user.id).await;

        let document = parse_html_document(response).await;
        let descriptions = transaction_descriptions(&document);
        assert_eq!(descriptions.len(), 5, "got {descriptions:?}");
        assert_eq!(descriptions[0], "Transfer 3");
        assert!(!descriptions.contains(&"Initial deposit".to_owned()));
    }

    #[tokio::test]
    async fn unknown_user_clears_session_and_redirects() {
        let state = get_test_app_state();

        let response = get_dashboard(&state, UserID::new(999)).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_eq!(
            response.headers().get("location").unwrap(),
            endpoints::LOG_IN_VIEW
        );
        let set_cookies: Vec<_> = response
            .headers()
            .get_all("set-cookie")
            .iter()
            .map(|header| header.to_str().unwrap().to_owned())
            .collect();
        assert!(
            set_cookies
                .iter()
                .any(|cookie| cookie.starts_with("session=") && cookie.contains("Max-Age=0")),
            "got {set_cookies:?}"
        );
        assert!(
            set_cookies.iter().any(|cookie| cookie.starts_with("flash=")),
            "got {set_cookies:?}"
        );
        assert_eq!(count(&state, "bank_accounts"), 0);
    }
}
