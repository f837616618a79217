use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_test::{TestResponse, TestServer};
use rusqlite::Connection;

use crate::{AppState, alert::Alert, build_router, flash::COOKIE_FLASH};

pub(crate) const TEST_SECRET: &str = "nafstenoas";

/// App state backed by an in-memory database that hashes passwords with the minimum bcrypt cost.
pub(crate) fn get_test_app_state() -> AppState {
    let connection =
        Connection::open_in_memory().expect("Could not open in-memory SQLite database");

    AppState::new(connection, TEST_SECRET)
        .expect("Could not create app state")
        .with_password_hash_cost(4)
}

pub(crate) fn get_test_server(state: AppState) -> TestServer {
    TestServer::try_new(build_router(state)).expect("Could not create test server.")
}

/// Decrypt and parse the flash message set by `response`.
#[track_caller]
pub(crate) fn get_flash(response: &TestResponse, key: &Key) -> Alert {
    let jar = PrivateCookieJar::new(key.clone());
    let cookie = jar
        .decrypt(response.cookie(COOKIE_FLASH))
        .expect("Could not decrypt flash cookie");

    serde_json::from_str(cookie.value()).expect("Could not parse flash cookie")
}
