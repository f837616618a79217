//! This file defines the routes for displaying the log-in page and handling log-in requests.
//! The auth module handles the lower level session cookie logic.

use std::sync::{Arc, Mutex};

use axum::{
    Form,
    extract::{FromRef, State},
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRequest;
use maud::{Markup, html};
use rusqlite::Connection;
use serde::{Deserialize, Serialize};
use time::Duration;

use crate::{
    AppState, Error, PasswordHash, ValidatedPassword,
    alert::Alert,
    auth::set_session_cookie,
    endpoints,
    flash::take_flash,
    html::{LINK_STYLE, base, log_in_register, password_input, submit_button, text_input},
    redirect::redirect,
    user::get_user_by_email,
};

fn log_in_form(email: &str, error_message: Option<&str>) -> Markup {
    html! {
        form
            hx-post=(endpoints::LOG_IN_VIEW)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #submit-button"
            method="post"
            action=(endpoints::LOG_IN_VIEW)
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", email, None))
            (password_input(0, error_message))
            (submit_button("Log in"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400" {
                "Don't have an account? "
                a href=(endpoints::REGISTER_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Register here"
                }
            }
        }
    }
}

fn log_in_page(form: &Markup, alert: Option<Alert>) -> Markup {
    let content = log_in_register("Log in to your account", alert, form);
    base("Log In", &content)
}

/// Display the log-in page along with any pending flash message.
pub async fn get_log_in_page(jar: PrivateCookieJar) -> Response {
    let (jar, alert) = take_flash(jar);

    (jar, log_in_page(&log_in_form("", None), alert)).into_response()
}

/// The state needed to perform a login.
#[derive(Debug, Clone)]
pub struct LoginState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which sessions are valid.
    pub cookie_duration: Duration,
    /// The bcrypt cost of the hash computed for unknown emails.
    pub password_hash_cost: u32,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for LoginState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<LoginState> for Key {
    fn from_ref(state: &LoginState) -> Self {
        state.cookie_key.clone()
    }
}

/// The raw data entered by the user in the log-in form.
///
/// The email and password are stored as plain strings. There is no need for validation here since
/// they will be compared against the email and password in the database, which have been verified.
#[derive(Clone, Serialize, Deserialize)]
pub struct LogInForm {
    /// Email entered during log-in.
    pub email: String,
    /// Password entered during log-in.
    pub password: String,
}

fn invalid_credentials_response(is_htmx: bool, email: &str) -> Response {
    let message = Error::InvalidCredentials.to_string();
    let form = log_in_form(email, Some(&message));

    if is_htmx {
        form.into_response()
    } else {
        log_in_page(&form, None).into_response()
    }
}

/// Handler for log-in requests via the POST method.
///
/// On a successful log-in request, the session cookie is set and the client is redirected to the
/// dashboard page. Otherwise, the form is returned with an error message that does not say
/// whether the email or the password was wrong.
pub async fn post_log_in(
    State(state): State<LoginState>,
    HxRequest(is_htmx): HxRequest,
    jar: PrivateCookieJar,
    Form(user_data): Form<LogInForm>,
) -> Response {
    let user = match state.db_connection.lock() {
        Ok(connection) => get_user_by_email(&user_data.email, &connection),
        Err(_) => Err(Error::DatabaseLockError),
    };

    let user = match user {
        Ok(user) => user,
        Err(Error::NotFound) => {
            tracing::info!("Log-in attempt for unknown email");
            // Unknown emails cost one bcrypt round, the same as a wrong password.
            let password = ValidatedPassword::new_unchecked(&user_data.password);
            if let Err(error) = PasswordHash::new(password, state.password_hash_cost) {
                tracing::error!("Could not hash password for unknown email: {error}");
            }
            return invalid_credentials_response(is_htmx, &user_data.email);
        }
        Err(error) => return error.into_response(),
    };

    match user.password_hash.verify(&user_data.password) {
        Ok(true) => {}
        Ok(false) => {
            tracing::info!("Log-in attempt with wrong password for user {}", user.id);
            return invalid_credentials_response(is_htmx, &user_data.email);
        }
        Err(error) => return Error::HashingError(error.to_string()).into_response(),
    }

    match set_session_cookie(jar, user.id, state.cookie_duration) {
        Ok(jar) => {
            tracing::info!("User {} logged in", user.id);
            (jar, redirect(is_htmx, endpoints::DASHBOARD_VIEW)).into_response()
        }
        Err(error) => error.into_response(),
    }
}


#[cfg(test)]
mod log_in_tests {
    use std::time::Instant;

    use axum::{extract::State, http::StatusCode, response::Response};
    use axum_extra::extract::PrivateCookieJar;
    use axum_htmx::HxRequest;
    use axum_test::TestServer;

    use crate::{
        AppState, Email, PasswordHash, UserID,
        auth::{COOKIE_SESSION, get_session_token},
        endpoints,
        test_utils::{
            assert_form_error_message, assert_form_input_with_value, assert_hx_redirect,
            assert_valid_html, get_test_app_state, get_test_server, must_get_form,
            parse_html_fragment,
        },
        user::{NewUser, create_user},
    };

    use super::{LogInForm, LoginState, post_log_in};

    const TEST_EMAIL: &str = "test@test.com";
    const TEST_PASSWORD: &str = "averysafeandsecurepassword";

    fn get_state_with_user() -> (AppState, UserID) {
        let state = get_test_app_state();
        let user = create_user(
            NewUser {
                email: Email::new(TEST_EMAIL).unwrap(),
                password_hash: PasswordHash::from_raw_password(TEST_PASSWORD, 4).unwrap(),
                phone_number: "0211234567".to_owned(),
                country_code: "+64".to_owned(),
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        (state, user.id)
    }

    async fn post_log_in_htmx(state: &AppState, email: &str, password: &str) -> Response {
        post_log_in(
            State(LoginState {
                cookie_key: state.cookie_key.clone(),
                cookie_duration: state.cookie_duration,
                password_hash_cost: state.password_hash_cost,
                db_connection: state.db_connection.clone(),
            }),
            HxRequest(true),
            PrivateCookieJar::new(state.cookie_key.clone()),
            axum::Form(LogInForm {
                email: email.to_owned(),
                password: password.to_owned(),
            }),
        )
        .await
    }

    #[tokio::test]
    async fn log_in_succeeds_with_valid_credentials() {
        let (state, _) = get_state_with_user();

        let response = post_log_in_htmx(&state, TEST_EMAIL, TEST_PASSWORD).await;

        assert_eq!(response.status(), StatusCode::SEE_OTHER);
        assert_hx_redirect(&response, endpoints::DASHBOARD_VIEW);
        let cookie_header = response
            .headers()
            .get("set-cookie")
            .expect("session cookie should be set")
            .to_str()
            .unwrap();
        assert!(cookie_header.starts_with("session="));
    }

    #[tokio::test]
    async fn session_identifies_logged_in_user() {
        let (state, user_id) = get_state_with_user();
        let server: TestServer = get_test_server(state.clone());

        let response = server
            .post(endpoints::LOG_IN_VIEW)
            .form(&LogInForm {
                email: TEST_EMAIL.to_owned(),
                password: TEST_PASSWORD.to_owned(),
            })
            .await;

        response.assert_status_see_other();
        assert_eq!(response.header("location"), endpoints::DASHBOARD_VIEW);
        let session_cookie = response.cookie(COOKIE_SESSION);
        let jar = PrivateCookieJar::new(state.cookie_key.clone());
        let jar = jar.clone().add(
            jar.decrypt(session_cookie)
                .expect("Could not decrypt session cookie"),
        );
        assert_eq!(get_session_token(&jar).unwrap().user_id, user_id);
    }

    async fn assert_invalid_credentials_fragment(response: Response, want_email: &str) {
        assert_eq!(response.status(), StatusCode::OK);
        assert!(response.headers().get("set-cookie").is_none());

        let fragment = parse_html_fragment(response).await;
        assert_valid_html(&fragment);
        let form = must_get_form(&fragment);
        assert_form_input_with_value(&form, "email", "email", want_email);
        assert_form_error_message(&form, "Invalid email or password");
    }

    #[tokio::test]
    async fn log_in_fails_with_wrong_password() {
        let (state, _) = get_state_with_user();

        let response = post_log_in_htmx(&state, TEST_EMAIL, "wrongpassword").await;

        assert_invalid_credentials_fragment(response, TEST_EMAIL).await;
    }

    #[tokio::test]
    async fn log_in_fails_with_unknown_email() {
        let (state, _) = get_state_with_user();

        let response = post_log_in_htmx(&state, "wrong@email.com", TEST_PASSWORD).await;

        assert_invalid_credentials_fragment(response, "wrong@email.com").await;
    }

    #[tokio::test]
    async fn unknown_email_and_wrong_password_look_identical() {
        let (state, _) = get_state_with_user();

        let wrong_password = post_log_in_htmx(&state, TEST_EMAIL, "wrongpassword").await;
        let unknown_email = post_log_in_htmx(&state, "nobody@test.com", TEST_PASSWORD).await;

        assert_eq!(wrong_password.status(), unknown_email.status());
        let wrong_password = parse_html_fragment(wrong_password)
            .await
            .html()
            .replace(TEST_EMAIL, "");
        let unknown_email = parse_html_fragment(unknown_email)
            .await
            .html()
            .replace("nobody@test.com", "");
        assert_eq!(wrong_password, unknown_email);
    }

    #[tokio::test]
    async fn unknown_email_takes_as_long_as_wrong_password() {
        let cost = 8;
        let state = get_test_app_state().with_password_hash_cost(cost);
        create_user(
            NewUser {
                email: Email::new(TEST_EMAIL).unwrap(),
                password_hash: PasswordHash::from_raw_password(TEST_PASSWORD, cost).unwrap(),
                phone_number: "0211234567".to_owned(),
                country_code: "+64".to_owned(),
            },
            &state.db_connection.lock().unwrap(),
        )
        .unwrap();

        let start = Instant::now();
        post_log_in_htmx(&state, TEST_EMAIL, "wrongpassword").await;
        let wrong_password = start.elapsed();

        let start = Instant::now();
        post_log_in_htmx(&state, "nobody@test.com", TEST_PASSWORD).await;
        let unknown_email = start.elapsed();

        assert!(
            unknown_email * 3 >= wrong_password,
            "unknown email took {unknown_email:?}, wrong password took {wrong_password:?}"
        );
    }

    #[tokio::test]
    async fn plain_form_post_gets_full_page_on_failure() {
        let (state, _) = get_state_with_user();
        let server = get_test_server(state);

        let response = server
            .post(endpoints::LOG_IN_VIEW)
            .form(&LogInForm {
                email: "wrong@email.com".to_owned(),
                password: TEST_PASSWORD.to_owned(),
            })
            .await;

        response.assert_status_ok();
        let document = scraper::Html::parse_document(&response.text());
        assert_valid_html(&document);
        let title = scraper::Selector::parse("title").unwrap();
        assert!(document.select(&title).next().is_some());
        let form = must_get_form(&document);
        assert_form_error_message(&form, "Invalid email or password");
    }
}
