//! The registration page for creating a new user.
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

use crate::{
    AppState, Email, Error, PasswordHash, ValidatedPassword,
    alert::Alert,
    endpoints,
    flash::{set_flash, take_flash},
    html::{LINK_STYLE, base, log_in_register, password_input, submit_button, text_input},
    password::MIN_PASSWORD_LENGTH,
    redirect::redirect,
    user::{NewUser, create_user, email_exists},
};

/// The message flashed on the log-in page after a user registers.
pub const REGISTRATION_SUCCESS_MSG: &str = "Registration successful";

/// The values to re-fill the form with and the error to show next to each field.
#[derive(Default)]
struct RegistrationFormView<'a> {
    email: &'a str,
    phone_number: &'a str,
    country_code: &'a str,
    email_error: Option<&'a str>,
    password_error: Option<&'a str>,
}

impl<'a> RegistrationFormView<'a> {
    fn from_submission(form: &'a RegisterForm) -> Self {
        Self {
            email: &form.email,
            phone_number: &form.phone_number,
            country_code: &form.country_code,
            ..Default::default()
        }
    }
}

fn registration_form(view: RegistrationFormView) -> Markup {
    html! {
        form
            hx-post=(endpoints::REGISTER_VIEW)
            hx-swap="outerHTML"
            hx-indicator="#indicator"
            hx-disabled-elt="#email, #password, #phone_number, #country_code, #submit-button"
            method="post"
            action=(endpoints::REGISTER_VIEW)
            class="space-y-4 md:space-y-6"
        {
            (text_input("email", "Email", "email", view.email, view.email_error))
            (password_input(MIN_PASSWORD_LENGTH, view.password_error))
            (text_input("phone_number", "Phone Number", "tel", view.phone_number, None))
            (text_input("country_code", "Country Code", "text", view.country_code, None))
            (submit_button("Register"))

            p class="text-sm font-light text-gray-500 dark:text-gray-400"
            {
                "Already have an account? "

                a href=(endpoints::LOG_IN_VIEW) tabindex="0" class=(LINK_STYLE)
                {
                  "Log in here"
                }
            }
        }
    }
}

fn registration_page(form: &Markup, alert: Option<Alert>) -> Markup {
    let content = log_in_register("Create an account", alert, form);
    base("Register", &content)
}

/// Display the registration page.
pub async fn get_register_page(jar: PrivateCookieJar) -> Response {
    let (jar, alert) = take_flash(jar);
    let form = registration_form(RegistrationFormView::default());

    (jar, registration_page(&form, alert)).into_response()
}

/// The state needed for creating a new user.
#[derive(Debug, Clone)]
pub struct RegistrationState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The bcrypt cost for hashing the new user's password.
    pub password_hash_cost: u32,
    pub db_connection: Arc<Mutex<Connection>>,
}

impl FromRef<AppState> for RegistrationState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            password_hash_cost: state.password_hash_cost,
            db_connection: state.db_connection.clone(),
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<RegistrationState> for Key {
    fn from_ref(state: &RegistrationState) -> Self {
        state.cookie_key.clone()
    }
}

/// The data submitted with the registration form.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RegisterForm {
    pub email: String,
    pub password: String,
    pub phone_number: String,
    pub country_code: String,
}

fn form_error_response(is_htmx: bool, view: RegistrationFormView) -> Response {
    let form = registration_form(view);

    if is_htmx {
        form.into_response()
    } else {
        registration_page(&form, None).into_response()
    }
}

/// Handler for registration requests via the POST method.
///
/// The email, password and email uniqueness are checked in that order and the
/// first failure is shown on the form. On success the user is created and the
/// client is redirected to the log-in page. The new user is not logged in.
pub async fn register_user(
    State(state): State<RegistrationState>,
    HxRequest(is_htmx): HxRequest,
    jar: PrivateCookieJar,
    Form(user_data): Form<RegisterForm>,
) -> Response {
    let email = match Email::new(&user_data.email) {
        Ok(email) => email,
        Err(error) => {
            let message = error.to_string();
            return form_error_response(
                is_htmx,
                RegistrationFormView {
                    email_error: Some(&message),
                    ..RegistrationFormView::from_submission(&user_data)
                },
            );
        }
    };

    let validated_password = match ValidatedPassword::new(&user_data.password) {
        Ok(password) => password,
        Err(error) => {
            let message = error.to_string();
            return form_error_response(
                is_htmx,
                RegistrationFormView {
                    password_error: Some(&message),
                    ..RegistrationFormView::from_submission(&user_data)
                },
            );
        }
    };

    let duplicate_email_response = || {
        let message = Error::DuplicateEmail.to_string();
        form_error_response(
            is_htmx,
            RegistrationFormView {
                email_error: Some(&message),
                ..RegistrationFormView::from_submission(&user_data)
            },
        )
    };

    let is_registered = match state.db_connection.lock() {
        Ok(connection) => email_exists(email.as_str(), &connection),
        Err(_) => Err(Error::DatabaseLockError),
    };
    match is_registered {
        Ok(false) => {}
        Ok(true) => return duplicate_email_response(),
        Err(error) => return error.into_response(),
    }

    let password_hash = match PasswordHash::new(validated_password, state.password_hash_cost) {
        Ok(hash) => hash,
        Err(error) => {
            tracing::error!("an error occurred while hashing a password: {error}");
            return error.into_response();
        }
    };

    let new_user = NewUser {
        email,
        password_hash,
        phone_number: user_data.phone_number.clone(),
        country_code: user_data.country_code.clone(),
    };
    let user = match state.db_connection.lock() {
        Ok(connection) => create_user(new_user, &connection),
        Err(_) => Err(Error::DatabaseLockError),
    };

    match user {
        Ok(user) => {
            tracing::info!("Registered user {}", user.id);
            let jar = set_flash(jar, Alert::success(REGISTRATION_SUCCESS_MSG));
            (jar, redirect(is_htmx, endpoints::LOG_IN_VIEW)).into_response()
        }
        Err(Error::DuplicateEmail) => duplicate_email_response(),
        Err(error) => {
            tracing::error!("An unhandled error occurred while inserting a new user: {error}");
            error.into_response()
        }
    }
}
