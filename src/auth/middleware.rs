//! Authentication middleware that validates the session cookie, extends sessions, and handles redirects.

use axum::{
    extract::{FromRef, FromRequestParts, Request, State},
    http::header::SET_COOKIE,
    middleware::Next,
    response::{IntoResponse, Response},
};
use axum_extra::extract::{PrivateCookieJar, cookie::Key};
use axum_htmx::HxRequest;
use time::Duration;

use crate::{
    AppState,
    alert::Alert,
    auth::cookie::{COOKIE_SESSION, extend_session_if_needed, get_session_token},
    endpoints,
    flash::set_flash,
    redirect::redirect,
};

/// The message shown on the log-in page after trying to open a page that requires a session.
pub const LOG_IN_REQUIRED_MSG: &str = "Please login first";

/// The state needed for the auth middleware
#[derive(Clone)]
pub struct AuthState {
    /// The key to be used for signing and encrypting private cookies.
    pub cookie_key: Key,
    /// The duration for which sessions are valid.
    pub cookie_duration: Duration,
}

impl FromRef<AppState> for AuthState {
    fn from_ref(state: &AppState) -> Self {
        Self {
            cookie_key: state.cookie_key.clone(),
            cookie_duration: state.cookie_duration,
        }
    }
}

// this impl tells `PrivateCookieJar` how to access the key from our state
impl FromRef<AuthState> for Key {
    fn from_ref(state: &AuthState) -> Self {
        state.cookie_key.clone()
    }
}

fn sets_session_cookie(response: &Response) -> bool {
    let prefix = format!("{COOKIE_SESSION}=");

    response
        .headers()
        .get_all(SET_COOKIE)
        .iter()
        .any(|value| value.to_str().is_ok_and(|value| value.starts_with(&prefix)))
}

/// Middleware function that checks for a valid session cookie.
/// The user ID is placed into the request and then the request executed normally if the session
/// is valid, otherwise the client is redirected to the log-in page with a flash message.
///
/// After the handler runs the session is extended to last at least the configured duration,
/// unless the handler set or cleared the session cookie itself.
///
/// **Note**: Route handlers can use the function argument `Extension(user_id): Extension<UserID>` to receive the user ID.
///
/// **Note**: The app state must contain an `axum_extra::extract::cookie::Key` for decrypting and verifying the cookie contents.
pub async fn auth_guard(State(state): State<AuthState>, request: Request, next: Next) -> Response {
    let (mut parts, body) = request.into_parts();
    let is_htmx = HxRequest::from_request_parts(&mut parts, &state)
        .await
        .map(|HxRequest(is_htmx)| is_htmx)
        .unwrap_or_default();
    let jar = match PrivateCookieJar::from_request_parts(&mut parts, &state).await {
        Ok(jar) => jar,
        Err(err) => {
            tracing::error!("Error getting cookie jar: {err:?}. Redirecting to log in page.");
            return redirect(is_htmx, endpoints::LOG_IN_VIEW);
        }
    };
    let user_id = match get_session_token(&jar) {
        Ok(token) => token.user_id,
        Err(_) => {
            let jar = set_flash(jar, Alert::error(LOG_IN_REQUIRED_MSG));
            return (jar, redirect(is_htmx, endpoints::LOG_IN_VIEW)).into_response();
        }
    };

    parts.extensions.insert(user_id);
    let request = Request::from_parts(parts, body);
    let response = next.run(request).await;

    if sets_session_cookie(&response) {
        return response;
    }

    let (mut parts, body) = response.into_parts();
    let jar = match extend_session_if_needed(jar.clone(), state.cookie_duration) {
        Ok(updated_jar) => updated_jar,
        Err(err) => {
            tracing::error!("Error extending session: {err:?}. Rolling back cookie jar.");
            jar
        }
    };
    for (key, val) in jar.into_response().headers().iter() {
        if key != SET_COOKIE {
            continue;
        }

        parts.headers.append(key, val.to_owned());
    }

    Response::from_parts(parts, body)
}
