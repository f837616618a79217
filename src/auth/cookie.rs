//! Defines functions for storing the session token in a private cookie.

use std::cmp::max;

use axum::{
    http::{HeaderValue, header::SET_COOKIE},
    response::Response,
};
use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::{Error, UserID, auth::SessionToken};

/// The name of the cookie holding the session token.
pub const COOKIE_SESSION: &str = "session";
/// The default duration for which a session is valid.
pub const DEFAULT_SESSION_DURATION: Duration = Duration::hours(1);

fn session_cookie(value: String, expires_at: OffsetDateTime) -> Cookie<'static> {
    Cookie::build((COOKIE_SESSION, value))
        .path("/")
        .expires(expires_at)
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

fn add_token(jar: PrivateCookieJar, token: &SessionToken) -> Result<PrivateCookieJar, Error> {
    let token_string =
        serde_json::to_string(token).map_err(|error| Error::SessionTokenError(error.to_string()))?;

    Ok(jar.add(session_cookie(token_string, token.expires_at)))
}

/// Add a session cookie to the cookie jar, indicating that a user is logged in.
///
/// The session expires `duration` from the current time.
/// You can use [DEFAULT_SESSION_DURATION] for the default duration.
///
/// # Errors
///
/// Returns [Error::SessionTokenError] if the token cannot be serialized.
pub fn set_session_cookie(
    jar: PrivateCookieJar,
    user_id: UserID,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = SessionToken {
        user_id,
        expires_at: OffsetDateTime::now_utc() + duration,
    };

    add_token(jar, &token)
}

/// Overwrite the session cookie with an empty value and an expiry in the past,
/// which deletes the cookie on the client side.
pub fn clear_session_cookie(jar: PrivateCookieJar) -> PrivateCookieJar {
    let mut cookie = session_cookie(String::new(), OffsetDateTime::UNIX_EPOCH);
    cookie.set_max_age(Duration::ZERO);

    jar.add(cookie)
}

/// Read the session token from `jar`.
///
/// # Errors
///
/// Returns [Error::InvalidSession] if the cookie is missing, cannot be
/// decrypted or parsed, or if the session has expired.
pub fn get_session_token(jar: &PrivateCookieJar) -> Result<SessionToken, Error> {
    let cookie = jar.get(COOKIE_SESSION).ok_or(Error::InvalidSession)?;
    let token: SessionToken =
        serde_json::from_str(cookie.value_trimmed()).map_err(|_| Error::InvalidSession)?;

    if token.is_expired() {
        return Err(Error::InvalidSession);
    }

    Ok(token)
}

/// Set the expiry of the session in `jar` to the latest of UTC now plus
/// `duration` and the current expiry.
///
/// # Errors
///
/// The cookie jar is not modified if an error is returned.
///
/// Returns:
/// - [Error::InvalidSession] if there is no valid session in the cookie jar.
/// - [Error::SessionTokenError] if extending the session by `duration` would overflow the date time.
pub fn extend_session_if_needed(
    jar: PrivateCookieJar,
    duration: Duration,
) -> Result<PrivateCookieJar, Error> {
    let token = get_session_token(&jar)?;

    let new_expiry = OffsetDateTime::now_utc()
        .checked_add(duration)
        .ok_or_else(|| Error::SessionTokenError("session expiry overflowed".to_owned()))?;

    let token = SessionToken {
        expires_at: max(token.expires_at, new_expiry),
        ..token
    };

    add_token(jar, &token)
}

/// Add the `Secure` attribute to every cookie set by `response`.
///
/// Cookies are built without `Secure` so that they survive plain HTTP. Layer
/// this over the router with [axum::middleware::map_response] when the server
/// is behind TLS.
pub async fn mark_cookies_secure(mut response: Response) -> Response {
    let headers = response.headers_mut();
    let cookies: Vec<HeaderValue> = headers.get_all(SET_COOKIE).iter().cloned().collect();
    headers.remove(SET_COOKIE);

    for header in cookies {
        let secured = header
            .to_str()
            .ok()
            .and_then(|text| Cookie::parse(text).ok())
            .and_then(|mut cookie| {
                cookie.set_secure(true);
                HeaderValue::from_str(&cookie.to_string()).ok()
            });

        match secured {
            Some(secured) => headers.append(SET_COOKIE, secured),
            None => {
                tracing::warn!("Could not mark cookie header {header:?} as secure");
                headers.append(SET_COOKIE, header)
            }
        };
    }

    response
}
