//! One-shot messages that survive a redirect.
//!
//! A handler that redirects stores an [Alert] in a private cookie with
//! [set_flash]. The next page to render calls [take_flash], shows the alert and
//! deletes the cookie.

use axum_extra::extract::{
    PrivateCookieJar,
    cookie::{Cookie, SameSite},
};
use time::{Duration, OffsetDateTime};

use crate::alert::Alert;

/// The name of the cookie holding the flash message.
pub const COOKIE_FLASH: &str = "flash";

fn flash_cookie(value: String) -> Cookie<'static> {
    Cookie::build((COOKIE_FLASH, value))
        .path("/")
        .http_only(true)
        .same_site(SameSite::Strict)
        .build()
}

/// Store `alert` so that it is shown on the next page the client renders.
pub fn set_flash(jar: PrivateCookieJar, alert: Alert) -> PrivateCookieJar {
    match serde_json::to_string(&alert) {
        Ok(value) => jar.add(flash_cookie(value)),
        Err(error) => {
            tracing::error!("Could not serialize flash message {alert:?}: {error}");
            jar
        }
    }
}

/// Remove the pending flash message from `jar` and return it.
///
/// The cookie is deleted even if its contents cannot be read.
pub fn take_flash(jar: PrivateCookieJar) -> (PrivateCookieJar, Option<Alert>) {
    let Some(cookie) = jar.get(COOKIE_FLASH) else {
        return (jar, None);
    };

    let alert = match serde_json::from_str(cookie.value_trimmed()) {
        Ok(alert) => Some(alert),
        Err(error) => {
            tracing::warn!("Discarding unreadable flash message: {error}");
            None
        }
    };

    let mut removal = flash_cookie(String::new());
    removal.set_expires(OffsetDateTime::UNIX_EPOCH);
    removal.set_max_age(Duration::ZERO);

    (jar.add(removal), alert)
}
