//! Log-out route handler that clears the session cookie and redirects users.

use axum::response::{IntoResponse, Response};
use axum_extra::extract::PrivateCookieJar;
use axum_htmx::HxRequest;

use crate::{
    alert::Alert, auth::clear_session_cookie, endpoints, flash::set_flash, redirect::redirect,
};

/// The message shown on the home page after logging out.
pub const LOG_OUT_MSG: &str = "You have been logged out";

/// Clear the session cookie and redirect the client to the home page.
///
/// This works whether or not the client is logged in.
pub async fn get_log_out(HxRequest(is_htmx): HxRequest, jar: PrivateCookieJar) -> Response {
    let jar = clear_session_cookie(jar);
    let jar = set_flash(jar, Alert::success(LOG_OUT_MSG));

    (jar, redirect(is_htmx, endpoints::ROOT)).into_response()
}
