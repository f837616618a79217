//! Redirects that work for both plain form posts and HTMX requests.

use axum::{
    http::StatusCode,
    response::{IntoResponse, Redirect, Response},
};
use axum_htmx::HxRedirect;

/// Redirect the client to `url`.
///
/// HTMX requests get an `HX-Redirect` header so that HTMX loads the new page,
/// other requests get a plain `303 See Other`.
pub fn redirect(is_htmx: bool, url: &str) -> Response {
    if is_htmx {
        (StatusCode::SEE_OTHER, HxRedirect(url.to_owned()), ()).into_response()
    } else {
        Redirect::to(url).into_response()
    }
}
