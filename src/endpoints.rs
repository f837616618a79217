//! The endpoint URIs.
//!
//! Page routes serve HTML for `GET` and accept the matching form for `POST`.

/// The landing page.
pub const ROOT: &str = "/";
/// The page for logged in users, showing their account and recent transactions.
pub const DASHBOARD_VIEW: &str = "/dashboard";
/// The route for getting the registration page and submitting the registration form.
pub const REGISTER_VIEW: &str = "/register";
/// The route for getting the log in page and submitting the log in form.
pub const LOG_IN_VIEW: &str = "/login";
/// The route for the client to log out the current user.
pub const LOG_OUT: &str = "/logout";
