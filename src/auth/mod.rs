//! Session handling: the token identifying the logged in user, the private
//! cookie that carries it, and the middleware that guards routes.

mod cookie;
mod middleware;
mod token;

pub use cookie::{
    COOKIE_SESSION, DEFAULT_SESSION_DURATION, clear_session_cookie, get_session_token,
    mark_cookies_secure, set_session_cookie,
};
pub use middleware::{AuthState, LOG_IN_REQUIRED_MSG, auth_guard};
pub(crate) use token::SessionToken;
