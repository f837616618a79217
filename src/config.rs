//! Server configuration that is read from the environment.

use crate::Error;

/// The environment variable holding the secret for signing and encrypting cookies.
pub const SECRET_KEY_ENV: &str = "SECRET_KEY";

/// Check the raw value of [SECRET_KEY_ENV] and return the secret.
///
/// There is no fallback secret.
///
/// # Errors
///
/// Returns [Error::MissingSecretKey] if `raw_secret` is `None` or only contains whitespace.
pub fn load_secret_key(raw_secret: Option<String>) -> Result<String, Error> {
    match raw_secret {
        Some(secret) if !secret.trim().is_empty() => Ok(secret),
        _ => Err(Error::MissingSecretKey),
    }
}

#[cfg(test)]
mod load_secret_key_tests {
    use crate::{Error, config::load_secret_key};

    #[test]
    fn returns_secret_when_set() {
        let secret = load_secret_key(Some("correct horse battery staple".to_owned()));

        assert_eq!(secret, Ok("correct horse battery staple".to_owned()));
    }

    #[test]
    fn fails_when_unset() {
        assert_eq!(load_secret_key(None), Err(Error::MissingSecretKey));
    }

    #[test]
    fn fails_when_blank() {
        assert_eq!(
            load_secret_key(Some("   ".to_owned())),
            Err(Error::MissingSecretKey)
        );
    }
}
