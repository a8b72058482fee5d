//! Authentication Adapter SPI, mirroring `libunftp`'s `auth::spi::Authenticator<U>`.

use super::user::User;
use async_trait::async_trait;
use std::fmt;

/// Verifies a username/password pair and, on success, returns the [`User`] the session
/// proceeds as.
#[async_trait]
pub trait Authenticator: Sync + Send {
    async fn authenticate(&self, username: &str, password: &str) -> Result<User, AuthError>;
}

#[derive(Debug)]
pub struct AuthError(pub String);

impl fmt::Display for AuthError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "authentication failed: {}", self.0)
    }
}

impl std::error::Error for AuthError {}
