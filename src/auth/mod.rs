mod registry;
mod spi;
mod user;

pub use registry::RegistryAuthenticator;
pub use spi::{AuthError, Authenticator};
pub use user::User;
