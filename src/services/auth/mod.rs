pub mod jwt;
pub mod password;

pub use jwt::{AuthError, IssuedToken, TokenError, TokenService, VerifiedToken};
pub use password::{PasswordError, PasswordHasher};
