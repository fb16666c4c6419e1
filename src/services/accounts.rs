//! Registration and login.
//!
//! Login never tells "unknown username" apart from "wrong password":
//! both return `InvalidCredentials` after one full Argon2 verification.
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, error, info};

use crate::models::User;
use crate::repos::{RepoError, UserRepo};
use crate::services::auth::{IssuedToken, PasswordError, PasswordHasher, TokenError, TokenService};
use crate::services::validation::{ValidationError, non_empty_text};

pub const MAX_USERNAME_CHARS: usize = 64;

#[derive(Debug, Error)]
pub enum AccountError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error("username already exists")]
    UsernameTaken,
    #[error("invalid username or password")]
    InvalidCredentials,
    #[error(transparent)]
    Store(#[from] RepoError),
    #[error(transparent)]
    Password(#[from] PasswordError),
    #[error(transparent)]
    Token(#[from] TokenError),
    #[error("password worker failed: {0}")]
    Worker(#[from] tokio::task::JoinError),
}

#[derive(Clone)]
pub struct AccountService {
    users: Arc<dyn UserRepo>,
    passwords: PasswordHasher,
    tokens: Arc<TokenService>,
}

impl std::fmt::Debug for AccountService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("AccountService")
            .field("passwords", &self.passwords)
            .finish()
    }
}

impl AccountService {
    pub fn new(
        users: Arc<dyn UserRepo>,
        passwords: PasswordHasher,
        tokens: Arc<TokenService>,
    ) -> Self {
        Self {
            users,
            passwords,
            tokens,
        }
    }

    /// Create a user with a freshly hashed password.
    pub async fn register(&self, username: &str, password: &str) -> Result<User, AccountError> {
        let username = validate_username(username)?;
        validate_password(password)?;

        let hasher = self.passwords.clone();
        let raw = password.to_string();
        let password_hash = tokio::task::spawn_blocking(move || hasher.hash(&raw)).await??;

        let user = self
            .users
            .create_user(&username, &password_hash)
            .await
            .map_err(|e| match e {
                RepoError::Conflict => {
                    debug!(username = %username, "username already taken");
                    AccountError::UsernameTaken
                }
                other => {
                    error!(error = ?other, "failed to create user");
                    AccountError::Store(other)
                }
            })?;

        info!(user_id = %user.id, "user registered");
        Ok(user)
    }

    /// Check credentials and issue an access token.
    pub async fn login(&self, username: &str, password: &str) -> Result<IssuedToken, AccountError> {
        let username = non_empty_text("username", username)?;
        validate_password(password)?;

        let user = self
            .users
            .find_user_by_username(&username)
            .await
            .inspect_err(|e| error!(error = ?e, "failed to look up user"))?;

        let hasher = self.passwords.clone();
        let raw = password.to_string();
        let verified = match user {
            Some(user) => {
                let stored = user.password_hash.clone();
                let ok = tokio::task::spawn_blocking(move || hasher.verify(&raw, &stored)).await?;
                ok.then_some(user)
            }
            None => {
                tokio::task::spawn_blocking(move || hasher.verify_dummy(&raw)).await?;
                None
            }
        };

        let Some(user) = verified else {
            debug!("login rejected");
            return Err(AccountError::InvalidCredentials);
        };

        let issued = self.tokens.issue(user.id)?;
        info!(user_id = %user.id, "user logged in");
        Ok(issued)
    }
}

fn validate_username(raw: &str) -> Result<String, ValidationError> {
    let username = non_empty_text("username", raw)?;
    if username.chars().count() > MAX_USERNAME_CHARS {
        return Err(ValidationError::TooLong {
            field: "username",
            max: MAX_USERNAME_CHARS,
        });
    }
    Ok(username)
}

fn validate_password(raw: &str) -> Result<(), ValidationError> {
    if raw.is_empty() {
        return Err(ValidationError::Empty("password"));
    }
    Ok(())
}
