/*
 * Responsibility
 * - /auth/register, /auth/login の request/response DTO
 * - 欠けているフィールドはここで Required にする (空文字チェックは service 側)
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::models::User;
use crate::services::auth::IssuedToken;
use crate::services::validation::ValidationError;

#[derive(Debug, Deserialize)]
pub struct CredentialsRequest {
    pub username: Option<String>,
    pub password: Option<String>,
}

impl CredentialsRequest {
    pub fn into_parts(self) -> Result<(String, String), ValidationError> {
        let username = self.username.ok_or(ValidationError::Required("username"))?;
        let password = self.password.ok_or(ValidationError::Required("password"))?;
        Ok((username, password))
    }
}

#[derive(Debug, Serialize)]
pub struct UserResponse {
    pub id: Uuid,
    pub username: String,
    pub created_at: DateTime<Utc>,
}

impl From<User> for UserResponse {
    fn from(user: User) -> Self {
        Self {
            id: user.id,
            username: user.username,
            created_at: user.created_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct TokenResponse {
    pub access_token: String,
    pub token_type: &'static str,
    pub expires_in: u64,
}

impl From<IssuedToken> for TokenResponse {
    fn from(issued: IssuedToken) -> Self {
        Self {
            access_token: issued.access_token,
            token_type: issued.token_type,
            expires_in: issued.expires_in,
        }
    }
}
