use chrono::{DateTime, Utc};
use uuid::Uuid;

/// A registered account.
///
/// `password_hash` is an Argon2id PHC string. It never leaves the server:
/// response DTOs are built field by field and skip it.
#[derive(Debug, Clone)]
pub struct User {
    pub id: Uuid,
    pub username: String,
    pub password_hash: String,
    pub created_at: DateTime<Utc>,
}
