//! Shared fixtures for unit and router tests.
use std::sync::Arc;

use crate::config::{PasswordSettings, TokenSettings};
use crate::repos::memory::MemoryRepo;
use crate::services::accounts::AccountService;
use crate::services::auth::{PasswordHasher, TokenService};
use crate::services::tasks::TaskService;
use crate::state::AppState;

pub fn token_settings() -> TokenSettings {
    TokenSettings {
        secret: "test-secret-with-at-least-32-bytes!!".to_string(),
        issuer: "task-api-test".to_string(),
        audience: "task-api-test".to_string(),
        ttl_seconds: 3600,
        leeway_seconds: 0,
    }
}

pub fn token_service() -> TokenService {
    TokenService::new(&token_settings()).unwrap()
}

/// Argon2id with the smallest parameters the crate accepts.
pub fn password_hasher() -> PasswordHasher {
    PasswordHasher::new(&PasswordSettings {
        memory_kib: 512,
        iterations: 1,
        parallelism: 1,
    })
    .unwrap()
}

/// App state over a fresh in-memory store. The repo handle lets tests
/// inspect storage or simulate an outage.
pub fn memory_state() -> (AppState, Arc<MemoryRepo>) {
    let repo = Arc::new(MemoryRepo::new());
    let tokens = Arc::new(token_service());
    let accounts = AccountService::new(repo.clone(), password_hasher(), tokens.clone());
    let tasks = TaskService::new(repo.clone());
    (AppState::new(accounts, tasks, tokens), repo)
}
