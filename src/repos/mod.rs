/*
 * Responsibility
 * - 永続化の境界 (trait) と PostgreSQL 実装
 * - service は trait object (Arc<dyn ...>) だけを見る
 */
pub mod error;
#[cfg(test)]
pub mod memory;
pub mod task_repo;
pub mod user_repo;

pub use error::{RepoError, RepoResult};
pub use task_repo::{PgTaskRepo, TaskRepo};
pub use user_repo::{PgUserRepo, UserRepo};
