/*
 * Responsibility
 * - ドメインの型 (User / Task / TaskStatus)
 * - repo と service の間で受け渡す。DB 行の形 (FromRow) は repo 側に閉じる
 */
pub mod task;
pub mod user;

pub use task::{Task, TaskChanges, TaskStatus};
pub use user::User;
