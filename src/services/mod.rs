/*
 * Responsibility
 * - 認証/認可のコア (password, token, account, task ownership)
 * - HTTP には依存しない。handler は AuthCtx の user_id を渡して呼ぶだけ
 */
pub mod accounts;
pub mod auth;
pub mod tasks;
pub mod validation;
