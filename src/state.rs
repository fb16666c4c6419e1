/*
 * Responsibility
 * - Router に紐づける共有コンテキスト (AppState)
 *   - accounts: 登録/ログイン, tasks: 所有者チェック付き CRUD, tokens: Bearer 検証
 * - Clone 前提で持つ (内部は Arc)
 */
use std::sync::Arc;

use crate::services::accounts::AccountService;
use crate::services::auth::TokenService;
use crate::services::tasks::TaskService;

#[derive(Clone, Debug)]
pub struct AppState {
    pub accounts: Arc<AccountService>,
    pub tasks: Arc<TaskService>,
    pub tokens: Arc<TokenService>,
}

impl AppState {
    pub fn new(accounts: AccountService, tasks: TaskService, tokens: Arc<TokenService>) -> Self {
        Self {
            accounts: Arc::new(accounts),
            tasks: Arc::new(tasks),
            tokens,
        }
    }
}
