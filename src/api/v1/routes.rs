/*
 * Responsibility
 * - v1 の URL 構造を定義
 * - /health, /auth は公開、/tasks は Bearer 必須 (route_layer で guard を適用)
 */
use axum::{
    Router,
    routing::{get, post},
};

use crate::state::AppState;

use crate::api::v1::handlers::{
    auth::{login, register},
    health::health,
    tasks::{create_task, delete_task, get_task, list_tasks, update_task},
};
use crate::middleware::auth::access;

pub fn routes(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/health", get(health))
        .route("/auth/register", post(register))
        .route("/auth/login", post(login));

    let protected = Router::new()
        .route("/tasks", get(list_tasks).post(create_task))
        .route(
            "/tasks/{task_id}",
            get(get_task)
                .put(update_task)
                .patch(update_task)
                .delete(delete_task),
        );

    public.merge(access::apply(protected, state))
}
