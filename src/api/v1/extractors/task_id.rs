/*
 * Responsibility
 * - Path の {task_id} を Uuid として受け取る
 * - 形式不正は axum 既定の text rejection ではなく AppError (400 VALIDATION_ERROR) で返す
 */
use axum::{
    extract::{FromRequestParts, Path},
    http::request::Parts,
};
use uuid::Uuid;

use crate::error::AppError;
use crate::services::validation::ValidationError;
use crate::state::AppState;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaskId(pub Uuid);

impl FromRequestParts<AppState> for TaskId {
    type Rejection = AppError;

    async fn from_request_parts(
        parts: &mut Parts,
        state: &AppState,
    ) -> Result<Self, Self::Rejection> {
        let Path(raw) = Path::<String>::from_request_parts(parts, state)
            .await
            .map_err(|_| ValidationError::Malformed("task id"))?;

        Uuid::parse_str(&raw)
            .map(TaskId)
            .map_err(|_| ValidationError::Malformed("task id").into())
    }
}
