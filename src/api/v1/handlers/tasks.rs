/*
 * Responsibility
 * - /tasks 系 CRUD handler
 * - AuthCtx (middleware で検証済み) の user_id をそのまま service に渡す
 * - 所有者チェックは TaskService 側。handler は owner を一切扱わない
 */
use axum::{Json, extract::State, http::StatusCode};

use crate::{
    api::v1::{
        dto::tasks::{
            CreateTaskRequest, ListTasksQuery, TaskListResponse, TaskResponse, UpdateTaskRequest,
        },
        extractors::{AuthCtxExtractor, JsonBody, QueryParams, TaskId},
    },
    error::AppError,
    state::AppState,
};

pub async fn create_task(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    JsonBody(req): JsonBody<CreateTaskRequest>,
) -> Result<(StatusCode, Json<TaskResponse>), AppError> {
    let input = req.into_new_task()?;
    let task = state.tasks.create(auth.user_id, input).await?;

    Ok((StatusCode::CREATED, Json(task.into())))
}

pub async fn list_tasks(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    QueryParams(query): QueryParams<ListTasksQuery>,
) -> Result<Json<TaskListResponse>, AppError> {
    let page = query.page_request()?;
    let page = state.tasks.list(auth.user_id, page).await?;

    Ok(Json(page.into()))
}

pub async fn get_task(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    TaskId(task_id): TaskId,
) -> Result<Json<TaskResponse>, AppError> {
    let task = state.tasks.get(auth.user_id, task_id).await?;
    Ok(Json(task.into()))
}

pub async fn update_task(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    TaskId(task_id): TaskId,
    JsonBody(req): JsonBody<UpdateTaskRequest>,
) -> Result<Json<TaskResponse>, AppError> {
    let patch = req.into_patch()?;
    let task = state.tasks.update(auth.user_id, task_id, patch).await?;

    Ok(Json(task.into()))
}

pub async fn delete_task(
    State(state): State<AppState>,
    AuthCtxExtractor(auth): AuthCtxExtractor,
    TaskId(task_id): TaskId,
) -> Result<StatusCode, AppError> {
    state.tasks.delete(auth.user_id, task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}
