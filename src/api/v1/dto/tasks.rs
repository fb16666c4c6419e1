/*
 * Responsibility
 * - /tasks 系の request/response DTO
 * - owner はクライアントから受け取らない (送られてきたら 400)
 * - description は tri-state (キーなし / null / 値)
 */
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use uuid::Uuid;

use crate::models::{Task, TaskStatus};
use crate::services::tasks::{NewTask, PageRequest, TaskPage, TaskPatch};
use crate::services::validation::ValidationError;

// Missing key -> None (via `default`), null -> Some(None), value -> Some(Some(v)).
fn double_option<'de, D, T>(de: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(de).map(Some)
}

#[derive(Debug, Deserialize)]
pub struct CreateTaskRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
    #[serde(default, alias = "user_id", deserialize_with = "double_option")]
    pub owner_id: Option<Option<serde_json::Value>>,
}

impl CreateTaskRequest {
    pub fn into_new_task(self) -> Result<NewTask, ValidationError> {
        if self.owner_id.is_some() {
            return Err(ValidationError::ReadOnly("owner_id"));
        }
        Ok(NewTask {
            title: self.title,
            description: self.description,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateTaskRequest {
    pub title: Option<String>,
    #[serde(default, deserialize_with = "double_option")]
    pub description: Option<Option<String>>,
    pub status: Option<String>,
    #[serde(default, alias = "user_id", deserialize_with = "double_option")]
    pub owner_id: Option<Option<serde_json::Value>>,
}

impl UpdateTaskRequest {
    pub fn into_patch(self) -> Result<TaskPatch, ValidationError> {
        if self.owner_id.is_some() {
            return Err(ValidationError::ReadOnly("owner_id"));
        }
        Ok(TaskPatch {
            title: self.title,
            description: self.description,
            status: self.status,
        })
    }
}

#[derive(Debug, Deserialize)]
pub struct ListTasksQuery {
    pub page: Option<i64>,
    pub per_page: Option<i64>,
}

impl ListTasksQuery {
    pub fn page_request(&self) -> Result<PageRequest, ValidationError> {
        PageRequest::new(self.page, self.per_page)
    }
}

#[derive(Debug, Serialize)]
pub struct TaskResponse {
    pub id: Uuid,
    pub title: String,
    pub description: Option<String>,
    pub status: TaskStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

impl From<Task> for TaskResponse {
    fn from(task: Task) -> Self {
        Self {
            id: task.id,
            title: task.title,
            description: task.description,
            status: task.status,
            created_at: task.created_at,
            updated_at: task.updated_at,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct PaginationResponse {
    pub total_items: i64,
    pub total_pages: i64,
    pub current_page: i64,
    pub per_page: i64,
    pub has_next: bool,
    pub has_prev: bool,
}

#[derive(Debug, Serialize)]
pub struct TaskListResponse {
    pub tasks: Vec<TaskResponse>,
    pub pagination: PaginationResponse,
}

impl From<TaskPage> for TaskListResponse {
    fn from(page: TaskPage) -> Self {
        let pagination = PaginationResponse {
            total_items: page.total_items,
            total_pages: page.total_pages(),
            current_page: page.page,
            per_page: page.per_page,
            has_next: page.has_next(),
            has_prev: page.has_prev(),
        };
        Self {
            tasks: page.tasks.into_iter().map(TaskResponse::from).collect(),
            pagination,
        }
    }
}
