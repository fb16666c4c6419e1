//! Task operations scoped to the authenticated user.
//!
//! Every operation on an existing task goes through
//! [`TaskService::authorize_task_access`] before anything else is looked
//! at. Callers turn both `NotFound` and `Forbidden` into the same 404 so
//! task ids owned by other users cannot be probed.
use std::sync::Arc;

use thiserror::Error;
use tracing::{debug, info, warn};
use uuid::Uuid;

use crate::models::{Task, TaskChanges, TaskStatus};
use crate::repos::{RepoError, TaskRepo};
use crate::services::validation::{ValidationError, non_empty_text, required_text};

pub const DEFAULT_PAGE: i64 = 1;
pub const DEFAULT_PER_PAGE: i64 = 3;
pub const MAX_PER_PAGE: i64 = 100;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Error)]
pub enum AccessError {
    #[error("task not found")]
    NotFound,
    #[error("task belongs to another user")]
    Forbidden,
}

#[derive(Debug, Error)]
pub enum TaskError {
    #[error(transparent)]
    Validation(#[from] ValidationError),
    #[error(transparent)]
    Access(#[from] AccessError),
    #[error(transparent)]
    Store(#[from] RepoError),
}

/// Unvalidated create input.
#[derive(Debug, Clone, Default)]
pub struct NewTask {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<String>,
}

/// Unvalidated update input. See [`TaskChanges`] for the description states.
#[derive(Debug, Clone, Default)]
pub struct TaskPatch {
    pub title: Option<String>,
    pub description: Option<Option<String>>,
    pub status: Option<String>,
}

impl TaskPatch {
    fn into_changes(self) -> Result<TaskChanges, ValidationError> {
        let title = self
            .title
            .map(|t| non_empty_text("title", &t))
            .transpose()?;
        let status = self.status.map(|s| s.parse::<TaskStatus>()).transpose()?;
        Ok(TaskChanges {
            title,
            description: self.description,
            status,
        })
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageRequest {
    pub page: i64,
    pub per_page: i64,
}

impl PageRequest {
    pub fn new(page: Option<i64>, per_page: Option<i64>) -> Result<Self, ValidationError> {
        let page = page.unwrap_or(DEFAULT_PAGE);
        let per_page = per_page.unwrap_or(DEFAULT_PER_PAGE);
        if page < 1 {
            return Err(ValidationError::NotPositive("page"));
        }
        if per_page < 1 {
            return Err(ValidationError::NotPositive("per_page"));
        }
        Ok(Self {
            page,
            per_page: per_page.min(MAX_PER_PAGE),
        })
    }

    fn offset(&self) -> i64 {
        (self.page - 1).saturating_mul(self.per_page)
    }
}

impl Default for PageRequest {
    fn default() -> Self {
        Self {
            page: DEFAULT_PAGE,
            per_page: DEFAULT_PER_PAGE,
        }
    }
}

#[derive(Debug, Clone)]
pub struct TaskPage {
    pub tasks: Vec<Task>,
    pub total_items: i64,
    pub page: i64,
    pub per_page: i64,
}

impl TaskPage {
    pub fn total_pages(&self) -> i64 {
        if self.total_items == 0 {
            0
        } else {
            (self.total_items + self.per_page - 1) / self.per_page
        }
    }

    pub fn has_next(&self) -> bool {
        self.page < self.total_pages()
    }

    pub fn has_prev(&self) -> bool {
        self.page > 1
    }
}

#[derive(Clone)]
pub struct TaskService {
    tasks: Arc<dyn TaskRepo>,
}

impl std::fmt::Debug for TaskService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("TaskService").finish_non_exhaustive()
    }
}

impl TaskService {
    pub fn new(tasks: Arc<dyn TaskRepo>) -> Self {
        Self { tasks }
    }

    /// Load a task and make sure `user_id` owns it.
    pub async fn authorize_task_access(&self, user_id: Uuid, task_id: Uuid) -> Result<Task, TaskError> {
        let Some(task) = self.tasks.find_task_by_id(task_id).await? else {
            debug!(%task_id, "task not found");
            return Err(AccessError::NotFound.into());
        };

        if task.owner_id != user_id {
            warn!(%user_id, %task_id, "cross-user task access denied");
            return Err(AccessError::Forbidden.into());
        }

        Ok(task)
    }

    pub async fn create(&self, user_id: Uuid, input: NewTask) -> Result<Task, TaskError> {
        let title = required_text("title", input.title.as_deref())?;
        let status = match input.status {
            Some(s) => s.parse::<TaskStatus>()?,
            None => TaskStatus::default(),
        };

        let task = self
            .tasks
            .create_task(user_id, &title, input.description.as_deref(), status)
            .await?;

        info!(%user_id, task_id = %task.id, "task created");
        Ok(task)
    }

    /// Only the caller's tasks, newest first.
    pub async fn list(&self, user_id: Uuid, page: PageRequest) -> Result<TaskPage, TaskError> {
        let total_items = self.tasks.count_tasks_by_owner(user_id).await?;
        let tasks = self
            .tasks
            .list_tasks_by_owner(user_id, page.per_page, page.offset())
            .await?;

        Ok(TaskPage {
            tasks,
            total_items,
            page: page.page,
            per_page: page.per_page,
        })
    }

    pub async fn get(&self, user_id: Uuid, task_id: Uuid) -> Result<Task, TaskError> {
        self.authorize_task_access(user_id, task_id).await
    }

    /// Authorize, validate, then write. A patch with no fields is a no-op.
    pub async fn update(&self, user_id: Uuid, task_id: Uuid, patch: TaskPatch) -> Result<Task, TaskError> {
        let current = self.authorize_task_access(user_id, task_id).await?;
        let changes = patch.into_changes()?;

        if changes.is_empty() {
            return Ok(current);
        }

        let task = self
            .tasks
            .update_task(task_id, &changes)
            .await?
            .ok_or(AccessError::NotFound)?;

        info!(%user_id, %task_id, "task updated");
        Ok(task)
    }

    pub async fn delete(&self, user_id: Uuid, task_id: Uuid) -> Result<(), TaskError> {
        self.authorize_task_access(user_id, task_id).await?;

        if !self.tasks.delete_task(task_id).await? {
            return Err(AccessError::NotFound.into());
        }

        info!(%user_id, %task_id, "task deleted");
        Ok(())
    }
}
