//! In-memory `UserRepo` + `TaskRepo` used by unit and router tests.
//!
//! Mirrors the Postgres semantics that the services rely on: unique
//! usernames, newest-first listing, tri-state description updates.
use std::sync::{
    Mutex,
    atomic::{AtomicBool, Ordering},
};

use async_trait::async_trait;
use chrono::Utc;
use uuid::Uuid;

use crate::models::{Task, TaskChanges, TaskStatus, User};
use crate::repos::{RepoError, RepoResult, TaskRepo, UserRepo};

#[derive(Debug, Default)]
pub struct MemoryRepo {
    users: Mutex<Vec<User>>,
    // insertion order; listing walks it backwards
    tasks: Mutex<Vec<Task>>,
    unavailable: AtomicBool,
}

impl MemoryRepo {
    pub fn new() -> Self {
        Self::default()
    }

    /// Make every subsequent call fail like a lost database connection.
    pub fn set_unavailable(&self, unavailable: bool) {
        self.unavailable.store(unavailable, Ordering::SeqCst);
    }

    pub fn task_count(&self) -> usize {
        self.tasks.lock().unwrap().len()
    }

    fn check_available(&self) -> RepoResult<()> {
        if self.unavailable.load(Ordering::SeqCst) {
            return Err(RepoError::Db(sqlx::Error::PoolTimedOut));
        }
        Ok(())
    }
}

#[async_trait]
impl UserRepo for MemoryRepo {
    async fn create_user(&self, username: &str, password_hash: &str) -> RepoResult<User> {
        self.check_available()?;
        let mut users = self.users.lock().unwrap();
        if users.iter().any(|u| u.username == username) {
            return Err(RepoError::Conflict);
        }
        let user = User {
            id: Uuid::new_v4(),
            username: username.to_string(),
            password_hash: password_hash.to_string(),
            created_at: Utc::now(),
        };
        users.push(user.clone());
        Ok(user)
    }

    async fn find_user_by_username(&self, username: &str) -> RepoResult<Option<User>> {
        self.check_available()?;
        let users = self.users.lock().unwrap();
        Ok(users.iter().find(|u| u.username == username).cloned())
    }
}

#[async_trait]
impl TaskRepo for MemoryRepo {
    async fn create_task(
        &self,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
    ) -> RepoResult<Task> {
        self.check_available()?;
        let now = Utc::now();
        let task = Task {
            id: Uuid::new_v4(),
            owner_id,
            title: title.to_string(),
            description: description.map(str::to_string),
            status,
            created_at: now,
            updated_at: now,
        };
        self.tasks.lock().unwrap().push(task.clone());
        Ok(task)
    }

    async fn find_task_by_id(&self, task_id: Uuid) -> RepoResult<Option<Task>> {
        self.check_available()?;
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.iter().find(|t| t.id == task_id).cloned())
    }

    async fn list_tasks_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<Task>> {
        self.check_available()?;
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks
            .iter()
            .rev()
            .filter(|t| t.owner_id == owner_id)
            .skip(offset.max(0) as usize)
            .take(limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_tasks_by_owner(&self, owner_id: Uuid) -> RepoResult<i64> {
        self.check_available()?;
        let tasks = self.tasks.lock().unwrap();
        Ok(tasks.iter().filter(|t| t.owner_id == owner_id).count() as i64)
    }

    async fn update_task(&self, task_id: Uuid, changes: &TaskChanges) -> RepoResult<Option<Task>> {
        self.check_available()?;
        let mut tasks = self.tasks.lock().unwrap();
        let Some(task) = tasks.iter_mut().find(|t| t.id == task_id) else {
            return Ok(None);
        };
        if let Some(title) = &changes.title {
            task.title = title.clone();
        }
        if let Some(description) = &changes.description {
            task.description = description.clone();
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        task.updated_at = Utc::now();
        Ok(Some(task.clone()))
    }

    async fn delete_task(&self, task_id: Uuid) -> RepoResult<bool> {
        self.check_available()?;
        let mut tasks = self.tasks.lock().unwrap();
        let before = tasks.len();
        tasks.retain(|t| t.id != task_id);
        Ok(tasks.len() < before)
    }
}
