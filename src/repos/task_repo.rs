/*
 * Responsibility
 * - tasks CRUD (task store)
 * - 所有者チェックはここではしない (services::tasks の責務)。list だけは owner で絞る
 * - 書き込み系は 1 操作 = 1 トランザクション。? で抜けると drop 時に rollback される
 */
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::{FromRow, PgPool};
use uuid::Uuid;

use crate::models::{Task, TaskChanges, TaskStatus};
use crate::repos::error::RepoResult;

#[async_trait]
pub trait TaskRepo: Send + Sync {
    async fn create_task(
        &self,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
    ) -> RepoResult<Task>;

    async fn find_task_by_id(&self, task_id: Uuid) -> RepoResult<Option<Task>>;

    /// Newest first.
    async fn list_tasks_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<Task>>;

    async fn count_tasks_by_owner(&self, owner_id: Uuid) -> RepoResult<i64>;

    /// Returns `None` when the task no longer exists.
    async fn update_task(&self, task_id: Uuid, changes: &TaskChanges) -> RepoResult<Option<Task>>;

    /// Returns `false` when the task no longer exists.
    async fn delete_task(&self, task_id: Uuid) -> RepoResult<bool>;
}

#[derive(Debug, Clone, FromRow)]
struct TaskRow {
    id: Uuid,
    owner_id: Uuid,
    title: String,
    description: Option<String>,
    status: String,
    created_at: DateTime<Utc>,
    updated_at: DateTime<Utc>,
}

impl TryFrom<TaskRow> for Task {
    type Error = sqlx::Error;

    fn try_from(row: TaskRow) -> Result<Self, Self::Error> {
        let status = row
            .status
            .parse::<TaskStatus>()
            .map_err(|e| sqlx::Error::Decode(e.into()))?;

        Ok(Self {
            id: row.id,
            owner_id: row.owner_id,
            title: row.title,
            description: row.description,
            status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        })
    }
}

#[derive(Clone, Debug)]
pub struct PgTaskRepo {
    pool: PgPool,
}

impl PgTaskRepo {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl TaskRepo for PgTaskRepo {
    async fn create_task(
        &self,
        owner_id: Uuid,
        title: &str,
        description: Option<&str>,
        status: TaskStatus,
    ) -> RepoResult<Task> {
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            INSERT INTO tasks (id, owner_id, title, description, status)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING
                id, owner_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(Uuid::new_v4())
        .bind(owner_id)
        .bind(title)
        .bind(description)
        .bind(status.as_str())
        .fetch_one(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(Task::try_from(row)?)
    }

    async fn find_task_by_id(&self, task_id: Uuid) -> RepoResult<Option<Task>> {
        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT
                id, owner_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .fetch_optional(&self.pool)
        .await?;

        Ok(row.map(Task::try_from).transpose()?)
    }

    async fn list_tasks_by_owner(
        &self,
        owner_id: Uuid,
        limit: i64,
        offset: i64,
    ) -> RepoResult<Vec<Task>> {
        let rows = sqlx::query_as::<_, TaskRow>(
            r#"
            SELECT
                id, owner_id, title, description, status, created_at, updated_at
            FROM tasks
            WHERE owner_id = $1
            ORDER BY created_at DESC, id DESC
            LIMIT $2 OFFSET $3
            "#,
        )
        .bind(owner_id)
        .bind(limit)
        .bind(offset)
        .fetch_all(&self.pool)
        .await?;

        let mut tasks = Vec::with_capacity(rows.len());
        for row in rows {
            tasks.push(Task::try_from(row)?);
        }
        Ok(tasks)
    }

    async fn count_tasks_by_owner(&self, owner_id: Uuid) -> RepoResult<i64> {
        let total = sqlx::query_scalar::<_, i64>(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE owner_id = $1
            "#,
        )
        .bind(owner_id)
        .fetch_one(&self.pool)
        .await?;

        Ok(total)
    }

    async fn update_task(&self, task_id: Uuid, changes: &TaskChanges) -> RepoResult<Option<Task>> {
        // description: Some(Some(v)) -> set to v
        // description: Some(None)    -> set to NULL
        // description: None          -> do not update
        let mut tx = self.pool.begin().await?;

        let row = sqlx::query_as::<_, TaskRow>(
            r#"
            UPDATE tasks
            SET
                title = COALESCE($2, title),
                description = CASE
                    WHEN $3 = false THEN description
                    ELSE $4
                END,
                status = COALESCE($5, status),
                updated_at = now()
            WHERE id = $1
            RETURNING
                id, owner_id, title, description, status, created_at, updated_at
            "#,
        )
        .bind(task_id)
        .bind(changes.title.as_deref())
        .bind(changes.description.is_some()) // $3: flag to set description
        .bind(changes.description.as_ref().and_then(|d| d.as_deref())) // $4: new description
        .bind(changes.status.map(|s| s.as_str()))
        .fetch_optional(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(row.map(Task::try_from).transpose()?)
    }

    async fn delete_task(&self, task_id: Uuid) -> RepoResult<bool> {
        let mut tx = self.pool.begin().await?;

        let result = sqlx::query(
            r#"
            DELETE FROM tasks
            WHERE id = $1
            "#,
        )
        .bind(task_id)
        .execute(&mut *tx)
        .await?;

        tx.commit().await?;
        Ok(result.rows_affected() > 0)
    }
}
