/// Task model and database operations
///
/// # Status
///
/// ```text
/// open ─┬─> in_progress ─┬─> completed
///       │                ├─> canceled
///       └────────────────┴─> archived
/// ```
///
/// Any status may be set from any other; the only boundary the core cares
/// about is entering `completed`, which triggers a notification.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE tasks (
///     id BIGSERIAL PRIMARY KEY,
///     title VARCHAR(200) NOT NULL,
///     description TEXT NOT NULL DEFAULT '',
///     status VARCHAR(20) NOT NULL DEFAULT 'open',
///     owner_id UUID REFERENCES users(id) ON DELETE CASCADE,
///     executor_id UUID REFERENCES users(id) ON DELETE CASCADE,
///     created_at TIMESTAMPTZ NOT NULL DEFAULT NOW(),
///     updated_at TIMESTAMPTZ NOT NULL DEFAULT NOW()
/// );
/// ```
///
/// `owner_id` is written once by `create` and has no update path.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use std::fmt;
use std::str::FromStr;
use uuid::Uuid;

/// Task status
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TaskStatus {
    #[default]
    Open,
    InProgress,
    Completed,
    Canceled,
    Archived,
}

impl TaskStatus {
    /// Converts status to string for database storage
    pub fn as_str(&self) -> &'static str {
        match self {
            TaskStatus::Open => "open",
            TaskStatus::InProgress => "in_progress",
            TaskStatus::Completed => "completed",
            TaskStatus::Canceled => "canceled",
            TaskStatus::Archived => "archived",
        }
    }

    pub fn is_completed(&self) -> bool {
        matches!(self, TaskStatus::Completed)
    }
}

impl fmt::Display for TaskStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for TaskStatus {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "open" => Ok(TaskStatus::Open),
            "in_progress" => Ok(TaskStatus::InProgress),
            "completed" => Ok(TaskStatus::Completed),
            "canceled" => Ok(TaskStatus::Canceled),
            "archived" => Ok(TaskStatus::Archived),
            other => Err(format!("\"{}\" is not a valid choice.", other)),
        }
    }
}

impl TryFrom<String> for TaskStatus {
    type Error = String;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        value.parse()
    }
}

/// Task row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Task {
    pub id: i64,

    pub title: String,

    pub description: String,

    #[sqlx(try_from = "String")]
    pub status: TaskStatus,

    /// Creator; never reassigned
    pub owner_id: Option<Uuid>,

    /// Current assignee
    pub executor_id: Option<Uuid>,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// Input for creating a task
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateTask {
    pub title: String,
    pub description: String,
    pub owner_id: Uuid,
    pub executor_id: Option<Uuid>,
}

/// Column changes applied by `Task::update`
///
/// `None` leaves a column untouched. `executor_id: Some(None)` clears the
/// executor.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskChanges {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub executor_id: Option<Option<Uuid>>,
}

impl TaskChanges {
    pub fn is_empty(&self) -> bool {
        self.title.is_none()
            && self.description.is_none()
            && self.status.is_none()
            && self.executor_id.is_none()
    }
}

/// A task as it was before an update and as the update left it
///
/// Both rows come from the same locked read, so concurrent updates see
/// distinct `before` states.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct TaskTransition {
    pub before: Task,
    pub after: Task,
}

/// Task list filters
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskQuery {
    pub status: Option<TaskStatus>,
    pub executor_id: Option<Uuid>,
    /// Case-insensitive substring of the title
    pub search: Option<String>,
    pub limit: i64,
    pub offset: i64,
}

impl TaskQuery {
    /// Whether a task passes the status/executor/search filters
    pub fn matches(&self, task: &Task) -> bool {
        if let Some(status) = self.status {
            if task.status != status {
                return false;
            }
        }
        if let Some(executor) = self.executor_id {
            if task.executor_id != Some(executor) {
                return false;
            }
        }
        if let Some(ref search) = self.search {
            if !task.title.to_lowercase().contains(&search.to_lowercase()) {
                return false;
            }
        }
        true
    }
}

const TASK_COLUMNS: &str =
    "id, title, description, status, owner_id, executor_id, created_at, updated_at";

impl Task {
    /// Creates a task in `open` status
    pub async fn create(pool: &PgPool, data: CreateTask) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO tasks (title, description, owner_id, executor_id)
            VALUES ($1, $2, $3, $4)
            RETURNING {TASK_COLUMNS}
            "#
        );

        sqlx::query_as::<_, Task>(&query)
            .bind(data.title)
            .bind(data.description)
            .bind(data.owner_id)
            .bind(data.executor_id)
            .fetch_one(pool)
            .await
    }

    /// Finds a task by ID
    pub async fn find_by_id(pool: &PgPool, id: i64) -> Result<Option<Self>, sqlx::Error> {
        let query = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1");

        sqlx::query_as::<_, Task>(&query)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    /// Lists tasks matching the query, ordered by ID
    pub async fn list(pool: &PgPool, query: &TaskQuery) -> Result<Vec<Self>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT {TASK_COLUMNS}
            FROM tasks
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR executor_id = $2)
              AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
            ORDER BY id ASC
            LIMIT $4 OFFSET $5
            "#
        );

        sqlx::query_as::<_, Task>(&sql)
            .bind(query.status.map(|s| s.as_str()))
            .bind(query.executor_id)
            .bind(query.search.as_deref())
            .bind(query.limit)
            .bind(query.offset)
            .fetch_all(pool)
            .await
    }

    /// Counts tasks matching the query filters (limit/offset ignored)
    pub async fn count(pool: &PgPool, query: &TaskQuery) -> Result<i64, sqlx::Error> {
        let (count,): (i64,) = sqlx::query_as(
            r#"
            SELECT COUNT(*)
            FROM tasks
            WHERE ($1::text IS NULL OR status = $1)
              AND ($2::uuid IS NULL OR executor_id = $2)
              AND ($3::text IS NULL OR title ILIKE '%' || $3 || '%')
            "#,
        )
        .bind(query.status.map(|s| s.as_str()))
        .bind(query.executor_id)
        .bind(query.search.as_deref())
        .fetch_one(pool)
        .await?;

        Ok(count)
    }

    /// Applies column changes and bumps `updated_at`
    ///
    /// The row is locked with `FOR UPDATE` before the change, and the
    /// pre-update row is returned alongside the result.
    pub async fn update(
        pool: &PgPool,
        id: i64,
        changes: &TaskChanges,
    ) -> Result<Option<TaskTransition>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!("SELECT {TASK_COLUMNS} FROM tasks WHERE id = $1 FOR UPDATE");
        let before = sqlx::query_as::<_, Task>(&select)
            .bind(id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(before) = before else {
            tx.rollback().await?;
            return Ok(None);
        };

        let mut query = String::from("UPDATE tasks SET updated_at = NOW()");
        let mut bind_count = 1;

        if changes.title.is_some() {
            bind_count += 1;
            query.push_str(&format!(", title = ${}", bind_count));
        }
        if changes.description.is_some() {
            bind_count += 1;
            query.push_str(&format!(", description = ${}", bind_count));
        }
        if changes.status.is_some() {
            bind_count += 1;
            query.push_str(&format!(", status = ${}", bind_count));
        }
        if changes.executor_id.is_some() {
            bind_count += 1;
            query.push_str(&format!(", executor_id = ${}", bind_count));
        }

        query.push_str(&format!(" WHERE id = $1 RETURNING {TASK_COLUMNS}"));

        let mut q = sqlx::query_as::<_, Task>(&query).bind(id);

        if let Some(ref title) = changes.title {
            q = q.bind(title.clone());
        }
        if let Some(ref description) = changes.description {
            q = q.bind(description.clone());
        }
        if let Some(status) = changes.status {
            q = q.bind(status.as_str());
        }
        if let Some(executor) = changes.executor_id {
            q = q.bind(executor);
        }

        let after = q.fetch_one(&mut *tx).await?;
        tx.commit().await?;

        Ok(Some(TaskTransition { before, after }))
    }

    /// Deletes a task
    ///
    /// Comments and time logs go with it (ON DELETE CASCADE).
    pub async fn delete(pool: &PgPool, id: i64) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM tasks WHERE id = $1")
            .bind(id)
            .execute(pool)
            .await?;

        Ok(result.rows_affected() > 0)
    }

    /// Total closed-log seconds per task
    ///
    /// Tasks without closed logs are absent from the result.
    pub async fn logged_seconds(
        pool: &PgPool,
        task_ids: &[i64],
    ) -> Result<Vec<(i64, i64)>, sqlx::Error> {
        sqlx::query_as::<_, (i64, i64)>(
            r#"
            SELECT task_id,
                   COALESCE(SUM(FLOOR(EXTRACT(EPOCH FROM (end_time - start_time)))), 0)::BIGINT
            FROM time_logs
            WHERE task_id = ANY($1) AND end_time IS NOT NULL
            GROUP BY task_id
            "#,
        )
        .bind(task_ids)
        .fetch_all(pool)
        .await
    }
}
