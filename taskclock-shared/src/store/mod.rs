/// Entity store
///
/// The services reach persistence only through the [`Store`] trait, so the
/// same timer, task and report logic runs against PostgreSQL in production
/// and against [`MemoryStore`] in tests and local development.
///
/// # Atomicity
///
/// Implementations must make `insert_running_log` a single atomic
/// check-and-insert and `close_running_log` a conditional close of a
/// still-running row. Everything else is a plain single-statement write.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskclock_shared::store::{MemoryStore, Store};
/// use taskclock_shared::models::user::CreateUser;
///
/// # async fn example() -> Result<(), taskclock_shared::error::StoreError> {
/// let store: Arc<dyn Store> = Arc::new(MemoryStore::new());
/// let user = store
///     .create_user(CreateUser {
///         email: "dev@example.com".to_string(),
///         first_name: "Dev".to_string(),
///         last_name: String::new(),
///     })
///     .await?;
/// assert_eq!(store.get_user(user.id).await?, Some(user));
/// # Ok(())
/// # }
/// ```

pub mod memory;
pub mod postgres;

pub use memory::MemoryStore;
pub use postgres::PgStore;

use crate::error::StoreError;
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges, TaskQuery, TaskTransition};
use crate::models::time_log::{LogWindow, NewTimeLog, ReportRow, TimeLog};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::HashMap;
use uuid::Uuid;

/// Result alias for store operations
pub type StoreResult<T> = Result<T, StoreError>;

/// Persistence interface for users, tasks, comments and time logs
#[async_trait]
pub trait Store: Send + Sync {
    // Users

    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>>;

    async fn list_users(&self) -> StoreResult<Vec<User>>;

    async fn create_user(&self, data: CreateUser) -> StoreResult<User>;

    // Tasks

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task>;

    async fn get_task(&self, id: i64) -> StoreResult<Option<Task>>;

    /// Tasks matching the filters, ordered by ID, limited and offset
    async fn list_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>>;

    /// Number of tasks matching the filters
    async fn count_tasks(&self, query: &TaskQuery) -> StoreResult<i64>;

    /// Applies the changes atomically and returns the row before and after;
    /// `None` if the task does not exist
    async fn update_task(
        &self,
        id: i64,
        changes: &TaskChanges,
    ) -> StoreResult<Option<TaskTransition>>;

    /// Deletes the task with its comments and logs; `false` if absent
    async fn delete_task(&self, id: i64) -> StoreResult<bool>;

    /// Closed-log seconds per task; tasks without closed logs map to 0
    async fn logged_seconds(&self, task_ids: &[i64]) -> StoreResult<HashMap<i64, i64>>;

    // Comments

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment>;

    async fn list_comments(&self, task_id: i64) -> StoreResult<Vec<Comment>>;

    /// Distinct author emails in first-comment order
    async fn commenter_emails(&self, task_id: i64) -> StoreResult<Vec<String>>;

    // Time logs

    /// Atomically inserts a running log; `None` if one is already running
    async fn insert_running_log(
        &self,
        task_id: i64,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        note: Option<String>,
    ) -> StoreResult<Option<TimeLog>>;

    /// Closes the running log, merging `note` into it; `None` if none runs
    async fn close_running_log(
        &self,
        task_id: i64,
        user_id: Uuid,
        end_time: DateTime<Utc>,
        note: Option<&str>,
    ) -> StoreResult<Option<TimeLog>>;

    async fn insert_closed_log(&self, data: NewTimeLog) -> StoreResult<TimeLog>;

    /// All logs of a task, ordered by ID
    async fn list_logs(&self, task_id: i64) -> StoreResult<Vec<TimeLog>>;

    /// Closed logs of `user_id` inside `window`, ordered by log ID
    async fn report_rows(&self, user_id: Uuid, window: LogWindow) -> StoreResult<Vec<ReportRow>>;

    /// Liveness probe
    async fn ping(&self) -> StoreResult<()>;
}
