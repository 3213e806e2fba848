/// Database models for taskclock
///
/// Each model owns the SQL for its table. Services never call these
/// directly; they go through [`crate::store::Store`], whose PostgreSQL
/// implementation delegates here.
///
/// # Models
///
/// - `user`: identity records (read-only to the API)
/// - `task`: tasks, status and executor
/// - `comment`: task comments
/// - `time_log`: running and closed time logs
///
/// # Example
///
/// ```no_run
/// use taskclock_shared::models::task::{CreateTask, Task};
/// use taskclock_shared::db::pool::{create_pool, DatabaseConfig};
///
/// # async fn example(owner: uuid::Uuid) -> Result<(), Box<dyn std::error::Error>> {
/// let pool = create_pool(DatabaseConfig::default()).await?;
///
/// let task = Task::create(
///     &pool,
///     CreateTask {
///         title: "Write release notes".to_string(),
///         description: String::new(),
///         owner_id: owner,
///         executor_id: Some(owner),
///     },
/// )
/// .await?;
/// # Ok(())
/// # }
/// ```

pub mod comment;
pub mod task;
pub mod time_log;
pub mod user;
