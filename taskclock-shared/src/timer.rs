/// Timer state machine
///
/// Per (task, user) a timer is either idle or running:
///
/// ```text
///          start                stop
///   Idle ─────────> Running ─────────> Idle
///     │  (conflict if running) (not found if idle)
///     └── manual entry: closed log created directly
/// ```
///
/// The running state is the single time log with no `end_time`. Start and
/// stop are each one atomic store call, so concurrent requests for the same
/// pair are linearized by the store.
///
/// # Example
///
/// ```
/// use std::sync::Arc;
/// use taskclock_shared::error::DomainError;
/// use taskclock_shared::models::task::CreateTask;
/// use taskclock_shared::models::user::CreateUser;
/// use taskclock_shared::store::{MemoryStore, Store};
/// use taskclock_shared::timer::TimerService;
///
/// # #[tokio::main(flavor = "current_thread")]
/// # async fn main() -> Result<(), DomainError> {
/// let store = Arc::new(MemoryStore::new());
/// let user = store
///     .create_user(CreateUser { email: "a@example.com".into(), first_name: "".into(), last_name: "".into() })
///     .await?;
/// let task = store
///     .create_task(CreateTask { title: "t".into(), description: "".into(), owner_id: user.id, executor_id: None })
///     .await?;
///
/// let timers = TimerService::new(store);
/// timers.start(task.id, user.id, None).await?;
/// assert!(matches!(
///     timers.start(task.id, user.id, None).await,
///     Err(DomainError::ActiveTimerExists)
/// ));
/// let log = timers.stop(task.id, user.id, Some("done")).await?;
/// assert!(log.end_time.is_some());
/// # Ok(())
/// # }
/// ```

use crate::error::{DomainError, DomainResult};
use crate::models::task::Task;
use crate::models::time_log::{NewTimeLog, TimeLog};
use crate::store::Store;
use chrono::{DateTime, Duration, Utc};
use std::sync::Arc;
use uuid::Uuid;

/// A manual (already finished) time entry
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ManualEntry {
    /// Minutes worked; must be positive
    pub duration_minutes: i64,

    /// When the work ended; defaults to now
    pub end_time: Option<DateTime<Utc>>,

    pub note: Option<String>,
}

/// Start/stop/manual-entry operations on time logs
#[derive(Clone)]
pub struct TimerService {
    store: Arc<dyn Store>,
}

impl TimerService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self { store }
    }

    /// Starts a timer for (task, user)
    ///
    /// # Errors
    ///
    /// - `TaskNotFound` if the task does not exist
    /// - `ActiveTimerExists` if a timer is already running for the pair
    pub async fn start(
        &self,
        task_id: i64,
        user_id: Uuid,
        note: Option<String>,
    ) -> DomainResult<TimeLog> {
        self.require_task(task_id).await?;

        let note = note.filter(|n| !n.is_empty());
        let log = self
            .store
            .insert_running_log(task_id, user_id, Utc::now(), note)
            .await?
            .ok_or(DomainError::ActiveTimerExists)?;

        tracing::info!(
            task_id = task_id,
            user_id = %user_id,
            log_id = log.id,
            "Timer started"
        );

        Ok(log)
    }

    /// Stops the running timer for (task, user)
    ///
    /// A non-empty `note` is appended to the log's note on a new line.
    ///
    /// # Errors
    ///
    /// - `TaskNotFound` if the task does not exist
    /// - `NoActiveTimer` if nothing is running; nothing is modified
    pub async fn stop(
        &self,
        task_id: i64,
        user_id: Uuid,
        note: Option<&str>,
    ) -> DomainResult<TimeLog> {
        self.require_task(task_id).await?;

        let log = self
            .store
            .close_running_log(task_id, user_id, Utc::now(), note)
            .await?
            .ok_or(DomainError::NoActiveTimer)?;

        tracing::info!(
            task_id = task_id,
            user_id = %user_id,
            log_id = log.id,
            duration_seconds = log.duration_seconds(),
            "Timer stopped"
        );

        Ok(log)
    }

    /// Records finished work without running a timer
    ///
    /// `start_time` is back-computed as `end_time - duration`.
    pub async fn create_manual(
        &self,
        task_id: i64,
        user_id: Uuid,
        entry: ManualEntry,
    ) -> DomainResult<TimeLog> {
        if entry.duration_minutes <= 0 {
            return Err(DomainError::invalid(
                "duration",
                "Ensure this value is greater than or equal to 1.",
            ));
        }

        let end_time = entry.end_time.unwrap_or_else(Utc::now);
        let start_time = Duration::try_minutes(entry.duration_minutes)
            .and_then(|duration| end_time.checked_sub_signed(duration))
            .ok_or_else(|| DomainError::invalid("duration", "Duration is too large."))?;

        self.require_task(task_id).await?;

        let log = self
            .store
            .insert_closed_log(NewTimeLog {
                task_id,
                user_id,
                start_time,
                end_time: Some(end_time),
                note: entry.note.filter(|n| !n.is_empty()),
            })
            .await?;

        tracing::info!(
            task_id = task_id,
            user_id = %user_id,
            log_id = log.id,
            duration_minutes = entry.duration_minutes,
            "Manual time log created"
        );

        Ok(log)
    }

    /// All logs of a task, ordered by ID
    pub async fn list(&self, task_id: i64) -> DomainResult<Vec<TimeLog>> {
        self.require_task(task_id).await?;
        Ok(self.store.list_logs(task_id).await?)
    }

    async fn require_task(&self, task_id: i64) -> DomainResult<Task> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))
    }
}
