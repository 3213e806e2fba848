/// Task service
///
/// Task CRUD and comments. Every change of executor or status goes through
/// [`TaskService::reassign_executor`] and [`TaskService::change_status`],
/// which decide whether a notification is due:
///
/// | Transition                         | Event       | Recipients           |
/// |------------------------------------|-------------|----------------------|
/// | executor set to a different user   | `Assigned`  | new executor         |
/// | status enters `completed`          | `Completed` | distinct commenters  |
/// | comment on a task with an executor | `Commented` | executor             |
///
/// Events are published after the write has committed. A failure to build
/// or publish one is logged and does not fail the operation.

use crate::duration::to_minutes;
use crate::error::{DomainError, DomainResult, FieldError};
use crate::events::{EventPublisher, NotificationEvent};
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges, TaskQuery, TaskStatus, TaskTransition};
use crate::models::user::User;
use crate::store::Store;
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Longest accepted task title, in characters
pub const MAX_TITLE_LEN: usize = 200;

/// Input for creating a task
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct NewTask {
    pub title: String,
    pub description: Option<String>,
    /// Defaults to the creator
    pub executor_id: Option<Uuid>,
}

/// Partial task update; `None` fields are left alone
///
/// `executor_id: Some(None)` unassigns the task. The owner is not updatable.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct TaskUpdate {
    pub title: Option<String>,
    pub description: Option<String>,
    pub status: Option<TaskStatus>,
    pub executor_id: Option<Option<Uuid>>,
}

/// Task and comment operations with notification side effects
#[derive(Clone)]
pub struct TaskService {
    store: Arc<dyn Store>,
    events: Arc<dyn EventPublisher>,
}

impl TaskService {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventPublisher>) -> Self {
        Self { store, events }
    }

    /// Creates a task owned by `creator`
    ///
    /// The executor defaults to the creator; the new executor is notified.
    pub async fn create_task(&self, creator: Uuid, input: NewTask) -> DomainResult<Task> {
        let mut errors = Vec::new();
        if let Some(e) = validate_title(&input.title) {
            errors.push(e);
        }
        let executor_id = input.executor_id.unwrap_or(creator);
        if let Some(e) = self.validate_executor(executor_id).await? {
            errors.push(e);
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let task = self
            .store
            .create_task(CreateTask {
                title: input.title,
                description: input.description.unwrap_or_default(),
                owner_id: creator,
                executor_id: Some(executor_id),
            })
            .await?;

        tracing::info!(
            task_id = task.id,
            owner_id = %creator,
            executor_id = %executor_id,
            "Task created"
        );

        self.reassign_executor(&task, None, task.executor_id).await;
        Ok(task)
    }

    pub async fn get_task(&self, task_id: i64) -> DomainResult<Task> {
        self.store
            .get_task(task_id)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))
    }

    /// One page of tasks plus the total number matching the filters
    pub async fn list_tasks(&self, query: &TaskQuery) -> DomainResult<(Vec<Task>, i64)> {
        let tasks = self.store.list_tasks(query).await?;
        let count = self.store.count_tasks(query).await?;
        Ok((tasks, count))
    }

    /// Applies a partial update, then runs the executor and status transitions
    ///
    /// Transitions are decided from the row as the store locked it, so two
    /// concurrent completions notify once.
    pub async fn update_task(&self, task_id: i64, update: TaskUpdate) -> DomainResult<Task> {
        let current = self.get_task(task_id).await?;

        let mut errors = Vec::new();
        if let Some(ref title) = update.title {
            if let Some(e) = validate_title(title) {
                errors.push(e);
            }
        }
        if let Some(Some(executor_id)) = update.executor_id {
            if let Some(e) = self.validate_executor(executor_id).await? {
                errors.push(e);
            }
        }
        if !errors.is_empty() {
            return Err(DomainError::Validation(errors));
        }

        let changes = TaskChanges {
            title: update.title,
            description: update.description,
            status: update.status,
            executor_id: update.executor_id,
        };
        if changes.is_empty() {
            return Ok(current);
        }

        let TaskTransition { before, after } = self
            .store
            .update_task(task_id, &changes)
            .await?
            .ok_or(DomainError::TaskNotFound(task_id))?;

        tracing::info!(
            task_id = task_id,
            status = %after.status,
            executor_id = ?after.executor_id,
            "Task updated"
        );

        self.reassign_executor(&after, before.executor_id, after.executor_id)
            .await;
        self.change_status(&after, before.status, after.status).await;

        Ok(after)
    }

    /// Moves a task to `completed`
    pub async fn complete_task(&self, task_id: i64) -> DomainResult<Task> {
        self.update_task(
            task_id,
            TaskUpdate {
                status: Some(TaskStatus::Completed),
                ..Default::default()
            },
        )
        .await
    }

    /// Deletes a task with its comments and logs
    pub async fn delete_task(&self, task_id: i64) -> DomainResult<()> {
        if !self.store.delete_task(task_id).await? {
            return Err(DomainError::TaskNotFound(task_id));
        }
        tracing::info!(task_id = task_id, "Task deleted");
        Ok(())
    }

    /// Executor transition: notifies the new executor when it changed
    pub async fn reassign_executor(&self, task: &Task, old: Option<Uuid>, new: Option<Uuid>) {
        let Some(new) = new else {
            return;
        };
        if old == Some(new) {
            return;
        }

        let event = match self.store.get_user(new).await {
            Ok(Some(executor)) => NotificationEvent::Assigned {
                task_id: task.id,
                task_title: task.title.clone(),
                executor_email: executor.email,
            },
            Ok(None) => {
                tracing::warn!(task_id = task.id, executor_id = %new, "Executor vanished before notification");
                return;
            }
            Err(e) => {
                tracing::warn!(task_id = task.id, error = %e, "Failed to load executor for notification");
                return;
            }
        };

        self.emit(event).await;
    }

    /// Status transition: notifies commenters when the task became completed
    pub async fn change_status(&self, task: &Task, old: TaskStatus, new: TaskStatus) {
        if old.is_completed() || !new.is_completed() {
            return;
        }

        let recipients = match self.store.commenter_emails(task.id).await {
            Ok(recipients) => recipients,
            Err(e) => {
                tracing::warn!(task_id = task.id, error = %e, "Failed to load commenters for notification");
                return;
            }
        };
        if recipients.is_empty() {
            tracing::debug!(task_id = task.id, "Task completed without commenters");
            return;
        }

        self.emit(NotificationEvent::Completed {
            task_id: task.id,
            task_title: task.title.clone(),
            recipients,
        })
        .await;
    }

    /// Adds a comment and notifies the executor, if any
    pub async fn add_comment(
        &self,
        task_id: i64,
        author_id: Uuid,
        text: String,
    ) -> DomainResult<Comment> {
        if text.trim().is_empty() {
            return Err(DomainError::invalid("text", "This field may not be blank."));
        }

        let task = self.get_task(task_id).await?;
        let author = self
            .store
            .get_user(author_id)
            .await?
            .ok_or(DomainError::UserNotFound(author_id))?;

        let comment = self
            .store
            .create_comment(CreateComment {
                task_id,
                user_id: author_id,
                text,
            })
            .await?;

        tracing::info!(
            task_id = task_id,
            comment_id = comment.id,
            user_id = %author_id,
            "Comment added"
        );

        if let Some(executor_id) = task.executor_id {
            match self.store.get_user(executor_id).await {
                Ok(Some(executor)) => {
                    self.emit(NotificationEvent::Commented {
                        task_id,
                        task_title: task.title.clone(),
                        executor_email: executor.email,
                        commenter_name: author.display_name(),
                        comment_text: comment.text.clone(),
                    })
                    .await;
                }
                Ok(None) => {}
                Err(e) => {
                    tracing::warn!(task_id = task_id, error = %e, "Failed to load executor for notification");
                }
            }
        }

        Ok(comment)
    }

    pub async fn list_comments(&self, task_id: i64) -> DomainResult<Vec<Comment>> {
        self.get_task(task_id).await?;
        Ok(self.store.list_comments(task_id).await?)
    }

    /// Logged minutes (closed logs, all users) per task
    pub async fn logged_minutes(&self, task_ids: &[i64]) -> DomainResult<HashMap<i64, i64>> {
        let seconds = self.store.logged_seconds(task_ids).await?;
        Ok(seconds
            .into_iter()
            .map(|(id, secs)| (id, to_minutes(secs)))
            .collect())
    }

    /// Loads users by ID, skipping unknown ones
    pub async fn users(&self, ids: &[Uuid]) -> DomainResult<HashMap<Uuid, User>> {
        let mut users = HashMap::new();
        for id in ids {
            if users.contains_key(id) {
                continue;
            }
            if let Some(user) = self.store.get_user(*id).await? {
                users.insert(*id, user);
            }
        }
        Ok(users)
    }

    async fn validate_executor(&self, executor_id: Uuid) -> DomainResult<Option<FieldError>> {
        Ok(match self.store.get_user(executor_id).await? {
            Some(_) => None,
            None => Some(FieldError::new(
                "executor",
                format!("Invalid pk \"{}\" - object does not exist.", executor_id),
            )),
        })
    }

    async fn emit(&self, event: NotificationEvent) {
        if let Err(e) = self.events.publish(&event).await {
            tracing::warn!(
                kind = event.kind(),
                task_id = event.task_id(),
                error = %e,
                "Failed to publish notification event"
            );
        }
    }
}

fn validate_title(title: &str) -> Option<FieldError> {
    if title.trim().is_empty() {
        Some(FieldError::new("title", "This field may not be blank."))
    } else if title.chars().count() > MAX_TITLE_LEN {
        Some(FieldError::new(
            "title",
            format!("Ensure this field has no more than {MAX_TITLE_LEN} characters."),
        ))
    } else {
        None
    }
}
