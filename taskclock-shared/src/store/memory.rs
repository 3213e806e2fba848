/// In-process store
///
/// Everything lives behind one `tokio::sync::Mutex`, so every trait method
/// is trivially atomic. Used by the integration tests and for running the
/// API without a database.

use super::{Store, StoreResult};
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges, TaskQuery, TaskTransition};
use crate::models::time_log::{merge_note, LogWindow, NewTimeLog, ReportRow, TimeLog};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::Mutex;
use uuid::Uuid;

#[derive(Default)]
struct Tables {
    users: Vec<User>,
    tasks: BTreeMap<i64, Task>,
    comments: BTreeMap<i64, Comment>,
    logs: BTreeMap<i64, TimeLog>,
    next_task_id: i64,
    next_comment_id: i64,
    next_log_id: i64,
}

impl Tables {
    fn next_id(counter: &mut i64) -> i64 {
        *counter += 1;
        *counter
    }
}

/// [`Store`] kept entirely in memory
#[derive(Default)]
pub struct MemoryStore {
    tables: Mutex<Tables>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl Store for MemoryStore {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        let tables = self.tables.lock().await;
        Ok(tables.users.iter().find(|u| u.id == id).cloned())
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(self.tables.lock().await.users.clone())
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        let user = User {
            id: Uuid::new_v4(),
            email: data.email,
            first_name: data.first_name,
            last_name: data.last_name,
            created_at: Utc::now(),
        };
        self.tables.lock().await.users.push(user.clone());
        Ok(user)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        let mut tables = self.tables.lock().await;
        let now = Utc::now();
        let task = Task {
            id: Tables::next_id(&mut tables.next_task_id),
            title: data.title,
            description: data.description,
            status: Default::default(),
            owner_id: Some(data.owner_id),
            executor_id: data.executor_id,
            created_at: now,
            updated_at: now,
        };
        tables.tasks.insert(task.id, task.clone());
        Ok(task)
    }

    async fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(self.tables.lock().await.tasks.get(&id).cloned())
    }

    async fn list_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .tasks
            .values()
            .filter(|t| query.matches(t))
            .skip(query.offset.max(0) as usize)
            .take(query.limit.max(0) as usize)
            .cloned()
            .collect())
    }

    async fn count_tasks(&self, query: &TaskQuery) -> StoreResult<i64> {
        let tables = self.tables.lock().await;
        Ok(tables.tasks.values().filter(|t| query.matches(t)).count() as i64)
    }

    async fn update_task(
        &self,
        id: i64,
        changes: &TaskChanges,
    ) -> StoreResult<Option<TaskTransition>> {
        let mut tables = self.tables.lock().await;
        let Some(task) = tables.tasks.get_mut(&id) else {
            return Ok(None);
        };
        let before = task.clone();

        if let Some(ref title) = changes.title {
            task.title = title.clone();
        }
        if let Some(ref description) = changes.description {
            task.description = description.clone();
        }
        if let Some(status) = changes.status {
            task.status = status;
        }
        if let Some(executor) = changes.executor_id {
            task.executor_id = executor;
        }
        task.updated_at = Utc::now();

        Ok(Some(TaskTransition {
            before,
            after: task.clone(),
        }))
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        let mut tables = self.tables.lock().await;
        if tables.tasks.remove(&id).is_none() {
            return Ok(false);
        }
        tables.comments.retain(|_, c| c.task_id != id);
        tables.logs.retain(|_, l| l.task_id != id);
        Ok(true)
    }

    async fn logged_seconds(&self, task_ids: &[i64]) -> StoreResult<HashMap<i64, i64>> {
        let tables = self.tables.lock().await;
        let mut totals: HashMap<i64, i64> = task_ids.iter().map(|id| (*id, 0)).collect();
        for log in tables.logs.values() {
            if let (Some(total), Some(seconds)) =
                (totals.get_mut(&log.task_id), log.duration_seconds())
            {
                *total += seconds;
            }
        }
        Ok(totals)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        let mut tables = self.tables.lock().await;
        let comment = Comment {
            id: Tables::next_id(&mut tables.next_comment_id),
            task_id: data.task_id,
            user_id: data.user_id,
            text: data.text,
            created_at: Utc::now(),
        };
        tables.comments.insert(comment.id, comment.clone());
        Ok(comment)
    }

    async fn list_comments(&self, task_id: i64) -> StoreResult<Vec<Comment>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .comments
            .values()
            .filter(|c| c.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn commenter_emails(&self, task_id: i64) -> StoreResult<Vec<String>> {
        let tables = self.tables.lock().await;
        let mut emails: Vec<String> = Vec::new();
        for comment in tables.comments.values().filter(|c| c.task_id == task_id) {
            let Some(author) = tables.users.iter().find(|u| u.id == comment.user_id) else {
                continue;
            };
            if !emails.contains(&author.email) {
                emails.push(author.email.clone());
            }
        }
        Ok(emails)
    }

    async fn insert_running_log(
        &self,
        task_id: i64,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        note: Option<String>,
    ) -> StoreResult<Option<TimeLog>> {
        let mut tables = self.tables.lock().await;
        let running = tables
            .logs
            .values()
            .any(|l| l.task_id == task_id && l.user_id == user_id && l.is_running());
        if running {
            return Ok(None);
        }

        let log = TimeLog {
            id: Tables::next_id(&mut tables.next_log_id),
            task_id,
            user_id,
            start_time,
            end_time: None,
            note,
        };
        tables.logs.insert(log.id, log.clone());
        Ok(Some(log))
    }

    async fn close_running_log(
        &self,
        task_id: i64,
        user_id: Uuid,
        end_time: DateTime<Utc>,
        note: Option<&str>,
    ) -> StoreResult<Option<TimeLog>> {
        let mut tables = self.tables.lock().await;
        let Some(log) = tables
            .logs
            .values_mut()
            .find(|l| l.task_id == task_id && l.user_id == user_id && l.is_running())
        else {
            return Ok(None);
        };

        log.end_time = Some(end_time);
        log.note = merge_note(log.note.as_deref(), note);
        Ok(Some(log.clone()))
    }

    async fn insert_closed_log(&self, data: NewTimeLog) -> StoreResult<TimeLog> {
        let mut tables = self.tables.lock().await;
        let log = TimeLog {
            id: Tables::next_id(&mut tables.next_log_id),
            task_id: data.task_id,
            user_id: data.user_id,
            start_time: data.start_time,
            end_time: data.end_time,
            note: data.note,
        };
        tables.logs.insert(log.id, log.clone());
        Ok(log)
    }

    async fn list_logs(&self, task_id: i64) -> StoreResult<Vec<TimeLog>> {
        let tables = self.tables.lock().await;
        Ok(tables
            .logs
            .values()
            .filter(|l| l.task_id == task_id)
            .cloned()
            .collect())
    }

    async fn report_rows(&self, user_id: Uuid, window: LogWindow) -> StoreResult<Vec<ReportRow>> {
        let tables = self.tables.lock().await;
        let rows = tables
            .logs
            .values()
            .filter(|l| l.user_id == user_id && window.contains(l.start_time, l.end_time))
            .filter_map(|l| {
                let task = tables.tasks.get(&l.task_id)?;
                Some(ReportRow {
                    task_id: l.task_id,
                    title: task.title.clone(),
                    start_time: l.start_time,
                    end_time: l.end_time?,
                })
            })
            .collect();
        Ok(rows)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(())
    }
}
