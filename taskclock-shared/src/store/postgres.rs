/// PostgreSQL store
///
/// Thin adapter from [`Store`] onto the model functions in
/// [`crate::models`].

use super::{Store, StoreResult};
use crate::db::pool::health_check;
use crate::models::comment::{Comment, CreateComment};
use crate::models::task::{CreateTask, Task, TaskChanges, TaskQuery, TaskTransition};
use crate::models::time_log::{LogWindow, NewTimeLog, ReportRow, TimeLog};
use crate::models::user::{CreateUser, User};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use sqlx::PgPool;
use std::collections::HashMap;
use uuid::Uuid;

/// [`Store`] backed by a PostgreSQL pool
#[derive(Clone)]
pub struct PgStore {
    pool: PgPool,
}

impl PgStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl Store for PgStore {
    async fn get_user(&self, id: Uuid) -> StoreResult<Option<User>> {
        Ok(User::find_by_id(&self.pool, id).await?)
    }

    async fn list_users(&self) -> StoreResult<Vec<User>> {
        Ok(User::list_all(&self.pool).await?)
    }

    async fn create_user(&self, data: CreateUser) -> StoreResult<User> {
        Ok(User::create(&self.pool, data).await?)
    }

    async fn create_task(&self, data: CreateTask) -> StoreResult<Task> {
        Ok(Task::create(&self.pool, data).await?)
    }

    async fn get_task(&self, id: i64) -> StoreResult<Option<Task>> {
        Ok(Task::find_by_id(&self.pool, id).await?)
    }

    async fn list_tasks(&self, query: &TaskQuery) -> StoreResult<Vec<Task>> {
        Ok(Task::list(&self.pool, query).await?)
    }

    async fn count_tasks(&self, query: &TaskQuery) -> StoreResult<i64> {
        Ok(Task::count(&self.pool, query).await?)
    }

    async fn update_task(
        &self,
        id: i64,
        changes: &TaskChanges,
    ) -> StoreResult<Option<TaskTransition>> {
        Ok(Task::update(&self.pool, id, changes).await?)
    }

    async fn delete_task(&self, id: i64) -> StoreResult<bool> {
        Ok(Task::delete(&self.pool, id).await?)
    }

    async fn logged_seconds(&self, task_ids: &[i64]) -> StoreResult<HashMap<i64, i64>> {
        let mut totals: HashMap<i64, i64> = task_ids.iter().map(|id| (*id, 0)).collect();
        for (task_id, seconds) in Task::logged_seconds(&self.pool, task_ids).await? {
            totals.insert(task_id, seconds);
        }
        Ok(totals)
    }

    async fn create_comment(&self, data: CreateComment) -> StoreResult<Comment> {
        Ok(Comment::create(&self.pool, data).await?)
    }

    async fn list_comments(&self, task_id: i64) -> StoreResult<Vec<Comment>> {
        Ok(Comment::list_by_task(&self.pool, task_id).await?)
    }

    async fn commenter_emails(&self, task_id: i64) -> StoreResult<Vec<String>> {
        Ok(Comment::commenter_emails(&self.pool, task_id).await?)
    }

    async fn insert_running_log(
        &self,
        task_id: i64,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        note: Option<String>,
    ) -> StoreResult<Option<TimeLog>> {
        Ok(TimeLog::insert_running(&self.pool, task_id, user_id, start_time, note).await?)
    }

    async fn close_running_log(
        &self,
        task_id: i64,
        user_id: Uuid,
        end_time: DateTime<Utc>,
        note: Option<&str>,
    ) -> StoreResult<Option<TimeLog>> {
        Ok(TimeLog::close_running(&self.pool, task_id, user_id, end_time, note).await?)
    }

    async fn insert_closed_log(&self, data: NewTimeLog) -> StoreResult<TimeLog> {
        Ok(TimeLog::insert(&self.pool, data).await?)
    }

    async fn list_logs(&self, task_id: i64) -> StoreResult<Vec<TimeLog>> {
        Ok(TimeLog::list_by_task(&self.pool, task_id).await?)
    }

    async fn report_rows(&self, user_id: Uuid, window: LogWindow) -> StoreResult<Vec<ReportRow>> {
        Ok(TimeLog::report_rows(&self.pool, user_id, window).await?)
    }

    async fn ping(&self) -> StoreResult<()> {
        Ok(health_check(&self.pool).await?)
    }
}
