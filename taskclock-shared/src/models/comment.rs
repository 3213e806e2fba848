/// Comment model
///
/// Comments are append-only: there is no update path, and they are removed
/// only together with their task.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Comment row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct Comment {
    pub id: i64,
    pub task_id: i64,
    /// Author
    pub user_id: Uuid,
    pub text: String,
    pub created_at: DateTime<Utc>,
}

/// Input for creating a comment
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CreateComment {
    pub task_id: i64,
    pub user_id: Uuid,
    pub text: String,
}

impl Comment {
    pub async fn create(pool: &PgPool, data: CreateComment) -> Result<Self, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            INSERT INTO comments (task_id, user_id, text)
            VALUES ($1, $2, $3)
            RETURNING id, task_id, user_id, text, created_at
            "#,
        )
        .bind(data.task_id)
        .bind(data.user_id)
        .bind(data.text)
        .fetch_one(pool)
        .await
    }

    /// Lists a task's comments in posting order
    pub async fn list_by_task(pool: &PgPool, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        sqlx::query_as::<_, Comment>(
            r#"
            SELECT id, task_id, user_id, text, created_at
            FROM comments
            WHERE task_id = $1
            ORDER BY id ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await
    }

    /// Distinct commenter emails, ordered by each author's first comment
    pub async fn commenter_emails(pool: &PgPool, task_id: i64) -> Result<Vec<String>, sqlx::Error> {
        let rows: Vec<(String,)> = sqlx::query_as(
            r#"
            SELECT u.email
            FROM comments c
            JOIN users u ON u.id = c.user_id
            WHERE c.task_id = $1
            GROUP BY u.email
            ORDER BY MIN(c.id) ASC
            "#,
        )
        .bind(task_id)
        .fetch_all(pool)
        .await?;

        Ok(rows.into_iter().map(|(email,)| email).collect())
    }
}
