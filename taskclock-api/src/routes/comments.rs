/// Task comment endpoints
///
/// - `GET /v1/tasks/:id/comments` - Comments in posting order
/// - `POST /v1/tasks/:id/comments` - Add a comment as the caller
///
/// Commenting on a task with an executor emails the executor.

use crate::{app::AppState, error::ApiResult, extract::ApiJson};
use axum::{
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use taskclock_shared::{auth::middleware::AuthContext, models::comment::Comment};
use uuid::Uuid;

/// Create comment request
#[derive(Debug, Deserialize)]
pub struct CreateCommentRequest {
    #[serde(default)]
    pub text: String,
}

/// Create comment response
#[derive(Debug, Serialize, Deserialize)]
pub struct CreateCommentResponse {
    pub id: i64,
}

/// Comment list item
#[derive(Debug, Serialize, Deserialize)]
pub struct CommentResponse {
    pub id: i64,

    pub text: String,

    /// Author's user ID
    pub user: Uuid,

    pub created_at: DateTime<Utc>,
}

impl From<Comment> for CommentResponse {
    fn from(comment: Comment) -> Self {
        Self {
            id: comment.id,
            text: comment.text,
            user: comment.user_id,
            created_at: comment.created_at,
        }
    }
}

pub async fn list_comments(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<CommentResponse>>> {
    let comments = state.tasks.list_comments(task_id).await?;
    Ok(Json(comments.into_iter().map(Into::into).collect()))
}

pub async fn create_comment(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<i64>,
    ApiJson(req): ApiJson<CreateCommentRequest>,
) -> ApiResult<(StatusCode, Json<CreateCommentResponse>)> {
    let comment = state
        .tasks
        .add_comment(task_id, auth.user_id, req.text)
        .await?;

    Ok((
        StatusCode::CREATED,
        Json(CreateCommentResponse { id: comment.id }),
    ))
}
