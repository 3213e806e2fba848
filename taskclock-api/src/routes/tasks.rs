/// Task endpoints
///
/// # Endpoints
///
/// - `GET /v1/tasks` - List tasks (paginated)
/// - `POST /v1/tasks` - Create a task
/// - `GET /v1/tasks/:id` - Task detail
/// - `PATCH /v1/tasks/:id` - Partial update
/// - `DELETE /v1/tasks/:id` - Delete a task with its comments and logs
///
/// # List filters
///
/// - `status`: one of `open`, `in_progress`, `completed`, `canceled`, `archived`
/// - `executor`: executor user ID
/// - `search`: case-insensitive substring of the title

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::ApiJson,
    routes::pagination::{PageParams, Paginated},
};
use axum::{
    extract::{Path, Query, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};
use taskclock_shared::{
    auth::middleware::AuthContext,
    models::{
        task::{Task, TaskQuery, TaskStatus},
        user::User,
    },
    tasks::{NewTask, TaskUpdate},
};
use uuid::Uuid;
use validator::Validate;

/// List filters, as received
#[derive(Debug, Default, Deserialize)]
pub struct TaskListParams {
    pub status: Option<String>,
    pub executor: Option<String>,
    pub search: Option<String>,
}

impl TaskListParams {
    /// Parses the filters, collecting one error per bad field
    fn to_query(&self) -> Result<TaskQuery, ApiError> {
        let mut errors = Vec::new();
        let mut query = TaskQuery::default();

        if let Some(raw) = non_empty(&self.status) {
            match raw.parse::<TaskStatus>() {
                Ok(status) => query.status = Some(status),
                Err(e) => errors.push(field_error("status", e.to_string())),
            }
        }
        if let Some(raw) = non_empty(&self.executor) {
            match Uuid::parse_str(raw) {
                Ok(id) => query.executor_id = Some(id),
                Err(_) => errors.push(field_error("executor", "Enter a valid UUID.")),
            }
        }
        query.search = non_empty(&self.search).map(str::to_string);

        if errors.is_empty() {
            Ok(query)
        } else {
            Err(ApiError::ValidationError(errors))
        }
    }
}

/// Create task request
#[derive(Debug, Deserialize, Validate)]
pub struct CreateTaskRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Ensure this field has no more than 200 characters."
    ))]
    pub title: String,

    #[serde(default)]
    pub description: Option<String>,

    /// Executor user ID; defaults to the caller
    #[serde(default)]
    pub executor: Option<Uuid>,
}

/// Partial update request
///
/// `"executor": null` unassigns; an absent key leaves the executor alone.
#[derive(Debug, Default, Deserialize, Validate)]
pub struct UpdateTaskRequest {
    #[validate(length(
        min = 1,
        max = 200,
        message = "Ensure this field has no more than 200 characters."
    ))]
    pub title: Option<String>,

    pub description: Option<String>,

    pub status: Option<String>,

    #[serde(default, deserialize_with = "present_or_null")]
    pub executor: Option<Option<Uuid>>,
}

/// Distinguishes an explicit `null` from a missing key
fn present_or_null<'de, D>(deserializer: D) -> Result<Option<Option<Uuid>>, D::Error>
where
    D: Deserializer<'de>,
{
    Option::<Uuid>::deserialize(deserializer).map(Some)
}

/// Task list item
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskListItem {
    pub id: i64,

    pub title: String,

    /// Minutes across all closed logs of the task
    pub logged_time: i64,
}

/// Embedded user
#[derive(Debug, Serialize, Deserialize)]
pub struct UserBody {
    pub id: Uuid,
    pub email: String,
    pub first_name: String,
    pub last_name: String,
}

impl From<&User> for UserBody {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            email: user.email.clone(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
        }
    }
}

/// Task detail
#[derive(Debug, Serialize, Deserialize)]
pub struct TaskDetail {
    pub id: i64,

    pub title: String,

    pub description: String,

    pub status: TaskStatus,

    pub owner: Option<UserBody>,

    pub executor: Option<UserBody>,

    /// Minutes across all closed logs of the task
    pub logged_time: i64,

    pub created_at: DateTime<Utc>,

    pub updated_at: DateTime<Utc>,
}

/// List tasks
///
/// ```text
/// GET /v1/tasks?status=open&search=report&page=2
/// ```
pub async fn list_tasks(
    State(state): State<AppState>,
    Query(filters): Query<TaskListParams>,
    Query(paging): Query<PageParams>,
) -> ApiResult<Json<Paginated<Vec<TaskListItem>>>> {
    let page = paging.resolve()?;
    let mut query = filters.to_query()?;
    query.limit = page.size;
    query.offset = page.offset();

    let (tasks, count) = state.tasks.list_tasks(&query).await?;
    page.check(count)?;

    let ids: Vec<i64> = tasks.iter().map(|t| t.id).collect();
    let minutes = state.tasks.logged_minutes(&ids).await?;

    let items = tasks
        .into_iter()
        .map(|task| TaskListItem {
            logged_time: minutes.get(&task.id).copied().unwrap_or(0),
            id: task.id,
            title: task.title,
        })
        .collect();

    Ok(Json(Paginated::new(count, page, items)))
}

/// Create a task owned by the caller
///
/// The executor is notified by email.
pub async fn create_task(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    ApiJson(req): ApiJson<CreateTaskRequest>,
) -> ApiResult<(StatusCode, Json<TaskDetail>)> {
    req.validate()?;

    let task = state
        .tasks
        .create_task(
            auth.user_id,
            NewTask {
                title: req.title,
                description: req.description,
                executor_id: req.executor,
            },
        )
        .await?;

    Ok((StatusCode::CREATED, Json(detail(&state, task).await?)))
}

pub async fn get_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<TaskDetail>> {
    let task = state.tasks.get_task(task_id).await?;
    Ok(Json(detail(&state, task).await?))
}

/// Partial update
///
/// A changed executor is notified; entering `completed` notifies everyone
/// who commented on the task.
pub async fn update_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
    ApiJson(req): ApiJson<UpdateTaskRequest>,
) -> ApiResult<Json<TaskDetail>> {
    req.validate()?;

    let status = match non_empty(&req.status) {
        None => None,
        Some(raw) => Some(
            raw.parse::<TaskStatus>()
                .map_err(|e| ApiError::ValidationError(vec![field_error("status", e.to_string())]))?,
        ),
    };

    let task = state
        .tasks
        .update_task(
            task_id,
            TaskUpdate {
                title: req.title,
                description: req.description,
                status,
                executor_id: req.executor,
            },
        )
        .await?;

    Ok(Json(detail(&state, task).await?))
}

pub async fn delete_task(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<StatusCode> {
    state.tasks.delete_task(task_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

async fn detail(state: &AppState, task: Task) -> ApiResult<TaskDetail> {
    let user_ids: Vec<Uuid> = task.owner_id.into_iter().chain(task.executor_id).collect();
    let users = state.tasks.users(&user_ids).await?;
    let minutes = state.tasks.logged_minutes(&[task.id]).await?;

    Ok(TaskDetail {
        id: task.id,
        owner: task.owner_id.and_then(|id| users.get(&id)).map(UserBody::from),
        executor: task
            .executor_id
            .and_then(|id| users.get(&id))
            .map(UserBody::from),
        logged_time: minutes.get(&task.id).copied().unwrap_or(0),
        title: task.title,
        description: task.description,
        status: task.status,
        created_at: task.created_at,
        updated_at: task.updated_at,
    })
}

fn non_empty(value: &Option<String>) -> Option<&str> {
    value.as_deref().map(str::trim).filter(|v| !v.is_empty())
}

fn field_error(field: &str, message: impl Into<String>) -> ValidationErrorDetail {
    ValidationErrorDetail {
        field: field.to_string(),
        message: message.into(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_list_filters_collect_errors() {
        let params = TaskListParams {
            status: Some("done".to_string()),
            executor: Some("nope".to_string()),
            search: None,
        };

        match params.to_query() {
            Err(ApiError::ValidationError(details)) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[0].field, "status");
                assert_eq!(details[0].message, "\"done\" is not a valid choice.");
                assert_eq!(details[1].field, "executor");
            }
            other => panic!("unexpected result: {other:?}"),
        }
    }

    #[test]
    fn test_blank_filters_are_ignored() {
        let params = TaskListParams {
            status: Some(" ".to_string()),
            executor: Some(String::new()),
            search: Some("".to_string()),
        };
        assert_eq!(params.to_query().unwrap(), TaskQuery::default());
    }

    #[test]
    fn test_update_executor_null_vs_missing() {
        let missing: UpdateTaskRequest = serde_json::from_str(r#"{"title":"x"}"#).unwrap();
        assert_eq!(missing.executor, None);

        let cleared: UpdateTaskRequest = serde_json::from_str(r#"{"executor":null}"#).unwrap();
        assert_eq!(cleared.executor, Some(None));

        let id = Uuid::new_v4();
        let set: UpdateTaskRequest =
            serde_json::from_str(&format!(r#"{{"executor":"{id}"}}"#)).unwrap();
        assert_eq!(set.executor, Some(Some(id)));
    }

    #[test]
    fn test_create_request_title_length() {
        let req = CreateTaskRequest {
            title: "x".repeat(201),
            description: None,
            executor: None,
        };
        assert!(req.validate().is_err());
    }
}
