/// Time log endpoints
///
/// # Endpoints
///
/// - `POST /v1/tasks/:id/logs/start` - Start the caller's timer (201)
/// - `POST /v1/tasks/:id/logs/stop` - Stop the caller's timer (200)
/// - `POST /v1/tasks/:id/logs` - Record finished work (201)
/// - `GET /v1/tasks/:id/logs` - All logs of the task
///
/// Start and stop accept an optional `{"note": "..."}` body. A note given on
/// stop is appended to the start note on a new line.
///
/// # Log body
///
/// ```json
/// {
///   "id": 7,
///   "task": 3,
///   "user": "4b1c...",
///   "start_time": "2024-11-07T08:00:00Z",
///   "end_time": "2024-11-07T09:30:00Z",
///   "note": "pairing",
///   "duration": "1:30:00"
/// }
/// ```
///
/// `duration` is `null` while the timer runs.

use crate::{
    app::AppState,
    error::{ApiError, ApiResult, ValidationErrorDetail},
    extract::{optional_json, ApiJson},
};
use axum::{
    body::Bytes,
    extract::{Path, State},
    http::StatusCode,
    Extension, Json,
};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use taskclock_shared::{
    auth::middleware::AuthContext, duration::format_hms, models::time_log::TimeLog,
    timer::ManualEntry,
};
use uuid::Uuid;

/// Optional start/stop body
#[derive(Debug, Default, Deserialize)]
pub struct NoteRequest {
    pub note: Option<String>,
}

/// Manual log request
///
/// `duration` and `end_time` are kept raw so that a wrong type is reported
/// against its field.
#[derive(Debug, Default, Deserialize)]
pub struct ManualLogRequest {
    /// Minutes worked: a positive integer, or a string holding one
    #[serde(default)]
    pub duration: Option<Value>,

    pub note: Option<String>,

    /// RFC 3339; defaults to now
    #[serde(default)]
    pub end_time: Option<Value>,
}

impl ManualLogRequest {
    /// Checks every field, collecting one error per bad field
    fn to_entry(self) -> Result<ManualEntry, ApiError> {
        let mut errors = Vec::new();

        let duration_minutes = match parse_minutes(self.duration.as_ref()) {
            Ok(minutes) => minutes,
            Err(message) => {
                errors.push(ValidationErrorDetail {
                    field: "duration".to_string(),
                    message: message.to_string(),
                });
                0
            }
        };

        let end_time = match parse_end_time(self.end_time.as_ref()) {
            Ok(end_time) => end_time,
            Err(message) => {
                errors.push(ValidationErrorDetail {
                    field: "end_time".to_string(),
                    message: message.to_string(),
                });
                None
            }
        };

        if !errors.is_empty() {
            return Err(ApiError::ValidationError(errors));
        }

        Ok(ManualEntry {
            duration_minutes,
            end_time,
            note: self.note,
        })
    }
}

fn parse_minutes(raw: Option<&Value>) -> Result<i64, &'static str> {
    let minutes = match raw {
        None | Some(Value::Null) => return Err("This field is required."),
        Some(Value::Number(n)) => n.as_i64(),
        Some(Value::String(s)) => s.trim().parse::<i64>().ok(),
        Some(_) => None,
    }
    .ok_or("A valid integer is required.")?;

    if minutes < 1 {
        return Err("Ensure this value is greater than or equal to 1.");
    }
    Ok(minutes)
}

fn parse_end_time(raw: Option<&Value>) -> Result<Option<DateTime<Utc>>, &'static str> {
    const WRONG_FORMAT: &str = "Datetime has wrong format. Use one of these formats instead: \
        YYYY-MM-DDThh:mm[:ss[.uuuuuu]][+HH:MM|-HH:MM|Z].";

    match raw {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s.trim())
            .map(|dt| Some(dt.with_timezone(&Utc)))
            .map_err(|_| WRONG_FORMAT),
        Some(_) => Err(WRONG_FORMAT),
    }
}

/// Time log response
#[derive(Debug, Serialize, Deserialize)]
pub struct LogResponse {
    pub id: i64,

    pub task: i64,

    pub user: Uuid,

    pub start_time: DateTime<Utc>,

    pub end_time: Option<DateTime<Utc>>,

    pub note: Option<String>,

    /// `H:MM:SS`, or null while running
    pub duration: Option<String>,
}

impl From<TimeLog> for LogResponse {
    fn from(log: TimeLog) -> Self {
        Self {
            duration: log.duration_seconds().map(format_hms),
            id: log.id,
            task: log.task_id,
            user: log.user_id,
            start_time: log.start_time,
            end_time: log.end_time,
            note: log.note,
        }
    }
}

pub async fn start_timer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<i64>,
    body: Bytes,
) -> ApiResult<(StatusCode, Json<LogResponse>)> {
    let note = optional_json::<NoteRequest>(&body)?.and_then(|req| req.note);
    let log = state.timers.start(task_id, auth.user_id, note).await?;

    Ok((StatusCode::CREATED, Json(log.into())))
}

pub async fn stop_timer(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<i64>,
    body: Bytes,
) -> ApiResult<Json<LogResponse>> {
    let note = optional_json::<NoteRequest>(&body)?.and_then(|req| req.note);
    let log = state
        .timers
        .stop(task_id, auth.user_id, note.as_deref())
        .await?;

    Ok(Json(log.into()))
}

pub async fn create_manual_log(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(task_id): Path<i64>,
    ApiJson(req): ApiJson<ManualLogRequest>,
) -> ApiResult<(StatusCode, Json<LogResponse>)> {
    let entry = req.to_entry()?;

    let log = state.timers.create_manual(task_id, auth.user_id, entry).await?;

    Ok((StatusCode::CREATED, Json(log.into())))
}

pub async fn list_logs(
    State(state): State<AppState>,
    Path(task_id): Path<i64>,
) -> ApiResult<Json<Vec<LogResponse>>> {
    let logs = state.timers.list(task_id).await?;
    Ok(Json(logs.into_iter().map(Into::into).collect()))
}
