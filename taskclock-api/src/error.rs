/// API error handling
///
/// Every failure leaves the server as a JSON body of the same shape:
///
/// ```json
/// {
///   "error": "validation_error",
///   "detail": "Request validation failed",
///   "details": [{ "field": "date_from", "message": "Enter a valid date." }]
/// }
/// ```
///
/// `details` is only present for validation errors.
///
/// # Mapping from domain errors
///
/// | DomainError         | Status |
/// |---------------------|--------|
/// | `ActiveTimerExists` | 400    |
/// | `NoActiveTimer`     | 404    |
/// | `TaskNotFound`      | 404    |
/// | `UserNotFound`      | 404    |
/// | `Validation`        | 400    |
/// | `Store`             | 500    |

use axum::{
    extract::rejection::JsonRejection,
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use serde::{Deserialize, Serialize};
use std::fmt;
use taskclock_shared::error::{DomainError, FieldError};

/// Result type for API handlers
pub type ApiResult<T> = Result<T, ApiError>;

/// API error types
#[derive(Debug)]
pub enum ApiError {
    /// 400, with a message meant for the client
    BadRequest(String),

    /// 401
    Unauthorized(String),

    /// 404
    NotFound(String),

    /// 400 with per-field details
    ValidationError(Vec<ValidationErrorDetail>),

    /// 500; the message is logged, never returned
    InternalError(String),
}

/// One invalid field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationErrorDetail {
    pub field: String,

    pub message: String,
}

/// Error response body
#[derive(Debug, Serialize, Deserialize)]
pub struct ErrorResponse {
    pub error: String,

    pub detail: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<Vec<ValidationErrorDetail>>,
}

impl fmt::Display for ApiError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ApiError::BadRequest(msg) => write!(f, "Bad request: {}", msg),
            ApiError::Unauthorized(msg) => write!(f, "Unauthorized: {}", msg),
            ApiError::NotFound(msg) => write!(f, "Not found: {}", msg),
            ApiError::ValidationError(errors) => {
                write!(f, "Validation failed: {} errors", errors.len())
            }
            ApiError::InternalError(msg) => write!(f, "Internal error: {}", msg),
        }
    }
}

impl std::error::Error for ApiError {}

impl IntoResponse for ApiError {
    fn into_response(self) -> Response {
        let (status, error_code, detail, details) = match self {
            ApiError::BadRequest(msg) => (StatusCode::BAD_REQUEST, "bad_request", msg, None),
            ApiError::Unauthorized(msg) => (StatusCode::UNAUTHORIZED, "unauthorized", msg, None),
            ApiError::NotFound(msg) => (StatusCode::NOT_FOUND, "not_found", msg, None),
            ApiError::ValidationError(errors) => (
                StatusCode::BAD_REQUEST,
                "validation_error",
                "Request validation failed".to_string(),
                Some(errors),
            ),
            ApiError::InternalError(msg) => {
                tracing::error!(error = %msg, "Internal error");
                (
                    StatusCode::INTERNAL_SERVER_ERROR,
                    "internal_error",
                    "An internal error occurred".to_string(),
                    None,
                )
            }
        };

        let body = Json(ErrorResponse {
            error: error_code.to_string(),
            detail,
            details,
        });

        (status, body).into_response()
    }
}

impl From<FieldError> for ValidationErrorDetail {
    fn from(err: FieldError) -> Self {
        Self {
            field: err.field,
            message: err.message,
        }
    }
}

impl From<DomainError> for ApiError {
    fn from(err: DomainError) -> Self {
        match err {
            DomainError::ActiveTimerExists => ApiError::BadRequest(err.to_string()),
            DomainError::NoActiveTimer => ApiError::NotFound(err.to_string()),
            DomainError::TaskNotFound(_) | DomainError::UserNotFound(_) => {
                ApiError::NotFound("Not found.".to_string())
            }
            DomainError::Validation(fields) => {
                ApiError::ValidationError(fields.into_iter().map(Into::into).collect())
            }
            DomainError::Store(e) => ApiError::InternalError(e.to_string()),
        }
    }
}

impl From<validator::ValidationErrors> for ApiError {
    fn from(errors: validator::ValidationErrors) -> Self {
        let mut details: Vec<ValidationErrorDetail> = errors
            .field_errors()
            .into_iter()
            .flat_map(|(field, errs)| {
                errs.iter().map(move |e| ValidationErrorDetail {
                    field: field.to_string(),
                    message: e
                        .message
                        .as_ref()
                        .map(|m| m.to_string())
                        .unwrap_or_else(|| e.code.to_string()),
                })
            })
            .collect();
        details.sort_by(|a, b| a.field.cmp(&b.field));

        ApiError::ValidationError(details)
    }
}

impl From<JsonRejection> for ApiError {
    fn from(rejection: JsonRejection) -> Self {
        match rejection {
            JsonRejection::JsonDataError(e) => ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "body".to_string(),
                message: e.body_text(),
            }]),
            other => ApiError::BadRequest(other.body_text()),
        }
    }
}

impl From<serde_json::Error> for ApiError {
    fn from(err: serde_json::Error) -> Self {
        if err.is_data() {
            ApiError::ValidationError(vec![ValidationErrorDetail {
                field: "body".to_string(),
                message: err.to_string(),
            }])
        } else {
            ApiError::BadRequest(format!("JSON parse error - {}", err))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use taskclock_shared::error::StoreError;

    #[test]
    fn test_error_display() {
        let err = ApiError::BadRequest("Invalid input".to_string());
        assert_eq!(err.to_string(), "Bad request: Invalid input");

        let err = ApiError::NotFound("Not found.".to_string());
        assert_eq!(err.to_string(), "Not found: Not found.");
    }

    #[test]
    fn test_domain_error_statuses() {
        let cases = [
            (DomainError::ActiveTimerExists, StatusCode::BAD_REQUEST),
            (DomainError::NoActiveTimer, StatusCode::NOT_FOUND),
            (DomainError::TaskNotFound(1), StatusCode::NOT_FOUND),
            (
                DomainError::invalid("top", "Enter a number."),
                StatusCode::BAD_REQUEST,
            ),
            (
                DomainError::Store(StoreError::Corrupt("bad row".to_string())),
                StatusCode::INTERNAL_SERVER_ERROR,
            ),
        ];

        for (err, status) in cases {
            assert_eq!(ApiError::from(err).into_response().status(), status);
        }
    }

    #[test]
    fn test_conflict_keeps_exact_detail() {
        match ApiError::from(DomainError::ActiveTimerExists) {
            ApiError::BadRequest(detail) => {
                assert_eq!(detail, "You already have an active timer for this task.")
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }

    #[test]
    fn test_validation_details_carry_fields() {
        let err = ApiError::from(DomainError::Validation(vec![
            FieldError::new("date_from", "Enter a valid date."),
            FieldError::new("top", "Enter a number."),
        ]));

        match err {
            ApiError::ValidationError(details) => {
                assert_eq!(details.len(), 2);
                assert_eq!(details[1].field, "top");
            }
            other => panic!("unexpected error: {other:?}"),
        }
    }
}
