/// Domain error types
///
/// Every core operation returns `Result<T, DomainError>`. The API crate maps
/// these onto HTTP responses; the worker logs them.
///
/// # Taxonomy
///
/// - `ActiveTimerExists` / `NoActiveTimer`: timer state machine conflicts
/// - `TaskNotFound` / `UserNotFound`: missing referenced entities
/// - `Validation`: per-field input errors, collected before any write
/// - `Store`: persistence failures (never retried for writes)

use serde::{Deserialize, Serialize};
use thiserror::Error;
use uuid::Uuid;

/// Message returned when a second timer is started for the same task.
pub const ACTIVE_TIMER_EXISTS: &str = "You already have an active timer for this task.";

/// Message returned when stopping a timer that is not running.
pub const NO_ACTIVE_TIMER: &str = "No active timer found for this task.";

/// A single invalid input field
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    /// Name of the offending field as the caller spelled it
    pub field: String,

    /// Human-readable reason
    pub message: String,
}

impl FieldError {
    pub fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            message: message.into(),
        }
    }
}

/// Persistence errors
#[derive(Debug, Error)]
pub enum StoreError {
    /// Database error
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// Stored data could not be mapped onto a domain type
    #[error("Corrupt record: {0}")]
    Corrupt(String),
}

/// Errors produced by the domain services
#[derive(Debug, Error)]
pub enum DomainError {
    /// A running timer already exists for this (task, user)
    #[error("{}", ACTIVE_TIMER_EXISTS)]
    ActiveTimerExists,

    /// No running timer exists for this (task, user)
    #[error("{}", NO_ACTIVE_TIMER)]
    NoActiveTimer,

    /// Referenced task does not exist
    #[error("Task {0} not found")]
    TaskNotFound(i64),

    /// Referenced user does not exist
    #[error("User {0} not found")]
    UserNotFound(Uuid),

    /// One or more input fields are invalid
    #[error("Validation failed: {} errors", .0.len())]
    Validation(Vec<FieldError>),

    /// Persistence failure
    #[error(transparent)]
    Store(#[from] StoreError),
}

impl DomainError {
    /// Shorthand for a single-field validation error
    pub fn invalid(field: &str, message: &str) -> Self {
        DomainError::Validation(vec![FieldError::new(field, message)])
    }
}

impl From<sqlx::Error> for DomainError {
    fn from(err: sqlx::Error) -> Self {
        DomainError::Store(StoreError::Database(err))
    }
}

/// Result alias used across the domain services
pub type DomainResult<T> = Result<T, DomainError>;
