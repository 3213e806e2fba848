/// API route handlers
///
/// Handlers are organized by resource:
///
/// - `health`: health check
/// - `tasks`: task CRUD
/// - `comments`: task comments
/// - `logs`: timer start/stop and manual time logs
/// - `reports`: per-task time reports
/// - `pagination`: page-number pagination shared by list endpoints

pub mod comments;
pub mod health;
pub mod logs;
pub mod pagination;
pub mod reports;
pub mod tasks;
