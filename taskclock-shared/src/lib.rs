//! # taskclock Shared Library
//!
//! Domain core shared by the taskclock API server and worker: the entity
//! store, the timer state machine, report aggregation and notification
//! events.
//!
//! ## Module Organization
//!
//! - `error`: domain error taxonomy
//! - `duration`: elapsed-time arithmetic
//! - `models`: database models and their SQL
//! - `db`: connection pool and migrations
//! - `store`: persistence trait with PostgreSQL and in-memory backends
//! - `timer`: start/stop/manual time logs
//! - `tasks`: task CRUD, comments and notification transitions
//! - `report`: time report aggregation, caching and weekly summaries
//! - `events`: notification events and publishers
//! - `redis`: Redis client
//! - `auth`: JWT validation and request authentication

pub mod auth;
pub mod db;
pub mod duration;
pub mod error;
pub mod events;
pub mod models;
pub mod redis;
pub mod report;
pub mod store;
pub mod tasks;
pub mod timer;

/// Current version of the taskclock shared library
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_version_is_set() {
        assert!(!VERSION.is_empty());
    }
}
