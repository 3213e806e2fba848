//! # taskclock Worker Library
//!
//! Background side of taskclock: turns notification events into mail and
//! sends weekly time reports.
//!
//! ## Modules
//!
//! - `config`: Worker configuration
//! - `mailer`: Message rendering and the `Mailer` trait
//! - `consumer`: Redis stream consumer for notification events
//! - `weekly`: Weekly report job
//!
//! ## Example
//!
//! ```
//! use taskclock_shared::events::NotificationEvent;
//! use taskclock_worker::mailer::render;
//!
//! let messages = render(&NotificationEvent::Assigned {
//!     task_id: 1,
//!     task_title: "Plan sprint".to_string(),
//!     executor_email: "dev@example.com".to_string(),
//! });
//! assert_eq!(messages[0].body, "You have been assigned a task: Plan sprint");
//! ```

pub mod config;
pub mod consumer;
pub mod mailer;
pub mod weekly;
