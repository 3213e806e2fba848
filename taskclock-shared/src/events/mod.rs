/// Notification events
///
/// Task transitions emit typed events that travel over the `notifications`
/// Redis Stream to the worker, which renders and mails them.
///
/// ```text
/// ┌──────────────┐  XADD   ┌───────────────┐  XREADGROUP  ┌──────────────┐
/// │ TaskService  │ ──────> │ notifications │ ───────────> │    worker    │
/// └──────────────┘         └───────────────┘              └──────────────┘
/// ```
///
/// # Example
///
/// ```
/// use taskclock_shared::events::NotificationEvent;
/// use taskclock_shared::events::serialization::{deserialize_event, serialize_event};
///
/// let event = NotificationEvent::Assigned {
///     task_id: 7,
///     task_title: "Ship it".to_string(),
///     executor_email: "dev@example.com".to_string(),
/// };
/// let fields = serialize_event(&event).unwrap();
/// assert_eq!(fields["kind"], "assigned");
/// assert_eq!(deserialize_event(&fields).unwrap().event, event);
/// ```

pub mod publisher;
pub mod serialization;

pub use publisher::{
    ChannelEventPublisher, EventPublisher, LogEventPublisher, PublishError, RedisEventPublisher,
};
pub use serialization::{deserialize_event, serialize_event, EventEnvelope, SerializationError};

use serde::{Deserialize, Serialize};

/// Stream all notification events are appended to
pub const NOTIFICATION_STREAM: &str = "notifications";

/// A notification-worthy task transition
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "kind", rename_all = "snake_case")]
pub enum NotificationEvent {
    /// A task got a (new) executor
    Assigned {
        task_id: i64,
        task_title: String,
        executor_email: String,
    },

    /// Someone commented on a task that has an executor
    Commented {
        task_id: i64,
        task_title: String,
        executor_email: String,
        commenter_name: String,
        comment_text: String,
    },

    /// A task entered `completed`; recipients are its distinct commenters
    Completed {
        task_id: i64,
        task_title: String,
        recipients: Vec<String>,
    },
}

impl NotificationEvent {
    /// Stream `kind` field value
    pub fn kind(&self) -> &'static str {
        match self {
            NotificationEvent::Assigned { .. } => "assigned",
            NotificationEvent::Commented { .. } => "commented",
            NotificationEvent::Completed { .. } => "completed",
        }
    }

    pub fn task_id(&self) -> i64 {
        match self {
            NotificationEvent::Assigned { task_id, .. }
            | NotificationEvent::Commented { task_id, .. }
            | NotificationEvent::Completed { task_id, .. } => *task_id,
        }
    }
}
