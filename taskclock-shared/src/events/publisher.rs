/// Event publishers
///
/// [`EventPublisher`] is the outbound queue seam of the task service.
///
/// - [`RedisEventPublisher`]: XADD onto the `notifications` stream
/// - [`ChannelEventPublisher`]: tokio channel, for tests and in-process use
/// - [`LogEventPublisher`]: logs and drops, for running without Redis
///
/// Publishing is fire-and-forget from the caller's point of view: the state
/// change that produced the event is already committed, so callers log
/// failures and carry on.

use super::serialization::{serialize_event, SerializationError};
use super::{NotificationEvent, NOTIFICATION_STREAM};
use crate::redis::RedisClient;
use async_trait::async_trait;
use redis::streams::StreamMaxlen;
use redis::AsyncCommands;
use thiserror::Error;
use tokio::sync::mpsc;

/// Publishing errors
#[derive(Error, Debug)]
pub enum PublishError {
    #[error("Serialization error: {0}")]
    Serialization(#[from] SerializationError),

    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    /// Receiving side of a channel publisher is gone
    #[error("Event channel closed")]
    ChannelClosed,
}

/// Outbound queue for notification events
#[async_trait]
pub trait EventPublisher: Send + Sync {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError>;
}

/// Publishes to a Redis Stream
#[derive(Clone)]
pub struct RedisEventPublisher {
    client: RedisClient,
    stream: String,
    max_len: usize,
}

impl RedisEventPublisher {
    /// Approximate cap on stream length
    pub const DEFAULT_MAX_LEN: usize = 100_000;

    pub fn new(client: RedisClient) -> Self {
        Self {
            client,
            stream: NOTIFICATION_STREAM.to_string(),
            max_len: Self::DEFAULT_MAX_LEN,
        }
    }

    /// Overrides the stream key (tests use a unique one per run)
    pub fn with_stream(mut self, stream: impl Into<String>) -> Self {
        self.stream = stream.into();
        self
    }
}

#[async_trait]
impl EventPublisher for RedisEventPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        let fields = serialize_event(event)?;
        let items: Vec<(&str, &str)> = fields
            .iter()
            .map(|(k, v)| (k.as_str(), v.as_str()))
            .collect();

        let mut conn = self.client.get_connection();
        let stream_id: String = conn
            .xadd_maxlen(&self.stream, StreamMaxlen::Approx(self.max_len), "*", &items)
            .await?;

        tracing::debug!(
            stream = %self.stream,
            stream_id = %stream_id,
            kind = event.kind(),
            task_id = event.task_id(),
            "Published notification event"
        );

        Ok(())
    }
}

/// Publishes onto an unbounded tokio channel
#[derive(Clone)]
pub struct ChannelEventPublisher {
    tx: mpsc::UnboundedSender<NotificationEvent>,
}

impl ChannelEventPublisher {
    /// Creates a publisher and the receiver its events arrive on
    pub fn new() -> (Self, mpsc::UnboundedReceiver<NotificationEvent>) {
        let (tx, rx) = mpsc::unbounded_channel();
        (Self { tx }, rx)
    }
}

#[async_trait]
impl EventPublisher for ChannelEventPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        self.tx
            .send(event.clone())
            .map_err(|_| PublishError::ChannelClosed)
    }
}

/// Logs events instead of queueing them
#[derive(Debug, Clone, Copy, Default)]
pub struct LogEventPublisher;

#[async_trait]
impl EventPublisher for LogEventPublisher {
    async fn publish(&self, event: &NotificationEvent) -> Result<(), PublishError> {
        tracing::info!(
            kind = event.kind(),
            task_id = event.task_id(),
            "Notification event (no queue configured)"
        );
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn assigned() -> NotificationEvent {
        NotificationEvent::Assigned {
            task_id: 1,
            task_title: "Write docs".to_string(),
            executor_email: "dev@example.com".to_string(),
        }
    }

    #[tokio::test]
    async fn test_channel_publisher_delivers() {
        let (publisher, mut rx) = ChannelEventPublisher::new();
        publisher.publish(&assigned()).await.unwrap();
        assert_eq!(rx.recv().await, Some(assigned()));
    }

    #[tokio::test]
    async fn test_channel_publisher_reports_closed_receiver() {
        let (publisher, rx) = ChannelEventPublisher::new();
        drop(rx);
        assert!(matches!(
            publisher.publish(&assigned()).await,
            Err(PublishError::ChannelClosed)
        ));
    }

    #[tokio::test]
    async fn test_log_publisher_never_fails() {
        assert!(LogEventPublisher.publish(&assigned()).await.is_ok());
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_redis_publisher_appends_to_stream() {
        use crate::redis::RedisConfig;
        use redis::streams::StreamRangeReply;

        let client = RedisClient::new(RedisConfig::default_for_test()).await.unwrap();
        let stream = format!("test:notifications:{}", uuid::Uuid::new_v4());
        let publisher = RedisEventPublisher::new(client.clone()).with_stream(stream.clone());

        publisher.publish(&assigned()).await.unwrap();

        let mut conn = client.get_connection();
        let reply: StreamRangeReply = conn.xrange_all(&stream).await.unwrap();
        assert_eq!(reply.ids.len(), 1);

        let _: () = conn.del(&stream).await.unwrap();
    }
}
