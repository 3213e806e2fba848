/// Notification stream consumer
///
/// Reads the `notifications` Redis stream through a consumer group, renders
/// each event into mail and acknowledges it.
///
/// # Delivery
///
/// ```text
/// XREADGROUP GROUP notifier <consumer> COUNT n BLOCK ms STREAMS notifications >
///   -> deserialize -> render -> Mailer::send -> XACK
/// ```
///
/// Entries are acknowledged once handled, including undecodable ones and
/// ones whose mail failed; notifications are best-effort. On startup the
/// consumer first replays its own pending entries (read but never acked by
/// a previous run).

use crate::config::ConsumerConfig;
use crate::mailer::{render, send_all, Mailer};
use redis::streams::{StreamReadOptions, StreamReadReply};
use redis::AsyncCommands;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use taskclock_shared::events::{deserialize_event, NotificationEvent};
use taskclock_shared::redis::{RedisClient, RedisClientError};
use thiserror::Error;
use tokio_util::sync::CancellationToken;

/// Consumer errors
#[derive(Error, Debug)]
pub enum ConsumerError {
    #[error("Redis error: {0}")]
    Redis(#[from] redis::RedisError),

    #[error("Redis client error: {0}")]
    Client(#[from] RedisClientError),
}

/// Handles one decoded event: renders and mails it
///
/// Returns the number of messages delivered.
pub async fn handle_event(mailer: &dyn Mailer, event: &NotificationEvent) -> usize {
    let messages = render(event);
    let delivered = send_all(mailer, &messages).await;

    tracing::info!(
        kind = event.kind(),
        task_id = event.task_id(),
        messages = messages.len(),
        delivered = delivered,
        "Notification handled"
    );

    delivered
}

/// Consumer-group reader of the notification stream
pub struct NotificationConsumer {
    client: RedisClient,
    mailer: Arc<dyn Mailer>,
    config: ConsumerConfig,
}

impl NotificationConsumer {
    pub fn new(client: RedisClient, mailer: Arc<dyn Mailer>, config: ConsumerConfig) -> Self {
        Self {
            client,
            mailer,
            config,
        }
    }

    /// Runs until `shutdown` is cancelled
    pub async fn run(&self, shutdown: CancellationToken) -> Result<(), ConsumerError> {
        self.client
            .ensure_group(&self.config.stream, &self.config.group)
            .await?;

        tracing::info!(
            stream = %self.config.stream,
            group = %self.config.group,
            consumer = %self.config.consumer,
            "Notification consumer starting"
        );

        // Replay entries a previous run read but never acknowledged
        loop {
            match self.poll("0").await {
                Ok(0) => break,
                Ok(n) => tracing::info!(count = n, "Replayed pending notifications"),
                Err(e) => {
                    tracing::error!(error = %e, "Failed to replay pending notifications");
                    break;
                }
            }
        }

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                result = self.poll(">") => {
                    if let Err(e) = result {
                        tracing::error!(error = %e, "Failed to read notification stream");
                        tokio::select! {
                            _ = shutdown.cancelled() => break,
                            _ = tokio::time::sleep(Duration::from_secs(1)) => {}
                        }
                    }
                }
            }
        }

        tracing::info!("Notification consumer stopped");
        Ok(())
    }

    /// One XREADGROUP call starting at `id` (`>` for new entries, `0` for
    /// this consumer's pending ones); returns the number of entries handled
    pub async fn poll(&self, id: &str) -> Result<usize, ConsumerError> {
        let mut conn = self.client.get_connection();

        let mut opts = StreamReadOptions::default()
            .group(&self.config.group, &self.config.consumer)
            .count(self.config.batch_size);
        if id == ">" {
            opts = opts.block(self.config.block_ms);
        }

        let reply: StreamReadReply = conn
            .xread_options(&[&self.config.stream], &[id], &opts)
            .await?;

        let mut handled = 0;
        for stream in reply.keys {
            for entry in stream.ids {
                let fields: HashMap<String, String> = entry
                    .map
                    .iter()
                    .filter_map(|(key, value)| {
                        let value = redis::from_redis_value::<String>(value).ok()?;
                        Some((key.clone(), value))
                    })
                    .collect();

                match deserialize_event(&fields) {
                    Ok(envelope) => {
                        handle_event(self.mailer.as_ref(), &envelope.event).await;
                    }
                    Err(e) => {
                        tracing::error!(
                            stream_id = %entry.id,
                            error = %e,
                            "Failed to deserialize notification, dropping"
                        );
                    }
                }

                let _: i64 = conn
                    .xack(&self.config.stream, &self.config.group, &[&entry.id])
                    .await?;
                handled += 1;
            }
        }

        Ok(handled)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::{MailError, Message};
    use async_trait::async_trait;
    use tokio::sync::Mutex;

    #[derive(Default)]
    struct RecordingMailer {
        sent: Mutex<Vec<Message>>,
    }

    #[async_trait]
    impl Mailer for RecordingMailer {
        async fn send(&self, message: &Message) -> Result<(), MailError> {
            self.sent.lock().await.push(message.clone());
            Ok(())
        }
    }

    #[tokio::test]
    async fn test_handle_event_mails_every_recipient() {
        let mailer = RecordingMailer::default();
        let event = NotificationEvent::Completed {
            task_id: 4,
            task_title: "Release".to_string(),
            recipients: vec!["a@example.com".to_string(), "b@example.com".to_string()],
        };

        assert_eq!(handle_event(&mailer, &event).await, 2);

        let sent = mailer.sent.lock().await;
        let to: Vec<_> = sent.iter().map(|m| m.to.as_str()).collect();
        assert_eq!(to, vec!["a@example.com", "b@example.com"]);
    }

    #[tokio::test]
    #[ignore] // Requires running Redis instance
    async fn test_consumer_reads_published_events() {
        use taskclock_shared::events::{EventPublisher, RedisEventPublisher};
        use taskclock_shared::redis::RedisConfig;

        let client = RedisClient::new(RedisConfig::from_env().unwrap())
            .await
            .unwrap();
        let stream = format!("notifications-test-{}", uuid::Uuid::new_v4());
        let config = ConsumerConfig {
            stream: stream.clone(),
            group: "notifier".to_string(),
            consumer: "test".to_string(),
            block_ms: 100,
            batch_size: 10,
        };

        client.ensure_group(&stream, &config.group).await.unwrap();
        let publisher = RedisEventPublisher::new(client.clone()).with_stream(stream.clone());
        publisher
            .publish(&NotificationEvent::Assigned {
                task_id: 1,
                task_title: "Plan".to_string(),
                executor_email: "dev@example.com".to_string(),
            })
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let consumer = NotificationConsumer::new(client.clone(), mailer.clone(), config);

        assert_eq!(consumer.poll(">").await.unwrap(), 1);
        assert_eq!(consumer.poll("0").await.unwrap(), 0);
        assert_eq!(mailer.sent.lock().await[0].to, "dev@example.com");

        let mut conn = client.get_connection();
        let _: () = conn.del(&stream).await.unwrap();
    }
}
