/// Worker configuration
///
/// | Variable                      | Default                  |
/// |-------------------------------|--------------------------|
/// | `REDIS_URL`                   | required                 |
/// | `DATABASE_URL`                | required (`memory://` ok) |
/// | `DATABASE_MAX_CONNECTIONS`    | `5`                      |
/// | `WEEKLY_REPORT_INTERVAL_SECS` | `604800` (one week)      |
/// | `NOTIFICATION_BLOCK_MS`       | `5000`                   |
/// | `NOTIFICATION_BATCH_SIZE`     | `10`                     |
/// | `NOTIFICATION_GROUP`          | `notifier`               |
/// | `WORKER_ID`                   | `worker-<pid>`           |
/// | `MAIL_FROM`                   | `noreply@taskclock.local` |

use std::env;
use std::time::Duration;

/// Default consumer group on the notification stream
pub const DEFAULT_GROUP: &str = "notifier";

/// Worker configuration
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    pub redis_url: String,

    pub database_url: String,

    pub max_connections: u32,

    /// Period of the weekly report job
    pub weekly_interval: Duration,

    pub consumer: ConsumerConfig,

    /// Sender address on outgoing mail
    pub mail_from: String,
}

/// Notification stream consumer settings
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ConsumerConfig {
    pub stream: String,

    pub group: String,

    /// Consumer name within the group
    pub consumer: String,

    /// How long one XREADGROUP call blocks
    pub block_ms: usize,

    /// Entries fetched per call
    pub batch_size: usize,
}

impl WorkerConfig {
    /// Loads configuration from the process environment
    pub fn from_env() -> anyhow::Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| env::var(key).ok())
    }

    /// Loads configuration through `lookup`
    pub fn from_lookup<F>(lookup: F) -> anyhow::Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let redis_url = lookup("REDIS_URL")
            .filter(|url| !url.is_empty())
            .ok_or_else(|| anyhow::anyhow!("REDIS_URL environment variable is required"))?;

        let database_url = lookup("DATABASE_URL")
            .ok_or_else(|| anyhow::anyhow!("DATABASE_URL environment variable is required"))?;

        let max_connections = lookup("DATABASE_MAX_CONNECTIONS")
            .unwrap_or_else(|| "5".to_string())
            .parse::<u32>()?;

        let weekly_secs = lookup("WEEKLY_REPORT_INTERVAL_SECS")
            .unwrap_or_else(|| "604800".to_string())
            .parse::<u64>()?;
        if weekly_secs == 0 {
            anyhow::bail!("WEEKLY_REPORT_INTERVAL_SECS must be positive");
        }

        let block_ms = lookup("NOTIFICATION_BLOCK_MS")
            .unwrap_or_else(|| "5000".to_string())
            .parse::<usize>()?;

        let batch_size = lookup("NOTIFICATION_BATCH_SIZE")
            .unwrap_or_else(|| "10".to_string())
            .parse::<usize>()?
            .max(1);

        let group = lookup("NOTIFICATION_GROUP").unwrap_or_else(|| DEFAULT_GROUP.to_string());
        let consumer =
            lookup("WORKER_ID").unwrap_or_else(|| format!("worker-{}", std::process::id()));

        let mail_from =
            lookup("MAIL_FROM").unwrap_or_else(|| "noreply@taskclock.local".to_string());

        Ok(Self {
            redis_url,
            database_url,
            max_connections,
            weekly_interval: Duration::from_secs(weekly_secs),
            consumer: ConsumerConfig {
                stream: taskclock_shared::events::NOTIFICATION_STREAM.to_string(),
                group,
                consumer,
                block_ms,
                batch_size,
            },
            mail_from,
        })
    }
}
