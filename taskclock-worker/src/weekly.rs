/// Weekly time report job
///
/// Every interval (a week by default) each user who logged time in the last
/// seven days gets a summary mail of their top tasks. Users with no logs in
/// the window are skipped.

use crate::mailer::{render_weekly, Mailer};
use chrono::{DateTime, Utc};
use std::sync::Arc;
use std::time::Duration;
use taskclock_shared::error::DomainResult;
use taskclock_shared::report::{ReportCache, ReportService};
use taskclock_shared::store::Store;
use tokio::time::{interval_at, Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;

/// Outcome of one run
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct WeeklyRunSummary {
    pub users: usize,
    pub sent: usize,
    pub skipped: usize,
    pub failed: usize,
}

/// Sends weekly summaries
pub struct WeeklyReportJob {
    store: Arc<dyn Store>,
    reports: ReportService,
    mailer: Arc<dyn Mailer>,
}

impl WeeklyReportJob {
    pub fn new(store: Arc<dyn Store>, mailer: Arc<dyn Mailer>) -> Self {
        Self {
            reports: ReportService::new(store.clone(), ReportCache::disabled()),
            store,
            mailer,
        }
    }

    /// Builds and mails every user's summary as of `now`
    ///
    /// A failure for one user is logged and the run continues.
    pub async fn run_once(&self, now: DateTime<Utc>) -> DomainResult<WeeklyRunSummary> {
        let users = self.store.list_users().await?;
        let mut summary = WeeklyRunSummary {
            users: users.len(),
            ..Default::default()
        };

        for user in &users {
            let report = match self.reports.weekly(user, now).await {
                Ok(Some(report)) => report,
                Ok(None) => {
                    summary.skipped += 1;
                    continue;
                }
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Failed to build weekly report");
                    summary.failed += 1;
                    continue;
                }
            };

            match self.mailer.send(&render_weekly(&report)).await {
                Ok(()) => summary.sent += 1,
                Err(e) => {
                    tracing::warn!(user_id = %user.id, error = %e, "Failed to send weekly report");
                    summary.failed += 1;
                }
            }
        }

        tracing::info!(
            users = summary.users,
            sent = summary.sent,
            skipped = summary.skipped,
            failed = summary.failed,
            "Weekly reports sent"
        );

        Ok(summary)
    }

    /// Runs every `period` (first run one period from now) until `shutdown`
    pub async fn run(&self, period: Duration, shutdown: CancellationToken) {
        let mut ticker = interval_at(Instant::now() + period, period);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

        tracing::info!(period_secs = period.as_secs(), "Weekly report job scheduled");

        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = ticker.tick() => {
                    if let Err(e) = self.run_once(Utc::now()).await {
                        tracing::error!(error = %e, "Weekly report run failed");
                    }
                }
            }
        }

        tracing::info!("Weekly report job stopped");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mailer::{MailError, Message, WEEKLY_SUBJECT};
    use async_trait::async_trait;
    use chrono::{Duration as ChronoDuration, TimeZone};
    use taskclock_shared::models::task::CreateTask;
    use taskclock_shared::models::time_log::NewTimeLog;
    use taskclock_shared::models::user::{CreateUser, User};
    use taskclock_shared::store::MemoryStore;
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

    fn at(day: u32, hour: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 11, day, hour, 0, 0).unwrap()
    }

    async fn user(store: &MemoryStore, email: &str) -> User {
        store
            .create_user(CreateUser {
                email: email.to_string(),
                first_name: String::new(),
                last_name: String::new(),
            })
            .await
            .unwrap()
    }

    #[tokio::test]
    async fn test_only_users_with_logs_are_mailed() {
        let store = Arc::new(MemoryStore::new());
        let jane = user(&store, "jane@example.com").await;
        user(&store, "idle@example.com").await;

        let task = store
            .create_task(CreateTask {
                title: "Docs".to_string(),
                description: String::new(),
                owner_id: jane.id,
                executor_id: Some(jane.id),
            })
            .await
            .unwrap();
        store
            .insert_closed_log(NewTimeLog {
                task_id: task.id,
                user_id: jane.id,
                start_time: at(8, 9),
                end_time: Some(at(8, 9) + ChronoDuration::minutes(95)),
                note: None,
            })
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let job = WeeklyReportJob::new(store.clone(), mailer.clone());

        let summary = job.run_once(at(11, 8)).await.unwrap();
        assert_eq!(
            summary,
            WeeklyRunSummary {
                users: 2,
                sent: 1,
                skipped: 1,
                failed: 0,
            }
        );

        let sent = mailer.sent.lock().await;
        assert_eq!(sent[0].to, "jane@example.com");
        assert_eq!(sent[0].subject, WEEKLY_SUBJECT);
        assert!(sent[0].body.contains("- Docs: 95 min"));
    }

    #[tokio::test]
    async fn test_old_logs_are_out_of_window() {
        let store = Arc::new(MemoryStore::new());
        let jane = user(&store, "jane@example.com").await;
        let task = store
            .create_task(CreateTask {
                title: "Old".to_string(),
                description: String::new(),
                owner_id: jane.id,
                executor_id: None,
            })
            .await
            .unwrap();
        store
            .insert_closed_log(NewTimeLog {
                task_id: task.id,
                user_id: jane.id,
                start_time: at(1, 9),
                end_time: Some(at(1, 10)),
                note: None,
            })
            .await
            .unwrap();

        let mailer = Arc::new(RecordingMailer::default());
        let job = WeeklyReportJob::new(store, mailer.clone());

        let summary = job.run_once(at(20, 8)).await.unwrap();
        assert_eq!(summary.skipped, 1);
        assert!(mailer.sent.lock().await.is_empty());
    }

    #[tokio::test(start_paused = true)]
    async fn test_run_stops_on_shutdown() {
        let store = Arc::new(MemoryStore::new());
        let job = WeeklyReportJob::new(store, Arc::new(RecordingMailer::default()));
        let token = CancellationToken::new();

        let handle = {
            let token = token.clone();
            tokio::spawn(async move { job.run(Duration::from_secs(60), token).await })
        };
        tokio::time::sleep(Duration::from_secs(150)).await;
        token.cancel();

        handle.await.unwrap();
    }
}
