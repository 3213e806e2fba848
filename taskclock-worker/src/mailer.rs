/// Outgoing mail
///
/// Notification events and weekly reports are rendered into plain-text
/// [`Message`]s and handed to a [`Mailer`]. The shipped [`LogMailer`] writes
/// one structured log line per message; SMTP delivery plugs in behind the
/// same trait.
///
/// # Wording
///
/// | Event       | Subject                                           |
/// |-------------|---------------------------------------------------|
/// | `Assigned`  | `[EBS-Task-Management] New task assigned`         |
/// | `Commented` | `[EBS-Task-Management] New comment on task: {title}` |
/// | `Completed` | `[EBS-Task-Management] Task Completed: {title}`   |
/// | weekly      | `Your Weekly Time Report`                         |

use async_trait::async_trait;
use std::fmt::Write as _;
use taskclock_shared::events::NotificationEvent;
use taskclock_shared::report::WeeklyReport;
use thiserror::Error;

const SUBJECT_PREFIX: &str = "[EBS-Task-Management]";

/// Subject of the weekly report mail
pub const WEEKLY_SUBJECT: &str = "Your Weekly Time Report";

/// A rendered mail
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

/// Mail delivery errors
#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail delivery failed: {0}")]
    Delivery(String),
}

/// Delivers rendered messages
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &Message) -> Result<(), MailError>;
}

/// Logs every message instead of sending it
#[derive(Debug, Clone)]
pub struct LogMailer {
    from: String,
}

impl LogMailer {
    pub fn new(from: impl Into<String>) -> Self {
        Self { from: from.into() }
    }
}

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &Message) -> Result<(), MailError> {
        tracing::info!(
            from = %self.from,
            to = %message.to,
            subject = %message.subject,
            body_len = message.body.len(),
            "Mail sent"
        );
        Ok(())
    }
}

/// Renders a notification event; `Completed` yields one message per
/// recipient
pub fn render(event: &NotificationEvent) -> Vec<Message> {
    match event {
        NotificationEvent::Assigned {
            task_title,
            executor_email,
            ..
        } => vec![Message {
            to: executor_email.clone(),
            subject: format!("{SUBJECT_PREFIX} New task assigned"),
            body: format!("You have been assigned a task: {task_title}"),
        }],
        NotificationEvent::Commented {
            task_title,
            executor_email,
            commenter_name,
            comment_text,
            ..
        } => vec![Message {
            to: executor_email.clone(),
            subject: format!("{SUBJECT_PREFIX} New comment on task: {task_title}"),
            body: format!("Comment Preview:\n{commenter_name}: {comment_text}"),
        }],
        NotificationEvent::Completed {
            task_title,
            recipients,
            ..
        } => recipients
            .iter()
            .map(|to| Message {
                to: to.clone(),
                subject: format!("{SUBJECT_PREFIX} Task Completed: {task_title}"),
                body: format!("The task \"{task_title}\" has been marked as completed."),
            })
            .collect(),
    }
}

/// Renders a weekly summary for its user
pub fn render_weekly(report: &WeeklyReport) -> Message {
    let mut body = String::from("Your time over the last seven days:\n\n");
    for task in &report.tasks {
        let _ = writeln!(body, "- {}: {} min", task.title, task.logged_time);
    }
    let _ = write!(
        body,
        "\nTotal logged time: {} min",
        report.total_logged_time
    );

    Message {
        to: report.user.email.clone(),
        subject: WEEKLY_SUBJECT.to_string(),
        body,
    }
}

/// Sends every message, returning how many were delivered
///
/// Failures are logged and do not stop the remaining messages.
pub async fn send_all(mailer: &dyn Mailer, messages: &[Message]) -> usize {
    let mut delivered = 0;
    for message in messages {
        match mailer.send(message).await {
            Ok(()) => delivered += 1,
            Err(e) => tracing::warn!(
                to = %message.to,
                subject = %message.subject,
                error = %e,
                "Failed to send mail"
            ),
        }
    }
    delivered
}
