/// Time log model and database operations
///
/// A time log is either *running* (`end_time IS NULL`) or *closed*. At most
/// one running log exists per (task, user); the partial unique index
/// `time_logs_one_running_idx` enforces this so that the check and the
/// insert in `insert_running` are one atomic statement.
///
/// # Schema
///
/// ```sql
/// CREATE TABLE time_logs (
///     id BIGSERIAL PRIMARY KEY,
///     task_id BIGINT NOT NULL REFERENCES tasks(id) ON DELETE CASCADE,
///     user_id UUID NOT NULL REFERENCES users(id) ON DELETE CASCADE,
///     start_time TIMESTAMPTZ NOT NULL,
///     end_time TIMESTAMPTZ,
///     note TEXT,
///     CONSTRAINT time_logs_end_after_start CHECK (end_time IS NULL OR end_time >= start_time)
/// );
///
/// CREATE UNIQUE INDEX time_logs_one_running_idx
///     ON time_logs (task_id, user_id) WHERE end_time IS NULL;
/// ```
///
/// Duration is never stored; see [`crate::duration`].

use crate::duration::duration_between;
use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use sqlx::PgPool;
use uuid::Uuid;

/// Time log row
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, sqlx::FromRow)]
pub struct TimeLog {
    pub id: i64,
    pub task_id: i64,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    /// `None` while the timer is running
    pub end_time: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

impl TimeLog {
    pub fn is_running(&self) -> bool {
        self.end_time.is_none()
    }

    /// Elapsed seconds, `None` while running
    pub fn duration_seconds(&self) -> Option<i64> {
        duration_between(self.start_time, self.end_time)
    }
}

/// Input for inserting a log
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NewTimeLog {
    pub task_id: i64,
    pub user_id: Uuid,
    pub start_time: DateTime<Utc>,
    pub end_time: Option<DateTime<Utc>>,
    pub note: Option<String>,
}

/// Combines the note of a running log with the note given on stop
///
/// An empty or absent addition leaves the existing note untouched. A
/// non-empty existing note gets the addition on a new line.
pub fn merge_note(existing: Option<&str>, addition: Option<&str>) -> Option<String> {
    match (existing, addition) {
        (existing, None) | (existing, Some("")) => existing.map(str::to_string),
        (Some(existing), Some(addition)) if !existing.is_empty() => {
            Some(format!("{existing}\n{addition}"))
        }
        (_, Some(addition)) => Some(addition.to_string()),
    }
}

/// Which closed logs a report covers
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum LogWindow {
    /// UTC calendar date of `end_time` within `[from, to]`, either side open
    EndDate {
        from: Option<NaiveDate>,
        to: Option<NaiveDate>,
    },

    /// Logs overlapping `[since, until)`: started before `until`, ended at or
    /// after `since`
    Overlap {
        since: DateTime<Utc>,
        until: DateTime<Utc>,
    },
}

impl LogWindow {
    /// Whether a log with these bounds falls inside the window
    ///
    /// Running logs never match.
    pub fn contains(&self, start: DateTime<Utc>, end: Option<DateTime<Utc>>) -> bool {
        let Some(end) = end else {
            return false;
        };

        match *self {
            LogWindow::EndDate { from, to } => {
                let day = end.date_naive();
                from.map_or(true, |from| day >= from) && to.map_or(true, |to| day <= to)
            }
            LogWindow::Overlap { since, until } => start < until && end >= since,
        }
    }
}

/// One closed log joined with its task title, as fed to the aggregator
#[derive(Debug, Clone, PartialEq, Eq, sqlx::FromRow)]
pub struct ReportRow {
    pub task_id: i64,
    pub title: String,
    pub start_time: DateTime<Utc>,
    pub end_time: DateTime<Utc>,
}

const LOG_COLUMNS: &str = "id, task_id, user_id, start_time, end_time, note";

impl TimeLog {
    /// Inserts a running log unless one already exists for (task, user)
    ///
    /// Returns `None` on conflict. The partial unique index makes the
    /// check-and-insert atomic across concurrent requests.
    pub async fn insert_running(
        pool: &PgPool,
        task_id: i64,
        user_id: Uuid,
        start_time: DateTime<Utc>,
        note: Option<String>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO time_logs (task_id, user_id, start_time, end_time, note)
            VALUES ($1, $2, $3, NULL, $4)
            ON CONFLICT DO NOTHING
            RETURNING {LOG_COLUMNS}
            "#
        );

        sqlx::query_as::<_, TimeLog>(&query)
            .bind(task_id)
            .bind(user_id)
            .bind(start_time)
            .bind(note)
            .fetch_optional(pool)
            .await
    }

    /// Closes the running log for (task, user)
    ///
    /// Returns `None` if nothing is running. The row is locked while the note
    /// is merged, and the update only applies to a still-running row.
    pub async fn close_running(
        pool: &PgPool,
        task_id: i64,
        user_id: Uuid,
        end_time: DateTime<Utc>,
        note: Option<&str>,
    ) -> Result<Option<Self>, sqlx::Error> {
        let mut tx = pool.begin().await?;

        let select = format!(
            r#"
            SELECT {LOG_COLUMNS}
            FROM time_logs
            WHERE task_id = $1 AND user_id = $2 AND end_time IS NULL
            FOR UPDATE
            "#
        );

        let running = sqlx::query_as::<_, TimeLog>(&select)
            .bind(task_id)
            .bind(user_id)
            .fetch_optional(&mut *tx)
            .await?;

        let Some(running) = running else {
            tx.rollback().await?;
            return Ok(None);
        };

        let update = format!(
            r#"
            UPDATE time_logs
            SET end_time = $2, note = $3
            WHERE id = $1 AND end_time IS NULL
            RETURNING {LOG_COLUMNS}
            "#
        );

        let closed = sqlx::query_as::<_, TimeLog>(&update)
            .bind(running.id)
            .bind(end_time)
            .bind(merge_note(running.note.as_deref(), note))
            .fetch_optional(&mut *tx)
            .await?;

        tx.commit().await?;
        Ok(closed)
    }

    /// Inserts a log as given (used for manual, already closed entries)
    pub async fn insert(pool: &PgPool, data: NewTimeLog) -> Result<Self, sqlx::Error> {
        let query = format!(
            r#"
            INSERT INTO time_logs (task_id, user_id, start_time, end_time, note)
            VALUES ($1, $2, $3, $4, $5)
            RETURNING {LOG_COLUMNS}
            "#
        );

        sqlx::query_as::<_, TimeLog>(&query)
            .bind(data.task_id)
            .bind(data.user_id)
            .bind(data.start_time)
            .bind(data.end_time)
            .bind(data.note)
            .fetch_one(pool)
            .await
    }

    /// All logs of a task, ordered by ID
    pub async fn list_by_task(pool: &PgPool, task_id: i64) -> Result<Vec<Self>, sqlx::Error> {
        let query = format!(
            "SELECT {LOG_COLUMNS} FROM time_logs WHERE task_id = $1 ORDER BY id ASC"
        );

        sqlx::query_as::<_, TimeLog>(&query)
            .bind(task_id)
            .fetch_all(pool)
            .await
    }

    /// Closed logs of a user inside the window, joined with task titles
    pub async fn report_rows(
        pool: &PgPool,
        user_id: Uuid,
        window: LogWindow,
    ) -> Result<Vec<ReportRow>, sqlx::Error> {
        match window {
            LogWindow::EndDate { from, to } => {
                sqlx::query_as::<_, ReportRow>(
                    r#"
                    SELECT l.task_id, t.title, l.start_time, l.end_time
                    FROM time_logs l
                    JOIN tasks t ON t.id = l.task_id
                    WHERE l.user_id = $1
                      AND l.end_time IS NOT NULL
                      AND ($2::date IS NULL OR (l.end_time AT TIME ZONE 'UTC')::date >= $2)
                      AND ($3::date IS NULL OR (l.end_time AT TIME ZONE 'UTC')::date <= $3)
                    ORDER BY l.id ASC
                    "#,
                )
                .bind(user_id)
                .bind(from)
                .bind(to)
                .fetch_all(pool)
                .await
            }
            LogWindow::Overlap { since, until } => {
                sqlx::query_as::<_, ReportRow>(
                    r#"
                    SELECT l.task_id, t.title, l.start_time, l.end_time
                    FROM time_logs l
                    JOIN tasks t ON t.id = l.task_id
                    WHERE l.user_id = $1
                      AND l.end_time IS NOT NULL
                      AND l.start_time < $2
                      AND l.end_time >= $3
                    ORDER BY l.id ASC
                    "#,
                )
                .bind(user_id)
                .bind(until)
                .bind(since)
                .fetch_all(pool)
                .await
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::{Duration, TimeZone};

    #[test]
    fn test_merge_note_appends_on_new_line() {
        assert_eq!(merge_note(Some("a"), Some("b")), Some("a\nb".to_string()));
    }

    #[test]
    fn test_merge_note_sets_when_absent() {
        assert_eq!(merge_note(None, Some("b")), Some("b".to_string()));
        assert_eq!(merge_note(Some(""), Some("b")), Some("b".to_string()));
    }

    #[test]
    fn test_merge_note_ignores_empty_addition() {
        assert_eq!(merge_note(Some("a"), Some("")), Some("a".to_string()));
        assert_eq!(merge_note(Some("a"), None), Some("a".to_string()));
        assert_eq!(merge_note(None, None), None);
    }

    #[test]
    fn test_end_date_window_uses_utc_date_of_end() {
        let window = LogWindow::EndDate {
            from: NaiveDate::from_ymd_opt(2024, 11, 1),
            to: NaiveDate::from_ymd_opt(2024, 11, 7),
        };
        let end = Utc.with_ymd_and_hms(2024, 11, 7, 23, 59, 59).unwrap();
        let start = end - Duration::days(10);

        assert!(window.contains(start, Some(end)));
        assert!(!window.contains(start, Some(end + Duration::seconds(1))));
        assert!(!window.contains(start, None));
    }

    #[test]
    fn test_end_date_window_open_sides() {
        let end = Utc.with_ymd_and_hms(2020, 1, 1, 0, 0, 0).unwrap();
        let open = LogWindow::EndDate { from: None, to: None };
        assert!(open.contains(end, Some(end)));

        let only_to = LogWindow::EndDate {
            from: None,
            to: NaiveDate::from_ymd_opt(2019, 12, 31),
        };
        assert!(!only_to.contains(end, Some(end)));
    }

    #[test]
    fn test_overlap_window() {
        let until = Utc.with_ymd_and_hms(2024, 11, 8, 12, 0, 0).unwrap();
        let since = until - Duration::days(7);
        let window = LogWindow::Overlap { since, until };

        // Started before the window, ended inside it
        assert!(window.contains(since - Duration::hours(1), Some(since)));
        // Ended before the window
        assert!(!window.contains(since - Duration::hours(2), Some(since - Duration::seconds(1))));
        // Started at the upper bound
        assert!(!window.contains(until, Some(until + Duration::hours(1))));
    }

    #[test]
    fn test_duration_seconds() {
        let start = Utc.with_ymd_and_hms(2024, 11, 7, 8, 0, 0).unwrap();
        let mut log = TimeLog {
            id: 1,
            task_id: 1,
            user_id: Uuid::new_v4(),
            start_time: start,
            end_time: None,
            note: None,
        };
        assert!(log.is_running());
        assert_eq!(log.duration_seconds(), None);

        log.end_time = Some(start + Duration::minutes(120));
        assert_eq!(log.duration_seconds(), Some(7200));
    }
}
