/// Time report aggregation
///
/// Turns a user's closed time logs into per-task totals:
///
/// 1. select closed logs of the subject user inside the window
/// 2. group by task and sum exact seconds
/// 3. order by total descending, ties by ascending task ID
/// 4. truncate to `top` tasks when a positive limit is given
///
/// Minutes are floored per task and, separately, for the grand total. The
/// grand total always covers every selected log, including tasks cut off by
/// `top`.
///
/// # Example
///
/// ```
/// use chrono::{Duration, Utc};
/// use taskclock_shared::models::time_log::ReportRow;
/// use taskclock_shared::report::aggregate;
///
/// let end = Utc::now();
/// let row = |task_id, title: &str, minutes| ReportRow {
///     task_id,
///     title: title.to_string(),
///     start_time: end - Duration::minutes(minutes),
///     end_time: end,
/// };
///
/// let report = aggregate(&[row(1, "a", 30), row(2, "b", 45), row(1, "a", 30)], None);
/// assert_eq!(report.total_logged_time, 105);
/// assert_eq!(report.tasks[0].id, 1);
/// assert_eq!(report.tasks[0].logged_time, 60);
/// ```

pub mod cache;
pub mod params;

pub use cache::ReportCache;
pub use params::{ReportFilters, ReportParams, ReportQuery};

use crate::duration::{duration_between, to_minutes};
use crate::error::DomainResult;
use crate::models::time_log::{LogWindow, ReportRow};
use crate::models::user::User;
use crate::store::Store;
use chrono::{DateTime, Duration, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use uuid::Uuid;

/// Number of tasks listed in a weekly report
pub const WEEKLY_TOP: usize = 20;

/// Per-task line of a report
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TaskTotal {
    pub id: i64,
    pub title: String,
    /// Whole minutes
    pub logged_time: i64,
}

/// Aggregated report
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Report {
    /// Whole minutes across all selected logs
    pub total_logged_time: i64,
    pub tasks: Vec<TaskTotal>,
}

/// Weekly summary for one user
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WeeklyReport {
    pub user: User,
    pub total_logged_time: i64,
    pub tasks: Vec<TaskTotal>,
}

/// Groups rows by task, sums, orders and truncates
pub fn aggregate(rows: &[ReportRow], top: Option<usize>) -> Report {
    let mut by_task: HashMap<i64, (String, i64)> = HashMap::new();
    let mut total_seconds = 0;

    for row in rows {
        let seconds = duration_between(row.start_time, Some(row.end_time)).unwrap_or(0);
        total_seconds += seconds;
        by_task
            .entry(row.task_id)
            .or_insert_with(|| (row.title.clone(), 0))
            .1 += seconds;
    }

    let mut totals: Vec<(i64, String, i64)> = by_task
        .into_iter()
        .map(|(id, (title, seconds))| (id, title, seconds))
        .collect();
    totals.sort_by(|a, b| b.2.cmp(&a.2).then(a.0.cmp(&b.0)));

    if let Some(top) = top.filter(|top| *top > 0) {
        totals.truncate(top);
    }

    Report {
        total_logged_time: to_minutes(total_seconds),
        tasks: totals
            .into_iter()
            .map(|(id, title, seconds)| TaskTotal {
                id,
                title,
                logged_time: to_minutes(seconds),
            })
            .collect(),
    }
}

/// Builds (and caches) time reports
pub struct ReportService {
    store: Arc<dyn Store>,
    cache: ReportCache,
}

impl ReportService {
    pub fn new(store: Arc<dyn Store>, cache: ReportCache) -> Self {
        Self { store, cache }
    }

    /// Parses `params` and builds the caller's report for the current UTC date
    pub async fn build(&self, caller: Uuid, params: &ReportParams) -> DomainResult<Arc<Report>> {
        let filters = params.parse()?;
        self.build_for(filters.resolve(caller, Utc::now().date_naive()))
            .await
    }

    /// Like [`ReportService::build`] with an explicit "today"
    pub async fn build_at(
        &self,
        caller: Uuid,
        params: &ReportParams,
        today: NaiveDate,
    ) -> DomainResult<Arc<Report>> {
        let filters = params.parse()?;
        self.build_for(filters.resolve(caller, today)).await
    }

    /// Builds the report for a resolved query, consulting the cache first
    pub async fn build_for(&self, query: ReportQuery) -> DomainResult<Arc<Report>> {
        if let Some(report) = self.cache.get(&query).await {
            tracing::debug!(subject = %query.subject, "Report cache hit");
            return Ok(report);
        }

        let rows = self.store.report_rows(query.subject, query.window).await?;
        let report = Arc::new(aggregate(&rows, query.top));

        tracing::debug!(
            subject = %query.subject,
            logs = rows.len(),
            tasks = report.tasks.len(),
            total_minutes = report.total_logged_time,
            "Report built"
        );

        self.cache.put(query, Arc::clone(&report)).await;
        Ok(report)
    }

    /// Weekly summary for `user`, or `None` when they logged nothing
    ///
    /// Covers logs that started before `now` and ended within the last
    /// seven days.
    pub async fn weekly(&self, user: &User, now: DateTime<Utc>) -> DomainResult<Option<WeeklyReport>> {
        let window = LogWindow::Overlap {
            since: now - Duration::days(7),
            until: now,
        };
        let rows = self.store.report_rows(user.id, window).await?;
        if rows.is_empty() {
            return Ok(None);
        }

        let report = aggregate(&rows, Some(WEEKLY_TOP));
        Ok(Some(WeeklyReport {
            user: user.clone(),
            total_logged_time: report.total_logged_time,
            tasks: report.tasks,
        }))
    }
}
