/// Time report endpoint
///
/// ```text
/// GET /v1/tasks/reports?date_from=2024-11-01&date_to=2024-11-07&top=5&user=<uuid>&page=1
/// ```
///
/// All parameters are optional. Without dates the report covers the current
/// month up to today. `top` keeps the N tasks with the most logged time;
/// zero or a negative value keeps all. `user` reports on another user.
///
/// # Response
///
/// ```json
/// {
///   "count": 2,
///   "next": null,
///   "previous": null,
///   "results": {
///     "total_logged_time": 240,
///     "tasks": [
///       { "id": 1, "title": "Task 1", "logged_time": 120 },
///       { "id": 2, "title": "Task 2", "logged_time": 120 }
///     ]
///   }
/// }
/// ```
///
/// `count` is the number of tasks in the report. `total_logged_time` covers
/// the whole report, not just the returned page.

use crate::{
    app::AppState,
    error::ApiResult,
    routes::pagination::{self, PageParams, Paginated},
};
use axum::{
    extract::{Query, State},
    Extension, Json,
};
use taskclock_shared::{
    auth::middleware::AuthContext,
    report::{Report, ReportParams},
};

pub async fn get_report(
    State(state): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Query(params): Query<ReportParams>,
    Query(paging): Query<PageParams>,
) -> ApiResult<Json<Paginated<Report>>> {
    let page = paging.resolve()?;
    let report = state.reports.build(auth.user_id, &params).await?;

    let count = report.tasks.len() as i64;
    page.check(count)?;

    let results = Report {
        total_logged_time: report.total_logged_time,
        tasks: pagination::slice(&report.tasks, page),
    };

    Ok(Json(Paginated::new(count, page, results)))
}
