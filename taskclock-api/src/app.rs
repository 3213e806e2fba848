/// Application state and router construction
///
/// # Routes
///
/// ```text
/// GET    /health
/// GET    /v1/tasks
/// POST   /v1/tasks
/// GET    /v1/tasks/reports
/// GET    /v1/tasks/:id
/// PATCH  /v1/tasks/:id
/// DELETE /v1/tasks/:id
/// GET    /v1/tasks/:id/comments
/// POST   /v1/tasks/:id/comments
/// GET    /v1/tasks/:id/logs
/// POST   /v1/tasks/:id/logs
/// POST   /v1/tasks/:id/logs/start
/// POST   /v1/tasks/:id/logs/stop
/// ```
///
/// Everything under `/v1` requires a bearer JWT.

use crate::config::Config;
use crate::routes;
use axum::{
    extract::{Request, State},
    http::{header, HeaderValue, Method},
    middleware::Next,
    response::Response,
    routing::{get, post},
    Router,
};
use std::sync::Arc;
use std::time::Duration;
use taskclock_shared::auth::middleware::{authenticate, AuthError};
use taskclock_shared::events::EventPublisher;
use taskclock_shared::report::{ReportCache, ReportService};
use taskclock_shared::store::Store;
use taskclock_shared::tasks::TaskService;
use taskclock_shared::timer::TimerService;
use tower_http::{
    cors::CorsLayer,
    trace::{DefaultMakeSpan, DefaultOnResponse, TraceLayer},
};
use tracing::Level;

/// Shared application state
#[derive(Clone)]
pub struct AppState {
    pub store: Arc<dyn Store>,

    pub tasks: TaskService,

    pub timers: TimerService,

    pub reports: Arc<ReportService>,

    pub config: Arc<Config>,
}

impl AppState {
    pub fn new(store: Arc<dyn Store>, events: Arc<dyn EventPublisher>, config: Config) -> Self {
        let cache = ReportCache::new(Duration::from_secs(config.reports.cache_ttl_secs));

        Self {
            tasks: TaskService::new(store.clone(), events),
            timers: TimerService::new(store.clone()),
            reports: Arc::new(ReportService::new(store.clone(), cache)),
            store,
            config: Arc::new(config),
        }
    }

    pub fn jwt_secret(&self) -> &str {
        &self.config.jwt.secret
    }
}

/// Builds the complete router
pub fn build_router(state: AppState) -> Router {
    let health_routes = Router::new().route("/health", get(routes::health::health_check));

    let task_routes = Router::new()
        .route(
            "/",
            get(routes::tasks::list_tasks).post(routes::tasks::create_task),
        )
        .route("/reports", get(routes::reports::get_report))
        .route(
            "/:id",
            get(routes::tasks::get_task)
                .patch(routes::tasks::update_task)
                .delete(routes::tasks::delete_task),
        )
        .route(
            "/:id/comments",
            get(routes::comments::list_comments).post(routes::comments::create_comment),
        )
        .route(
            "/:id/logs",
            get(routes::logs::list_logs).post(routes::logs::create_manual_log),
        )
        .route("/:id/logs/start", post(routes::logs::start_timer))
        .route("/:id/logs/stop", post(routes::logs::stop_timer));

    let v1_routes = Router::new()
        .nest("/tasks", task_routes)
        .layer(axum::middleware::from_fn_with_state(
            state.clone(),
            jwt_auth_layer,
        ));

    let cors = if state.config.api.cors_origins.iter().any(|o| o == "*") {
        CorsLayer::permissive()
    } else {
        let origins: Vec<HeaderValue> = state
            .config
            .api
            .cors_origins
            .iter()
            .filter_map(|origin| origin.parse().ok())
            .collect();

        CorsLayer::new()
            .allow_origin(origins)
            .allow_methods([
                Method::GET,
                Method::POST,
                Method::PATCH,
                Method::DELETE,
                Method::OPTIONS,
            ])
            .allow_headers([header::AUTHORIZATION, header::CONTENT_TYPE])
            .max_age(Duration::from_secs(3600))
    };

    Router::new()
        .merge(health_routes)
        .nest("/v1", v1_routes)
        .layer(
            TraceLayer::new_for_http()
                .make_span_with(DefaultMakeSpan::new().level(Level::INFO))
                .on_response(DefaultOnResponse::new().level(Level::INFO)),
        )
        .layer(cors)
        .with_state(state)
}

/// Resolves the bearer token into an `AuthContext` request extension
async fn jwt_auth_layer(
    State(state): State<AppState>,
    mut req: Request,
    next: Next,
) -> Result<Response, AuthError> {
    let auth_context = authenticate(req.headers(), state.jwt_secret(), state.store.as_ref()).await?;

    req.extensions_mut().insert(auth_context);

    Ok(next.run(req).await)
}
