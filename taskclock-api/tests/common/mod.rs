//! Common test utilities for integration tests
//!
//! Every test gets its own router over a fresh in-memory store and a
//! channel publisher, so emitted notification events can be inspected.

#![allow(dead_code)]

use axum::body::Body;
use axum::http::{Request, StatusCode};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use taskclock_api::app::{build_router, AppState};
use taskclock_api::config::Config;
use taskclock_shared::auth::jwt::{create_token, Claims};
use taskclock_shared::events::{ChannelEventPublisher, NotificationEvent};
use taskclock_shared::models::user::{CreateUser, User};
use taskclock_shared::store::{MemoryStore, Store};
use tokio::sync::mpsc::UnboundedReceiver;
use tower::ServiceExt;

pub const JWT_SECRET: &str = "integration-test-secret-at-least-32-bytes";

/// Test context containing all necessary resources
pub struct TestContext {
    pub store: Arc<MemoryStore>,
    pub app: axum::Router,
    pub config: Config,
    pub user: User,
    pub jwt_token: String,
    pub events: UnboundedReceiver<NotificationEvent>,
}

impl TestContext {
    /// Fresh store, caching disabled, one signed-in user
    pub async fn new() -> Self {
        let vars: HashMap<&str, &str> = HashMap::from([
            ("DATABASE_URL", "memory://"),
            ("JWT_SECRET", JWT_SECRET),
            ("REPORT_CACHE_TTL_SECS", "0"),
        ]);
        let config = Config::from_lookup(|key| vars.get(key).map(|v| v.to_string())).unwrap();

        let store = Arc::new(MemoryStore::new());
        let (publisher, events) = ChannelEventPublisher::new();
        let state = AppState::new(store.clone(), Arc::new(publisher), config.clone());
        let app = build_router(state);

        let user = create_user(&store, "jane@example.com", "Jane", "Smith").await;
        let jwt_token = token_for(&user);

        TestContext {
            store,
            app,
            config,
            user,
            jwt_token,
            events,
        }
    }

    /// Adds another user and returns it with a bearer token
    pub async fn add_user(&self, email: &str, first_name: &str) -> (User, String) {
        let user = create_user(&self.store, email, first_name, "").await;
        let token = token_for(&user);
        (user, token)
    }

    /// Returns authorization header value
    pub fn auth_header(&self) -> String {
        format!("Bearer {}", self.jwt_token)
    }

    /// Sends a request as the context user
    pub async fn send(&self, method: &str, uri: &str, body: Option<Value>) -> (StatusCode, Value) {
        send_as(&self.app, Some(&self.jwt_token), method, uri, body).await
    }

    /// Sends a request with an explicit token (or none)
    pub async fn send_as(
        &self,
        token: Option<&str>,
        method: &str,
        uri: &str,
        body: Option<Value>,
    ) -> (StatusCode, Value) {
        send_as(&self.app, token, method, uri, body).await
    }

    /// Creates a task through the API and returns its ID
    pub async fn create_task(&self, title: &str) -> i64 {
        let (status, body) = self
            .send("POST", "/v1/tasks", Some(serde_json::json!({ "title": title })))
            .await;
        assert_eq!(status, StatusCode::CREATED, "{body}");
        body["id"].as_i64().unwrap()
    }

    /// Events published so far
    pub fn drain_events(&mut self) -> Vec<NotificationEvent> {
        let mut events = Vec::new();
        while let Ok(event) = self.events.try_recv() {
            events.push(event);
        }
        events
    }
}

pub async fn send_as(
    app: &axum::Router,
    token: Option<&str>,
    method: &str,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let mut builder = Request::builder().method(method).uri(uri);
    if let Some(token) = token {
        builder = builder.header("authorization", format!("Bearer {}", token));
    }

    let request = match body {
        Some(json) => builder
            .header("content-type", "application/json")
            .body(Body::from(json.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };

    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    let json = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap_or_else(|_| {
            Value::String(String::from_utf8_lossy(&bytes).into_owned())
        })
    };

    (status, json)
}

async fn create_user(store: &MemoryStore, email: &str, first_name: &str, last_name: &str) -> User {
    store
        .create_user(CreateUser {
            email: email.to_string(),
            first_name: first_name.to_string(),
            last_name: last_name.to_string(),
        })
        .await
        .unwrap()
}

fn token_for(user: &User) -> String {
    create_token(&Claims::new(user.id), JWT_SECRET).unwrap()
}
