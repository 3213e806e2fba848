//! Task, comment and notification flows

mod common;

use axum::http::StatusCode;
use common::TestContext;
use serde_json::json;
use taskclock_shared::events::NotificationEvent;

#[tokio::test]
async fn test_health_needs_no_token() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx.send_as(None, "GET", "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"], "connected");
}

#[tokio::test]
async fn test_create_and_get_task() {
    let mut ctx = TestContext::new().await;

    let (status, created) = ctx
        .send(
            "POST",
            "/v1/tasks",
            Some(json!({ "title": "Plan sprint", "description": "Q4" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED, "{created}");
    assert_eq!(created["status"], "open");
    assert_eq!(created["owner"]["email"], "jane@example.com");
    assert_eq!(created["executor"]["id"], ctx.user.id.to_string());
    assert_eq!(created["logged_time"], 0);

    let task_id = created["id"].as_i64().unwrap();
    let (status, fetched) = ctx.send("GET", &format!("/v1/tasks/{task_id}"), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched["description"], "Q4");

    assert_eq!(
        ctx.drain_events(),
        vec![NotificationEvent::Assigned {
            task_id,
            task_title: "Plan sprint".to_string(),
            executor_email: "jane@example.com".to_string(),
        }]
    );
}

#[tokio::test]
async fn test_create_rejects_unknown_executor() {
    let ctx = TestContext::new().await;

    let (status, body) = ctx
        .send(
            "POST",
            "/v1/tasks",
            Some(json!({
                "title": "Ghost",
                "executor": "00000000-0000-0000-0000-000000000001"
            })),
        )
        .await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "executor");
}

#[tokio::test]
async fn test_list_filters_and_pagination() {
    let ctx = TestContext::new().await;
    for title in ["Write report", "Review report", "Deploy"] {
        ctx.create_task(title).await;
    }

    let (status, body) = ctx.send("GET", "/v1/tasks?search=REPORT", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["results"][0]["logged_time"], 0);

    let (_, body) = ctx.send("GET", "/v1/tasks?page_size=2&page=2", None).await;
    assert_eq!(body["count"], 3);
    assert_eq!(body["previous"], 1);
    assert_eq!(body["results"].as_array().unwrap().len(), 1);

    let (status, body) = ctx.send("GET", "/v1/tasks?status=done", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["field"], "status");

    let (status, _) = ctx.send("GET", "/v1/tasks?page=5", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, body) = ctx
        .send("GET", "/v1/tasks?page=9223372036854775807&page_size=2", None)
        .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Invalid page.");
}

#[tokio::test]
async fn test_reassign_comment_and_complete_notifications() {
    let mut ctx = TestContext::new().await;
    let (bob, bob_token) = ctx.add_user("bob@example.com", "Bob").await;
    let task_id = ctx.create_task("Release").await;
    ctx.drain_events();

    // Reassign to Bob
    let (status, body) = ctx
        .send(
            "PATCH",
            &format!("/v1/tasks/{task_id}"),
            Some(json!({ "executor": bob.id })),
        )
        .await;
    assert_eq!(status, StatusCode::OK, "{body}");
    assert_eq!(body["executor"]["email"], "bob@example.com");
    assert_eq!(
        ctx.drain_events(),
        vec![NotificationEvent::Assigned {
            task_id,
            task_title: "Release".to_string(),
            executor_email: "bob@example.com".to_string(),
        }]
    );

    // Jane comments; Bob is told
    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/tasks/{task_id}/comments"),
            Some(json!({ "text": "Ship it" })),
        )
        .await;
    assert_eq!(status, StatusCode::CREATED);
    assert!(body["id"].is_i64());
    assert_eq!(
        ctx.drain_events(),
        vec![NotificationEvent::Commented {
            task_id,
            task_title: "Release".to_string(),
            executor_email: "bob@example.com".to_string(),
            commenter_name: "Jane Smith".to_string(),
            comment_text: "Ship it".to_string(),
        }]
    );

    // Bob comments too, then completes the task
    ctx.send_as(
        Some(&bob_token),
        "POST",
        &format!("/v1/tasks/{task_id}/comments"),
        Some(json!({ "text": "Done" })),
    )
    .await;
    ctx.drain_events();

    let (status, body) = ctx
        .send_as(
            Some(&bob_token),
            "PATCH",
            &format!("/v1/tasks/{task_id}"),
            Some(json!({ "status": "completed" })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "completed");
    assert_eq!(
        ctx.drain_events(),
        vec![NotificationEvent::Completed {
            task_id,
            task_title: "Release".to_string(),
            recipients: vec![
                "jane@example.com".to_string(),
                "bob@example.com".to_string()
            ],
        }]
    );

    let (_, comments) = ctx
        .send("GET", &format!("/v1/tasks/{task_id}/comments"), None)
        .await;
    assert_eq!(comments[0]["text"], "Ship it");
    assert_eq!(comments[1]["user"], bob.id.to_string());
}

#[tokio::test]
async fn test_unassign_with_null_executor() {
    let mut ctx = TestContext::new().await;
    let task_id = ctx.create_task("Backlog").await;
    ctx.drain_events();

    let (status, body) = ctx
        .send(
            "PATCH",
            &format!("/v1/tasks/{task_id}"),
            Some(json!({ "executor": null })),
        )
        .await;
    assert_eq!(status, StatusCode::OK);
    assert!(body["executor"].is_null());

    ctx.send(
        "POST",
        &format!("/v1/tasks/{task_id}/comments"),
        Some(json!({ "text": "anyone?" })),
    )
    .await;
    assert!(ctx.drain_events().is_empty());
}

#[tokio::test]
async fn test_blank_comment_rejected() {
    let ctx = TestContext::new().await;
    let task_id = ctx.create_task("Quiet").await;

    let (status, body) = ctx
        .send(
            "POST",
            &format!("/v1/tasks/{task_id}/comments"),
            Some(json!({ "text": "  " })),
        )
        .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["details"][0]["message"], "This field may not be blank.");
}

#[tokio::test]
async fn test_delete_cascades() {
    let ctx = TestContext::new().await;
    let task_id = ctx.create_task("Temporary").await;
    ctx.send(
        "POST",
        &format!("/v1/tasks/{task_id}/logs"),
        Some(json!({ "duration": 15 })),
    )
    .await;

    let (status, _) = ctx.send("DELETE", &format!("/v1/tasks/{task_id}"), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = ctx.send("GET", &format!("/v1/tasks/{task_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);

    let (status, _) = ctx.send("DELETE", &format!("/v1/tasks/{task_id}"), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}
