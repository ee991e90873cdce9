use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use chrono::{DateTime, Duration, Utc};
use serde_json::json;
use taskboard_core::{TaskStatus, timestamp_now};

mod common;

use common::{insert_task, send, send_request, setup};

const UNKNOWN_ID: &str = "7f1c1f40-3c4e-4b8e-9f2a-1c2d3e4f5a6b";

#[tokio::test]
async fn can_create_toggle_and_delete_a_task() {
    let state = setup().await.expect("Failed to setup test context");
    let app = state.app(None);

    let (status, body) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": "Buy milk" })),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(body["success"], true);
    assert_eq!(body["message"], "Task created successfully");
    assert_eq!(body["data"]["title"], "Buy milk");
    assert_eq!(body["data"]["status"], "Pending");
    assert_eq!(body["data"]["age"], 0);
    assert_eq!(body["data"]["createdAt"], body["data"]["updatedAt"]);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 1);
    assert_eq!(
        body["stats"],
        json!({ "total": 1, "pending": 1, "completed": 0 })
    );
    assert_eq!(body["data"][0]["id"], id.as_str());

    let (status, body) = send(
        &app,
        Method::PATCH,
        &format!("/api/tasks/{}/toggle", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task marked as completed");
    assert_eq!(body["data"]["status"], "Completed");

    let (_, body) = send(&app, Method::GET, "/api/tasks?status=Pending", None).await;
    assert_eq!(body["count"], 0);
    assert_eq!(body["data"], json!([]));
    assert_eq!(
        body["stats"],
        json!({ "total": 1, "pending": 0, "completed": 1 })
    );

    let (_, body) = send(&app, Method::GET, "/api/tasks?status=Completed", None).await;
    assert_eq!(body["count"], 1);
    assert_eq!(body["data"][0]["id"], id.as_str());

    let (status, body) = send(&app, Method::DELETE, &format!("/api/tasks/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task deleted successfully");
    assert_eq!(body["data"]["id"], id.as_str());

    let (status, body) = send(&app, Method::GET, &format!("/api/tasks/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body, json!({ "success": false, "message": "Task not found" }));
}

#[tokio::test]
async fn can_create_single_character_task_but_not_blank_update() {
    let state = setup().await.expect("Failed to setup test context");
    let app = state.app(None);

    let (status, body) = send(&app, Method::POST, "/api/tasks", Some(json!({ "title": "a" }))).await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["data"]["id"].as_str().unwrap().to_string();

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/tasks/{}", id),
        Some(json!({ "title": "" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body,
        json!({
            "success": false,
            "message": "Validation failed",
            "errors": [{ "field": "title", "message": "Task title cannot be empty" }]
        })
    );

    let (_, body) = send(&app, Method::GET, &format!("/api/tasks/{}", id), None).await;
    assert_eq!(body["data"]["title"], "a");
}

#[tokio::test]
async fn cannot_create_task_without_valid_fields() {
    let state = setup().await.expect("Failed to setup test context");
    let app = state.app(None);

    let (status, body) = send(&app, Method::POST, "/api/tasks", Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["errors"][0]["field"], "title");
    assert_eq!(body["errors"][0]["message"], "Task title is required");

    let too_long = "x".repeat(201);
    let (status, body) = send(
        &app,
        Method::POST,
        "/api/tasks",
        Some(json!({ "title": too_long, "status": "Done" })),
    )
    .await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(
        body["errors"],
        json!([
            { "field": "title", "message": "Task title cannot exceed 200 characters" },
            { "field": "status", "message": "Status must be either Pending or Completed" }
        ])
    );

    let (_, body) = send(&app, Method::GET, "/api/tasks", None).await;
    assert_eq!(body["count"], 0);
}

#[tokio::test]
async fn cannot_create_task_from_malformed_json() {
    let state = setup().await.expect("Failed to setup test context");
    let app = state.app(None);

    let request = Request::builder()
        .method(Method::POST)
        .uri("/api/tasks")
        .header("content-type", "application/json")
        .body(Body::from("{\"title\": "))
        .unwrap();
    let (status, body) = send_request(&app, request).await;

    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["message"], "Validation failed");
    assert_eq!(body["errors"][0]["field"], "body");
}

#[tokio::test]
async fn can_update_status_with_partial_body() {
    let state = setup().await.expect("Failed to setup test context");
    let created_at = timestamp_now() - Duration::days(3);
    let task = insert_task(&state.db, "Water plants", TaskStatus::Pending, created_at).await;
    let app = state.app(None);

    let (status, body) = send(
        &app,
        Method::PUT,
        &format!("/api/tasks/{}", task.id),
        Some(json!({ "status": "Completed" })),
    )
    .await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["message"], "Task updated successfully");
    assert_eq!(body["data"]["title"], "Water plants");
    assert_eq!(body["data"]["status"], "Completed");
    assert_eq!(body["data"]["age"], 3);

    let created: DateTime<Utc> = body["data"]["createdAt"].as_str().unwrap().parse().unwrap();
    let updated: DateTime<Utc> = body["data"]["updatedAt"].as_str().unwrap().parse().unwrap();
    assert_eq!(created, task.created_at);
    assert!(updated > created);
}

#[tokio::test]
async fn returns_not_found_for_unknown_task_ids() {
    let state = setup().await.expect("Failed to setup test context");
    let app = state.app(None);
    let path = format!("/api/tasks/{}", UNKNOWN_ID);

    for (method, uri, body) in [
        (Method::GET, path.clone(), None),
        (Method::PUT, path.clone(), Some(json!({ "title": "x" }))),
        (Method::DELETE, path.clone(), None),
        (Method::PATCH, format!("{}/toggle", path), None),
    ] {
        let (status, body) = send(&app, method.clone(), &uri, body).await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{} {}", method, uri);
        assert_eq!(body, json!({ "success": false, "message": "Task not found" }));
    }
}

#[tokio::test]
async fn rejects_malformed_task_ids() {
    let state = setup().await.expect("Failed to setup test context");
    let app = state.app(None);

    for (method, uri) in [
        (Method::GET, "/api/tasks/not-an-id"),
        (Method::DELETE, "/api/tasks/not-an-id"),
        (Method::PATCH, "/api/tasks/not-an-id/toggle"),
    ] {
        let (status, body) = send(&app, method.clone(), uri, None).await;
        assert_eq!(status, StatusCode::BAD_REQUEST, "{} {}", method, uri);
        assert_eq!(
            body,
            json!({ "success": false, "message": "Invalid task ID format" })
        );
    }
}

#[tokio::test]
async fn can_list_with_search_and_sorting() {
    let state = setup().await.expect("Failed to setup test context");
    let now = timestamp_now();
    insert_task(&state.db, "Buy milk", TaskStatus::Pending, now - Duration::hours(1)).await;
    insert_task(&state.db, "buy BREAD", TaskStatus::Completed, now).await;
    insert_task(&state.db, "Call mom", TaskStatus::Pending, now - Duration::hours(2)).await;
    let app = state.app(None);

    let (status, body) = send(&app, Method::GET, "/api/tasks?search=BUY", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 2);
    assert_eq!(body["data"][0]["title"], "buy BREAD");
    assert_eq!(body["data"][1]["title"], "Buy milk");
    assert_eq!(body["stats"]["total"], 3);

    let (_, body) = send(
        &app,
        Method::GET,
        "/api/tasks?sortBy=createdAt&sortOrder=asc&status=All",
        None,
    )
    .await;
    let titles: Vec<_> = body["data"]
        .as_array()
        .unwrap()
        .iter()
        .map(|task| task["title"].as_str().unwrap())
        .collect();
    assert_eq!(titles, vec!["Call mom", "Buy milk", "buy BREAD"]);

    let (_, body) = send(&app, Method::GET, "/api/tasks?status=Pending&search=", None).await;
    assert_eq!(body["count"], 2);
}

#[tokio::test]
async fn status_filter_returns_exact_subset_for_every_sort() {
    let state = setup().await.expect("Failed to setup test context");
    let now = timestamp_now();
    insert_task(&state.db, "Alpha", TaskStatus::Completed, now - Duration::hours(3)).await;
    insert_task(&state.db, "Bravo", TaskStatus::Pending, now - Duration::hours(2)).await;
    insert_task(&state.db, "Charlie", TaskStatus::Completed, now - Duration::hours(1)).await;
    insert_task(&state.db, "Delta", TaskStatus::Pending, now).await;
    let app = state.app(None);

    for sort_by in ["createdAt", "updatedAt", "title", "status"] {
        for sort_order in ["asc", "desc"] {
            let uri = format!(
                "/api/tasks?status=Completed&sortBy={}&sortOrder={}",
                sort_by, sort_order
            );
            let (status, body) = send(&app, Method::GET, &uri, None).await;
            assert_eq!(status, StatusCode::OK, "{}", uri);

            let mut titles: Vec<_> = body["data"]
                .as_array()
                .unwrap()
                .iter()
                .map(|task| {
                    assert_eq!(task["status"], "Completed", "{}", uri);
                    task["title"].as_str().unwrap().to_string()
                })
                .collect();
            titles.sort();
            assert_eq!(titles, vec!["Alpha", "Charlie"], "{}", uri);
        }
    }
}

#[tokio::test]
async fn unknown_status_filter_returns_empty_list_with_global_stats() {
    let state = setup().await.expect("Failed to setup test context");
    insert_task(&state.db, "Buy milk", TaskStatus::Pending, timestamp_now()).await;
    let app = state.app(None);

    let (status, body) = send(&app, Method::GET, "/api/tasks?status=Done", None).await;

    assert_eq!(status, StatusCode::OK);
    assert_eq!(
        body,
        json!({
            "success": true,
            "count": 0,
            "stats": { "total": 1, "pending": 1, "completed": 0 },
            "data": []
        })
    );
}

#[tokio::test]
async fn unknown_sort_values_fall_back_to_newest_first() {
    let state = setup().await.expect("Failed to setup test context");
    let now = timestamp_now();
    insert_task(&state.db, "Older", TaskStatus::Pending, now - Duration::hours(1)).await;
    insert_task(&state.db, "Newer", TaskStatus::Pending, now).await;
    let app = state.app(None);
    let long_search = "e".repeat(150);

    let (status, body) = send(
        &app,
        Method::GET,
        "/api/tasks?sortBy=priority&sortOrder=sideways",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["data"][0]["title"], "Newer");
    assert_eq!(body["data"][1]["title"], "Older");

    let (status, body) = send(
        &app,
        Method::GET,
        &format!("/api/tasks?search={}", long_search),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["count"], 0);
}
