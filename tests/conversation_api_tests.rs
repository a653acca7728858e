//! Conversation, history and export endpoint tests
mod common;

use axum::http::{Method, StatusCode};
use common::*;
use prd_analyzer::router;
use serde_json::json;
use std::sync::Arc;

/// Router with one conversation that already has a stored PRD version
async fn app_with_prd() -> (axum::Router, i64) {
    let model = Arc::new(ScriptedModel::happy());
    let (app, conversation_id) = app_with_conversation(test_server_with_model(model)).await;
    let (_, body) = call(
        &app,
        Method::POST,
        "/api/process-prd",
        Some(json!({
            "user_input": "An app to find dog walkers",
            "conversation_id": conversation_id
        })),
    )
    .await;
    assert_eq!(body["success"], true);
    (app, conversation_id)
}

#[tokio::test]
async fn test_conversation_crud() {
    let app = router(test_server());

    let (status, created) = call(
        &app,
        Method::POST,
        "/conversations/",
        Some(json!({"title": "Meal planner", "additional_metadata": "{\"source\": \"web\"}"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["title"], "Meal planner");
    assert_eq!(created["status"], "active");
    assert_eq!(created["current_prd_version_id"], json!(null));
    let id = created["id"].as_i64().unwrap();

    let (status, untitled) = call(&app, Method::POST, "/conversations", Some(json!({}))).await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(untitled["title"], json!(null));

    let (_, all) = call(&app, Method::GET, "/conversations/", None).await;
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (status, fetched) = call(&app, Method::GET, &format!("/conversations/{}", id), None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);

    let (status, _) = call(&app, Method::DELETE, &format!("/conversations/{}", id), None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, body) = call(&app, Method::GET, &format!("/conversations/{}", id), None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], format!("Conversation with ID {} not found", id));
}

#[tokio::test]
async fn test_conversation_ids_are_checked() {
    let app = router(test_server());

    let (status, body) = call(&app, Method::GET, "/conversations/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "Conversation ID must be a positive integer");

    for path in ["messages", "prd-versions", "clarifying-questions", "export"] {
        let (status, _) = call(
            &app,
            Method::GET,
            &format!("/conversations/9/{}", path),
            None,
        )
        .await;
        assert_eq!(status, StatusCode::NOT_FOUND, "{}", path);
    }

    let (status, body) = call(&app, Method::GET, "/prd-versions/3/changes", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "PRD version with ID 3 not found");

    let (status, _) = call(&app, Method::DELETE, "/conversations/9", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_deleting_conversation_removes_its_attachments() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;
    let (_, attachment) = call(
        &app,
        Method::POST,
        "/file-attachments/",
        Some(attachment_body(conversation_id)),
    )
    .await;

    let (status, _) = call(
        &app,
        Method::DELETE,
        &format!("/conversations/{}", conversation_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NO_CONTENT);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/file-attachments/{}", attachment["id"]),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_first_version_changes_list_added_sections() {
    let (app, conversation_id) = app_with_prd().await;
    let (_, versions) = call(
        &app,
        Method::GET,
        &format!("/conversations/{}/prd-versions", conversation_id),
        None,
    )
    .await;
    let version_id = versions[0]["id"].as_i64().unwrap();

    let (_, changes) = call(
        &app,
        Method::GET,
        &format!("/prd-versions/{}/changes", version_id),
        None,
    )
    .await;
    let changes = changes.as_array().unwrap();
    assert_eq!(changes.len(), 6);
    assert!(changes.iter().all(|c| c["change_type"] == "added"));
    assert!(changes.iter().all(|c| c["previous_prd_version_id"] == json!(null)));
    assert_eq!(changes[0]["section"], "title");
    assert_eq!(changes[0]["new_content"], "Dog Walker Finder");
}

#[tokio::test]
async fn test_export_defaults_to_text() {
    let (app, conversation_id) = app_with_prd().await;

    let request = axum::http::Request::builder()
        .uri(format!("/conversations/{}/export", conversation_id))
        .body(axum::body::Body::empty())
        .unwrap();
    let response = tower::ServiceExt::oneshot(app.clone(), request).await.unwrap();
    assert_eq!(response.status(), StatusCode::OK);

    let headers = response.headers();
    assert_eq!(headers["content-type"], "text/plain; charset=utf-8");
    let disposition = headers["content-disposition"].to_str().unwrap().to_string();
    assert!(disposition.starts_with("attachment; filename=\"dog_walker_finder_"));
    assert!(disposition.ends_with(".txt\""));

    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let text = String::from_utf8(bytes.to_vec()).unwrap();
    assert!(text.starts_with("Dog Walker Finder\n=================\n"));
    assert!(text.contains("\nFEATURES\n- Walker search: filter by distance\n"));
}

#[tokio::test]
async fn test_export_markdown_and_json() {
    let (app, conversation_id) = app_with_prd().await;

    let (status, bytes) = call_raw(
        &app,
        Method::GET,
        &format!("/conversations/{}/export?format=markdown", conversation_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    let markdown = String::from_utf8(bytes).unwrap();
    assert!(markdown.starts_with("# Dog Walker Finder\n"));
    assert!(markdown.contains("## User Stories"));

    let (status, document) = call(
        &app,
        Method::GET,
        &format!("/conversations/{}/export?format=json", conversation_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(document["title"], "Dog Walker Finder");
    assert_eq!(document["objectives"].as_array().unwrap().len(), 2);

    let (status, _) = call(
        &app,
        Method::GET,
        &format!("/conversations/{}/export?format=pdf", conversation_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
}

#[tokio::test]
async fn test_export_without_version_is_not_found() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;
    let (status, body) = call(
        &app,
        Method::GET,
        &format!("/conversations/{}/export", conversation_id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(
        body["detail"],
        format!("Conversation with ID {} has no PRD yet", conversation_id)
    );
}
