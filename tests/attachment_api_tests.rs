//! File attachment endpoint tests
mod common;

use axum::http::{Method, StatusCode};
use common::*;
use serde_json::json;

#[tokio::test]
async fn test_create_and_get_attachment() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;

    let (status, created) = call(
        &app,
        Method::POST,
        "/file-attachments/",
        Some(attachment_body(conversation_id)),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    assert_eq!(created["original_filename"], "requirements.md");
    assert_eq!(created["status"], "uploaded");
    assert_eq!(created["file_type"], "md");
    let id = created["id"].as_i64().unwrap();

    let (status, fetched) = call(
        &app,
        Method::GET,
        &format!("/file-attachments/{}", id),
        None,
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(fetched, created);
}

#[tokio::test]
async fn test_list_filters_by_conversation() {
    let (app, first) = app_with_conversation(test_server()).await;
    let (_, second) = call(&app, Method::POST, "/conversations/", Some(json!({}))).await;
    let second = second["id"].as_i64().unwrap();

    call(&app, Method::POST, "/file-attachments/", Some(attachment_body(first))).await;
    call(&app, Method::POST, "/file-attachments", Some(attachment_body(second))).await;

    let (status, all) = call(&app, Method::GET, "/file-attachments/", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(all.as_array().unwrap().len(), 2);

    let (_, filtered) = call(
        &app,
        Method::GET,
        &format!("/file-attachments/?conversation_id={}", second),
        None,
    )
    .await;
    let filtered = filtered.as_array().unwrap();
    assert_eq!(filtered.len(), 1);
    assert_eq!(filtered[0]["conversation_id"], second);

    let (status, body) = call(
        &app,
        Method::GET,
        "/file-attachments/?conversation_id=0",
        None,
    )
    .await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_invalid_ids_and_missing_records() {
    let app = prd_analyzer::router(test_server());

    let (status, body) = call(&app, Method::GET, "/file-attachments/0", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File ID must be a positive integer");

    let (status, body) = call(&app, Method::GET, "/file-attachments/-5", None).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "File ID must be a positive integer");

    let (status, body) = call(&app, Method::GET, "/file-attachments/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "File attachment with ID 99 not found");

    let (status, _) = call(&app, Method::DELETE, "/file-attachments/99", None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_validation_errors() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;

    let mut too_big = attachment_body(conversation_id);
    too_big["file_size"] = json!(50 * 1024 * 1024 + 1);
    let (status, body) = call(&app, Method::POST, "/file-attachments/", Some(too_big)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);
    assert!(body["detail"].as_str().unwrap().contains("50MB"));

    let mut bad_type = attachment_body(conversation_id);
    bad_type["file_type"] = json!("pdf");
    let (status, _) = call(&app, Method::POST, "/file-attachments/", Some(bad_type)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let mut long_name = attachment_body(conversation_id);
    long_name["original_filename"] = json!("a".repeat(256));
    let (status, _) = call(&app, Method::POST, "/file-attachments/", Some(long_name)).await;
    assert_eq!(status, StatusCode::UNPROCESSABLE_ENTITY);

    let (status, body) = call(
        &app,
        Method::POST,
        "/file-attachments/",
        Some(attachment_body(777)),
    )
    .await;
    assert_eq!(status, StatusCode::NOT_FOUND);
    assert_eq!(body["detail"], "Conversation with ID 777 not found");
}

#[tokio::test]
async fn test_put_replaces_record() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;
    let (_, created) = call(
        &app,
        Method::POST,
        "/file-attachments/",
        Some(attachment_body(conversation_id)),
    )
    .await;
    let id = created["id"].as_i64().unwrap();

    let replacement = json!({
        "conversation_id": conversation_id,
        "original_filename": "brief.docx",
        "file_type": "docx",
        "file_size": 1,
        "storage_path": "/uploads/brief.docx"
    });
    let (status, updated) = call(
        &app,
        Method::PUT,
        &format!("/file-attachments/{}", id),
        Some(replacement),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["original_filename"], "brief.docx");
    assert_eq!(updated["extracted_text"], json!(null));
    assert_eq!(updated["status"], "uploaded");
    assert_eq!(updated["created_at"], created["created_at"]);
}

#[tokio::test]
async fn test_patch_updates_only_given_fields() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;
    let (_, created) = call(
        &app,
        Method::POST,
        "/file-attachments/",
        Some(attachment_body(conversation_id)),
    )
    .await;
    let uri = format!("/file-attachments/{}", created["id"]);

    let (status, updated) = call(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({"status": "processed"})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(updated["status"], "processed");
    assert_eq!(updated["extracted_text"], created["extracted_text"]);

    let (status, cleared) = call(
        &app,
        Method::PATCH,
        &uri,
        Some(json!({"additional_metadata": null})),
    )
    .await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(cleared["additional_metadata"], json!(null));
    assert_eq!(cleared["status"], "processed");

    let (status, body) = call(&app, Method::PATCH, &uri, Some(json!({}))).await;
    assert_eq!(status, StatusCode::BAD_REQUEST);
    assert_eq!(body["detail"], "No fields provided for update");

    let (status, _) = call(&app, Method::PATCH, "/file-attachments/4242", Some(json!({}))).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_delete_returns_no_content() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;
    let (_, created) = call(
        &app,
        Method::POST,
        "/file-attachments/",
        Some(attachment_body(conversation_id)),
    )
    .await;
    let uri = format!("/file-attachments/{}", created["id"]);

    let (status, body) = call(&app, Method::DELETE, &uri, None).await;
    assert_eq!(status, StatusCode::NO_CONTENT);
    assert_eq!(body, serde_json::Value::Null);

    let (status, _) = call(&app, Method::GET, &uri, None).await;
    assert_eq!(status, StatusCode::NOT_FOUND);
}

#[tokio::test]
async fn test_malformed_json_is_rejected_with_detail() {
    let app = prd_analyzer::router(test_server());
    let request = axum::http::Request::builder()
        .method(Method::POST)
        .uri("/file-attachments/")
        .header("content-type", "application/json")
        .body(axum::body::Body::from("{not json"))
        .unwrap();
    let response = tower::ServiceExt::oneshot(app, request).await.unwrap();
    assert_eq!(response.status(), StatusCode::BAD_REQUEST);
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX).await.unwrap();
    let body: serde_json::Value = serde_json::from_slice(&bytes).unwrap();
    assert!(body["detail"].is_string());
}

#[tokio::test]
async fn test_health_counts_attachments() {
    let (app, conversation_id) = app_with_conversation(test_server()).await;
    call(&app, Method::POST, "/file-attachments/", Some(attachment_body(conversation_id))).await;

    let (status, body) = call(&app, Method::GET, "/health", None).await;
    assert_eq!(status, StatusCode::OK);
    assert_eq!(body["status"], "healthy");
    assert_eq!(body["database"]["connected"], true);
    assert_eq!(body["database"]["file_attachments_count"], 1);
}
