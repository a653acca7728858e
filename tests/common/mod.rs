//! Common test utilities for integration tests
#![allow(dead_code)]

use async_trait::async_trait;
use axum::Router;
use axum::body::Body;
use axum::http::{Method, Request, StatusCode};
use prd_analyzer::llm::{CompletionRequest, LanguageModel, LlmError};
use prd_analyzer::pipeline::knowledge::KnowledgeBase;
use prd_analyzer::{Database, PipelineSettings, PrdPipeline, PrdServer, router};
use serde_json::{Value, json};
use std::collections::VecDeque;
use std::sync::{Arc, Mutex};
use tower::ServiceExt;

pub const ANALYSIS: &str = r#"{"product_type": "mobile app",
    "purpose": "help dog owners find walkers",
    "target_users": ["dog owners", "walkers"], "features": ["booking"],
    "technical_requirements": ["iOS"], "business_objectives": ["grow marketplace"]}"#;

pub const PRD: &str = r#"```json
{
  "title": "Dog Walker Finder",
  "overview": "A marketplace connecting dog owners with trusted local walkers.",
  "objectives": ["Onboard 500 walkers", "Reach 2k bookings per month"],
  "features": ["Walker search: filter by distance", "Booking: schedule walks"],
  "requirements": ["iOS and Android apps", "Payment processing"],
  "userStories": ["As an owner, I want to book a walk, so that my dog gets exercise"]
}
```"#;

pub const QUESTIONS: &str =
    r#"["How do you vet walkers?", "Do owners pay per walk or by subscription?"]"#;

/// Language model that replays queued answers and records every prompt
pub struct ScriptedModel {
    answers: Mutex<VecDeque<Result<String, LlmError>>>,
    pub requests: Mutex<Vec<CompletionRequest>>,
}

impl ScriptedModel {
    pub fn new(answers: Vec<Result<String, LlmError>>) -> Self {
        Self {
            answers: Mutex::new(answers.into()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Analysis, document and questions, all successful
    pub fn happy() -> Self {
        Self::new(vec![
            Ok(ANALYSIS.to_string()),
            Ok(PRD.to_string()),
            Ok(QUESTIONS.to_string()),
        ])
    }

    pub fn request_count(&self) -> usize {
        self.requests.lock().unwrap().len()
    }
}

#[async_trait]
impl LanguageModel for ScriptedModel {
    async fn complete(&self, request: CompletionRequest) -> Result<String, LlmError> {
        self.requests.lock().unwrap().push(request);
        self.answers
            .lock()
            .unwrap()
            .pop_front()
            .unwrap_or(Err(LlmError::EmptyResponse))
    }

    fn model_name(&self) -> &str {
        "scripted"
    }
}

pub fn pipeline_with(model: Arc<ScriptedModel>) -> PrdPipeline {
    PrdPipeline::new(
        model,
        KnowledgeBase::template(1000, 200),
        PipelineSettings::default(),
    )
}

/// Server over an in-memory database, with the pipeline disabled
pub fn test_server() -> Arc<PrdServer> {
    Arc::new(PrdServer::new(Database::open_in_memory().unwrap(), None))
}

/// Server whose pipeline answers from `model`
pub fn test_server_with_model(model: Arc<ScriptedModel>) -> Arc<PrdServer> {
    Arc::new(PrdServer::new(
        Database::open_in_memory().unwrap(),
        Some(pipeline_with(model)),
    ))
}

/// Send one request through the router and decode the JSON body (`Null` if empty)
pub async fn call(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Value) {
    let (status, bytes) = call_raw(app, method, uri, body).await;
    let value = if bytes.is_empty() {
        Value::Null
    } else {
        serde_json::from_slice(&bytes).unwrap()
    };
    (status, value)
}

/// Send one request and return the raw body bytes
pub async fn call_raw(
    app: &Router,
    method: Method,
    uri: &str,
    body: Option<Value>,
) -> (StatusCode, Vec<u8>) {
    let builder = Request::builder().method(method).uri(uri);
    let request = match body {
        Some(body) => builder
            .header("content-type", "application/json")
            .body(Body::from(body.to_string()))
            .unwrap(),
        None => builder.body(Body::empty()).unwrap(),
    };
    let response = app.clone().oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    (status, bytes.to_vec())
}

/// Router plus the id of a freshly created conversation
pub async fn app_with_conversation(server: Arc<PrdServer>) -> (Router, i64) {
    let app = router(server);
    let (status, body) = call(
        &app,
        Method::POST,
        "/conversations/",
        Some(json!({"title": "Test"})),
    )
    .await;
    assert_eq!(status, StatusCode::CREATED);
    let id = body["id"].as_i64().unwrap();
    (app, id)
}

/// A valid attachment body for `conversation_id`
pub fn attachment_body(conversation_id: i64) -> Value {
    json!({
        "conversation_id": conversation_id,
        "original_filename": "requirements.md",
        "file_type": "md",
        "file_size": 4096,
        "storage_path": "/uploads/requirements.md",
        "extracted_text": "Users need offline mode",
        "additional_metadata": "{\"pages\": 2}"
    })
}
