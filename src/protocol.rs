//! Wire types of the PRD processing endpoints
//!
//! Shared by the server handlers and the chat client.

use crate::pipeline::{PipelineOutcome, ProcessingStage};
use crate::prd::{HistoryEntry, PrdDocument};
use serde::{Deserialize, Deserializer, Serialize};
use serde_json::Value;

/// Body of `POST /api/process-prd`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdRequest {
    pub user_input: String,
    #[serde(default, deserialize_with = "null_as_empty")]
    pub conversation_history: Vec<HistoryEntry>,
    /// When set, the exchange is stored under this conversation
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
}

impl PrdRequest {
    pub fn new(user_input: impl Into<String>) -> Self {
        Self {
            user_input: user_input.into(),
            conversation_history: Vec::new(),
            conversation_id: None,
        }
    }
}

fn null_as_empty<'de, D>(deserializer: D) -> Result<Vec<HistoryEntry>, D::Error>
where
    D: Deserializer<'de>,
{
    Ok(Option::<Vec<HistoryEntry>>::deserialize(deserializer)?.unwrap_or_default())
}

/// Body returned by `POST /api/process-prd`
///
/// `prd_content` is `{}` when no document was generated.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdResponse {
    pub success: bool,
    #[serde(default)]
    pub prd_content: Value,
    #[serde(default)]
    pub clarifying_questions: Vec<String>,
    #[serde(default)]
    pub analysis: Value,
    #[serde(default)]
    pub error_message: String,
    pub processing_stage: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prd_version_id: Option<i64>,
}

impl PrdResponse {
    pub fn from_outcome(outcome: PipelineOutcome) -> Self {
        let success = outcome.success();
        let prd_content = match outcome.document {
            Some(ref document) => serde_json::to_value(document).unwrap_or_else(|_| empty_object()),
            None => empty_object(),
        };
        Self {
            success,
            prd_content,
            clarifying_questions: outcome.questions,
            analysis: outcome.analysis,
            error_message: outcome.error_message,
            processing_stage: outcome.stage.to_string(),
            conversation_id: None,
            prd_version_id: None,
        }
    }

    /// Response for a request that failed outside the pipeline steps
    pub fn failure(message: impl Into<String>) -> Self {
        Self {
            success: false,
            prd_content: empty_object(),
            clarifying_questions: Vec::new(),
            analysis: empty_object(),
            error_message: message.into(),
            processing_stage: ProcessingStage::Error.to_string(),
            conversation_id: None,
            prd_version_id: None,
        }
    }

    /// Decode `prd_content` leniently; missing or malformed fields are left empty
    pub fn document(&self) -> PrdDocument {
        PrdDocument::from_payload(&self.prd_content)
    }
}

fn empty_object() -> Value {
    Value::Object(Default::default())
}

/// Body returned by `GET /api/rag-status`
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RagStatus {
    pub rag_available: bool,
    pub status: String,
    pub message: String,
}

impl RagStatus {
    pub fn new(available: bool) -> Self {
        if available {
            Self {
                rag_available: true,
                status: "ready".to_string(),
                message: "RAG system is ready for PRD processing".to_string(),
            }
        } else {
            Self {
                rag_available: false,
                status: "unavailable".to_string(),
                message: "RAG system dependencies not found".to_string(),
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_request_history_defaults() {
        let request: PrdRequest = serde_json::from_str(r#"{"user_input": "x"}"#).unwrap();
        assert!(request.conversation_history.is_empty());

        let request: PrdRequest =
            serde_json::from_str(r#"{"user_input": "x", "conversation_history": null}"#).unwrap();
        assert!(request.conversation_history.is_empty());
        assert_eq!(request.conversation_id, None);
    }

    #[test]
    fn test_response_document_is_lenient() {
        let response: PrdResponse = serde_json::from_value(json!({
            "success": true,
            "prd_content": {"objectives": ["Reach 500 clinics"]},
            "processing_stage": "generated"
        }))
        .unwrap();
        let document = response.document();
        assert_eq!(document.objectives, vec!["Reach 500 clinics"]);
        assert!(document.title.is_empty());
        assert!(response.clarifying_questions.is_empty());

        let response = PrdResponse {
            prd_content: json!({"title": null, "features": {"bad": true}, "objectives": ["A"]}),
            ..response
        };
        let document = response.document();
        assert_eq!(document.objectives, vec!["A"]);
        assert!(document.features.is_empty());
    }

    #[test]
    fn test_failure_shape() {
        let response = PrdResponse::failure("Processing failed: boom");
        let value = serde_json::to_value(&response).unwrap();
        assert_eq!(value["success"], false);
        assert_eq!(value["prd_content"], json!({}));
        assert_eq!(value["processing_stage"], "error");
        assert!(value.get("conversation_id").is_none());
    }
}
