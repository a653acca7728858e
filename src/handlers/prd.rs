//! PRD processing endpoints

use super::extract::ApiJson;
use crate::PrdServer;
use crate::error::{ApiError, DbContext};
use crate::models::{MessageStatus, Sender};
use crate::pipeline::PipelineOutcome;
use crate::prd::{HistoryEntry, PrdDocument, Role};
use crate::protocol::{PrdRequest, PrdResponse, RagStatus};
use crate::validation;
use axum::Json;
use axum::extract::State;
use std::sync::Arc;
use tracing::info;

const RAG_UNAVAILABLE: &str = "RAG system is not available. Please check server configuration.";

impl PrdServer {
    /// Run the generation pipeline for one user message
    ///
    /// When `conversation_id` is set the user message, the reply, the new
    /// version and its clarifying questions are stored under it. An empty
    /// `conversation_history` is then rebuilt from the stored transcript.
    ///
    /// # Returns
    /// The pipeline result; a pipeline failure is a `success: false`
    /// response, not an error
    pub async fn process_prd(&self, mut request: PrdRequest) -> Result<PrdResponse, ApiError> {
        validation::validate_prd_request(&request)?;
        let Some(pipeline) = self.pipeline.as_ref() else {
            return Err(ApiError::Unavailable(RAG_UNAVAILABLE.to_string()));
        };

        if let Some(conversation_id) = request.conversation_id {
            let history = self.record_user_message(conversation_id, &request.user_input)?;
            if request.conversation_history.is_empty() {
                request.conversation_history = history;
            }
        }

        let outcome = pipeline
            .run(&request.user_input, &request.conversation_history)
            .await;

        let prd_version_id = match request.conversation_id {
            Some(conversation_id) => self.record_outcome(conversation_id, &outcome)?,
            None => None,
        };

        let mut response = PrdResponse::from_outcome(outcome);
        response.conversation_id = request.conversation_id;
        response.prd_version_id = prd_version_id;
        Ok(response)
    }

    /// Store the user message and let it answer pending questions
    ///
    /// # Returns
    /// The transcript before this message, in history form
    fn record_user_message(
        &self,
        conversation_id: i64,
        user_input: &str,
    ) -> Result<Vec<HistoryEntry>, ApiError> {
        let db = self.db().db_context("Failed to store message")?;
        if !db
            .conversation_exists(conversation_id)
            .db_context("Failed to load conversation")?
        {
            return Err(ApiError::conversation_not_found(conversation_id));
        }

        let history = db
            .list_messages(conversation_id)
            .db_context("Failed to load messages")?
            .into_iter()
            .map(|message| HistoryEntry {
                role: match message.sender {
                    Sender::User => Role::User.as_str().to_string(),
                    Sender::Ai => Role::Assistant.as_str().to_string(),
                },
                content: message.content,
            })
            .collect();

        let message = db
            .insert_message(conversation_id, Sender::User, user_input, MessageStatus::Delivered)
            .db_context("Failed to store message")?;
        db.answer_pending_questions(conversation_id, message.id, user_input)
            .db_context("Failed to update clarifying questions")?;
        Ok(history)
    }

    /// Store the reply, the merged document version and the new questions
    ///
    /// # Returns
    /// The id of the new version, or `None` when the pipeline failed
    fn record_outcome(
        &self,
        conversation_id: i64,
        outcome: &PipelineOutcome,
    ) -> Result<Option<i64>, ApiError> {
        let db = self.db().db_context("Failed to store PRD")?;

        let Some(generated) = outcome.document.clone().filter(|_| outcome.success()) else {
            db.insert_message(
                conversation_id,
                Sender::Ai,
                &outcome.error_message,
                MessageStatus::Failed,
            )
            .db_context("Failed to store message")?;
            return Ok(None);
        };

        let current = db
            .current_prd_version(conversation_id)
            .db_context("Failed to load PRD version")?;
        let is_first = current.is_none();
        let mut document = current.map(|v| v.document).unwrap_or_default();
        let appended = document.merge(generated);

        let change_summary = if is_first {
            "Initial draft".to_string()
        } else {
            format!("Added {} item(s)", appended)
        };
        let recorded = db
            .record_exchange(
                conversation_id,
                &reply_text(&document, &outcome.questions),
                &document,
                Some(change_summary),
                &outcome.questions,
            )
            .db_context("Failed to store PRD version")?;
        let version = recorded.version;

        info!(
            conversation_id,
            version = version.version_number,
            appended,
            questions = outcome.questions.len(),
            "stored PRD version"
        );
        Ok(Some(version.id))
    }
}

/// Assistant message stored for a successful exchange
fn reply_text(document: &PrdDocument, questions: &[String]) -> String {
    let mut text = format!("Updated PRD: {}", document.title);
    for (index, question) in questions.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", index + 1, question));
    }
    text
}

pub async fn process_prd(
    State(server): State<Arc<PrdServer>>,
    ApiJson(request): ApiJson<PrdRequest>,
) -> Result<Json<PrdResponse>, ApiError> {
    Ok(Json(server.process_prd(request).await?))
}

pub async fn rag_status(State(server): State<Arc<PrdServer>>) -> Json<RagStatus> {
    Json(RagStatus::new(server.rag_available()))
}
