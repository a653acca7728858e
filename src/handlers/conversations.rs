//! Conversation endpoints and their stored history

use super::extract::{ApiJson, ApiPath};
use crate::PrdServer;
use crate::error::{ApiError, DbContext};
use crate::models::{
    ClarifyingQuestion, Conversation, Message, NewConversation, PrdChange, PrdVersion,
};
use crate::storage::Database;
use crate::validation;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use std::sync::Arc;

/// Fail with 404 unless the conversation exists
fn require_conversation(db: &Database, id: i64) -> Result<(), ApiError> {
    if !db
        .conversation_exists(id)
        .db_context("Failed to retrieve conversation")?
    {
        return Err(ApiError::conversation_not_found(id));
    }
    Ok(())
}

impl PrdServer {
    pub fn create_conversation(&self, input: &NewConversation) -> Result<Conversation, ApiError> {
        self.db()
            .and_then(|db| db.create_conversation(input))
            .db_context("Failed to create conversation")
    }

    pub fn list_conversations(&self) -> Result<Vec<Conversation>, ApiError> {
        self.db()
            .and_then(|db| db.list_conversations())
            .db_context("Failed to retrieve conversations")
    }

    pub fn get_conversation(&self, id: i64) -> Result<Conversation, ApiError> {
        validation::ensure_positive_id(id, "Conversation")?;
        self.db()
            .and_then(|db| db.get_conversation(id))
            .db_context("Failed to retrieve conversation")?
            .ok_or_else(|| ApiError::conversation_not_found(id))
    }

    /// Delete a conversation with its messages, versions and attachments
    pub fn delete_conversation(&self, id: i64) -> Result<(), ApiError> {
        validation::ensure_positive_id(id, "Conversation")?;
        let removed = self
            .db()
            .and_then(|db| db.delete_conversation(id))
            .db_context("Failed to delete conversation")?;
        if !removed {
            return Err(ApiError::conversation_not_found(id));
        }
        Ok(())
    }

    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<Message>, ApiError> {
        validation::ensure_positive_id(conversation_id, "Conversation")?;
        let db = self.db().db_context("Failed to retrieve messages")?;
        require_conversation(&db, conversation_id)?;
        db.list_messages(conversation_id)
            .db_context("Failed to retrieve messages")
    }

    pub fn list_prd_versions(&self, conversation_id: i64) -> Result<Vec<PrdVersion>, ApiError> {
        validation::ensure_positive_id(conversation_id, "Conversation")?;
        let db = self.db().db_context("Failed to retrieve PRD versions")?;
        require_conversation(&db, conversation_id)?;
        db.list_prd_versions(conversation_id)
            .db_context("Failed to retrieve PRD versions")
    }

    pub fn list_prd_changes(&self, version_id: i64) -> Result<Vec<PrdChange>, ApiError> {
        validation::ensure_positive_id(version_id, "PRD version")?;
        let db = self.db().db_context("Failed to retrieve PRD changes")?;
        if db
            .get_prd_version(version_id)
            .db_context("Failed to retrieve PRD changes")?
            .is_none()
        {
            return Err(ApiError::NotFound(format!(
                "PRD version with ID {} not found",
                version_id
            )));
        }
        db.list_prd_changes(version_id)
            .db_context("Failed to retrieve PRD changes")
    }

    pub fn list_questions(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<ClarifyingQuestion>, ApiError> {
        validation::ensure_positive_id(conversation_id, "Conversation")?;
        let db = self.db().db_context("Failed to retrieve clarifying questions")?;
        require_conversation(&db, conversation_id)?;
        db.list_questions(conversation_id)
            .db_context("Failed to retrieve clarifying questions")
    }
}

pub async fn create(
    State(server): State<Arc<PrdServer>>,
    ApiJson(input): ApiJson<NewConversation>,
) -> Result<(StatusCode, Json<Conversation>), ApiError> {
    Ok((StatusCode::CREATED, Json(server.create_conversation(&input)?)))
}

pub async fn list(
    State(server): State<Arc<PrdServer>>,
) -> Result<Json<Vec<Conversation>>, ApiError> {
    Ok(Json(server.list_conversations()?))
}

pub async fn get(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Conversation>, ApiError> {
    Ok(Json(server.get_conversation(id)?))
}

pub async fn delete(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    server.delete_conversation(id)?;
    Ok(StatusCode::NO_CONTENT)
}

pub async fn messages(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<Message>>, ApiError> {
    Ok(Json(server.list_messages(id)?))
}

pub async fn prd_versions(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<PrdVersion>>, ApiError> {
    Ok(Json(server.list_prd_versions(id)?))
}

pub async fn prd_changes(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<PrdChange>>, ApiError> {
    Ok(Json(server.list_prd_changes(id)?))
}

pub async fn clarifying_questions(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<Vec<ClarifyingQuestion>>, ApiError> {
    Ok(Json(server.list_questions(id)?))
}
