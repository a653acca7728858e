//! File attachment CRUD endpoints

use super::extract::{ApiJson, ApiPath, ApiQuery};
use crate::PrdServer;
use crate::error::{ApiError, DbContext};
use crate::models::{AttachmentPatch, FileAttachment, NewAttachment};
use crate::validation;
use axum::Json;
use axum::extract::State;
use axum::http::StatusCode;
use serde::Deserialize;
use std::sync::Arc;

#[derive(Debug, Default, Deserialize)]
pub struct ListQuery {
    pub conversation_id: Option<i64>,
}

fn not_found(id: i64) -> ApiError {
    ApiError::NotFound(format!("File attachment with ID {} not found", id))
}

impl PrdServer {
    pub fn create_attachment(&self, input: &NewAttachment) -> Result<FileAttachment, ApiError> {
        validation::validate_new_attachment(input)?;
        let db = self.db().db_context("Failed to create file attachment")?;
        if !db
            .conversation_exists(input.conversation_id)
            .db_context("Failed to create file attachment")?
        {
            return Err(ApiError::conversation_not_found(input.conversation_id));
        }
        db.insert_attachment(input)
            .db_context("Failed to create file attachment")
    }

    /// List attachments, optionally for one conversation
    pub fn list_attachments(
        &self,
        conversation_id: Option<i64>,
    ) -> Result<Vec<FileAttachment>, ApiError> {
        validation::validate_conversation_filter(conversation_id)?;
        self.db()
            .and_then(|db| db.list_attachments(conversation_id))
            .db_context("Failed to retrieve file attachments")
    }

    pub fn get_attachment(&self, id: i64) -> Result<FileAttachment, ApiError> {
        validation::ensure_positive_id(id, "File")?;
        self.db()
            .and_then(|db| db.get_attachment(id))
            .db_context("Failed to retrieve file attachment")?
            .ok_or_else(|| not_found(id))
    }

    /// Replace every client-owned field of an attachment
    pub fn replace_attachment(
        &self,
        id: i64,
        input: &NewAttachment,
    ) -> Result<FileAttachment, ApiError> {
        validation::validate_new_attachment(input)?;
        validation::ensure_positive_id(id, "File")?;
        let db = self.db().db_context("Failed to update file attachment")?;
        if db
            .get_attachment(id)
            .db_context("Failed to update file attachment")?
            .is_none()
        {
            return Err(not_found(id));
        }
        if !db
            .conversation_exists(input.conversation_id)
            .db_context("Failed to update file attachment")?
        {
            return Err(ApiError::conversation_not_found(input.conversation_id));
        }
        db.replace_attachment(id, input)
            .db_context("Failed to update file attachment")?
            .ok_or_else(|| not_found(id))
    }

    /// Apply only the fields present in `patch`
    pub fn patch_attachment(
        &self,
        id: i64,
        patch: &AttachmentPatch,
    ) -> Result<FileAttachment, ApiError> {
        validation::validate_patch(patch)?;
        validation::ensure_positive_id(id, "File")?;
        let db = self.db().db_context("Failed to update file attachment")?;
        if db
            .get_attachment(id)
            .db_context("Failed to update file attachment")?
            .is_none()
        {
            return Err(not_found(id));
        }
        validation::ensure_patch_not_empty(patch)?;
        if let Some(conversation_id) = patch.conversation_id
            && !db
                .conversation_exists(conversation_id)
                .db_context("Failed to update file attachment")?
        {
            return Err(ApiError::conversation_not_found(conversation_id));
        }
        db.patch_attachment(id, patch)
            .db_context("Failed to update file attachment")?
            .ok_or_else(|| not_found(id))
    }

    pub fn delete_attachment(&self, id: i64) -> Result<(), ApiError> {
        validation::ensure_positive_id(id, "File")?;
        let removed = self
            .db()
            .and_then(|db| db.delete_attachment(id))
            .db_context("Failed to delete file attachment")?;
        if !removed {
            return Err(not_found(id));
        }
        Ok(())
    }
}

pub async fn create(
    State(server): State<Arc<PrdServer>>,
    ApiJson(input): ApiJson<NewAttachment>,
) -> Result<(StatusCode, Json<FileAttachment>), ApiError> {
    let attachment = server.create_attachment(&input)?;
    Ok((StatusCode::CREATED, Json(attachment)))
}

pub async fn list(
    State(server): State<Arc<PrdServer>>,
    ApiQuery(query): ApiQuery<ListQuery>,
) -> Result<Json<Vec<FileAttachment>>, ApiError> {
    Ok(Json(server.list_attachments(query.conversation_id)?))
}

pub async fn get(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<Json<FileAttachment>, ApiError> {
    Ok(Json(server.get_attachment(id)?))
}

pub async fn replace(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(input): ApiJson<NewAttachment>,
) -> Result<Json<FileAttachment>, ApiError> {
    Ok(Json(server.replace_attachment(id, &input)?))
}

pub async fn patch(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
    ApiJson(patch): ApiJson<AttachmentPatch>,
) -> Result<Json<FileAttachment>, ApiError> {
    Ok(Json(server.patch_attachment(id, &patch)?))
}

pub async fn delete(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
) -> Result<StatusCode, ApiError> {
    server.delete_attachment(id)?;
    Ok(StatusCode::NO_CONTENT)
}
