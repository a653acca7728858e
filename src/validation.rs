//! Request validation for the REST service
//!
//! Field rules for attachments and PRD requests. Every check returns an
//! [`ApiError`] carrying the message sent back to the client.

use crate::error::ApiError;
use crate::models::{AttachmentPatch, NewAttachment};
use crate::protocol::PrdRequest;

/// Largest accepted attachment, in bytes (50MB)
pub const MAX_FILE_SIZE: i64 = 50 * 1024 * 1024;

/// Longest accepted original filename, in characters
pub const MAX_FILENAME_CHARS: usize = 255;

/// Longest accepted product description, in characters
pub const MAX_USER_INPUT_CHARS: usize = 5000;

/// Reject non-positive path ids with a 400
///
/// # Arguments
/// * `id` - The id taken from the request path
/// * `entity` - Entity name used in the message (e.g. "File")
pub fn ensure_positive_id(id: i64, entity: &str) -> Result<(), ApiError> {
    if id < 1 {
        return Err(ApiError::BadRequest(format!(
            "{} ID must be a positive integer",
            entity
        )));
    }
    Ok(())
}

/// Validate the optional `conversation_id` list filter
pub fn validate_conversation_filter(conversation_id: Option<i64>) -> Result<(), ApiError> {
    match conversation_id {
        Some(id) if id < 1 => Err(ApiError::Validation(
            "conversation_id must be greater than or equal to 1".to_string(),
        )),
        _ => Ok(()),
    }
}

fn check_conversation_id(id: i64) -> Result<(), ApiError> {
    if id < 1 {
        return Err(ApiError::Validation(
            "conversation_id must be greater than 0".to_string(),
        ));
    }
    Ok(())
}

fn check_filename(name: &str) -> Result<(), ApiError> {
    let chars = name.chars().count();
    if chars == 0 {
        return Err(ApiError::Validation(
            "original_filename must not be empty".to_string(),
        ));
    }
    if chars > MAX_FILENAME_CHARS {
        return Err(ApiError::Validation(format!(
            "original_filename must be at most {} characters",
            MAX_FILENAME_CHARS
        )));
    }
    Ok(())
}

fn check_file_size(size: i64) -> Result<(), ApiError> {
    if size < 1 {
        return Err(ApiError::Validation(
            "File size must be at least 1 byte".to_string(),
        ));
    }
    if size > MAX_FILE_SIZE {
        return Err(ApiError::Validation(format!(
            "File size must not exceed {} bytes ({}MB)",
            MAX_FILE_SIZE,
            MAX_FILE_SIZE / (1024 * 1024)
        )));
    }
    Ok(())
}

fn check_storage_path(path: &str) -> Result<(), ApiError> {
    if path.is_empty() {
        return Err(ApiError::Validation(
            "storage_path must not be empty".to_string(),
        ));
    }
    Ok(())
}

/// Validate a create or full-update body
pub fn validate_new_attachment(input: &NewAttachment) -> Result<(), ApiError> {
    check_conversation_id(input.conversation_id)?;
    check_filename(&input.original_filename)?;
    check_file_size(input.file_size)?;
    check_storage_path(&input.storage_path)
}

/// Validate the fields present in a partial update
pub fn validate_patch(patch: &AttachmentPatch) -> Result<(), ApiError> {
    if let Some(id) = patch.conversation_id {
        check_conversation_id(id)?;
    }
    if let Some(ref name) = patch.original_filename {
        check_filename(name)?;
    }
    if let Some(size) = patch.file_size {
        check_file_size(size)?;
    }
    if let Some(ref path) = patch.storage_path {
        check_storage_path(path)?;
    }
    Ok(())
}

/// Reject a partial update that carries no fields with a 400
pub fn ensure_patch_not_empty(patch: &AttachmentPatch) -> Result<(), ApiError> {
    if patch.is_empty() {
        return Err(ApiError::BadRequest(
            "No fields provided for update".to_string(),
        ));
    }
    Ok(())
}

pub fn validate_prd_request(request: &PrdRequest) -> Result<(), ApiError> {
    let chars = request.user_input.chars().count();
    if chars == 0 {
        return Err(ApiError::Validation(
            "user_input must not be empty".to_string(),
        ));
    }
    if chars > MAX_USER_INPUT_CHARS {
        return Err(ApiError::Validation(format!(
            "user_input must be at most {} characters",
            MAX_USER_INPUT_CHARS
        )));
    }
    if let Some(id) = request.conversation_id {
        check_conversation_id(id)?;
    }
    Ok(())
}
