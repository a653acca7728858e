//! Server-side document export

use super::extract::{ApiPath, ApiQuery};
use crate::PrdServer;
use crate::error::{ApiError, DbContext};
use crate::models::ExportFormat;
use crate::prd::export;
use crate::validation;
use axum::extract::State;
use axum::http::header;
use axum::response::{IntoResponse, Response};
use chrono::{Local, NaiveDate};
use serde::Deserialize;
use std::sync::Arc;
use tracing::info;

#[derive(Debug, Default, Deserialize)]
pub struct ExportQuery {
    pub format: Option<ExportFormat>,
}

/// A rendered document ready to be downloaded
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RenderedExport {
    pub filename: String,
    pub content_type: &'static str,
    pub body: String,
}

impl IntoResponse for RenderedExport {
    fn into_response(self) -> Response {
        let disposition = format!("attachment; filename=\"{}\"", self.filename);
        (
            [
                (header::CONTENT_TYPE, self.content_type.to_string()),
                (header::CONTENT_DISPOSITION, disposition),
            ],
            self.body,
        )
            .into_response()
    }
}

impl PrdServer {
    /// Render the current version of a conversation's document and record the export
    ///
    /// # Arguments
    /// * `conversation_id` - Conversation whose current version is exported
    /// * `format` - Output format
    /// * `date` - Date used in the filename
    pub fn export_conversation(
        &self,
        conversation_id: i64,
        format: ExportFormat,
        date: NaiveDate,
    ) -> Result<RenderedExport, ApiError> {
        validation::ensure_positive_id(conversation_id, "Conversation")?;
        let db = self.db().db_context("Failed to export PRD")?;
        if !db
            .conversation_exists(conversation_id)
            .db_context("Failed to export PRD")?
        {
            return Err(ApiError::conversation_not_found(conversation_id));
        }
        let version = db
            .current_prd_version(conversation_id)
            .db_context("Failed to export PRD")?
            .ok_or_else(|| {
                ApiError::NotFound(format!(
                    "Conversation with ID {} has no PRD yet",
                    conversation_id
                ))
            })?;

        let document = &version.document;
        let body = match format {
            ExportFormat::Text => export::render_text(document),
            ExportFormat::Markdown => export::render_markdown(document),
            ExportFormat::Json => serde_json::to_string_pretty(document)
                .map_err(crate::storage::StoreError::from)
                .db_context("Failed to export PRD")?,
        };
        let filename = export::filename_with_extension(&document.title, date, format.extension());

        db.insert_export(conversation_id, version.id, format, &filename)
            .db_context("Failed to record export")?;
        info!(conversation_id, version = version.version_number, %format, "exported PRD");

        Ok(RenderedExport {
            filename,
            content_type: format.content_type(),
            body,
        })
    }
}

pub async fn export_conversation(
    State(server): State<Arc<PrdServer>>,
    ApiPath(id): ApiPath<i64>,
    ApiQuery(query): ApiQuery<ExportQuery>,
) -> Result<RenderedExport, ApiError> {
    let format = query.format.unwrap_or(ExportFormat::Text);
    server.export_conversation(id, format, Local::now().date_naive())
}
