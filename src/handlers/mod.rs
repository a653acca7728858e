//! REST handlers for the PRD service
//!
//! Each file adds service methods to [`PrdServer`](crate::PrdServer) and
//! exposes thin axum adapters over them:
//! - `root`: service information and health
//! - `prd`: PRD processing and pipeline status
//! - `attachments`: file attachment CRUD
//! - `conversations`: conversations, messages, versions and questions
//! - `export`: document download

pub mod attachments;
pub mod conversations;
pub mod export;
mod extract;
pub mod prd;
pub mod root;

use crate::PrdServer;
use axum::Router;
use axum::routing::get;
use std::sync::Arc;
use tower_http::cors::CorsLayer;
use tower_http::trace::TraceLayer;

/// Build the application router with permissive CORS and request tracing
pub fn router(server: Arc<PrdServer>) -> Router {
    Router::new()
        .route("/", get(root::root))
        .route("/health", get(root::health))
        .route("/api/process-prd", axum::routing::post(prd::process_prd))
        .route("/api/rag-status", get(prd::rag_status))
        .route(
            "/file-attachments",
            get(attachments::list).post(attachments::create),
        )
        .route(
            "/file-attachments/",
            get(attachments::list).post(attachments::create),
        )
        .route(
            "/file-attachments/:id",
            get(attachments::get)
                .put(attachments::replace)
                .patch(attachments::patch)
                .delete(attachments::delete),
        )
        .route(
            "/conversations",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/",
            get(conversations::list).post(conversations::create),
        )
        .route(
            "/conversations/:id",
            get(conversations::get).delete(conversations::delete),
        )
        .route("/conversations/:id/messages", get(conversations::messages))
        .route(
            "/conversations/:id/prd-versions",
            get(conversations::prd_versions),
        )
        .route(
            "/conversations/:id/clarifying-questions",
            get(conversations::clarifying_questions),
        )
        .route(
            "/conversations/:id/export",
            get(export::export_conversation),
        )
        .route("/prd-versions/:id/changes", get(conversations::prd_changes))
        .layer(TraceLayer::new_for_http())
        .layer(CorsLayer::permissive())
        .with_state(server)
}
