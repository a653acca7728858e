//! PRD Analyzer Library
//!
//! Turns free-text product ideas into structured product requirements
//! documents (PRDs). A REST service runs each message through a
//! language-model pipeline and stores conversations, document versions and
//! file attachments in SQLite; a chat client keeps the live document on the
//! user's side.
//!
//! # Architecture
//!
//! - **HTTP Layer**: `PrdServer` and the `handlers` module - axum routes and request validation
//! - **Domain Layer**: `prd`, `pipeline` and `llm` - document model, generation workflow and
//!   model client
//! - **Persistence Layer**: `storage` module - rusqlite database
//! - **Client Layer**: `session` and `client` - chat state holder and HTTP backend
//!
//! # Example
//!
//! ```no_run
//! use prd_analyzer::{AppConfig, serve};
//! use anyhow::Result;
//!
//! #[tokio::main]
//! async fn main() -> Result<()> {
//!     serve(AppConfig::load(None)?).await
//! }
//! ```

pub mod client;
pub mod config;
pub mod error;
pub mod formatting;
mod handlers;
pub mod llm;
pub mod models;
pub mod pipeline;
pub mod prd;
pub mod protocol;
pub mod session;
pub mod storage;
pub mod validation;

use anyhow::{Context, Result};
use std::sync::{Arc, Mutex, MutexGuard};
use tracing::{info, warn};

pub use config::AppConfig;
pub use handlers::export::RenderedExport;
pub use handlers::router;
pub use pipeline::{PipelineSettings, PrdPipeline};
pub use storage::{Database, StoreError};

/// Shared state behind every route
///
/// The pipeline is optional: without an API key the service still serves
/// attachments and conversations but answers `process-prd` with 503.
pub struct PrdServer {
    pub(crate) db: Mutex<Database>,
    pub(crate) pipeline: Option<PrdPipeline>,
}

impl PrdServer {
    pub fn new(db: Database, pipeline: Option<PrdPipeline>) -> Self {
        Self {
            db: Mutex::new(db),
            pipeline,
        }
    }

    /// Open the configured database and build the pipeline if a key is set
    ///
    /// # Arguments
    /// * `config` - Fully resolved configuration
    ///
    /// # Returns
    /// Result containing the server state or an error
    pub async fn from_config(config: &AppConfig) -> Result<Self> {
        let db = Database::open(&config.database.path).with_context(|| {
            format!(
                "Failed to open database {}",
                config.database.path.display()
            )
        })?;

        let pipeline = match config.llm.api_key.as_deref() {
            Some(key) if !key.trim().is_empty() => {
                let model = llm::OpenAiClient::new(&config.llm, key)
                    .context("Failed to build language model client")?;
                let mut knowledge = pipeline::knowledge::KnowledgeBase::load(
                    &config.knowledge.artifact_paths,
                    config.knowledge.chunk_size,
                    config.knowledge.chunk_overlap,
                );
                if let Err(e) = knowledge.index(&model).await {
                    warn!(error = %e, "could not embed knowledge base, using keyword ranking");
                }
                info!(
                    model = %config.llm.model,
                    chunks = knowledge.len(),
                    embedded = knowledge.is_indexed(),
                    "PRD pipeline ready"
                );
                Some(PrdPipeline::new(
                    Arc::new(model),
                    knowledge,
                    PipelineSettings::from_config(config),
                ))
            }
            _ => {
                warn!("no API key configured; PRD processing is disabled");
                None
            }
        };

        Ok(Self::new(db, pipeline))
    }

    pub fn rag_available(&self) -> bool {
        self.pipeline.is_some()
    }

    pub(crate) fn db(&self) -> Result<MutexGuard<'_, Database>, StoreError> {
        self.db.lock().map_err(|_| StoreError::Poisoned)
    }
}

/// Run the REST service until Ctrl-C
pub async fn serve(config: AppConfig) -> Result<()> {
    let server = Arc::new(PrdServer::from_config(&config).await?);
    let address = config.bind_address();
    let listener = tokio::net::TcpListener::bind(&address)
        .await
        .with_context(|| format!("Failed to bind {}", address))?;
    info!(%address, database = %config.database.path.display(), "PRD analyzer listening");

    axum::serve(listener, router(server))
        .with_graceful_shutdown(async {
            if let Err(e) = tokio::signal::ctrl_c().await {
                warn!(error = %e, "failed to listen for shutdown signal");
            }
            info!("shutting down");
        })
        .await
        .context("Server error")?;
    Ok(())
}
