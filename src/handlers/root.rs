//! Service information and health check

use crate::PrdServer;
use axum::Json;
use axum::extract::State;
use chrono::Local;
use serde_json::{Value, json};
use std::sync::Arc;

pub const SERVICE_NAME: &str = "AI-Powered Requirement Analyzer API";

impl PrdServer {
    /// Name, version and the main endpoints
    pub fn service_info(&self) -> Value {
        json!({
            "name": SERVICE_NAME,
            "version": env!("CARGO_PKG_VERSION"),
            "status": "running",
            "endpoints": {
                "health": "/health",
                "process_prd": "/api/process-prd",
                "rag_status": "/api/rag-status",
                "file_attachments": "/file-attachments/",
                "conversations": "/conversations/"
            }
        })
    }

    /// Check the database by counting attachments
    ///
    /// Never fails; a broken database is reported as `unhealthy`.
    pub fn health(&self) -> Value {
        let timestamp = Local::now().naive_local().to_string();
        let count = self.db().and_then(|db| {
            db.ping()?;
            db.count_attachments()
        });
        match count {
            Ok(count) => json!({
                "status": "healthy",
                "timestamp": timestamp,
                "database": {
                    "type": "sqlite",
                    "connected": true,
                    "file_attachments_count": count
                }
            }),
            Err(e) => json!({
                "status": "unhealthy",
                "timestamp": timestamp,
                "database": {
                    "type": "sqlite",
                    "connected": false,
                    "error": e.to_string()
                }
            }),
        }
    }
}

pub async fn root(State(server): State<Arc<PrdServer>>) -> Json<Value> {
    Json(server.service_info())
}

pub async fn health(State(server): State<Arc<PrdServer>>) -> Json<Value> {
    Json(server.health())
}
