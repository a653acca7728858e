//! Application configuration
//!
//! Settings come from three layers, later ones winning: built-in defaults,
//! an optional TOML file, and environment variables. The binary applies its
//! command-line flags on top.

use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Errors raised while loading configuration
#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("invalid config file {path}: {source}")]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    pub server: ServerConfig,
    pub database: DatabaseConfig,
    pub llm: LlmConfig,
    pub knowledge: KnowledgeConfig,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ServerConfig {
    pub host: String,
    pub port: u16,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            host: "0.0.0.0".to_string(),
            port: 8000,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DatabaseConfig {
    pub path: PathBuf,
}

impl Default for DatabaseConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from("artifacts/prd-database.db"),
        }
    }
}

/// Settings for the chat-completions endpoint
///
/// Without an API key the generation pipeline is disabled and
/// `/api/process-prd` answers 503.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LlmConfig {
    pub model: String,
    /// Model used to embed knowledge chunks; retrieval falls back to keyword
    /// ranking when the endpoint cannot embed
    pub embedding_model: String,
    pub base_url: String,
    pub api_key: Option<String>,
    pub timeout_secs: u64,
    pub analysis_temperature: f32,
    pub generation_temperature: f32,
    pub questions_temperature: f32,
}

impl Default for LlmConfig {
    fn default() -> Self {
        Self {
            model: "gpt-4.1".to_string(),
            embedding_model: "text-embedding-3-small".to_string(),
            base_url: "https://api.openai.com/v1".to_string(),
            api_key: None,
            timeout_secs: 60,
            analysis_temperature: 0.1,
            generation_temperature: 0.2,
            questions_temperature: 0.1,
        }
    }
}

impl LlmConfig {
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnowledgeConfig {
    /// Reference documents loaded into the retrieval index
    pub artifact_paths: Vec<PathBuf>,
    pub chunk_size: usize,
    pub chunk_overlap: usize,
    pub top_k: usize,
    /// How many retrieved chunks are quoted in the generation prompt
    pub context_docs: usize,
    pub snippet_chars: usize,
    pub history_window: usize,
}

impl Default for KnowledgeConfig {
    fn default() -> Self {
        Self {
            artifact_paths: vec![
                PathBuf::from("artifacts/prd_gen.md"),
                PathBuf::from("artifacts/schema.sql"),
                PathBuf::from("artifacts/adr.md"),
            ],
            chunk_size: 1000,
            chunk_overlap: 200,
            top_k: 4,
            context_docs: 3,
            snippet_chars: 500,
            history_window: 10,
        }
    }
}

impl AppConfig {
    /// Load configuration from an optional TOML file and the process environment
    ///
    /// # Arguments
    /// * `path` - Config file; `None` uses defaults only
    pub fn load(path: Option<&Path>) -> Result<Self, ConfigError> {
        let mut config = match path {
            Some(path) => Self::from_file(path)?,
            None => Self::default(),
        };
        config.apply_env(|key| std::env::var(key).ok());
        Ok(config)
    }

    /// Parse a TOML config file
    pub fn from_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|source| ConfigError::Read {
            path: path.to_path_buf(),
            source,
        })?;
        toml::from_str(&content).map_err(|source| ConfigError::Parse {
            path: path.to_path_buf(),
            source,
        })
    }

    /// Apply environment overrides through `lookup`
    ///
    /// `PRD_ANALYZER_API_KEY` takes precedence over `OPENAI_API_KEY`.
    /// Empty values are ignored.
    pub fn apply_env<F>(&mut self, lookup: F)
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        if let Some(key) = get("PRD_ANALYZER_API_KEY").or_else(|| get("OPENAI_API_KEY")) {
            self.llm.api_key = Some(key);
        }
        if let Some(url) = get("OPENAI_BASE_URL") {
            self.llm.base_url = url;
        }
        if let Some(path) = get("PRD_ANALYZER_DATABASE") {
            self.database.path = PathBuf::from(path);
        }
    }

    /// Socket address string for the HTTP listener
    pub fn bind_address(&self) -> String {
        format!("{}:{}", self.server.host, self.server.port)
    }
}
