//! PRD generation workflow
//!
//! A request moves through three steps: analyze the idea, generate the
//! document, then ask clarifying questions. Each step records a
//! [`ProcessingStage`]; [`next_step`] decides where to go from there.
//!
//! - `knowledge`: reference corpus searched for prompt context
//! - `prompts`: prompt text for each step

pub mod knowledge;
mod prompts;

use crate::config::AppConfig;
use crate::llm::{CompletionRequest, LanguageModel, LlmError, parse_json};
use crate::prd::{HistoryEntry, NotAnObject, PrdDocument};
use knowledge::{Chunk, KnowledgeBase};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::sync::Arc;
use tracing::{debug, warn};

/// Asked when the model cannot produce usable questions
pub const DEFAULT_QUESTIONS: [&str; 2] = [
    "Could you provide more details about your target users?",
    "What are the most important features for your users?",
];

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ProcessingStage {
    Starting,
    Analyzed,
    Generated,
    Error,
}

impl ProcessingStage {
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessingStage::Starting => "starting",
            ProcessingStage::Analyzed => "analyzed",
            ProcessingStage::Generated => "generated",
            ProcessingStage::Error => "error",
        }
    }
}

impl fmt::Display for ProcessingStage {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Step {
    Analyze,
    Generate,
    Clarify,
}

/// Step to run after `after` finished with `stage`, or `None` to stop
pub fn next_step(after: Step, stage: ProcessingStage) -> Option<Step> {
    match (after, stage) {
        (Step::Analyze, ProcessingStage::Analyzed) => Some(Step::Generate),
        (Step::Generate, ProcessingStage::Generated) => Some(Step::Clarify),
        _ => None,
    }
}

/// Tunables taken from the `[llm]` and `[knowledge]` configuration
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineSettings {
    pub analysis_temperature: f32,
    pub generation_temperature: f32,
    pub questions_temperature: f32,
    pub top_k: usize,
    pub context_docs: usize,
    pub snippet_chars: usize,
    pub history_window: usize,
}

impl PipelineSettings {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            analysis_temperature: config.llm.analysis_temperature,
            generation_temperature: config.llm.generation_temperature,
            questions_temperature: config.llm.questions_temperature,
            top_k: config.knowledge.top_k,
            context_docs: config.knowledge.context_docs,
            snippet_chars: config.knowledge.snippet_chars,
            history_window: config.knowledge.history_window,
        }
    }
}

impl Default for PipelineSettings {
    fn default() -> Self {
        Self::from_config(&AppConfig::default())
    }
}

/// Result of one pipeline run
#[derive(Debug, Clone, PartialEq)]
pub struct PipelineOutcome {
    pub stage: ProcessingStage,
    pub analysis: Value,
    pub document: Option<PrdDocument>,
    pub questions: Vec<String>,
    pub error_message: String,
}

impl PipelineOutcome {
    fn starting() -> Self {
        Self {
            stage: ProcessingStage::Starting,
            analysis: Value::Object(Default::default()),
            document: None,
            questions: Vec::new(),
            error_message: String::new(),
        }
    }

    pub fn success(&self) -> bool {
        !matches!(
            self.stage,
            ProcessingStage::Starting | ProcessingStage::Error
        )
    }

    fn fail(&mut self, message: String) {
        warn!(error = %message, "PRD pipeline step failed");
        self.error_message = message;
        self.stage = ProcessingStage::Error;
    }
}

#[derive(Debug, thiserror::Error)]
enum GenerateError {
    #[error(transparent)]
    Llm(#[from] LlmError),
    #[error(transparent)]
    Document(#[from] NotAnObject),
}

/// Analyze → generate → clarify, backed by a language model and a knowledge base
pub struct PrdPipeline {
    model: Arc<dyn LanguageModel>,
    knowledge: KnowledgeBase,
    settings: PipelineSettings,
}

impl PrdPipeline {
    pub fn new(
        model: Arc<dyn LanguageModel>,
        knowledge: KnowledgeBase,
        settings: PipelineSettings,
    ) -> Self {
        Self {
            model,
            knowledge,
            settings,
        }
    }

    pub fn model_name(&self) -> &str {
        self.model.model_name()
    }

    pub fn knowledge(&self) -> &KnowledgeBase {
        &self.knowledge
    }

    /// Process one user message
    ///
    /// # Arguments
    /// * `user_input` - The latest product description
    /// * `history` - Earlier messages; only the most recent ones reach the prompt
    ///
    /// # Returns
    /// The stage reached and whatever was produced on the way
    pub async fn run(&self, user_input: &str, history: &[HistoryEntry]) -> PipelineOutcome {
        let mut outcome = PipelineOutcome::starting();
        let query = prompts::context_query(user_input);
        let context = self
            .knowledge
            .search(self.model.as_ref(), &query, self.settings.top_k)
            .await;

        let mut step = Some(Step::Analyze);
        while let Some(current) = step {
            debug!(step = ?current, "running PRD pipeline step");
            match current {
                Step::Analyze => self.analyze(user_input, history, &mut outcome).await,
                Step::Generate => self.generate(&context, &mut outcome).await,
                Step::Clarify => self.clarify(user_input, &mut outcome).await,
            }
            step = next_step(current, outcome.stage);
        }
        outcome
    }

    async fn analyze(
        &self,
        user_input: &str,
        history: &[HistoryEntry],
        outcome: &mut PipelineOutcome,
    ) {
        let recent = &history[history.len().saturating_sub(self.settings.history_window)..];
        let request = CompletionRequest {
            system: prompts::ANALYSIS_SYSTEM.to_string(),
            user: prompts::analysis_prompt(user_input, recent),
            temperature: self.settings.analysis_temperature,
        };
        let result = match self.model.complete(request).await {
            Ok(text) => parse_json(&text),
            Err(e) => Err(e),
        };
        match result {
            Ok(analysis) => {
                outcome.analysis = analysis;
                outcome.stage = ProcessingStage::Analyzed;
            }
            Err(e) => outcome.fail(format!("Analysis failed: {}", e)),
        }
    }

    async fn generate(&self, context: &[&Chunk], outcome: &mut PipelineOutcome) {
        let docs = &context[..context.len().min(self.settings.context_docs)];
        let request = CompletionRequest {
            system: prompts::GENERATION_SYSTEM.to_string(),
            user: prompts::generation_prompt(&outcome.analysis, docs, self.settings.snippet_chars),
            temperature: self.settings.generation_temperature,
        };
        match self.generate_document(request).await {
            Ok(document) => {
                outcome.document = Some(document);
                outcome.stage = ProcessingStage::Generated;
            }
            Err(e) => outcome.fail(format!("PRD generation failed: {}", e)),
        }
    }

    async fn generate_document(
        &self,
        request: CompletionRequest,
    ) -> Result<PrdDocument, GenerateError> {
        let text = self.model.complete(request).await?;
        let value = parse_json(&text)?;
        Ok(PrdDocument::from_generated(&value)?)
    }

    async fn clarify(&self, user_input: &str, outcome: &mut PipelineOutcome) {
        let request = CompletionRequest {
            system: prompts::QUESTIONS_SYSTEM.to_string(),
            user: prompts::questions_prompt(user_input, &outcome.analysis),
            temperature: self.settings.questions_temperature,
        };
        let questions = match self.model.complete(request).await {
            Ok(text) => parse_json(&text).ok().and_then(|value| questions_from(&value)),
            Err(e) => {
                warn!(error = %e, "clarifying question request failed");
                None
            }
        };
        outcome.questions = questions.unwrap_or_else(|| {
            warn!("using default clarifying questions");
            DEFAULT_QUESTIONS.iter().map(|q| q.to_string()).collect()
        });
    }
}

/// Accept `["q1", ...]` or `{"questions": ["q1", ...]}`
fn questions_from(value: &Value) -> Option<Vec<String>> {
    let items = match value {
        Value::Array(items) => items,
        Value::Object(object) => object.get("questions")?.as_array()?,
        _ => return None,
    };
    let questions: Vec<String> = items
        .iter()
        .map(|item| match item {
            Value::String(s) => s.clone(),
            other => other.to_string(),
        })
        .collect();
    (!questions.is_empty()).then_some(questions)
}
