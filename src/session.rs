//! Client-side chat state
//!
//! [`ChatSession`] holds the transcript and the live document for one user
//! session and talks to a [`PrdBackend`]. Only one request may be in flight
//! at a time.

use crate::client::{ClientError, PrdBackend};
use crate::prd::{ChatMessage, PrdDocument, export};
use crate::protocol::{PrdRequest, PrdResponse};
use crate::validation::MAX_USER_INPUT_CHARS;
use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use tracing::warn;

pub const WELCOME_MESSAGE: &str =
    "Hi! Describe your product idea and I'll draft a product requirements document for it.";

/// Shown when the server could not be reached or answered with something unreadable
pub const CONNECTIVITY_ERROR: &str = "Sorry, I couldn't reach the PRD service. \
                                      Please check that the server is running and try again.";

/// Shown when the server reports a failure without an error text
pub const GENERIC_FAILURE: &str = "Sorry, something went wrong while generating the PRD.";

const ACKNOWLEDGEMENT: &str = "I've updated the PRD based on your input.";

/// What happened to one call to [`ChatSession::send`]
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum SendOutcome {
    /// Input was empty after trimming
    Ignored,
    /// A request was already in flight
    Busy,
    /// Input was longer than the service accepts; nothing was sent
    TooLong,
    Updated { appended: usize, questions: usize },
    /// The server reported `success: false` or answered with an error status
    Failed(String),
    Unreachable,
}

/// A rendered export ready to be written to disk
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportFile {
    pub filename: String,
    pub contents: String,
}

pub struct ChatSession<B> {
    backend: B,
    messages: Vec<ChatMessage>,
    document: PrdDocument,
    generating: bool,
    conversation_id: Option<i64>,
}

impl<B: PrdBackend> ChatSession<B> {
    /// Start a session whose transcript opens with the welcome message
    pub fn new(backend: B) -> Self {
        Self {
            backend,
            messages: vec![ChatMessage::assistant(WELCOME_MESSAGE)],
            document: PrdDocument::default(),
            generating: false,
            conversation_id: None,
        }
    }

    /// Store every exchange of this session under a server-side conversation
    pub fn with_conversation(mut self, conversation_id: i64) -> Self {
        self.conversation_id = Some(conversation_id);
        self
    }

    pub fn messages(&self) -> &[ChatMessage] {
        &self.messages
    }

    pub fn document(&self) -> &PrdDocument {
        &self.document
    }

    pub fn is_generating(&self) -> bool {
        self.generating
    }

    fn try_begin(&mut self, input: &str) -> Result<PrdRequest, SendOutcome> {
        let text = input.trim();
        if text.is_empty() {
            return Err(SendOutcome::Ignored);
        }
        if self.generating {
            return Err(SendOutcome::Busy);
        }
        if text.chars().count() > MAX_USER_INPUT_CHARS {
            self.messages.push(ChatMessage::assistant(format!(
                "Your message is too long. Please keep it under {} characters.",
                MAX_USER_INPUT_CHARS
            )));
            return Err(SendOutcome::TooLong);
        }

        let history = self.messages.iter().map(ChatMessage::to_history).collect();
        self.messages.push(ChatMessage::user(text));
        self.generating = true;
        Ok(PrdRequest {
            user_input: text.to_string(),
            conversation_history: history,
            conversation_id: self.conversation_id,
        })
    }

    /// Record the user's message and build the request for it
    ///
    /// # Returns
    /// `None` without touching the session when the input is blank or a
    /// request is already in flight. Over-long input is also refused, with a
    /// notice added to the transcript.
    pub fn begin(&mut self, input: &str) -> Option<PrdRequest> {
        self.try_begin(input).ok()
    }

    /// Apply the result of the request started by [`begin`](Self::begin)
    pub fn complete(&mut self, result: Result<PrdResponse, ClientError>) -> SendOutcome {
        self.generating = false;
        match result {
            Ok(response) if response.success => {
                let appended = self.document.merge(response.document());
                self.messages
                    .push(ChatMessage::assistant(reply_text(&response.clarifying_questions)));
                SendOutcome::Updated {
                    appended,
                    questions: response.clarifying_questions.len(),
                }
            }
            Ok(response) => self.fail(response.error_message),
            // error statuses carry the server's `detail` text
            Err(ClientError::Status { detail, .. }) => self.fail(detail),
            Err(e) => {
                warn!(error = %e, "PRD request failed");
                self.messages.push(ChatMessage::assistant(CONNECTIVITY_ERROR));
                SendOutcome::Unreachable
            }
        }
    }

    fn fail(&mut self, error_message: String) -> SendOutcome {
        let text = if error_message.trim().is_empty() {
            GENERIC_FAILURE.to_string()
        } else {
            error_message
        };
        self.messages.push(ChatMessage::assistant(text.clone()));
        SendOutcome::Failed(text)
    }

    /// Send one user message and fold the answer into the session
    pub async fn send(&mut self, input: &str) -> SendOutcome {
        let request = match self.try_begin(input) {
            Ok(request) => request,
            Err(outcome) => return outcome,
        };
        let result = self.backend.process(&request).await;
        self.complete(result)
    }

    /// Render the current document as a dated text file
    pub fn export(&self, date: NaiveDate) -> ExportFile {
        ExportFile {
            filename: export::export_filename(&self.document.title, date),
            contents: export::render_text(&self.document),
        }
    }

    /// Write [`export`](Self::export) into `dir` and return the file path
    pub fn write_export(&self, dir: &Path, date: NaiveDate) -> Result<PathBuf> {
        let file = self.export(date);
        std::fs::create_dir_all(dir)
            .with_context(|| format!("Failed to create export directory {}", dir.display()))?;
        let path = dir.join(&file.filename);
        std::fs::write(&path, file.contents)
            .with_context(|| format!("Failed to write export to {}", path.display()))?;
        Ok(path)
    }
}

fn reply_text(questions: &[String]) -> String {
    if questions.is_empty() {
        return ACKNOWLEDGEMENT.to_string();
    }
    let mut text = format!(
        "{}\n\nTo refine it further, could you answer these questions?",
        ACKNOWLEDGEMENT
    );
    for (index, question) in questions.iter().enumerate() {
        text.push_str(&format!("\n{}. {}", index + 1, question));
    }
    text
}
