//! PRD domain models
//!
//! This module contains the document and chat data structures shared by the
//! service, the generation pipeline and the chat client:
//! - `document`: the structured PRD, its merge and normalization rules
//! - `chat`: transcript messages and conversation history entries
//! - `export`: text and markdown rendering, export filenames

mod chat;
mod document;
pub mod export;

pub use chat::{ChatMessage, HistoryEntry, Role};
pub use document::{
    ChangeType, DEFAULT_OVERVIEW, DEFAULT_TITLE, ListSection, NotAnObject, PrdDocument,
    SectionChange, diff_sections,
};
