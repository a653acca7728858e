use crate::prd::{ChangeType, PrdDocument};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

text_enum! {
    /// Lifecycle of a conversation
    ConversationStatus { Active => "active", Completed => "completed", Archived => "archived" }
}

text_enum! {
    /// Author of a stored message
    Sender { User => "user", Ai => "ai" }
}

text_enum! {
    /// Delivery state of a stored message
    MessageStatus { Delivered => "delivered", Pending => "pending", Failed => "failed" }
}

text_enum! {
    /// State of a PRD version
    VersionStatus { Draft => "draft", Complete => "complete", Archived => "archived" }
}

text_enum! {
    /// State of a clarifying question
    QuestionStatus { Unanswered => "unanswered", Answered => "answered", Dismissed => "dismissed" }
}

text_enum! {
    /// Output format of a server-side export
    ExportFormat { Text => "text", Markdown => "markdown", Json => "json" }
}

impl Default for ConversationStatus {
    fn default() -> Self {
        ConversationStatus::Active
    }
}

impl ExportFormat {
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Text => "txt",
            ExportFormat::Markdown => "md",
            ExportFormat::Json => "json",
        }
    }

    pub fn content_type(self) -> &'static str {
        match self {
            ExportFormat::Text => "text/plain; charset=utf-8",
            ExportFormat::Markdown => "text/markdown; charset=utf-8",
            ExportFormat::Json => "application/json",
        }
    }
}

/// A chat session between a user and the assistant
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Conversation {
    pub id: i64,
    pub title: Option<String>,
    pub current_prd_version_id: Option<i64>,
    pub status: ConversationStatus,
    pub additional_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a conversation create request
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct NewConversation {
    #[serde(default)]
    pub title: Option<String>,
    #[serde(default)]
    pub additional_metadata: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Message {
    pub id: i64,
    pub conversation_id: i64,
    pub sender: Sender,
    pub message_type: String,
    pub content: String,
    pub status: MessageStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// An immutable snapshot of the document produced by one exchange
///
/// `content` is the markdown rendering; `document` is the structured form.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdVersion {
    pub id: i64,
    pub conversation_id: i64,
    pub version_number: i64,
    pub content: String,
    pub document: PrdDocument,
    pub change_summary: Option<String>,
    pub generated_by_ai_message_id: Option<i64>,
    pub trigger_type: Option<String>,
    pub status: VersionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Section-level change recorded when a version is created
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PrdChange {
    pub id: i64,
    pub prd_version_id: i64,
    pub previous_prd_version_id: Option<i64>,
    pub section: String,
    pub change_type: ChangeType,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
    pub reason: Option<String>,
    pub created_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ClarifyingQuestion {
    pub id: i64,
    pub conversation_id: i64,
    pub prd_version_id: Option<i64>,
    pub question_text: String,
    pub category: Option<String>,
    /// Higher is more important
    pub priority: i64,
    pub ai_message_id: Option<i64>,
    pub user_message_id: Option<i64>,
    pub answer: Option<String>,
    pub status: QuestionStatus,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ExportRecord {
    pub id: i64,
    pub prd_version_id: i64,
    pub conversation_id: i64,
    pub export_format: ExportFormat,
    pub file_path: Option<String>,
    pub status: String,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_text_enum_round_trip_names() {
        assert_eq!("ai".parse::<Sender>().unwrap(), Sender::Ai);
        assert_eq!(QuestionStatus::Unanswered.to_string(), "unanswered");
        let err = "pdf".parse::<ExportFormat>().unwrap_err();
        assert!(err.contains("text, markdown, json"));
    }

    #[test]
    fn test_export_format_file_details() {
        assert_eq!(ExportFormat::Markdown.extension(), "md");
        assert_eq!(ExportFormat::Json.content_type(), "application/json");
    }
}
