use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Who authored a chat message
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    User,
    Assistant,
}

impl Role {
    pub fn as_str(self) -> &'static str {
        match self {
            Role::User => "user",
            Role::Assistant => "assistant",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "user" => Ok(Role::User),
            // stored messages use "ai" for the assistant
            "assistant" | "ai" => Ok(Role::Assistant),
            _ => Err(format!(
                "Invalid role '{}'. Valid options are: user, assistant",
                s
            )),
        }
    }
}

/// One entry of the chat transcript shown to the user
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub text: String,
}

impl ChatMessage {
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: Role::User,
            text: text.into(),
        }
    }

    pub fn assistant(text: impl Into<String>) -> Self {
        Self {
            role: Role::Assistant,
            text: text.into(),
        }
    }

    /// Convert to the shape sent in `conversation_history`
    pub fn to_history(&self) -> HistoryEntry {
        HistoryEntry {
            role: self.role.as_str().to_string(),
            content: self.text.clone(),
        }
    }
}

/// Wire shape of one conversation history element
///
/// Roles are free strings; missing keys decode as empty.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HistoryEntry {
    pub role: String,
    pub content: String,
}
