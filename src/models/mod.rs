//! Persisted records
//!
//! - `attachment`: uploaded files and their create/update payloads
//! - `conversation`: conversations, messages, PRD versions, clarifying
//!   questions and export records

/// Declares a string-backed status enum with `as_str`, `Display` and `FromStr`
macro_rules! text_enum {
    (
        $(#[$meta:meta])*
        $name:ident { $($variant:ident => $text:literal),+ $(,)? }
    ) => {
        $(#[$meta])*
        #[derive(
            Debug, Clone, Copy, PartialEq, Eq, Hash, ::serde::Serialize, ::serde::Deserialize,
        )]
        #[serde(rename_all = "lowercase")]
        pub enum $name {
            $($variant),+
        }

        impl $name {
            pub fn as_str(self) -> &'static str {
                match self {
                    $($name::$variant => $text),+
                }
            }
        }

        impl ::std::fmt::Display for $name {
            fn fmt(&self, f: &mut ::std::fmt::Formatter<'_>) -> ::std::fmt::Result {
                f.write_str(self.as_str())
            }
        }

        impl ::std::str::FromStr for $name {
            type Err = String;

            fn from_str(s: &str) -> Result<Self, Self::Err> {
                match s {
                    $($text => Ok($name::$variant),)+
                    _ => Err(format!(
                        "Invalid {} '{}'. Valid options are: {}",
                        stringify!($name),
                        s,
                        [$($text),+].join(", ")
                    )),
                }
            }
        }
    };
}

mod attachment;
mod conversation;

pub use attachment::{AttachmentPatch, AttachmentStatus, FileAttachment, FileType, NewAttachment};
pub use conversation::{
    ClarifyingQuestion, Conversation, ConversationStatus, ExportFormat, ExportRecord, Message,
    MessageStatus, NewConversation, PrdChange, PrdVersion, QuestionStatus, Sender, VersionStatus,
};
