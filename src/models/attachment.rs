use chrono::{DateTime, Utc};
use serde::{Deserialize, Deserializer, Serialize};

text_enum! {
    /// Supported document formats for attachments
    FileType { Txt => "txt", Md => "md", Docx => "docx" }
}

text_enum! {
    /// Processing state of an uploaded file
    AttachmentStatus {
        Uploaded => "uploaded",
        Processing => "processing",
        Processed => "processed",
        Failed => "failed",
    }
}

impl Default for AttachmentStatus {
    fn default() -> Self {
        AttachmentStatus::Uploaded
    }
}

/// A file uploaded during a conversation
///
/// The extracted text of a file feeds into PRD generation. `additional_metadata`
/// is an opaque JSON string owned by the client.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FileAttachment {
    pub id: i64,
    pub conversation_id: i64,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub storage_path: String,
    pub extracted_text: Option<String>,
    pub status: AttachmentStatus,
    pub additional_metadata: Option<String>,
    pub created_at: DateTime<Utc>,
    pub updated_at: DateTime<Utc>,
}

/// Body of a create (POST) or full update (PUT) request
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct NewAttachment {
    pub conversation_id: i64,
    pub original_filename: String,
    pub file_type: FileType,
    pub file_size: i64,
    pub storage_path: String,
    #[serde(default)]
    pub extracted_text: Option<String>,
    #[serde(default)]
    pub status: AttachmentStatus,
    #[serde(default)]
    pub additional_metadata: Option<String>,
}

/// Body of a partial update (PATCH) request
///
/// Only fields present in the request are applied. For the nullable columns
/// an explicit `null` clears the value, which is why they are doubly optional.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AttachmentPatch {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub conversation_id: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub original_filename: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_type: Option<FileType>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file_size: Option<i64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub storage_path: Option<String>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub extracted_text: Option<Option<String>>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub status: Option<AttachmentStatus>,
    #[serde(
        default,
        deserialize_with = "present_or_null",
        skip_serializing_if = "Option::is_none"
    )]
    pub additional_metadata: Option<Option<String>>,
}

impl AttachmentPatch {
    /// True when the request carried no fields at all
    pub fn is_empty(&self) -> bool {
        self.conversation_id.is_none()
            && self.original_filename.is_none()
            && self.file_type.is_none()
            && self.file_size.is_none()
            && self.storage_path.is_none()
            && self.extracted_text.is_none()
            && self.status.is_none()
            && self.additional_metadata.is_none()
    }

    /// Apply the present fields to an existing record
    pub fn apply_to(&self, attachment: &mut FileAttachment) {
        if let Some(id) = self.conversation_id {
            attachment.conversation_id = id;
        }
        if let Some(ref name) = self.original_filename {
            attachment.original_filename = name.clone();
        }
        if let Some(file_type) = self.file_type {
            attachment.file_type = file_type;
        }
        if let Some(size) = self.file_size {
            attachment.file_size = size;
        }
        if let Some(ref path) = self.storage_path {
            attachment.storage_path = path.clone();
        }
        if let Some(ref text) = self.extracted_text {
            attachment.extracted_text = text.clone();
        }
        if let Some(status) = self.status {
            attachment.status = status;
        }
        if let Some(ref metadata) = self.additional_metadata {
            attachment.additional_metadata = metadata.clone();
        }
    }
}

/// Distinguishes an explicit `null` from an absent field
fn present_or_null<'de, D, T>(deserializer: D) -> Result<Option<Option<T>>, D::Error>
where
    D: Deserializer<'de>,
    T: Deserialize<'de>,
{
    Option::<T>::deserialize(deserializer).map(Some)
}
