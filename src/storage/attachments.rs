use super::{Database, StoreError};
use crate::models::{AttachmentPatch, FileAttachment, NewAttachment};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

const COLUMNS: &str = "id, conversation_id, original_filename, file_type, file_size, storage_path, \
                       extracted_text, status, metadata, created_at, updated_at";

fn from_row(row: &Row<'_>) -> rusqlite::Result<FileAttachment> {
    Ok(FileAttachment {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        original_filename: row.get(2)?,
        file_type: row.get(3)?,
        file_size: row.get(4)?,
        storage_path: row.get(5)?,
        extracted_text: row.get(6)?,
        status: row.get(7)?,
        additional_metadata: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

impl Database {
    /// Insert a new attachment and return the stored record
    pub fn insert_attachment(&self, input: &NewAttachment) -> Result<FileAttachment, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO file_attachment (conversation_id, original_filename, file_type, file_size,
                storage_path, extracted_text, status, metadata, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
            "#,
            params![
                input.conversation_id,
                input.original_filename,
                input.file_type,
                input.file_size,
                input.storage_path,
                input.extracted_text,
                input.status,
                input.additional_metadata,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_attachment(id)?.ok_or(StoreError::MissingRow {
            table: "file_attachment",
            id,
        })
    }

    pub fn get_attachment(&self, id: i64) -> Result<Option<FileAttachment>, StoreError> {
        let attachment = self
            .conn
            .query_row(
                &format!("SELECT {} FROM file_attachment WHERE id = ?1", COLUMNS),
                params![id],
                from_row,
            )
            .optional()?;
        Ok(attachment)
    }

    /// List attachments in id order, optionally for one conversation only
    pub fn list_attachments(
        &self,
        conversation_id: Option<i64>,
    ) -> Result<Vec<FileAttachment>, StoreError> {
        let attachments = match conversation_id {
            Some(conversation_id) => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM file_attachment WHERE conversation_id = ?1 ORDER BY id",
                    COLUMNS
                ))?;
                stmt.query_map(params![conversation_id], from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
            None => {
                let mut stmt = self.conn.prepare(&format!(
                    "SELECT {} FROM file_attachment ORDER BY id",
                    COLUMNS
                ))?;
                stmt.query_map([], from_row)?
                    .collect::<Result<Vec<_>, _>>()?
            }
        };
        Ok(attachments)
    }

    /// Overwrite every client-owned field of an attachment
    ///
    /// # Returns
    /// The updated record, or `None` if no attachment has this id
    pub fn replace_attachment(
        &self,
        id: i64,
        input: &NewAttachment,
    ) -> Result<Option<FileAttachment>, StoreError> {
        let changed = self.conn.execute(
            r#"
            UPDATE file_attachment
            SET conversation_id = ?1, original_filename = ?2, file_type = ?3, file_size = ?4,
                storage_path = ?5, extracted_text = ?6, status = ?7, metadata = ?8, updated_at = ?9
            WHERE id = ?10
            "#,
            params![
                input.conversation_id,
                input.original_filename,
                input.file_type,
                input.file_size,
                input.storage_path,
                input.extracted_text,
                input.status,
                input.additional_metadata,
                Utc::now(),
                id
            ],
        )?;
        if changed == 0 {
            return Ok(None);
        }
        self.get_attachment(id)
    }

    /// Apply only the fields present in `patch`
    ///
    /// # Returns
    /// The updated record, or `None` if no attachment has this id
    pub fn patch_attachment(
        &self,
        id: i64,
        patch: &AttachmentPatch,
    ) -> Result<Option<FileAttachment>, StoreError> {
        let Some(mut attachment) = self.get_attachment(id)? else {
            return Ok(None);
        };
        patch.apply_to(&mut attachment);

        let merged = NewAttachment {
            conversation_id: attachment.conversation_id,
            original_filename: attachment.original_filename,
            file_type: attachment.file_type,
            file_size: attachment.file_size,
            storage_path: attachment.storage_path,
            extracted_text: attachment.extracted_text,
            status: attachment.status,
            additional_metadata: attachment.additional_metadata,
        };
        self.replace_attachment(id, &merged)
    }

    /// Delete an attachment, returning whether a row was removed
    pub fn delete_attachment(&self, id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM file_attachment WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    pub fn count_attachments(&self) -> Result<i64, StoreError> {
        self.count_rows("file_attachment")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{AttachmentStatus, FileType, NewConversation};

    fn setup() -> (Database, i64) {
        let db = Database::open_in_memory().unwrap();
        let conversation = db
            .create_conversation(&NewConversation::default())
            .unwrap();
        (db, conversation.id)
    }

    fn new_attachment(conversation_id: i64, name: &str) -> NewAttachment {
        NewAttachment {
            conversation_id,
            original_filename: name.to_string(),
            file_type: FileType::Txt,
            file_size: 1024,
            storage_path: format!("/files/{}", name),
            extracted_text: Some("Sample text".to_string()),
            status: AttachmentStatus::Uploaded,
            additional_metadata: Some(r#"{"author": "QA"}"#.to_string()),
        }
    }

    #[test]
    fn test_insert_and_get() {
        let (db, conversation_id) = setup();
        let created = db
            .insert_attachment(&new_attachment(conversation_id, "a.txt"))
            .unwrap();

        assert!(created.id > 0);
        assert_eq!(created.original_filename, "a.txt");
        assert_eq!(created.created_at, created.updated_at);

        let fetched = db.get_attachment(created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn test_insert_requires_existing_conversation() {
        let (db, _) = setup();
        let result = db.insert_attachment(&new_attachment(999, "orphan.txt"));
        assert!(matches!(result, Err(StoreError::Sql(_))));
    }

    #[test]
    fn test_list_filters_by_conversation() {
        let (db, first) = setup();
        let second = db
            .create_conversation(&NewConversation::default())
            .unwrap()
            .id;
        db.insert_attachment(&new_attachment(first, "one.txt")).unwrap();
        db.insert_attachment(&new_attachment(second, "two.txt")).unwrap();
        db.insert_attachment(&new_attachment(first, "three.txt")).unwrap();

        assert_eq!(db.list_attachments(None).unwrap().len(), 3);
        let names: Vec<String> = db
            .list_attachments(Some(first))
            .unwrap()
            .into_iter()
            .map(|a| a.original_filename)
            .collect();
        assert_eq!(names, vec!["one.txt", "three.txt"]);
    }

    #[test]
    fn test_patch_only_touches_given_fields() {
        let (db, conversation_id) = setup();
        let created = db
            .insert_attachment(&new_attachment(conversation_id, "p.txt"))
            .unwrap();

        let patch = AttachmentPatch {
            status: Some(AttachmentStatus::Processed),
            extracted_text: Some(None),
            ..AttachmentPatch::default()
        };
        let updated = db.patch_attachment(created.id, &patch).unwrap().unwrap();

        assert_eq!(updated.status, AttachmentStatus::Processed);
        assert_eq!(updated.extracted_text, None);
        assert_eq!(updated.original_filename, "p.txt");
        assert_eq!(updated.additional_metadata, created.additional_metadata);
        assert!(updated.updated_at >= created.updated_at);
    }

    #[test]
    fn test_missing_rows() {
        let (db, conversation_id) = setup();
        assert!(db.get_attachment(12345).unwrap().is_none());
        assert!(
            db.replace_attachment(12345, &new_attachment(conversation_id, "x.txt"))
                .unwrap()
                .is_none()
        );
        assert!(
            db.patch_attachment(12345, &AttachmentPatch::default())
                .unwrap()
                .is_none()
        );
        assert!(!db.delete_attachment(12345).unwrap());
    }

    #[test]
    fn test_delete() {
        let (db, conversation_id) = setup();
        let created = db
            .insert_attachment(&new_attachment(conversation_id, "d.txt"))
            .unwrap();
        assert_eq!(db.count_attachments().unwrap(), 1);
        assert!(db.delete_attachment(created.id).unwrap());
        assert_eq!(db.count_attachments().unwrap(), 0);
    }
}
