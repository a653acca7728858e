use super::{Database, StoreError};
use crate::models::{
    Conversation, ConversationStatus, Message, MessageStatus, NewConversation, Sender,
};
use chrono::Utc;
use rusqlite::{OptionalExtension, Row, params};

const CONVERSATION_COLUMNS: &str =
    "id, title, current_prd_version_id, status, metadata, created_at, updated_at";

const MESSAGE_COLUMNS: &str =
    "id, conversation_id, sender, message_type, content, status, created_at, updated_at";

fn conversation_from_row(row: &Row<'_>) -> rusqlite::Result<Conversation> {
    Ok(Conversation {
        id: row.get(0)?,
        title: row.get(1)?,
        current_prd_version_id: row.get(2)?,
        status: row.get(3)?,
        additional_metadata: row.get(4)?,
        created_at: row.get(5)?,
        updated_at: row.get(6)?,
    })
}

fn message_from_row(row: &Row<'_>) -> rusqlite::Result<Message> {
    Ok(Message {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        sender: row.get(2)?,
        message_type: row.get(3)?,
        content: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

impl Database {
    pub fn create_conversation(&self, input: &NewConversation) -> Result<Conversation, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO conversation (title, status, metadata, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5)
            "#,
            params![
                input.title,
                ConversationStatus::Active,
                input.additional_metadata,
                now,
                now
            ],
        )?;
        let id = self.conn.last_insert_rowid();
        self.get_conversation(id)?.ok_or(StoreError::MissingRow {
            table: "conversation",
            id,
        })
    }

    pub fn get_conversation(&self, id: i64) -> Result<Option<Conversation>, StoreError> {
        let conversation = self
            .conn
            .query_row(
                &format!("SELECT {} FROM conversation WHERE id = ?1", CONVERSATION_COLUMNS),
                params![id],
                conversation_from_row,
            )
            .optional()?;
        Ok(conversation)
    }

    pub fn list_conversations(&self) -> Result<Vec<Conversation>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM conversation ORDER BY id",
            CONVERSATION_COLUMNS
        ))?;
        let conversations = stmt
            .query_map([], conversation_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(conversations)
    }

    /// Delete a conversation together with everything that belongs to it
    pub fn delete_conversation(&self, id: i64) -> Result<bool, StoreError> {
        let removed = self
            .conn
            .execute("DELETE FROM conversation WHERE id = ?1", params![id])?;
        Ok(removed > 0)
    }

    /// Append a text message to a conversation
    pub fn insert_message(
        &self,
        conversation_id: i64,
        sender: Sender,
        content: &str,
        status: MessageStatus,
    ) -> Result<Message, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO message (conversation_id, sender, message_type, content, status,
                created_at, updated_at)
            VALUES (?1, ?2, 'text', ?3, ?4, ?5, ?6)
            "#,
            params![conversation_id, sender, content, status, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn.execute(
            "UPDATE conversation SET updated_at = ?1 WHERE id = ?2",
            params![now, conversation_id],
        )?;
        let message = self
            .conn
            .query_row(
                &format!("SELECT {} FROM message WHERE id = ?1", MESSAGE_COLUMNS),
                params![id],
                message_from_row,
            )
            .optional()?;
        message.ok_or(StoreError::MissingRow { table: "message", id })
    }

    /// Messages of a conversation, oldest first
    pub fn list_messages(&self, conversation_id: i64) -> Result<Vec<Message>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM message WHERE conversation_id = ?1 ORDER BY id",
            MESSAGE_COLUMNS
        ))?;
        let messages = stmt
            .query_map(params![conversation_id], message_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(messages)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_create_and_list_conversations() {
        let db = Database::open_in_memory().unwrap();
        let first = db
            .create_conversation(&NewConversation {
                title: Some("Recipe app".to_string()),
                additional_metadata: None,
            })
            .unwrap();
        db.create_conversation(&NewConversation::default()).unwrap();

        assert_eq!(first.status, ConversationStatus::Active);
        assert_eq!(first.title.as_deref(), Some("Recipe app"));
        assert_eq!(first.current_prd_version_id, None);
        assert_eq!(db.list_conversations().unwrap().len(), 2);
        assert!(db.conversation_exists(first.id).unwrap());
        assert!(!db.conversation_exists(first.id + 100).unwrap());
    }

    #[test]
    fn test_messages_are_ordered() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_conversation(&NewConversation::default()).unwrap().id;

        db.insert_message(id, Sender::User, "An app for dog walkers", MessageStatus::Delivered)
            .unwrap();
        let reply = db
            .insert_message(id, Sender::Ai, "Here is a draft", MessageStatus::Delivered)
            .unwrap();

        assert_eq!(reply.message_type, "text");
        let messages = db.list_messages(id).unwrap();
        assert_eq!(messages.len(), 2);
        assert_eq!(messages[0].sender, Sender::User);
        assert_eq!(messages[1].sender, Sender::Ai);
    }

    #[test]
    fn test_delete_cascades_to_messages() {
        let db = Database::open_in_memory().unwrap();
        let id = db.create_conversation(&NewConversation::default()).unwrap().id;
        db.insert_message(id, Sender::User, "hello", MessageStatus::Delivered)
            .unwrap();

        assert!(db.delete_conversation(id).unwrap());
        assert!(db.get_conversation(id).unwrap().is_none());
        assert_eq!(db.count_rows("message").unwrap(), 0);
        assert!(!db.delete_conversation(id).unwrap());
    }
}
