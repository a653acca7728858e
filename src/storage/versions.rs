use super::{Database, StoreError};
use crate::models::{
    ClarifyingQuestion, ExportFormat, ExportRecord, Message, MessageStatus, PrdChange, PrdVersion,
    QuestionStatus, Sender, VersionStatus,
};
use crate::prd::{PrdDocument, diff_sections, export};
use chrono::Utc;
use rusqlite::{Connection, OptionalExtension, Row, params};

const VERSION_COLUMNS: &str = "id, conversation_id, version_number, content, metadata, \
                               change_summary, generated_by_ai_message_id, trigger_type, status, \
                               created_at, updated_at";

const CHANGE_COLUMNS: &str = "id, prd_version_id, previous_prd_version_id, section, change_type, \
                              old_content, new_content, reason, created_at";

const QUESTION_COLUMNS: &str = "id, conversation_id, prd_version_id, question_text, category, \
                                priority, ai_message_id, user_message_id, answer, status, \
                                created_at, updated_at";

const EXPORT_COLUMNS: &str =
    "id, prd_version_id, conversation_id, export_format, file_path, status, created_at, updated_at";

/// Input for a new PRD version
#[derive(Debug, Clone)]
pub struct NewPrdVersion<'a> {
    pub conversation_id: i64,
    pub document: &'a PrdDocument,
    pub change_summary: Option<String>,
    pub generated_by_ai_message_id: Option<i64>,
}

fn version_from_row(row: &Row<'_>) -> rusqlite::Result<PrdVersion> {
    // the structured document lives in the metadata column as JSON
    let metadata: Option<String> = row.get(4)?;
    let document = metadata
        .and_then(|json| serde_json::from_str(&json).ok())
        .unwrap_or_default();
    Ok(PrdVersion {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        version_number: row.get(2)?,
        content: row.get(3)?,
        document,
        change_summary: row.get(5)?,
        generated_by_ai_message_id: row.get(6)?,
        trigger_type: row.get(7)?,
        status: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

fn change_from_row(row: &Row<'_>) -> rusqlite::Result<PrdChange> {
    Ok(PrdChange {
        id: row.get(0)?,
        prd_version_id: row.get(1)?,
        previous_prd_version_id: row.get(2)?,
        section: row.get(3)?,
        change_type: row.get(4)?,
        old_content: row.get(5)?,
        new_content: row.get(6)?,
        reason: row.get(7)?,
        created_at: row.get(8)?,
    })
}

fn question_from_row(row: &Row<'_>) -> rusqlite::Result<ClarifyingQuestion> {
    Ok(ClarifyingQuestion {
        id: row.get(0)?,
        conversation_id: row.get(1)?,
        prd_version_id: row.get(2)?,
        question_text: row.get(3)?,
        category: row.get(4)?,
        priority: row.get(5)?,
        ai_message_id: row.get(6)?,
        user_message_id: row.get(7)?,
        answer: row.get(8)?,
        status: row.get(9)?,
        created_at: row.get(10)?,
        updated_at: row.get(11)?,
    })
}

fn export_from_row(row: &Row<'_>) -> rusqlite::Result<ExportRecord> {
    Ok(ExportRecord {
        id: row.get(0)?,
        prd_version_id: row.get(1)?,
        conversation_id: row.get(2)?,
        export_format: row.get(3)?,
        file_path: row.get(4)?,
        status: row.get(5)?,
        created_at: row.get(6)?,
        updated_at: row.get(7)?,
    })
}

/// Write a version row, its section changes and the conversation pointer
///
/// Must run inside a transaction on `conn`.
fn write_prd_version(conn: &Connection, input: &NewPrdVersion<'_>) -> Result<i64, StoreError> {
    let now = Utc::now();
    let previous = conn
        .query_row(
            &format!(
                "SELECT {} FROM prd_version WHERE conversation_id = ?1 \
                 ORDER BY version_number DESC LIMIT 1",
                VERSION_COLUMNS
            ),
            params![input.conversation_id],
            version_from_row,
        )
        .optional()?;

    let (version_number, trigger_type) = match previous {
        Some(ref prev) => (prev.version_number + 1, "refinement"),
        None => (1, "initial"),
    };

    conn.execute(
        r#"
        INSERT INTO prd_version (conversation_id, version_number, content, change_summary,
            generated_by_ai_message_id, trigger_type, status, metadata, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10)
        "#,
        params![
            input.conversation_id,
            version_number,
            export::render_markdown(input.document),
            input.change_summary,
            input.generated_by_ai_message_id,
            trigger_type,
            VersionStatus::Complete,
            serde_json::to_string(input.document)?,
            now,
            now
        ],
    )?;
    let id = conn.last_insert_rowid();

    let previous_id = previous.as_ref().map(|p| p.id);
    for change in diff_sections(previous.as_ref().map(|p| &p.document), input.document) {
        conn.execute(
            r#"
            INSERT INTO prd_change (prd_version_id, previous_prd_version_id, section, change_type,
                old_content, new_content, created_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)
            "#,
            params![
                id,
                previous_id,
                change.section,
                change.change_type,
                change.old_content,
                change.new_content,
                now
            ],
        )?;
    }

    conn.execute(
        "UPDATE conversation SET current_prd_version_id = ?1, updated_at = ?2 WHERE id = ?3",
        params![id, now, input.conversation_id],
    )?;
    Ok(id)
}

/// Write question rows, the first one with the highest priority
fn write_questions(
    conn: &Connection,
    conversation_id: i64,
    prd_version_id: Option<i64>,
    ai_message_id: Option<i64>,
    questions: &[String],
) -> Result<Vec<i64>, StoreError> {
    let now = Utc::now();
    let mut ids = Vec::with_capacity(questions.len());
    for (index, question) in questions.iter().enumerate() {
        let priority = (questions.len() - index) as i64;
        conn.execute(
            r#"
            INSERT INTO clarifying_question (conversation_id, prd_version_id, question_text,
                priority, ai_message_id, status, created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8)
            "#,
            params![
                conversation_id,
                prd_version_id,
                question,
                priority,
                ai_message_id,
                QuestionStatus::Unanswered,
                now,
                now
            ],
        )?;
        ids.push(conn.last_insert_rowid());
    }
    Ok(ids)
}

/// Rows written for one successful assistant turn
#[derive(Debug, Clone)]
pub struct RecordedExchange {
    pub reply: Message,
    pub version: PrdVersion,
    pub questions: Vec<ClarifyingQuestion>,
}

impl Database {
    /// Store a new version of a conversation's document
    ///
    /// Runs in one transaction: picks the next version number, records the
    /// section changes against the previous version and makes the new version
    /// the conversation's current one.
    pub fn insert_prd_version(&self, input: &NewPrdVersion<'_>) -> Result<PrdVersion, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let id = write_prd_version(&tx, input)?;
        tx.commit()?;
        self.load_prd_version(id)
    }

    /// Store an assistant reply together with the version and questions it produced
    ///
    /// Either every row is written or none is.
    ///
    /// # Arguments
    /// * `reply` - Text of the assistant message
    /// * `change_summary` - Short description kept on the version row
    /// * `questions` - Clarifying questions asked in the reply
    pub fn record_exchange(
        &self,
        conversation_id: i64,
        reply: &str,
        document: &PrdDocument,
        change_summary: Option<String>,
        questions: &[String],
    ) -> Result<RecordedExchange, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let reply =
            self.insert_message(conversation_id, Sender::Ai, reply, MessageStatus::Delivered)?;
        let version_id = write_prd_version(
            &tx,
            &NewPrdVersion {
                conversation_id,
                document,
                change_summary,
                generated_by_ai_message_id: Some(reply.id),
            },
        )?;
        let question_ids =
            write_questions(&tx, conversation_id, Some(version_id), Some(reply.id), questions)?;
        tx.commit()?;

        Ok(RecordedExchange {
            reply,
            version: self.load_prd_version(version_id)?,
            questions: self.load_questions(&question_ids)?,
        })
    }

    fn load_prd_version(&self, id: i64) -> Result<PrdVersion, StoreError> {
        self.get_prd_version(id)?.ok_or(StoreError::MissingRow {
            table: "prd_version",
            id,
        })
    }

    fn load_questions(&self, ids: &[i64]) -> Result<Vec<ClarifyingQuestion>, StoreError> {
        let mut stored = Vec::with_capacity(ids.len());
        for &id in ids {
            let question = self
                .conn
                .query_row(
                    &format!("SELECT {} FROM clarifying_question WHERE id = ?1", QUESTION_COLUMNS),
                    params![id],
                    question_from_row,
                )
                .optional()?
                .ok_or(StoreError::MissingRow {
                    table: "clarifying_question",
                    id,
                })?;
            stored.push(question);
        }
        Ok(stored)
    }

    pub fn get_prd_version(&self, id: i64) -> Result<Option<PrdVersion>, StoreError> {
        let version = self
            .conn
            .query_row(
                &format!("SELECT {} FROM prd_version WHERE id = ?1", VERSION_COLUMNS),
                params![id],
                version_from_row,
            )
            .optional()?;
        Ok(version)
    }

    /// The version a conversation currently points at, if any
    pub fn current_prd_version(
        &self,
        conversation_id: i64,
    ) -> Result<Option<PrdVersion>, StoreError> {
        let version_id: Option<i64> = self
            .conn
            .query_row(
                "SELECT current_prd_version_id FROM conversation WHERE id = ?1",
                params![conversation_id],
                |row| row.get(0),
            )
            .optional()?
            .flatten();
        match version_id {
            Some(id) => self.get_prd_version(id),
            None => Ok(None),
        }
    }

    /// Versions of a conversation, oldest first
    pub fn list_prd_versions(&self, conversation_id: i64) -> Result<Vec<PrdVersion>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM prd_version WHERE conversation_id = ?1 ORDER BY version_number",
            VERSION_COLUMNS
        ))?;
        let versions = stmt
            .query_map(params![conversation_id], version_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(versions)
    }

    pub fn list_prd_changes(&self, prd_version_id: i64) -> Result<Vec<PrdChange>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM prd_change WHERE prd_version_id = ?1 ORDER BY id",
            CHANGE_COLUMNS
        ))?;
        let changes = stmt
            .query_map(params![prd_version_id], change_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(changes)
    }

    /// Record the questions asked alongside a version
    ///
    /// The first question gets the highest priority.
    pub fn insert_questions(
        &self,
        conversation_id: i64,
        prd_version_id: Option<i64>,
        ai_message_id: Option<i64>,
        questions: &[String],
    ) -> Result<Vec<ClarifyingQuestion>, StoreError> {
        let tx = self.conn.unchecked_transaction()?;
        let ids = write_questions(&tx, conversation_id, prd_version_id, ai_message_id, questions)?;
        tx.commit()?;
        self.load_questions(&ids)
    }

    pub fn list_questions(
        &self,
        conversation_id: i64,
    ) -> Result<Vec<ClarifyingQuestion>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM clarifying_question WHERE conversation_id = ?1 ORDER BY id",
            QUESTION_COLUMNS
        ))?;
        let questions = stmt
            .query_map(params![conversation_id], question_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(questions)
    }

    /// Mark every unanswered question of a conversation as answered by a user message
    ///
    /// # Returns
    /// The number of questions that were updated
    pub fn answer_pending_questions(
        &self,
        conversation_id: i64,
        user_message_id: i64,
        answer: &str,
    ) -> Result<usize, StoreError> {
        let updated = self.conn.execute(
            r#"
            UPDATE clarifying_question
            SET status = ?1, answer = ?2, user_message_id = ?3, updated_at = ?4
            WHERE conversation_id = ?5 AND status = ?6
            "#,
            params![
                QuestionStatus::Answered,
                answer,
                user_message_id,
                Utc::now(),
                conversation_id,
                QuestionStatus::Unanswered
            ],
        )?;
        Ok(updated)
    }

    pub fn insert_export(
        &self,
        conversation_id: i64,
        prd_version_id: i64,
        format: ExportFormat,
        file_path: &str,
    ) -> Result<ExportRecord, StoreError> {
        let now = Utc::now();
        self.conn.execute(
            r#"
            INSERT INTO export (prd_version_id, conversation_id, export_format, file_path, status,
                created_at, updated_at)
            VALUES (?1, ?2, ?3, ?4, 'completed', ?5, ?6)
            "#,
            params![prd_version_id, conversation_id, format, file_path, now, now],
        )?;
        let id = self.conn.last_insert_rowid();
        self.conn
            .query_row(
                &format!("SELECT {} FROM export WHERE id = ?1", EXPORT_COLUMNS),
                params![id],
                export_from_row,
            )
            .optional()?
            .ok_or(StoreError::MissingRow { table: "export", id })
    }

    pub fn list_exports(&self, conversation_id: i64) -> Result<Vec<ExportRecord>, StoreError> {
        let mut stmt = self.conn.prepare(&format!(
            "SELECT {} FROM export WHERE conversation_id = ?1 ORDER BY id",
            EXPORT_COLUMNS
        ))?;
        let exports = stmt
            .query_map(params![conversation_id], export_from_row)?
            .collect::<Result<Vec<_>, _>>()?;
        Ok(exports)
    }
}
