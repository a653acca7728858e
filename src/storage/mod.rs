//! SQLite persistence
//!
//! A single [`Database`] wraps one rusqlite connection with foreign keys
//! enforced. Record access is split by table group:
//! - `attachments`: file attachment CRUD
//! - `conversations`: conversations and messages
//! - `versions`: PRD versions, their changes, clarifying questions and exports

mod attachments;
mod conversations;
mod schema;
mod versions;

use crate::models::{
    AttachmentStatus, ConversationStatus, ExportFormat, FileType, MessageStatus, QuestionStatus,
    Sender, VersionStatus,
};
use crate::prd::ChangeType;
use rusqlite::types::{FromSql, FromSqlError, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use rusqlite::{Connection, params};
use serde::Serialize;
use std::path::{Path, PathBuf};

pub use schema::TABLES;
pub use versions::{NewPrdVersion, RecordedExchange};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("io: {0}")]
    Io(#[from] std::io::Error),
    #[error("sqlite: {0}")]
    Sql(#[from] rusqlite::Error),
    #[error("json: {0}")]
    Json(#[from] serde_json::Error),
    #[error("row {id} vanished from {table}")]
    MissingRow { table: &'static str, id: i64 },
    #[error("database lock poisoned")]
    Poisoned,
}

/// Summary returned by `db-info` and the maintenance commands
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DatabaseInfo {
    pub path: Option<PathBuf>,
    pub exists: bool,
    pub size_mb: f64,
    pub tables: Vec<TableCount>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct TableCount {
    pub table: String,
    pub rows: i64,
}

pub struct Database {
    conn: Connection,
    path: Option<PathBuf>,
}

impl Database {
    /// Open (creating if needed) the database file and apply the schema
    ///
    /// # Arguments
    /// * `path` - Location of the SQLite file; parent directories are created
    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        let path = path.as_ref().to_path_buf();
        if let Some(parent) = path.parent().filter(|p| !p.as_os_str().is_empty()) {
            std::fs::create_dir_all(parent)?;
        }
        let conn = Connection::open(&path)?;
        let db = Self {
            conn,
            path: Some(path),
        };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    /// Open a private in-memory database with the schema applied
    pub fn open_in_memory() -> Result<Self, StoreError> {
        let db = Self {
            conn: Connection::open_in_memory()?,
            path: None,
        };
        db.configure()?;
        db.migrate()?;
        Ok(db)
    }

    pub fn path(&self) -> Option<&Path> {
        self.path.as_deref()
    }

    fn configure(&self) -> Result<(), StoreError> {
        self.conn.execute_batch("PRAGMA foreign_keys=ON;")?;
        Ok(())
    }

    /// Create any missing tables and indexes
    pub fn migrate(&self) -> Result<(), StoreError> {
        self.conn.execute_batch(schema::SCHEMA)?;
        Ok(())
    }

    /// Drop every table and recreate the schema
    pub fn reset(&self) -> Result<(), StoreError> {
        let mut batch = String::from("PRAGMA foreign_keys=OFF;\n");
        for table in TABLES {
            batch.push_str(&format!("DROP TABLE IF EXISTS {};\n", table));
        }
        batch.push_str("PRAGMA foreign_keys=ON;\n");
        self.conn.execute_batch(&batch)?;
        self.migrate()
    }

    /// Cheap round trip used by the health check
    pub fn ping(&self) -> Result<(), StoreError> {
        self.conn.query_row("SELECT 1", [], |row| row.get::<_, i64>(0))?;
        Ok(())
    }

    pub fn count_rows(&self, table: &str) -> Result<i64, StoreError> {
        if !TABLES.contains(&table) {
            return Err(StoreError::Sql(rusqlite::Error::InvalidParameterName(
                table.to_string(),
            )));
        }
        let count = self
            .conn
            .query_row(&format!("SELECT COUNT(*) FROM {}", table), [], |row| {
                row.get(0)
            })?;
        Ok(count)
    }

    /// Location, size and per-table row counts
    pub fn info(&self) -> Result<DatabaseInfo, StoreError> {
        let metadata = self.path.as_ref().and_then(|p| std::fs::metadata(p).ok());
        let size_mb = metadata
            .as_ref()
            .map(|m| (m.len() as f64 / (1024.0 * 1024.0) * 100.0).round() / 100.0)
            .unwrap_or(0.0);

        let mut tables = Vec::with_capacity(TABLES.len());
        for table in TABLES.iter().rev() {
            tables.push(TableCount {
                table: table.to_string(),
                rows: self.count_rows(table)?,
            });
        }

        Ok(DatabaseInfo {
            path: self.path.clone(),
            exists: metadata.is_some(),
            size_mb,
            tables,
        })
    }

    /// True if a conversation row with this id exists
    pub fn conversation_exists(&self, id: i64) -> Result<bool, StoreError> {
        let exists = self.conn.query_row(
            "SELECT EXISTS(SELECT 1 FROM conversation WHERE id = ?1)",
            params![id],
            |row| row.get(0),
        )?;
        Ok(exists)
    }
}

/// Store string-backed enums as their wire names
macro_rules! text_column {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl ToSql for $ty {
                fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                    Ok(ToSqlOutput::from(self.as_str()))
                }
            }

            impl FromSql for $ty {
                fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                    value
                        .as_str()?
                        .parse()
                        .map_err(|e: String| FromSqlError::Other(e.into()))
                }
            }
        )+
    };
}

text_column!(
    FileType,
    AttachmentStatus,
    ConversationStatus,
    Sender,
    MessageStatus,
    VersionStatus,
    QuestionStatus,
    ExportFormat,
    ChangeType,
);

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    #[test]
    fn test_open_creates_parent_directories() {
        let dir = TempDir::new().unwrap();
        let path = dir.path().join("nested").join("prd.db");

        let db = Database::open(&path).unwrap();
        assert!(path.exists());
        assert_eq!(db.path(), Some(path.as_path()));
    }

    #[test]
    fn test_migrate_is_idempotent() {
        let db = Database::open_in_memory().unwrap();
        db.migrate().unwrap();
        db.migrate().unwrap();
        assert_eq!(db.count_rows("file_attachment").unwrap(), 0);
    }

    #[test]
    fn test_info_lists_every_table() {
        let dir = TempDir::new().unwrap();
        let db = Database::open(dir.path().join("prd.db")).unwrap();

        let info = db.info().unwrap();
        assert!(info.exists);
        assert_eq!(info.tables.len(), TABLES.len());
        assert_eq!(info.tables[0].table, "conversation");
        assert!(info.tables.iter().all(|t| t.rows == 0));
    }

    #[test]
    fn test_count_rows_rejects_unknown_table() {
        let db = Database::open_in_memory().unwrap();
        assert!(db.count_rows("sqlite_master; DROP TABLE message").is_err());
    }

    #[test]
    fn test_foreign_keys_are_enforced() {
        let db = Database::open_in_memory().unwrap();
        let result = db.conn.execute(
            "INSERT INTO message (conversation_id, sender, message_type, content, created_at,
                 updated_at)
             VALUES (42, 'user', 'text', 'hi', '2025-01-01', '2025-01-01')",
            [],
        );
        assert!(result.is_err());
    }
}
