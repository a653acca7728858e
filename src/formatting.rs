//! Plain-text formatting for the command-line tools
//!
//! Used by the `chat` and `db-info` subcommands of the binary.

use crate::prd::{ChatMessage, ListSection, PrdDocument, Role};
use crate::storage::DatabaseInfo;

/// Format one transcript entry with a role prefix
///
/// # Arguments
/// * `message` - The chat message to display
///
/// # Returns
/// `"you> ..."` or `"assistant> ..."`, with continuation lines indented
pub fn format_message(message: &ChatMessage) -> String {
    let prefix = match message.role {
        Role::User => "you> ",
        Role::Assistant => "assistant> ",
    };
    let indent = " ".repeat(prefix.len());
    let mut lines = message.text.lines();
    let mut out = format!("{}{}", prefix, lines.next().unwrap_or(""));
    for line in lines {
        out.push('\n');
        out.push_str(&indent);
        out.push_str(line);
    }
    out
}

/// Compact view of the live document for the terminal
///
/// Empty sections are skipped, and a document with no content at all is
/// shown as a single placeholder line.
pub fn format_document(document: &PrdDocument) -> String {
    if document.is_empty() {
        return "(the document is empty; describe your product to start)".to_string();
    }

    let mut out = String::new();
    if !document.title.is_empty() {
        out.push_str(&format!("# {}\n", document.title));
    }
    if !document.overview.is_empty() {
        out.push_str(&format!("\n{}\n", document.overview));
    }
    for section in ListSection::ALL {
        let items = document.section(section);
        if items.is_empty() {
            continue;
        }
        out.push_str(&format!("\n{} ({})\n", section.heading(), items.len()));
        for item in items {
            out.push_str(&format!("  - {}\n", item));
        }
    }
    out
}

/// Summary printed by `db-info`
pub fn format_database_info(info: &DatabaseInfo) -> String {
    let path = info
        .path
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| ":memory:".to_string());

    let mut out = format!("Database: {}\n", path);
    out.push_str(&format!(
        "Exists: {}\n",
        if info.exists { "yes" } else { "no" }
    ));
    out.push_str(&format!("Size: {:.2} MB\n", info.size_mb));
    out.push_str("Tables:\n");
    let width = info
        .tables
        .iter()
        .map(|t| t.table.len())
        .max()
        .unwrap_or(0);
    for table in &info.tables {
        out.push_str(&format!(
            "  {:<width$}  {} row(s)\n",
            table.table,
            table.rows,
            width = width
        ));
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::storage::TableCount;
    use std::path::PathBuf;

    #[test]
    fn test_format_message_indents_continuation_lines() {
        let message = ChatMessage::assistant("Updated.\n1. Who pays?");
        assert_eq!(
            format_message(&message),
            "assistant> Updated.\n           1. Who pays?"
        );
        assert_eq!(format_message(&ChatMessage::user("hi")), "you> hi");
    }

    #[test]
    fn test_format_document_skips_empty_sections() {
        let document = PrdDocument {
            title: "Meal Planner".to_string(),
            objectives: vec!["Save time".to_string()],
            ..PrdDocument::default()
        };
        let text = format_document(&document);
        assert!(text.starts_with("# Meal Planner\n"));
        assert!(text.contains("Objectives (1)\n  - Save time\n"));
        assert!(!text.contains("Features"));
        assert!(format_document(&PrdDocument::default()).starts_with("(the document is empty"));
    }

    #[test]
    fn test_format_database_info() {
        let info = DatabaseInfo {
            path: Some(PathBuf::from("artifacts/prd-database.db")),
            exists: true,
            size_mb: 0.05,
            tables: vec![
                TableCount {
                    table: "conversation".to_string(),
                    rows: 2,
                },
                TableCount {
                    table: "export".to_string(),
                    rows: 0,
                },
            ],
        };
        let text = format_database_info(&info);
        assert!(
            text.starts_with("Database: artifacts/prd-database.db\nExists: yes\nSize: 0.05 MB\n")
        );
        assert!(text.contains("  conversation  2 row(s)\n"));
        assert!(text.contains("  export        0 row(s)\n"));
    }
}
