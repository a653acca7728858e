//! Document export
//!
//! Renders a [`PrdDocument`] as plain text or markdown and derives the
//! download filename from its title.

use super::document::{ListSection, PrdDocument};
use chrono::NaiveDate;
use std::fmt::Write;

const UNTITLED: &str = "Untitled PRD";
const EMPTY_SECTION: &str = "(none yet)";

/// Render the document as plain text with upper-case headings
pub fn render_text(document: &PrdDocument) -> String {
    let mut out = String::new();
    let title = non_empty_or(&document.title, UNTITLED);
    let _ = writeln!(out, "{}", title);
    let _ = writeln!(out, "{}", "=".repeat(title.chars().count()));
    let _ = writeln!(out);

    let _ = writeln!(out, "OVERVIEW");
    let _ = writeln!(out, "{}", non_empty_or(&document.overview, EMPTY_SECTION));

    for section in ListSection::ALL {
        let _ = writeln!(out);
        let _ = writeln!(out, "{}", section.heading().to_uppercase());
        let items = document.section(section);
        if items.is_empty() {
            let _ = writeln!(out, "{}", EMPTY_SECTION);
        }
        for item in items {
            let _ = writeln!(out, "- {}", item);
        }
    }

    out
}

/// Render the document as markdown
pub fn render_markdown(document: &PrdDocument) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "# {}", non_empty_or(&document.title, UNTITLED));
    let _ = writeln!(out);
    let _ = writeln!(out, "## Overview");
    let _ = writeln!(out);
    let _ = writeln!(out, "{}", non_empty_or(&document.overview, EMPTY_SECTION));

    for section in ListSection::ALL {
        let _ = writeln!(out);
        let _ = writeln!(out, "## {}", section.heading());
        let _ = writeln!(out);
        let items = document.section(section);
        if items.is_empty() {
            let _ = writeln!(out, "_{}_", EMPTY_SECTION);
        }
        for item in items {
            let _ = writeln!(out, "- {}", item);
        }
    }

    out
}

/// Turn a title into a filesystem-safe stem
///
/// Lower-cases the title, replaces every run of non-alphanumeric characters
/// with a single `_` and trims underscores from both ends. An empty result
/// becomes `prd`.
pub fn sanitize_title(title: &str) -> String {
    let mut stem = String::with_capacity(title.len());
    let mut pending_separator = false;
    for ch in title.chars() {
        if ch.is_alphanumeric() {
            if pending_separator && !stem.is_empty() {
                stem.push('_');
            }
            pending_separator = false;
            stem.extend(ch.to_lowercase());
        } else {
            pending_separator = true;
        }
    }

    if stem.is_empty() {
        "prd".to_string()
    } else {
        stem
    }
}

/// Filename for a text export: `<sanitized title>_<YYYY-MM-DD>.txt`
pub fn export_filename(title: &str, date: NaiveDate) -> String {
    filename_with_extension(title, date, "txt")
}

/// Filename for an export with an arbitrary extension
pub fn filename_with_extension(title: &str, date: NaiveDate, extension: &str) -> String {
    format!(
        "{}_{}.{}",
        sanitize_title(title),
        date.format("%Y-%m-%d"),
        extension
    )
}

fn non_empty_or<'a>(value: &'a str, fallback: &'a str) -> &'a str {
    if value.trim().is_empty() {
        fallback
    } else {
        value
    }
}
