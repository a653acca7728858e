use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt;
use std::str::FromStr;

/// Title used when the model does not provide one
pub const DEFAULT_TITLE: &str = "Product Requirements Document";

/// Overview used when the model does not provide one
pub const DEFAULT_OVERVIEW: &str = "Product overview will be generated from your input.";

const FALLBACK_OBJECTIVES: [&str; 3] = [
    "Define clear business goals",
    "Identify target market",
    "Establish success metrics",
];

const FALLBACK_FEATURES: [&str; 4] = [
    "Core functionality",
    "User interface",
    "Data management",
    "User authentication",
];

const FALLBACK_REQUIREMENTS: [&str; 3] = [
    "Web-based application",
    "Mobile responsive design",
    "Secure data storage",
];

const FALLBACK_USER_STORIES: [&str; 2] = [
    "As a user, I want to access the application, so that I can use its features",
    "As a user, I want to save my data, so that I can access it later",
];

/// A product requirements document as rendered in the document pane
///
/// Every field defaults, so an empty JSON object decodes to an empty document.
/// The wire name of `user_stories` is `userStories`.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PrdDocument {
    pub title: String,
    pub overview: String,
    pub objectives: Vec<String>,
    pub features: Vec<String>,
    pub requirements: Vec<String>,
    #[serde(rename = "userStories")]
    pub user_stories: Vec<String>,
}

/// The list-valued sections of a document
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListSection {
    Objectives,
    Features,
    Requirements,
    UserStories,
}

impl ListSection {
    pub const ALL: [ListSection; 4] = [
        ListSection::Objectives,
        ListSection::Features,
        ListSection::Requirements,
        ListSection::UserStories,
    ];

    /// JSON key used by the generator and the front end
    pub fn key(self) -> &'static str {
        match self {
            ListSection::Objectives => "objectives",
            ListSection::Features => "features",
            ListSection::Requirements => "requirements",
            ListSection::UserStories => "userStories",
        }
    }

    /// Human-readable heading
    pub fn heading(self) -> &'static str {
        match self {
            ListSection::Objectives => "Objectives",
            ListSection::Features => "Features",
            ListSection::Requirements => "Requirements",
            ListSection::UserStories => "User Stories",
        }
    }

    fn fallback(self) -> &'static [&'static str] {
        match self {
            ListSection::Objectives => &FALLBACK_OBJECTIVES,
            ListSection::Features => &FALLBACK_FEATURES,
            ListSection::Requirements => &FALLBACK_REQUIREMENTS,
            ListSection::UserStories => &FALLBACK_USER_STORIES,
        }
    }
}

/// Error returned when generated content cannot be turned into a document
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("expected a JSON object for the PRD, got {0}")]
pub struct NotAnObject(pub &'static str);

impl PrdDocument {
    /// Borrow one of the list sections
    pub fn section(&self, section: ListSection) -> &[String] {
        match section {
            ListSection::Objectives => &self.objectives,
            ListSection::Features => &self.features,
            ListSection::Requirements => &self.requirements,
            ListSection::UserStories => &self.user_stories,
        }
    }

    fn section_mut(&mut self, section: ListSection) -> &mut Vec<String> {
        match section {
            ListSection::Objectives => &mut self.objectives,
            ListSection::Features => &mut self.features,
            ListSection::Requirements => &mut self.requirements,
            ListSection::UserStories => &mut self.user_stories,
        }
    }

    /// True when no field carries any content
    pub fn is_empty(&self) -> bool {
        self.title.is_empty()
            && self.overview.is_empty()
            && ListSection::ALL.iter().all(|s| self.section(*s).is_empty())
    }

    /// Merge an incoming document into this one
    ///
    /// A non-empty incoming title or overview replaces the current value.
    /// List items are appended in order, skipping items already present.
    ///
    /// # Returns
    /// The number of list items that were appended
    pub fn merge(&mut self, mut incoming: PrdDocument) -> usize {
        if !incoming.title.trim().is_empty() {
            self.title = std::mem::take(&mut incoming.title);
        }
        if !incoming.overview.trim().is_empty() {
            self.overview = std::mem::take(&mut incoming.overview);
        }

        let mut appended = 0;
        for section in ListSection::ALL {
            let items = std::mem::take(incoming.section_mut(section));
            let target = self.section_mut(section);
            for item in items {
                if !target.contains(&item) {
                    target.push(item);
                    appended += 1;
                }
            }
        }
        appended
    }

    /// Build a document from model output, filling gaps with defaults
    ///
    /// # Arguments
    /// * `value` - The decoded JSON the generator produced
    ///
    /// # Returns
    /// The normalized document, or an error if `value` is not an object
    pub fn from_generated(value: &Value) -> Result<Self, NotAnObject> {
        let object = value.as_object().ok_or(NotAnObject(json_kind(value)))?;

        let text_or = |key: &str, default: &str| match object.get(key) {
            None | Some(Value::Null) => default.to_string(),
            Some(Value::String(s)) => s.clone(),
            Some(other) => other.to_string(),
        };

        let mut document = PrdDocument {
            title: text_or("title", DEFAULT_TITLE),
            overview: text_or("overview", DEFAULT_OVERVIEW),
            ..PrdDocument::default()
        };

        for section in ListSection::ALL {
            let mut items = match object.get(section.key()) {
                Some(Value::Array(values)) => values.iter().map(value_to_text).collect(),
                Some(other) if is_truthy(other) => vec![value_to_text(other)],
                _ => Vec::new(),
            };
            if items.is_empty() {
                items = section.fallback().iter().map(|s| s.to_string()).collect();
            }
            *document.section_mut(section) = items;
        }

        Ok(document)
    }

    /// Decode a document sent over the wire, one field at a time
    ///
    /// Unlike [`PrdDocument::from_generated`] nothing is filled in: a field
    /// of the wrong shape is left empty and the rest still decode. Anything
    /// other than an object yields an empty document.
    pub fn from_payload(value: &Value) -> Self {
        let Some(object) = value.as_object() else {
            return PrdDocument::default();
        };

        let text = |key: &str| match object.get(key) {
            None | Some(Value::Null | Value::Array(_) | Value::Object(_)) => String::new(),
            Some(other) => value_to_text(other),
        };

        let mut document = PrdDocument {
            title: text("title"),
            overview: text("overview"),
            ..PrdDocument::default()
        };
        for section in ListSection::ALL {
            *document.section_mut(section) = match object.get(section.key()) {
                Some(Value::Array(values)) => values
                    .iter()
                    .filter(|v| !v.is_null())
                    .map(value_to_text)
                    .collect(),
                Some(Value::String(s)) if !s.is_empty() => vec![s.clone()],
                _ => Vec::new(),
            };
        }
        document
    }
}

fn value_to_text(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

fn is_truthy(value: &Value) -> bool {
    match value {
        Value::Null => false,
        Value::Bool(b) => *b,
        Value::Number(n) => n.as_f64().is_some_and(|f| f != 0.0),
        Value::String(s) => !s.is_empty(),
        Value::Array(a) => !a.is_empty(),
        Value::Object(o) => !o.is_empty(),
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}

/// Kind of change recorded between two document versions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ChangeType {
    Added,
    Modified,
    Removed,
}

impl ChangeType {
    pub fn as_str(self) -> &'static str {
        match self {
            ChangeType::Added => "added",
            ChangeType::Modified => "modified",
            ChangeType::Removed => "removed",
        }
    }
}

impl fmt::Display for ChangeType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for ChangeType {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "added" => Ok(ChangeType::Added),
            "modified" => Ok(ChangeType::Modified),
            "removed" => Ok(ChangeType::Removed),
            _ => Err(format!(
                "Invalid change type '{}'. Valid options are: added, modified, removed",
                s
            )),
        }
    }
}

/// One section-level difference between two versions of a document
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionChange {
    pub section: String,
    pub change_type: ChangeType,
    pub old_content: Option<String>,
    pub new_content: Option<String>,
}

/// Compute section-level changes from `old` to `new`
///
/// With no previous version every non-empty section counts as added. List
/// sections are compared as a whole and stored one item per line.
pub fn diff_sections(old: Option<&PrdDocument>, new: &PrdDocument) -> Vec<SectionChange> {
    let empty = PrdDocument::default();
    let old = old.unwrap_or(&empty);

    let mut pairs: Vec<(&str, String, String)> = vec![
        ("title", old.title.clone(), new.title.clone()),
        ("overview", old.overview.clone(), new.overview.clone()),
    ];
    for section in ListSection::ALL {
        pairs.push((
            section.key(),
            old.section(section).join("\n"),
            new.section(section).join("\n"),
        ));
    }

    pairs
        .into_iter()
        .filter_map(|(section, before, after)| {
            let change_type = match (before.is_empty(), after.is_empty()) {
                (true, false) => ChangeType::Added,
                (false, true) => ChangeType::Removed,
                (false, false) if before != after => ChangeType::Modified,
                _ => return None,
            };
            Some(SectionChange {
                section: section.to_string(),
                change_type,
                old_content: (!before.is_empty()).then_some(before),
                new_content: (!after.is_empty()).then_some(after),
            })
        })
        .collect()
}
