/// Table names, children before parents
pub const TABLES: [&str; 7] = [
    "prd_change",
    "export",
    "clarifying_question",
    "file_attachment",
    "prd_version",
    "message",
    "conversation",
];

/// Idempotent schema for the PRD database
///
/// `conversation.current_prd_version_id` and `prd_version.conversation_id`
/// reference each other; SQLite resolves the forward reference lazily.
pub const SCHEMA: &str = r#"
CREATE TABLE IF NOT EXISTS conversation (
    id INTEGER PRIMARY KEY,
    title TEXT,
    current_prd_version_id INTEGER REFERENCES prd_version(id) ON DELETE SET NULL,
    status TEXT NOT NULL DEFAULT 'active',
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS message (
    id INTEGER PRIMARY KEY,
    conversation_id INTEGER NOT NULL REFERENCES conversation(id) ON DELETE CASCADE,
    sender TEXT NOT NULL,
    message_type TEXT NOT NULL,
    content TEXT NOT NULL,
    metadata TEXT,
    status TEXT NOT NULL DEFAULT 'delivered',
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_message_conversation_id ON message(conversation_id);

CREATE TABLE IF NOT EXISTS file_attachment (
    id INTEGER PRIMARY KEY,
    conversation_id INTEGER NOT NULL REFERENCES conversation(id) ON DELETE CASCADE,
    original_filename TEXT NOT NULL,
    file_type TEXT NOT NULL,
    file_size INTEGER NOT NULL,
    storage_path TEXT NOT NULL,
    extracted_text TEXT,
    status TEXT NOT NULL DEFAULT 'uploaded',
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_file_attachment_conversation_id ON file_attachment(conversation_id);

CREATE TABLE IF NOT EXISTS prd_version (
    id INTEGER PRIMARY KEY,
    conversation_id INTEGER NOT NULL REFERENCES conversation(id) ON DELETE CASCADE,
    version_number INTEGER NOT NULL,
    content TEXT NOT NULL,
    change_summary TEXT,
    generated_by_ai_message_id INTEGER REFERENCES message(id) ON DELETE SET NULL,
    trigger_type TEXT,
    status TEXT NOT NULL DEFAULT 'complete',
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL,
    CONSTRAINT uq_conversation_version UNIQUE (conversation_id, version_number)
);
CREATE INDEX IF NOT EXISTS idx_prd_version_conversation_id ON prd_version(conversation_id);

CREATE TABLE IF NOT EXISTS clarifying_question (
    id INTEGER PRIMARY KEY,
    conversation_id INTEGER NOT NULL REFERENCES conversation(id) ON DELETE CASCADE,
    prd_version_id INTEGER REFERENCES prd_version(id) ON DELETE SET NULL,
    question_text TEXT NOT NULL,
    category TEXT,
    priority INTEGER NOT NULL DEFAULT 0,
    ai_message_id INTEGER REFERENCES message(id) ON DELETE SET NULL,
    user_message_id INTEGER REFERENCES message(id) ON DELETE SET NULL,
    answer TEXT,
    status TEXT NOT NULL DEFAULT 'unanswered',
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_clarifying_question_conversation_id
    ON clarifying_question(conversation_id);

CREATE TABLE IF NOT EXISTS prd_change (
    id INTEGER PRIMARY KEY,
    prd_version_id INTEGER NOT NULL REFERENCES prd_version(id) ON DELETE CASCADE,
    previous_prd_version_id INTEGER REFERENCES prd_version(id) ON DELETE CASCADE,
    section TEXT NOT NULL,
    change_type TEXT NOT NULL,
    old_content TEXT,
    new_content TEXT,
    reason TEXT,
    metadata TEXT,
    created_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_prd_change_prd_version_id ON prd_change(prd_version_id);

CREATE TABLE IF NOT EXISTS export (
    id INTEGER PRIMARY KEY,
    prd_version_id INTEGER NOT NULL REFERENCES prd_version(id) ON DELETE CASCADE,
    conversation_id INTEGER NOT NULL REFERENCES conversation(id) ON DELETE CASCADE,
    export_format TEXT NOT NULL,
    file_path TEXT,
    status TEXT NOT NULL DEFAULT 'completed',
    metadata TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);
CREATE INDEX IF NOT EXISTS idx_export_prd_version_id ON export(prd_version_id);
CREATE INDEX IF NOT EXISTS idx_export_conversation_id ON export(conversation_id);
"#;
