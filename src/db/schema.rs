pub const SCHEMA_VERSION: i32 = 2;

pub const SCHEMA_V1: &str = r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_version (
    id INTEGER PRIMARY KEY,
    version INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS app_settings (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);

-- Core contact table
CREATE TABLE IF NOT EXISTS contacts (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    first_name TEXT NOT NULL CHECK (length(trim(first_name)) > 0),
    last_name TEXT NOT NULL CHECK (length(trim(last_name)) > 0),
    company TEXT,
    title TEXT,
    birthday TEXT,
    linkedin_url TEXT,
    notes TEXT,
    is_deleted INTEGER NOT NULL DEFAULT 0,
    deleted_at TEXT,
    created_at TEXT NOT NULL,
    updated_at TEXT NOT NULL
);

CREATE TABLE IF NOT EXISTS contact_emails (
    id TEXT PRIMARY KEY,
    contact_id TEXT NOT NULL,
    address TEXT NOT NULL,
    -- Case-folded identity, written by the application
    address_key TEXT NOT NULL,
    label TEXT NOT NULL DEFAULT 'personal',
    is_primary INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS contact_phones (
    id TEXT PRIMARY KEY,
    contact_id TEXT NOT NULL,
    number TEXT NOT NULL,
    label TEXT NOT NULL DEFAULT 'mobile',
    is_primary INTEGER NOT NULL DEFAULT 0,
    position INTEGER NOT NULL DEFAULT 0,
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS tags (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    name TEXT NOT NULL,
    -- Case-folded name, written by the application
    name_key TEXT NOT NULL,
    created_at TEXT NOT NULL,
    UNIQUE(owner_id, name_key)
);

CREATE TABLE IF NOT EXISTS contact_tags (
    contact_id TEXT NOT NULL,
    tag_id TEXT NOT NULL,
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE,
    FOREIGN KEY (tag_id) REFERENCES tags(id) ON DELETE CASCADE,
    PRIMARY KEY (contact_id, tag_id)
);

-- Append-only history; (contact_id, version) is the concurrency backstop
CREATE TABLE IF NOT EXISTS contact_versions (
    id TEXT PRIMARY KEY,
    contact_id TEXT NOT NULL,
    version INTEGER NOT NULL CHECK (version >= 1),
    snapshot TEXT NOT NULL,
    changes TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE,
    UNIQUE(contact_id, version)
);

CREATE TABLE IF NOT EXISTS tasks (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    title TEXT NOT NULL,
    contact_id TEXT,
    created_at TEXT NOT NULL,
    completed_at TEXT,
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE SET NULL
);

-- Indexes
CREATE INDEX IF NOT EXISTS idx_contact_owner ON contacts(owner_id, is_deleted);
CREATE INDEX IF NOT EXISTS idx_contact_name ON contacts(owner_id, last_name, first_name);
CREATE INDEX IF NOT EXISTS idx_email_contact ON contact_emails(contact_id, position);
CREATE INDEX IF NOT EXISTS idx_email_address_key ON contact_emails(address_key);
CREATE INDEX IF NOT EXISTS idx_phone_contact ON contact_phones(contact_id, position);
CREATE INDEX IF NOT EXISTS idx_contact_tag_tag ON contact_tags(tag_id);
CREATE INDEX IF NOT EXISTS idx_version_created ON contact_versions(created_at);
CREATE INDEX IF NOT EXISTS idx_task_owner_created ON tasks(owner_id, created_at);
CREATE INDEX IF NOT EXISTS idx_task_owner_completed ON tasks(owner_id, completed_at);
"#;

/// V2 migration: merge audit log and per-owner feed suppression
pub const MIGRATION_V2: &str = r#"
CREATE TABLE IF NOT EXISTS contact_merge_records (
    id TEXT PRIMARY KEY,
    owner_id TEXT NOT NULL,
    primary_contact_id TEXT NOT NULL,
    primary_name TEXT NOT NULL,
    secondary_contact_id TEXT NOT NULL,
    secondary_name TEXT NOT NULL,
    emails_merged INTEGER NOT NULL DEFAULT 0,
    phones_merged INTEGER NOT NULL DEFAULT 0,
    tags_merged INTEGER NOT NULL DEFAULT 0,
    created_at TEXT NOT NULL,
    FOREIGN KEY (primary_contact_id) REFERENCES contacts(id) ON DELETE CASCADE
);

CREATE TABLE IF NOT EXISTS hidden_feed_contacts (
    owner_id TEXT NOT NULL,
    contact_id TEXT NOT NULL,
    created_at TEXT NOT NULL,
    FOREIGN KEY (contact_id) REFERENCES contacts(id) ON DELETE CASCADE,
    PRIMARY KEY (owner_id, contact_id)
);

CREATE INDEX IF NOT EXISTS idx_merge_owner_created ON contact_merge_records(owner_id, created_at);
"#;
