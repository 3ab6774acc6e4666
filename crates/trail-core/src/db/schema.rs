//! Canonical SQLite schema for the trail database.
//!
//! The schema is normalized around the two-sources-of-truth design:
//! - `tasks` and `task_relations` hold the authoritative live state
//! - `task_history` is the append-only ledger auditing them
//!
//! `task_history` enforces the ledger invariants structurally:
//! `UNIQUE (task_id, sequence)` turns any concurrent sequence collision into
//! a hard constraint error, and `ON DELETE CASCADE` is the only way entries
//! ever disappear.

/// Migration v1: live tables plus the history ledger.
pub const MIGRATION_V1_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS tasks (
    task_id TEXT PRIMARY KEY CHECK (length(trim(task_id)) > 0),
    name TEXT NOT NULL,
    description TEXT,
    priority TEXT CHECK (priority IS NULL OR priority IN ('low', 'medium', 'high', 'urgent')),
    completed INTEGER NOT NULL DEFAULT 0 CHECK (completed IN (0, 1)),
    start_date_us INTEGER,
    end_date_us INTEGER,
    estimation_points INTEGER,
    list_id TEXT,
    created_at_us INTEGER NOT NULL,
    updated_at_us INTEGER NOT NULL
);

CREATE TABLE IF NOT EXISTS task_relations (
    task_id TEXT NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    kind TEXT NOT NULL CHECK (kind IN ('assignee', 'label', 'project')),
    related_id TEXT NOT NULL CHECK (length(trim(related_id)) > 0),
    created_at_us INTEGER NOT NULL,
    PRIMARY KEY (task_id, kind, related_id)
);

CREATE TABLE IF NOT EXISTS task_history (
    entry_id TEXT PRIMARY KEY CHECK (entry_id LIKE 'blake3:%'),
    task_id TEXT NOT NULL REFERENCES tasks(task_id) ON DELETE CASCADE,
    changed_at_us INTEGER NOT NULL,
    sequence INTEGER NOT NULL CHECK (sequence >= 0),
    change_type TEXT NOT NULL CHECK (
        change_type IN ('entity.created', 'field.updated', 'relation.added', 'relation.removed')
    ),
    field_name TEXT CHECK (field_name IS NULL OR field_name IN (
        'name', 'description', 'priority', 'completed',
        'start_date', 'end_date', 'estimation_points', 'list_id'
    )),
    relation_kind TEXT CHECK (relation_kind IS NULL OR relation_kind IN ('assignee', 'label', 'project')),
    related_id TEXT,
    old_value TEXT,
    new_value TEXT,
    actor_id TEXT,
    metadata TEXT,
    UNIQUE (task_id, sequence)
);
"#;

/// Migration v2: read-path indexes for replay prefixes and history pages.
pub const MIGRATION_V2_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_task_history_position
    ON task_history(task_id, changed_at_us, sequence);

CREATE INDEX IF NOT EXISTS idx_task_history_relation
    ON task_history(task_id, relation_kind, changed_at_us, sequence);

CREATE INDEX IF NOT EXISTS idx_task_history_type
    ON task_history(task_id, change_type, changed_at_us DESC, sequence DESC);

CREATE INDEX IF NOT EXISTS idx_task_relations_kind
    ON task_relations(task_id, kind, related_id);
"#;

/// Indexes expected by the replay and listing query paths.
pub const REQUIRED_INDEXES: &[&str] = &[
    "idx_task_history_position",
    "idx_task_history_relation",
    "idx_task_history_type",
    "idx_task_relations_kind",
];
