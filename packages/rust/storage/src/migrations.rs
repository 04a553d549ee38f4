//! SQL migration definitions for the DocPilot database.
//!
//! Migrations are applied in order on database open. Each migration has a
//! version number and a set of SQL statements executed as a batch.

/// A database migration with a version and SQL statements.
pub(crate) struct Migration {
    pub version: u32,
    pub description: &'static str,
    pub sql: &'static str,
}

/// All migrations, in ascending version order.
pub(crate) fn all_migrations() -> Vec<Migration> {
    vec![Migration {
        version: 1,
        description: "Initial schema: hook_executions",
        sql: r#"
-- Schema version tracking
CREATE TABLE IF NOT EXISTS schema_migrations (
    version    INTEGER PRIMARY KEY,
    applied_at TEXT NOT NULL DEFAULT (datetime('now'))
);

-- Append-only hook execution log. Rows are inserted when a run starts
-- and finalized exactly once; finalized rows are never updated again.
CREATE TABLE IF NOT EXISTS hook_executions (
    id          TEXT PRIMARY KEY,
    doc_key     TEXT NOT NULL,
    trigger_kind TEXT NOT NULL,
    started_at  TEXT NOT NULL,
    finished_at TEXT,
    outcome     TEXT,
    error       TEXT
);

CREATE INDEX IF NOT EXISTS idx_hook_executions_doc_key
    ON hook_executions(doc_key, started_at DESC);

INSERT INTO schema_migrations (version) VALUES (1);
"#,
    }]
}
