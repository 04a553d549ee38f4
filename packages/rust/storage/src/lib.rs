//! libSQL storage layer for the hook execution log.
//!
//! The [`Storage`] struct wraps a local libSQL database holding the
//! append-only [`HookExecutionRecord`] log. A record is inserted when a
//! pipeline run starts, finalized exactly once when it ends, and never
//! touched afterwards. Skipped runs are written already-finalized.

mod migrations;

use std::path::Path;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use libsql::{Connection, Database, params};
use uuid::Uuid;

use docpilot_shared::{
    DocPilotError, ExecutionOutcome, HookExecutionRecord, Result, TriggerKind,
};

/// Primary storage handle wrapping a libSQL database.
pub struct Storage {
    #[allow(dead_code)]
    db: Database,
    conn: Connection,
    readonly: bool,
}

impl Storage {
    /// Open or create a database at `path` in read-write mode.
    pub async fn open(path: &Path) -> Result<Self> {
        // Ensure parent directory exists
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(|e| DocPilotError::io(parent, e))?;
        }

        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;

        let storage = Self {
            db,
            conn,
            readonly: false,
        };
        storage.run_migrations().await?;
        Ok(storage)
    }

    /// Open a database at `path` in read-only mode (status inspection).
    pub async fn open_readonly(path: &Path) -> Result<Self> {
        let db = libsql::Builder::new_local(path)
            .build()
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;

        let conn = db
            .connect()
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;

        Ok(Self {
            db,
            conn,
            readonly: true,
        })
    }

    /// Run pending schema migrations.
    async fn run_migrations(&self) -> Result<()> {
        let current_version = self.get_schema_version().await;

        for migration in migrations::all_migrations() {
            if migration.version > current_version {
                tracing::info!(
                    version = migration.version,
                    description = migration.description,
                    "applying migration"
                );
                self.conn.execute_batch(migration.sql).await.map_err(|e| {
                    DocPilotError::Storage(format!("migration v{} failed: {e}", migration.version))
                })?;
            }
        }
        Ok(())
    }

    /// Get the current schema version, or 0 if no migrations have been applied.
    async fn get_schema_version(&self) -> u32 {
        let result = self
            .conn
            .query("SELECT MAX(version) FROM schema_migrations", params![])
            .await;

        match result {
            Ok(mut rows) => {
                if let Ok(Some(row)) = rows.next().await {
                    row.get::<u32>(0).unwrap_or(0)
                } else {
                    0
                }
            }
            Err(_) => 0, // Table doesn't exist yet
        }
    }

    /// Ensure we're in read-write mode before writing.
    fn check_writable(&self) -> Result<()> {
        if self.readonly {
            return Err(DocPilotError::Storage(
                "database is opened in read-only mode".into(),
            ));
        }
        Ok(())
    }

    // -----------------------------------------------------------------------
    // Execution log operations
    // -----------------------------------------------------------------------

    /// Record the start of a pipeline run. Returns the generated record ID.
    pub async fn begin_execution(&self, doc_key: &str, trigger: TriggerKind) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO hook_executions (id, doc_key, trigger_kind, started_at)
                 VALUES (?1, ?2, ?3, ?4)",
                params![id.as_str(), doc_key, trigger.as_str(), now.as_str()],
            )
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Finalize a run. Only touches the row if it is still in flight, so a
    /// record can never be finalized twice.
    pub async fn finish_execution(
        &self,
        id: &str,
        outcome: ExecutionOutcome,
        error: Option<&str>,
    ) -> Result<()> {
        self.check_writable()?;
        let now = Utc::now().to_rfc3339();
        let changed = self
            .conn
            .execute(
                "UPDATE hook_executions SET finished_at = ?1, outcome = ?2, error = ?3
                 WHERE id = ?4 AND finished_at IS NULL",
                params![now.as_str(), outcome.as_str(), error, id],
            )
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;
        if changed == 0 {
            return Err(DocPilotError::Storage(format!(
                "execution {id} not found or already finalized"
            )));
        }
        Ok(())
    }

    /// Record a trigger that was skipped because a run for the same doc
    /// key was already in flight. Written already-finalized.
    pub async fn record_skipped(&self, doc_key: &str, trigger: TriggerKind) -> Result<String> {
        self.check_writable()?;
        let id = Uuid::now_v7().to_string();
        let now = Utc::now().to_rfc3339();
        self.conn
            .execute(
                "INSERT INTO hook_executions (id, doc_key, trigger_kind, started_at, finished_at, outcome)
                 VALUES (?1, ?2, ?3, ?4, ?4, ?5)",
                params![
                    id.as_str(),
                    doc_key,
                    trigger.as_str(),
                    now.as_str(),
                    ExecutionOutcome::SkippedInFlight.as_str(),
                ],
            )
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;
        Ok(id)
    }

    /// Most recent executions for a doc key, newest first.
    pub async fn recent_executions(
        &self,
        doc_key: &str,
        limit: u32,
    ) -> Result<Vec<HookExecutionRecord>> {
        let mut rows = self
            .conn
            .query(
                "SELECT id, doc_key, trigger_kind, started_at, finished_at, outcome, error
                 FROM hook_executions WHERE doc_key = ?1
                 ORDER BY started_at DESC, id DESC
                 LIMIT ?2",
                params![doc_key, limit],
            )
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;

        let mut results = Vec::new();
        while let Ok(Some(row)) = rows.next().await {
            results.push(row_to_record(&row)?);
        }
        Ok(results)
    }

    /// True when an unfinalized run exists for the doc key. Used to detect
    /// a crashed run left behind by a previous process.
    pub async fn has_in_flight(&self, doc_key: &str) -> Result<bool> {
        let mut rows = self
            .conn
            .query(
                "SELECT 1 FROM hook_executions
                 WHERE doc_key = ?1 AND finished_at IS NULL LIMIT 1",
                params![doc_key],
            )
            .await
            .map_err(|e| DocPilotError::Storage(e.to_string()))?;

        match rows.next().await {
            Ok(Some(_)) => Ok(true),
            Ok(None) => Ok(false),
            Err(e) => Err(DocPilotError::Storage(e.to_string())),
        }
    }
}

/// Convert a database row to a [`HookExecutionRecord`].
fn row_to_record(row: &libsql::Row) -> Result<HookExecutionRecord> {
    let trigger_str: String = row
        .get(2)
        .map_err(|e| DocPilotError::Storage(e.to_string()))?;
    let outcome_str: Option<String> = row.get::<String>(5).ok();

    Ok(HookExecutionRecord {
        id: row
            .get::<String>(0)
            .map_err(|e| DocPilotError::Storage(e.to_string()))?,
        doc_key: row
            .get::<String>(1)
            .map_err(|e| DocPilotError::Storage(e.to_string()))?,
        trigger: TriggerKind::from_str(&trigger_str).map_err(DocPilotError::Storage)?,
        started_at: parse_timestamp(
            &row.get::<String>(3)
                .map_err(|e| DocPilotError::Storage(e.to_string()))?,
        )?,
        finished_at: match row.get::<String>(4).ok() {
            Some(s) => Some(parse_timestamp(&s)?),
            None => None,
        },
        outcome: match outcome_str {
            Some(s) => Some(ExecutionOutcome::from_str(&s).map_err(DocPilotError::Storage)?),
            None => None,
        },
        error: row.get::<String>(6).ok(),
    })
}

fn parse_timestamp(s: &str) -> Result<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| DocPilotError::Storage(format!("invalid date: {e}")))
}

#[cfg(test)]
mod tests {
    use super::*;

    /// Create a temp file storage for testing.
    async fn test_storage() -> Storage {
        let tmp = std::env::temp_dir().join(format!("docpilot_test_{}.db", Uuid::now_v7()));
        Storage::open(&tmp).await.expect("open test db")
    }

    #[tokio::test]
    async fn open_and_migrate() {
        let storage = test_storage().await;
        assert_eq!(storage.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn idempotent_migration() {
        let tmp = std::env::temp_dir().join(format!("docpilot_test_{}.db", Uuid::now_v7()));
        let s1 = Storage::open(&tmp).await.expect("first open");
        drop(s1);
        let s2 = Storage::open(&tmp).await.expect("second open");
        assert_eq!(s2.get_schema_version().await, 1);
    }

    #[tokio::test]
    async fn execution_lifecycle() {
        let storage = test_storage().await;

        let id = storage
            .begin_execution("tasks", TriggerKind::FeatureCreated)
            .await
            .expect("begin");
        assert!(storage.has_in_flight("tasks").await.expect("in flight"));

        storage
            .finish_execution(&id, ExecutionOutcome::Succeeded, None)
            .await
            .expect("finish");
        assert!(!storage.has_in_flight("tasks").await.expect("in flight"));

        let records = storage.recent_executions("tasks", 10).await.expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].id, id);
        assert_eq!(records[0].outcome, Some(ExecutionOutcome::Succeeded));
        assert!(records[0].finished_at.is_some());
    }

    #[tokio::test]
    async fn finalize_twice_is_rejected() {
        let storage = test_storage().await;
        let id = storage
            .begin_execution("faq", TriggerKind::DocumentSaved)
            .await
            .expect("begin");
        storage
            .finish_execution(&id, ExecutionOutcome::Failed, Some("boom"))
            .await
            .expect("finish");

        let again = storage
            .finish_execution(&id, ExecutionOutcome::Succeeded, None)
            .await;
        assert!(again.is_err());

        // The first finalization stuck.
        let records = storage.recent_executions("faq", 1).await.expect("list");
        assert_eq!(records[0].outcome, Some(ExecutionOutcome::Failed));
        assert_eq!(records[0].error.as_deref(), Some("boom"));
    }

    #[tokio::test]
    async fn skipped_runs_are_recorded_finalized() {
        let storage = test_storage().await;
        storage
            .record_skipped("quick-start", TriggerKind::DocumentSaved)
            .await
            .expect("record skipped");

        assert!(!storage.has_in_flight("quick-start").await.expect("check"));
        let records = storage
            .recent_executions("quick-start", 10)
            .await
            .expect("list");
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].outcome, Some(ExecutionOutcome::SkippedInFlight));
    }

    #[tokio::test]
    async fn recent_executions_scoped_and_limited() {
        let storage = test_storage().await;
        for _ in 0..5 {
            let id = storage
                .begin_execution("tasks", TriggerKind::DocumentSaved)
                .await
                .expect("begin");
            storage
                .finish_execution(&id, ExecutionOutcome::Succeeded, None)
                .await
                .expect("finish");
        }
        let other = storage
            .begin_execution("faq", TriggerKind::DocumentSaved)
            .await
            .expect("begin faq");
        storage
            .finish_execution(&other, ExecutionOutcome::Succeeded, None)
            .await
            .expect("finish faq");

        let records = storage.recent_executions("tasks", 3).await.expect("list");
        assert_eq!(records.len(), 3);
        assert!(records.iter().all(|r| r.doc_key == "tasks"));
    }

    #[tokio::test]
    async fn readonly_rejects_writes() {
        let tmp = std::env::temp_dir().join(format!("docpilot_test_{}.db", Uuid::now_v7()));
        let rw = Storage::open(&tmp).await.expect("open rw");
        rw.begin_execution("tasks", TriggerKind::FeatureCreated)
            .await
            .expect("begin");
        drop(rw);

        let ro = Storage::open_readonly(&tmp).await.expect("open ro");
        let result = ro.record_skipped("tasks", TriggerKind::DocumentSaved).await;
        assert!(result.is_err());
        assert!(result.unwrap_err().to_string().contains("read-only"));
    }
}
