//! The schema version ledger.
//!
//! A persisted table recording which schema version a database has applied.
//! The table may be absent only in the pre-initialised state; reads treat
//! that as "no record" rather than an error.

use anitrack_postgres::{MigrationSession, PgError};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tokio_postgres::error::SqlState;
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};

/// SQL for initializing the ledger table.
///
/// Creation schema artifacts normally create and seed this table
/// themselves; the engine also runs this before locking so it can operate
/// on databases whose creation artifact predates the ledger.
pub const LEDGER_INIT_SQL: &str = r#"
CREATE TABLE IF NOT EXISTS schema_version (
    version INTEGER PRIMARY KEY,
    description TEXT,
    applied_at TIMESTAMP WITH TIME ZONE NOT NULL DEFAULT NOW()
);
"#;

/// Exclusive lock on the ledger table.
///
/// The single serialization point for concurrent migrators: whichever
/// caller acquires it first completes its entire chain (commit or rollback)
/// before the next lock-waiter proceeds.
const LEDGER_LOCK_SQL: &str = "LOCK TABLE schema_version IN ACCESS EXCLUSIVE MODE";

/// A recorded schema version.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LedgerEntry {
    /// The schema version.
    pub version: i32,
    /// Human-readable description of the transition.
    pub description: Option<String>,
    /// When the version was recorded.
    pub applied_at: DateTime<Utc>,
}

/// Create the ledger table if it does not exist yet.
pub async fn initialize(session: &mut MigrationSession) -> MigrateResult<()> {
    session
        .batch_execute(LEDGER_INIT_SQL)
        .await
        .map_err(MigrationError::Ledger)
}

/// Take the exclusive ledger lock inside the open transaction.
///
/// Blocks until the current holder commits or rolls back.
pub async fn lock_exclusive(session: &mut MigrationSession) -> MigrateResult<()> {
    debug!("acquiring exclusive ledger lock");
    session
        .batch_execute(LEDGER_LOCK_SQL)
        .await
        .map_err(MigrationError::Ledger)
}

/// Read the current (highest recorded) schema version.
///
/// Returns `None` when the ledger is empty or its table has not been
/// created yet; errors only on genuine query failure.
pub async fn current_version(session: &mut MigrationSession) -> MigrateResult<Option<i32>> {
    let result = session
        .query_opt(
            "SELECT version FROM schema_version ORDER BY version DESC LIMIT 1",
            &[],
        )
        .await;

    match result {
        Ok(row) => Ok(row.map(|r| r.get(0))),
        Err(PgError::Postgres(e)) if e.code() == Some(&SqlState::UNDEFINED_TABLE) => {
            debug!("ledger table does not exist yet");
            Ok(None)
        }
        Err(e) => Err(MigrationError::Ledger(e)),
    }
}

/// Record a schema version.
///
/// Idempotent: recording an already-present version is a no-op, never an
/// error, and leaves exactly one row for that version.
pub async fn record(
    session: &mut MigrationSession,
    version: i32,
    description: &str,
) -> MigrateResult<()> {
    let inserted = session
        .execute(
            "INSERT INTO schema_version (version, description) VALUES ($1, $2) \
             ON CONFLICT (version) DO NOTHING",
            &[&version, &description],
        )
        .await
        .map_err(MigrationError::Ledger)?;

    debug!(version, inserted, "ledger record");
    Ok(())
}

/// All recorded versions, newest first.
pub async fn history(session: &mut MigrationSession) -> MigrateResult<Vec<LedgerEntry>> {
    let rows = session
        .query(
            "SELECT version, description, applied_at FROM schema_version \
             ORDER BY version DESC",
            &[],
        )
        .await
        .map_err(MigrationError::Ledger)?;

    Ok(rows
        .iter()
        .map(|row| LedgerEntry {
            version: row.get(0),
            description: row.get(1),
            applied_at: row.get(2),
        })
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_init_sql_shape() {
        assert!(LEDGER_INIT_SQL.contains("schema_version"));
        assert!(LEDGER_INIT_SQL.contains("version INTEGER PRIMARY KEY"));
        assert!(LEDGER_INIT_SQL.contains("applied_at"));
    }

    #[test]
    fn test_ledger_entry_equality() {
        let entry = LedgerEntry {
            version: 2,
            description: Some("Upgraded to schema version 2".to_string()),
            applied_at: Utc::now(),
        };
        assert_eq!(entry, entry.clone());
    }
}
