//! The migration orchestrator.

use std::path::PathBuf;
use std::time::Instant;

use anitrack_postgres::{Gateway, MigrationSession};
use tracing::{info, warn};

use crate::applier::SchemaApplier;
use crate::catalog::VersionCatalog;
use crate::error::{MigrateResult, MigrationError};
use crate::ledger;
use crate::populate::PopulationRegistry;

/// Configuration for the migration engine.
#[derive(Debug, Clone)]
pub struct MigrationConfig {
    /// Directory holding the schema artifacts.
    pub artifact_dir: PathBuf,
}

impl Default for MigrationConfig {
    fn default() -> Self {
        Self {
            artifact_dir: PathBuf::from("./migrations"),
        }
    }
}

impl MigrationConfig {
    /// Create a new configuration.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the artifact directory.
    pub fn artifact_dir(mut self, dir: impl Into<PathBuf>) -> Self {
        self.artifact_dir = dir.into();
        self
    }
}

/// Result of a completed migration call.
#[derive(Debug)]
pub struct MigrationOutcome {
    /// Schema version the database ended at.
    pub version: u32,
    /// Number of schema transitions applied.
    pub steps_applied: usize,
    /// Number of population steps that ran.
    pub populated: usize,
    /// Total duration in milliseconds.
    pub duration_ms: i64,
}

impl MigrationOutcome {
    /// Get a summary of the outcome.
    pub fn summary(&self) -> String {
        format!(
            "schema version {}: {} transition(s), {} population step(s) in {}ms",
            self.version, self.steps_applied, self.populated, self.duration_ms
        )
    }
}

/// The top-level migration state machine.
///
/// Sequences the gateway, catalog, applier, populator, and ledger to
/// realize `create_database` and `upgrade_database`, owning the transaction
/// scope and the exclusive ledger lock for the duration of each call. One
/// session is opened per call and closed on every exit path.
pub struct Migrator {
    config: MigrationConfig,
    gateway: Gateway,
    registry: PopulationRegistry,
}

impl Migrator {
    /// Create a migrator with an empty population registry.
    pub fn new(gateway: Gateway, config: MigrationConfig) -> Self {
        Self {
            config,
            gateway,
            registry: PopulationRegistry::new(),
        }
    }

    /// Create a migrator with a population registry.
    pub fn with_registry(
        gateway: Gateway,
        config: MigrationConfig,
        registry: PopulationRegistry,
    ) -> Self {
        Self {
            config,
            gateway,
            registry,
        }
    }

    /// The engine configuration.
    pub fn config(&self) -> &MigrationConfig {
        &self.config
    }

    /// The population registry.
    pub fn registry(&self) -> &PopulationRegistry {
        &self.registry
    }

    /// Mutable access to the population registry.
    pub fn registry_mut(&mut self) -> &mut PopulationRegistry {
        &mut self.registry
    }

    /// Create the target database at `version`, or at the newest available
    /// schema version when unspecified.
    ///
    /// Idempotent at the existence check: a pre-existing target database is
    /// not an error, and schema creation proceeds against it. On failure
    /// after the target session is open, the transaction is rolled back and
    /// the session closed, but the database itself is not dropped — a
    /// created-but-unmigrated database is a known outcome requiring manual
    /// cleanup.
    pub async fn create_database(&self, version: Option<u32>) -> MigrateResult<MigrationOutcome> {
        let start = Instant::now();
        let database = self.gateway.config().database.clone();
        info!(database = %database, ?version, "creating database");

        self.ensure_database_exists(&database).await?;

        let mut session = self.gateway.open(&database, false).await?;
        let result = self.create_schema(&mut session, version).await;

        if result.is_err() {
            if let Err(e) = session.rollback().await {
                warn!(error = %e, "rollback after failed creation also failed");
            }
        }
        session.close().await;

        let (version, populated) = result?;
        info!(database = %database, version, "database created and schema applied");

        Ok(MigrationOutcome {
            version,
            steps_applied: 1,
            populated: populated as usize,
            duration_ms: start.elapsed().as_millis() as i64,
        })
    }

    /// Upgrade the target database from `from` to `to` through the chain of
    /// single-version transitions.
    ///
    /// The whole chain runs in one transaction under the exclusive ledger
    /// lock: on any failure the database is left exactly at `from`. The
    /// caller is responsible for passing the ledger's current version as
    /// `from` and a `to` greater than it.
    pub async fn upgrade_database(&self, from: u32, to: u32) -> MigrateResult<MigrationOutcome> {
        let start = Instant::now();
        let database = self.gateway.config().database.clone();
        info!(database = %database, from, to, "upgrading database");

        let mut session = self.gateway.open(&database, false).await?;
        let result = self.apply_upgrade_chain(&mut session, from, to).await;

        if result.is_err() {
            if let Err(e) = session.rollback().await {
                warn!(error = %e, "rollback after failed upgrade also failed");
            }
        }
        session.close().await;

        let (steps_applied, populated) = result?;
        info!(database = %database, version = to, "database upgraded");

        Ok(MigrationOutcome {
            version: to,
            steps_applied,
            populated,
            duration_ms: start.elapsed().as_millis() as i64,
        })
    }

    /// Check for the target database on the server, creating it if absent.
    async fn ensure_database_exists(&self, database: &str) -> MigrateResult<()> {
        let mut admin = self.gateway.open_admin().await?;
        let result = self.check_or_create(&mut admin, database).await;
        admin.close().await;
        result
    }

    async fn check_or_create(
        &self,
        admin: &mut MigrationSession,
        database: &str,
    ) -> MigrateResult<()> {
        if self.gateway.database_exists(admin, database).await? {
            info!(database, "database already exists, proceeding with schema creation");
        } else {
            self.gateway.create_database(admin, database).await?;
        }
        Ok(())
    }

    /// Steps 4-6 of creation: resolve the version, apply the creation
    /// artifact, and populate under the ledger lock, all in one transaction.
    async fn create_schema(
        &self,
        session: &mut MigrationSession,
        version: Option<u32>,
    ) -> MigrateResult<(u32, bool)> {
        let version = match version {
            Some(v) => v,
            None => {
                VersionCatalog::new(&self.config.artifact_dir)
                    .latest_available()
                    .await?
            }
        };

        let applier = SchemaApplier::new(&self.config.artifact_dir);
        applier.apply(session, 0, version).await?;

        ledger::initialize(session).await?;
        ledger::lock_exclusive(session).await?;
        let populated = self.registry.run(session, 0, version).await?;
        session.commit().await.map_err(MigrationError::from)?;

        Ok((version, populated))
    }

    /// The upgrade chain: lock, re-read the ledger, apply each transition
    /// with its population step, record the target version, commit once.
    async fn apply_upgrade_chain(
        &self,
        session: &mut MigrationSession,
        from: u32,
        to: u32,
    ) -> MigrateResult<(usize, usize)> {
        session.begin().await.map_err(MigrationError::from)?;
        ledger::initialize(session).await?;
        ledger::lock_exclusive(session).await?;

        // Re-read under the lock: a waiter that lost the race to a
        // concurrent migrator must not re-apply transitions it now sees
        // recorded.
        let recorded = ledger::current_version(session).await?;
        let start_version = match recorded {
            Some(v) if v > 0 => from.max(v as u32),
            _ => from,
        };
        if start_version > from {
            info!(
                recorded = start_version,
                "ledger is ahead of requested start, skipping applied transitions"
            );
        }

        let applier = SchemaApplier::new(&self.config.artifact_dir);
        let mut steps_applied = 0;
        let mut populated = 0;

        for v in start_version..to {
            applier.apply(session, v, v + 1).await?;
            if self.registry.run(session, v, v + 1).await? {
                populated += 1;
            }
            steps_applied += 1;
        }

        ledger::record(
            session,
            to as i32,
            &format!("Upgraded to schema version {to}"),
        )
        .await?;
        session.commit().await.map_err(MigrationError::from)?;

        Ok((steps_applied, populated))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_config_default_dir() {
        let config = MigrationConfig::new();
        assert_eq!(config.artifact_dir, PathBuf::from("./migrations"));
    }

    #[test]
    fn test_config_artifact_dir() {
        let config = MigrationConfig::new().artifact_dir("/srv/anitrack/migrations");
        assert_eq!(config.artifact_dir, PathBuf::from("/srv/anitrack/migrations"));
    }

    #[test]
    fn test_outcome_summary() {
        let outcome = MigrationOutcome {
            version: 3,
            steps_applied: 2,
            populated: 1,
            duration_ms: 42,
        };
        let summary = outcome.summary();
        assert!(summary.contains("schema version 3"));
        assert!(summary.contains("2 transition(s)"));
        assert!(summary.contains("1 population step(s)"));
    }
}
