//! Data populator: per-version seed and transform steps.
//!
//! Population logic is a registry of statically compiled steps selected by
//! `(from, to)` at run time. Most transitions have no step; that is the
//! common case and not an error.

use std::collections::HashMap;
use std::sync::Arc;

use anitrack_postgres::MigrationSession;
use async_trait::async_trait;
use tracing::{debug, info, warn};

use crate::error::{MigrateResult, MigrationError, StepError};

/// Savepoint guarding a population step inside the outer transaction.
const STEP_SAVEPOINT: &str = "population_step";

/// Resolve the deterministic name for a population step.
///
/// Creation form when `from == 0`, upgrade form otherwise:
/// `v<N>_create_populate` / `v<From>_to_v<To>_upgrade_populate`.
pub fn population_step_name(from: u32, to: u32) -> String {
    if from == 0 {
        format!("v{to}_create_populate")
    } else {
        format!("v{from}_to_v{to}_upgrade_populate")
    }
}

/// A per-version data population step.
///
/// The step receives the live session with unrestricted read/write access:
/// it may run arbitrary queries, including schema-dependent lookups and
/// row-by-row transforms. Side effects beyond the database (e.g. metadata
/// lookups over the network) are the step's responsibility; whatever a step
/// raises is treated as an opaque [`StepError`] cause.
#[async_trait]
pub trait PopulationStep: Send + Sync {
    /// Seed or transform data for the step's version transition.
    async fn populate(&self, session: &mut MigrationSession) -> Result<(), StepError>;
}

/// Registry of population steps keyed by version transition.
#[derive(Default)]
pub struct PopulationRegistry {
    steps: HashMap<(u32, u32), Arc<dyn PopulationStep>>,
}

impl PopulationRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a step for the `from -> to` transition.
    ///
    /// Replaces any step previously registered for the same transition.
    pub fn register(&mut self, from: u32, to: u32, step: impl PopulationStep + 'static) {
        self.steps.insert((from, to), Arc::new(step));
    }

    /// Look up the step for a transition.
    pub fn get(&self, from: u32, to: u32) -> Option<&Arc<dyn PopulationStep>> {
        self.steps.get(&(from, to))
    }

    /// Number of registered steps.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    /// Whether the registry holds no steps.
    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Run the step for `from -> to`, if one is registered.
    ///
    /// Returns `false` without error when no step exists. A step runs under
    /// a savepoint inside the caller's open transaction: on failure the
    /// session is rolled back to the savepoint and the step's error is
    /// surfaced as [`MigrationError::Population`]; on success the savepoint
    /// is released and `true` is returned.
    pub async fn run(
        &self,
        session: &mut MigrationSession,
        from: u32,
        to: u32,
    ) -> MigrateResult<bool> {
        let Some(step) = self.get(from, to) else {
            debug!(from, to, "no population step registered for transition");
            return Ok(false);
        };

        let name = population_step_name(from, to);
        info!(step = %name, "running population step");

        session.savepoint(STEP_SAVEPOINT).await?;

        match step.populate(session).await {
            Ok(()) => {
                session.release_savepoint(STEP_SAVEPOINT).await?;
                info!(step = %name, "population step completed");
                Ok(true)
            }
            Err(source) => {
                warn!(step = %name, error = %source, "population step failed, rolling back");
                session.rollback_to(STEP_SAVEPOINT).await?;
                Err(MigrationError::Population { name, source })
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    struct NoopStep;

    #[async_trait]
    impl PopulationStep for NoopStep {
        async fn populate(&self, _session: &mut MigrationSession) -> Result<(), StepError> {
            Ok(())
        }
    }

    #[test]
    fn test_step_name_forms() {
        assert_eq!(population_step_name(0, 2), "v2_create_populate");
        assert_eq!(population_step_name(1, 2), "v1_to_v2_upgrade_populate");
    }

    #[test]
    fn test_registry_lookup() {
        let mut registry = PopulationRegistry::new();
        assert!(registry.is_empty());

        registry.register(0, 2, NoopStep);
        registry.register(1, 2, NoopStep);

        assert_eq!(registry.len(), 2);
        assert!(registry.get(0, 2).is_some());
        assert!(registry.get(1, 2).is_some());
        assert!(registry.get(2, 3).is_none());
    }

    #[test]
    fn test_registry_replaces_duplicate_transition() {
        let mut registry = PopulationRegistry::new();
        registry.register(0, 2, NoopStep);
        registry.register(0, 2, NoopStep);
        assert_eq!(registry.len(), 1);
    }
}
