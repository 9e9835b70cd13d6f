//! Error types for the migration engine.

use std::path::PathBuf;

use anitrack_postgres::PgError;
use thiserror::Error;

/// Opaque cause raised by a population step.
///
/// Steps may call arbitrary collaborators (metadata lookups, text helpers);
/// whatever they raise is carried here without further interpretation.
pub type StepError = Box<dyn std::error::Error + Send + Sync + 'static>;

/// Result type alias for migration operations.
pub type MigrateResult<T> = Result<T, MigrationError>;

/// Errors that can occur during migration operations.
///
/// None of these are swallowed or downgraded: each is surfaced to the
/// caller with the original cause attached. The only recovery the engine
/// performs itself is create-if-absent for the target database.
#[derive(Debug, Error)]
pub enum MigrationError {
    /// The target database does not exist.
    ///
    /// The creation path recovers by creating it; the upgrade path cannot.
    #[error("database \"{0}\" does not exist")]
    DatabaseNotFound(String),

    /// An expected schema artifact file is missing.
    #[error("schema artifact not found: {path}")]
    ArtifactNotFound {
        /// Path the artifact was resolved to.
        path: PathBuf,
    },

    /// A schema artifact was found but failed to execute.
    #[error("failed to apply schema transition {from} -> {to}")]
    SchemaApplication {
        /// Version the transition starts from (0 for creation).
        from: u32,
        /// Version the transition ends at.
        to: u32,
        /// The underlying database error.
        #[source]
        source: PgError,
    },

    /// A population step raised during execution.
    #[error("population step '{name}' failed")]
    Population {
        /// Artifact-style name of the step, e.g. `v1_to_v2_upgrade_populate`.
        name: String,
        /// The opaque cause raised by the step.
        #[source]
        source: StepError,
    },

    /// Failure reading or writing the schema version ledger.
    #[error("schema version ledger error")]
    Ledger(#[source] PgError),

    /// Generic connectivity or authentication failure.
    #[error("connection error")]
    Connection(#[source] PgError),

    /// Any other database failure (transaction control, admin statements).
    #[error("database error: {0}")]
    Database(PgError),

    /// No creation-form schema artifacts were found in the artifact dir.
    #[error("no schema creation artifacts found in {dir}")]
    NoArtifacts {
        /// The directory that was scanned.
        dir: PathBuf,
    },

    /// Failed to read an artifact file that exists.
    #[error("error reading schema artifact {path}")]
    Io {
        /// Path of the artifact.
        path: PathBuf,
        /// The underlying I/O error.
        #[source]
        source: std::io::Error,
    },
}

impl MigrationError {
    /// Create a population error.
    pub fn population(name: impl Into<String>, source: impl Into<StepError>) -> Self {
        Self::Population {
            name: name.into(),
            source: source.into(),
        }
    }

    /// Check if this is the missing-artifact condition.
    pub fn is_artifact_not_found(&self) -> bool {
        matches!(self, Self::ArtifactNotFound { .. })
    }

    /// Check if this is the database-does-not-exist condition.
    pub fn is_database_not_found(&self) -> bool {
        matches!(self, Self::DatabaseNotFound(_))
    }
}

impl From<PgError> for MigrationError {
    fn from(err: PgError) -> Self {
        match err {
            PgError::DatabaseNotFound(db) => Self::DatabaseNotFound(db),
            e @ PgError::Connection(_) | e @ PgError::Config(_) => Self::Connection(e),
            e => Self::Database(e),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_artifact_not_found_display() {
        let err = MigrationError::ArtifactNotFound {
            path: PathBuf::from("/tmp/migrations/v2_to_v3_upgrade_schema.sql"),
        };
        assert!(err.is_artifact_not_found());
        assert!(err.to_string().contains("v2_to_v3_upgrade_schema.sql"));
    }

    #[test]
    fn test_population_carries_cause() {
        let err = MigrationError::population("v2_create_populate", "lookup insert failed");
        let msg = err.to_string();
        assert!(msg.contains("v2_create_populate"));

        let source = std::error::Error::source(&err).expect("population keeps its cause");
        assert!(source.to_string().contains("lookup insert failed"));
    }

    #[test]
    fn test_from_pg_error_classification() {
        let err: MigrationError = PgError::DatabaseNotFound("anitrack".to_string()).into();
        assert!(err.is_database_not_found());

        let err: MigrationError = PgError::config("bad url").into();
        assert!(matches!(err, MigrationError::Connection(_)));
    }
}
