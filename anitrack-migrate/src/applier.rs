//! Schema applier: resolving and executing schema artifacts.

use std::io;
use std::path::{Path, PathBuf};

use anitrack_postgres::MigrationSession;
use tracing::info;

use crate::error::{MigrateResult, MigrationError};

/// Resolve the deterministic filename for a schema transition.
///
/// Creation form when `from == 0`, upgrade form otherwise:
/// `v<N>_create_schema.sql` / `v<From>_to_v<To>_upgrade_schema.sql`.
pub fn schema_artifact_name(from: u32, to: u32) -> String {
    if from == 0 {
        format!("v{to}_create_schema.sql")
    } else {
        format!("v{from}_to_v{to}_upgrade_schema.sql")
    }
}

/// Locates and executes the raw DDL artifact for a version transition.
pub struct SchemaApplier {
    artifact_dir: PathBuf,
}

impl SchemaApplier {
    /// Create an applier over the given artifact directory.
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    /// The path the artifact for `from -> to` resolves to.
    pub fn artifact_path(&self, from: u32, to: u32) -> PathBuf {
        self.artifact_dir.join(schema_artifact_name(from, to))
    }

    /// Apply the schema artifact for `from -> to` as one statement batch.
    ///
    /// A missing artifact file ([`MigrationError::ArtifactNotFound`]) is a
    /// distinct failure from the artifact failing to execute
    /// ([`MigrationError::SchemaApplication`]).
    pub async fn apply(
        &self,
        session: &mut MigrationSession,
        from: u32,
        to: u32,
    ) -> MigrateResult<()> {
        let path = self.artifact_path(from, to);
        info!(from, to, path = %path.display(), "applying schema artifact");

        let sql = match tokio::fs::read_to_string(&path).await {
            Ok(sql) => sql,
            Err(e) if e.kind() == io::ErrorKind::NotFound => {
                return Err(MigrationError::ArtifactNotFound { path });
            }
            Err(e) => return Err(MigrationError::Io { path, source: e }),
        };

        session
            .batch_execute(&sql)
            .await
            .map_err(|source| MigrationError::SchemaApplication { from, to, source })?;

        info!(to, "schema transition applied");
        Ok(())
    }

    /// The directory this applier reads artifacts from.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_creation_form_name() {
        assert_eq!(schema_artifact_name(0, 1), "v1_create_schema.sql");
        assert_eq!(schema_artifact_name(0, 12), "v12_create_schema.sql");
    }

    #[test]
    fn test_upgrade_form_name() {
        assert_eq!(schema_artifact_name(1, 2), "v1_to_v2_upgrade_schema.sql");
        assert_eq!(schema_artifact_name(9, 10), "v9_to_v10_upgrade_schema.sql");
    }

    #[test]
    fn test_name_is_deterministic() {
        assert_eq!(schema_artifact_name(2, 3), schema_artifact_name(2, 3));
    }

    #[test]
    fn test_artifact_path_joins_dir() {
        let applier = SchemaApplier::new("/srv/anitrack/migrations");
        assert_eq!(
            applier.artifact_path(0, 2),
            PathBuf::from("/srv/anitrack/migrations/v2_create_schema.sql")
        );
    }
}
