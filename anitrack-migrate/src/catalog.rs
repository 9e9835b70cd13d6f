//! Version catalog: resolving the newest available schema version.

use std::path::{Path, PathBuf};

use regex_lite::Regex;
use tracing::debug;

use crate::error::{MigrateResult, MigrationError};

/// Filename pattern of creation-form schema artifacts.
const CREATE_SCHEMA_PATTERN: &str = r"^v(\d+)_create_schema\.sql$";

/// Scans a migration-artifact directory for creation-form schema artifacts
/// and resolves the set of available schema versions.
pub struct VersionCatalog {
    artifact_dir: PathBuf,
}

impl VersionCatalog {
    /// Create a catalog over the given artifact directory.
    pub fn new(artifact_dir: impl Into<PathBuf>) -> Self {
        Self {
            artifact_dir: artifact_dir.into(),
        }
    }

    /// The directory this catalog scans.
    pub fn artifact_dir(&self) -> &Path {
        &self.artifact_dir
    }

    /// All schema versions with a creation artifact, in ascending order.
    ///
    /// Non-matching files are ignored. The result is sorted, so it does not
    /// depend on directory iteration order.
    pub async fn available_versions(&self) -> MigrateResult<Vec<u32>> {
        let re = Regex::new(CREATE_SCHEMA_PATTERN).unwrap();

        let mut entries =
            tokio::fs::read_dir(&self.artifact_dir)
                .await
                .map_err(|e| MigrationError::Io {
                    path: self.artifact_dir.clone(),
                    source: e,
                })?;

        let mut versions = Vec::new();
        while let Some(entry) = entries.next_entry().await.map_err(|e| MigrationError::Io {
            path: self.artifact_dir.clone(),
            source: e,
        })? {
            let name = entry.file_name();
            let Some(name) = name.to_str() else {
                continue;
            };
            if let Some(caps) = re.captures(name) {
                // A filename that matched the pattern always holds a
                // parseable integer, barring overflow.
                if let Ok(version) = caps[1].parse::<u32>() {
                    versions.push(version);
                }
            }
        }

        versions.sort_unstable();
        versions.dedup();
        debug!(dir = %self.artifact_dir.display(), ?versions, "scanned creation artifacts");
        Ok(versions)
    }

    /// The highest schema version with a creation artifact.
    pub async fn latest_available(&self) -> MigrateResult<u32> {
        let versions = self.available_versions().await?;
        versions
            .last()
            .copied()
            .ok_or_else(|| MigrationError::NoArtifacts {
                dir: self.artifact_dir.clone(),
            })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn touch(dir: &Path, name: &str) {
        std::fs::write(dir.join(name), "-- sql\n").unwrap();
    }

    #[tokio::test]
    async fn test_latest_available_takes_max() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "v1_create_schema.sql");
        touch(dir.path(), "v3_create_schema.sql");
        touch(dir.path(), "v2_create_schema.sql");

        let catalog = VersionCatalog::new(dir.path());
        assert_eq!(catalog.latest_available().await.unwrap(), 3);
    }

    #[tokio::test]
    async fn test_non_matching_files_ignored() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "v1_create_schema.sql");
        touch(dir.path(), "v1_to_v2_upgrade_schema.sql");
        touch(dir.path(), "notes.txt");
        touch(dir.path(), "v9_create_schema.sql.bak");

        let catalog = VersionCatalog::new(dir.path());
        assert_eq!(catalog.available_versions().await.unwrap(), vec![1]);
    }

    #[tokio::test]
    async fn test_no_artifacts_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "README.md");

        let catalog = VersionCatalog::new(dir.path());
        let err = catalog.latest_available().await.unwrap_err();
        assert!(matches!(err, MigrationError::NoArtifacts { .. }));
    }

    #[tokio::test]
    async fn test_deterministic_across_scans() {
        let dir = tempfile::tempdir().unwrap();
        touch(dir.path(), "v2_create_schema.sql");
        touch(dir.path(), "v10_create_schema.sql");

        let catalog = VersionCatalog::new(dir.path());
        let first = catalog.available_versions().await.unwrap();
        let second = catalog.available_versions().await.unwrap();
        assert_eq!(first, second);
        assert_eq!(first, vec![2, 10]);
    }
}
