//! # anitrack-migrate
//!
//! Versioned schema migration and data-population engine for AniTrack.
//!
//! This crate provides functionality for:
//! - Creating a PostgreSQL database from scratch at a chosen schema version
//! - Upgrading an existing database through a chain of versioned schema
//!   deltas, atomically
//! - Resolving schema artifacts on the filesystem by version transition
//! - Running per-version data population steps from a static registry
//! - Tracking applied versions in a `schema_version` ledger table
//!
//! ## Architecture
//!
//! The engine sequences a small set of components around one exclusively
//! owned session per call. The exclusive lock on the ledger table is the
//! single serialization point for concurrent migrators.
//!
//! ```text
//! ┌──────────────┐     ┌─────────────────┐     ┌──────────────┐
//! │ Artifact Dir │────▶│ Version Catalog │────▶│   Migrator   │
//! └──────────────┘     └─────────────────┘     └──────────────┘
//!                                                      │
//!                              ┌────────────────┬──────┴───────┐
//!                              ▼                ▼              ▼
//!                      ┌──────────────┐ ┌──────────────┐ ┌───────────┐
//!                      │Schema Applier│ │  Population  │ │  Ledger   │
//!                      │  (DDL files) │ │   Registry   │ │  (table)  │
//!                      └──────────────┘ └──────────────┘ └───────────┘
//! ```
//!
//! ## Example
//!
//! ```rust,ignore
//! use anitrack_migrate::{MigrationConfig, Migrator, steps};
//! use anitrack_postgres::{Gateway, PgConfig};
//!
//! async fn run() -> Result<(), anitrack_migrate::MigrationError> {
//!     let config = PgConfig::from_url("postgresql://postgres@localhost/anitrack")?;
//!     let migrator = Migrator::with_registry(
//!         Gateway::new(config),
//!         MigrationConfig::new().artifact_dir("./migrations"),
//!         steps::default_registry(None),
//!     );
//!
//!     // Create at the newest available version, then upgrade later.
//!     let outcome = migrator.create_database(None).await?;
//!     println!("{}", outcome.summary());
//!     Ok(())
//! }
//! ```

pub mod applier;
pub mod catalog;
pub mod engine;
pub mod error;
pub mod ledger;
pub mod populate;
pub mod steps;

pub use applier::{SchemaApplier, schema_artifact_name};
pub use catalog::VersionCatalog;
pub use engine::{MigrationConfig, MigrationOutcome, Migrator};
pub use error::{MigrateResult, MigrationError, StepError};
pub use ledger::LedgerEntry;
pub use populate::{PopulationRegistry, PopulationStep, population_step_name};

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::applier::SchemaApplier;
    pub use crate::catalog::VersionCatalog;
    pub use crate::engine::{MigrationConfig, MigrationOutcome, Migrator};
    pub use crate::error::{MigrateResult, MigrationError};
    pub use crate::populate::{PopulationRegistry, PopulationStep};
}
