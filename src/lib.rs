//! # AniTrack database layer
//!
//! The database layer of AniTrack, an anime watch-tracking application.
//!
//! This facade crate re-exports the two member crates:
//! - [`postgres`] — PostgreSQL driver layer: connection configuration, the
//!   single-connection migration session, and the connection gateway.
//! - [`migrate`] — the versioned schema migration and data-population
//!   engine, including AniTrack's own population steps.
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use anitrack::prelude::*;
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anitrack::migrate::MigrationError> {
//!     let config = PgConfig::from_url("postgresql://postgres@localhost/anitrack")?;
//!     let gateway = Gateway::new(config);
//!
//!     let migrator = Migrator::with_registry(
//!         gateway,
//!         MigrationConfig::new().artifact_dir("./migrations"),
//!         anitrack::migrate::steps::default_registry(None),
//!     );
//!
//!     // Create the database at the newest available schema version.
//!     let outcome = migrator.create_database(None).await?;
//!     println!("{}", outcome.summary());
//!
//!     Ok(())
//! }
//! ```

#![deny(missing_docs)]
#![deny(rustdoc::broken_intra_doc_links)]

/// PostgreSQL driver layer: configuration, sessions, and the gateway.
pub mod postgres {
    pub use anitrack_postgres::*;
}

/// The versioned schema migration and data-population engine.
pub mod migrate {
    pub use anitrack_migrate::*;
}

/// Prelude module for convenient imports.
pub mod prelude {
    pub use crate::migrate::{MigrationConfig, MigrationError, Migrator, PopulationRegistry};
    pub use crate::postgres::{Gateway, MigrationSession, PgConfig, PgError};
}

// Re-export key types at the crate root
pub use migrate::{MigrationError, Migrator};
pub use postgres::{Gateway, PgConfig};
