//! # anitrack-postgres
//!
//! PostgreSQL driver layer for the AniTrack database tools.
//!
//! This crate provides:
//! - Connection configuration from URLs or a builder ([`PgConfig`])
//! - A single-connection, explicitly-owned session primitive with
//!   transaction and savepoint control ([`MigrationSession`])
//! - A connection gateway that distinguishes "database does not exist"
//!   from other connection failures and can create the target database
//!   ([`Gateway`])
//!
//! There is no connection pool here on purpose: the migration engine owns
//! exactly one connection per call and passes it by argument.
//!
//! ## Example
//!
//! ```rust,ignore
//! use anitrack_postgres::{Gateway, PgConfig};
//!
//! #[tokio::main]
//! async fn main() -> Result<(), anitrack_postgres::PgError> {
//!     let config = PgConfig::from_url("postgresql://postgres@localhost/anitrack")?;
//!     let gateway = Gateway::new(config);
//!
//!     let mut session = gateway.open_target(false).await?;
//!     session.batch_execute("SELECT 1").await?;
//!     session.rollback().await?;
//!     session.close().await;
//!
//!     Ok(())
//! }
//! ```

pub mod config;
pub mod error;
pub mod gateway;
pub mod session;

pub use config::{DEFAULT_ADMIN_DATABASE, PgConfig, PgConfigBuilder};
pub use error::{PgError, PgResult};
pub use gateway::{Gateway, quote_identifier};
pub use session::MigrationSession;

/// Prelude for convenient imports.
pub mod prelude {
    pub use crate::config::{PgConfig, PgConfigBuilder};
    pub use crate::error::{PgError, PgResult};
    pub use crate::gateway::Gateway;
    pub use crate::session::MigrationSession;
}
