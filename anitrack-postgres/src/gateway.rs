//! Connection gateway: opening sessions and server-level operations.

use tracing::{debug, info};

use crate::config::PgConfig;
use crate::error::PgResult;
use crate::session::MigrationSession;

/// Opens and closes sessions against a configured PostgreSQL server.
///
/// The gateway distinguishes "target database does not exist"
/// ([`crate::PgError::DatabaseNotFound`]) from any other connection failure,
/// and provides the server-level existence check and `CREATE DATABASE` used
/// by the database-creation path.
pub struct Gateway {
    config: PgConfig,
}

impl Gateway {
    /// Create a gateway for the given configuration.
    pub fn new(config: PgConfig) -> Self {
        Self { config }
    }

    /// The connection configuration.
    pub fn config(&self) -> &PgConfig {
        &self.config
    }

    /// Open a session against an arbitrary database on the server.
    pub async fn open(&self, database: &str, autocommit: bool) -> PgResult<MigrationSession> {
        debug!(database, autocommit, "opening session");
        MigrationSession::establish(&self.config, database, autocommit).await
    }

    /// Open a session against the configured target database.
    pub async fn open_target(&self, autocommit: bool) -> PgResult<MigrationSession> {
        self.open(&self.config.database, autocommit).await
    }

    /// Open an autocommit session against the administrative database.
    ///
    /// Used for server-level statements (`CREATE DATABASE` cannot run
    /// inside a transaction).
    pub async fn open_admin(&self) -> PgResult<MigrationSession> {
        self.open(&self.config.admin_database, true).await
    }

    /// Check whether a database with the given name exists on the server.
    pub async fn database_exists(
        &self,
        admin: &mut MigrationSession,
        database: &str,
    ) -> PgResult<bool> {
        let row = admin
            .query_opt("SELECT 1 FROM pg_database WHERE datname = $1", &[&database])
            .await?;
        Ok(row.is_some())
    }

    /// Create a database with the given name.
    ///
    /// `CREATE DATABASE` takes no bind parameters, so the name goes through
    /// [`quote_identifier`] instead of string interpolation.
    pub async fn create_database(
        &self,
        admin: &mut MigrationSession,
        database: &str,
    ) -> PgResult<()> {
        admin
            .batch_execute(&format!("CREATE DATABASE {}", quote_identifier(database)))
            .await?;
        info!(database, "database created");
        Ok(())
    }
}

/// Quote an SQL identifier for safe inclusion in DDL.
///
/// Wraps the name in double quotes and doubles any embedded quote, per the
/// SQL standard.
pub fn quote_identifier(name: &str) -> String {
    format!("\"{}\"", name.replace('"', "\"\""))
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn test_quote_identifier_plain() {
        assert_eq!(quote_identifier("anitrack"), "\"anitrack\"");
    }

    #[test]
    fn test_quote_identifier_mixed_case_preserved() {
        assert_eq!(quote_identifier("AniTrack"), "\"AniTrack\"");
    }

    #[test]
    fn test_quote_identifier_escapes_quotes() {
        assert_eq!(quote_identifier("ani\"track"), "\"ani\"\"track\"");
    }

    #[test]
    fn test_gateway_holds_config() {
        let config = PgConfig::builder().database("anitrack").build().unwrap();
        let gateway = Gateway::new(config);
        assert_eq!(gateway.config().database, "anitrack");
        assert_eq!(gateway.config().admin_database, "postgres");
    }
}
