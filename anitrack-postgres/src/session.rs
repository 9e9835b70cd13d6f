//! Single-connection migration sessions.

use tokio::task::JoinHandle;
use tokio_postgres::types::ToSql;
use tokio_postgres::{NoTls, Row};
use tracing::{debug, warn};

use crate::config::PgConfig;
use crate::error::{PgError, PgResult};

/// The unit of work for one migration call: a live connection, its statement
/// interface, and the transaction boundary.
///
/// A session is owned exclusively by the caller that opened it and is passed
/// by argument through every operation that needs it; there is no ambient or
/// global database handle. [`MigrationSession::close`] must run on every
/// exit path and always succeeds — an open transaction is implicitly rolled
/// back.
///
/// With `autocommit` disabled the session behaves like the classic drivers:
/// a transaction is opened lazily before the first statement and stays open
/// until an explicit [`commit`](Self::commit) or
/// [`rollback`](Self::rollback), after which the next statement opens a
/// fresh one.
pub struct MigrationSession {
    client: tokio_postgres::Client,
    conn_task: JoinHandle<()>,
    database: String,
    autocommit: bool,
    in_transaction: bool,
}

impl MigrationSession {
    /// Establish a session against `database` on the configured server.
    pub(crate) async fn establish(
        config: &PgConfig,
        database: &str,
        autocommit: bool,
    ) -> PgResult<Self> {
        let pg_config = config.to_pg_config(database);

        let (client, connection) = pg_config
            .connect(NoTls)
            .await
            .map_err(|e| PgError::from_connect(e, database))?;

        let db = database.to_string();
        let conn_task = tokio::spawn(async move {
            if let Err(e) = connection.await {
                warn!(database = %db, error = %e, "connection task terminated with error");
            }
        });

        debug!(database, autocommit, "session established");

        Ok(Self {
            client,
            conn_task,
            database: database.to_string(),
            autocommit,
            in_transaction: false,
        })
    }

    /// The database this session is connected to.
    pub fn database(&self) -> &str {
        &self.database
    }

    /// Whether the session runs each statement in its own transaction.
    pub fn autocommit(&self) -> bool {
        self.autocommit
    }

    /// Whether an explicit transaction is currently open.
    pub fn in_transaction(&self) -> bool {
        self.in_transaction
    }

    async fn ensure_transaction(&mut self) -> PgResult<()> {
        if !self.autocommit && !self.in_transaction {
            self.client.batch_execute("BEGIN").await?;
            self.in_transaction = true;
        }
        Ok(())
    }

    /// Execute a statement and return the number of affected rows.
    pub async fn execute(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<u64> {
        debug!(sql = %sql, "executing statement");
        self.ensure_transaction().await?;
        let count = self.client.execute(sql, params).await?;
        Ok(count)
    }

    /// Execute a query and return all rows.
    pub async fn query(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<Vec<Row>> {
        debug!(sql = %sql, "executing query");
        self.ensure_transaction().await?;
        let rows = self.client.query(sql, params).await?;
        Ok(rows)
    }

    /// Execute a query and return exactly one row.
    pub async fn query_one(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<Row> {
        debug!(sql = %sql, "executing query_one");
        self.ensure_transaction().await?;
        let row = self.client.query_one(sql, params).await?;
        Ok(row)
    }

    /// Execute a query and return zero or one row.
    pub async fn query_opt(
        &mut self,
        sql: &str,
        params: &[&(dyn ToSql + Sync)],
    ) -> PgResult<Option<Row>> {
        debug!(sql = %sql, "executing query_opt");
        self.ensure_transaction().await?;
        let row = self.client.query_opt(sql, params).await?;
        Ok(row)
    }

    /// Execute a batch of statements in a single round-trip.
    ///
    /// Used for schema artifacts, which are opaque multi-statement scripts.
    pub async fn batch_execute(&mut self, sql: &str) -> PgResult<()> {
        self.ensure_transaction().await?;
        self.client.batch_execute(sql).await?;
        Ok(())
    }

    /// Open an explicit transaction. A no-op if one is already open.
    pub async fn begin(&mut self) -> PgResult<()> {
        if self.in_transaction {
            return Ok(());
        }
        debug!("beginning transaction");
        self.client.batch_execute("BEGIN").await?;
        self.in_transaction = true;
        Ok(())
    }

    /// Commit the open transaction. A no-op if none is open.
    pub async fn commit(&mut self) -> PgResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        debug!("committing transaction");
        self.client.batch_execute("COMMIT").await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Roll back the open transaction. A no-op if none is open.
    pub async fn rollback(&mut self) -> PgResult<()> {
        if !self.in_transaction {
            return Ok(());
        }
        debug!("rolling back transaction");
        self.client.batch_execute("ROLLBACK").await?;
        self.in_transaction = false;
        Ok(())
    }

    /// Create a savepoint inside the open transaction.
    pub async fn savepoint(&mut self, name: &str) -> PgResult<()> {
        debug!(name = %name, "creating savepoint");
        self.ensure_transaction().await?;
        self.client
            .batch_execute(&format!("SAVEPOINT {}", name))
            .await?;
        Ok(())
    }

    /// Roll back to a savepoint, keeping the enclosing transaction open.
    pub async fn rollback_to(&mut self, name: &str) -> PgResult<()> {
        debug!(name = %name, "rolling back to savepoint");
        self.client
            .batch_execute(&format!("ROLLBACK TO SAVEPOINT {}", name))
            .await?;
        Ok(())
    }

    /// Release a savepoint.
    pub async fn release_savepoint(&mut self, name: &str) -> PgResult<()> {
        debug!(name = %name, "releasing savepoint");
        self.client
            .batch_execute(&format!("RELEASE SAVEPOINT {}", name))
            .await?;
        Ok(())
    }

    /// Close the session.
    ///
    /// Always succeeds. An open transaction is rolled back first; a failure
    /// doing so is logged and otherwise ignored, since dropping the
    /// connection discards the uncommitted transaction server-side anyway.
    pub async fn close(mut self) {
        if self.in_transaction {
            if let Err(e) = self.client.batch_execute("ROLLBACK").await {
                debug!(error = %e, "rollback during close failed");
            }
            self.in_transaction = false;
        }

        let Self {
            client,
            conn_task,
            database,
            ..
        } = self;

        drop(client);
        let _ = conn_task.await;
        debug!(database = %database, "session closed");
    }
}

#[cfg(test)]
mod tests {
    // Session behavior is exercised by the engine integration tests in
    // anitrack-migrate/tests, which require a running PostgreSQL server.
}
