//! Error types for PostgreSQL operations.

use thiserror::Error;
use tokio_postgres::error::SqlState;

/// Result type for PostgreSQL operations.
pub type PgResult<T> = Result<T, PgError>;

/// Errors that can occur during PostgreSQL operations.
#[derive(Error, Debug)]
pub enum PgError {
    /// The target database does not exist on the server.
    ///
    /// Signalled distinctly so callers can recover by creating the
    /// database; every other connectivity failure is [`PgError::Connection`].
    #[error("database \"{0}\" does not exist")]
    DatabaseNotFound(String),

    /// Failure establishing a session (connectivity, authentication).
    #[error("connection error: {0}")]
    Connection(#[source] tokio_postgres::Error),

    /// PostgreSQL error raised by an established session.
    #[error("postgres error: {0}")]
    Postgres(#[from] tokio_postgres::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),
}

impl PgError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Classify a driver error raised while connecting to `database`.
    ///
    /// SQLSTATE 3D000 (`invalid_catalog_name`) means the named database is
    /// absent; anything else is a generic connection failure.
    pub fn from_connect(err: tokio_postgres::Error, database: &str) -> Self {
        if err.code() == Some(&SqlState::INVALID_CATALOG_NAME) {
            return Self::DatabaseNotFound(database.to_string());
        }
        Self::Connection(err)
    }

    /// Check if this is the database-does-not-exist condition.
    pub fn is_database_not_found(&self) -> bool {
        matches!(self, Self::DatabaseNotFound(_))
    }

    /// Check if this is a generic connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(self, Self::Connection(_))
    }

    /// The SQLSTATE code of the underlying driver error, if any.
    pub fn sql_state(&self) -> Option<&SqlState> {
        match self {
            Self::Connection(e) | Self::Postgres(e) => e.code(),
            _ => None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_creation() {
        let err = PgError::config("invalid URL");
        assert!(matches!(err, PgError::Config(_)));

        let err = PgError::DatabaseNotFound("anitrack".to_string());
        assert!(err.is_database_not_found());
        assert!(!err.is_connection_error());
    }

    #[test]
    fn test_not_found_display_names_database() {
        let err = PgError::DatabaseNotFound("anitrack".to_string());
        assert!(err.to_string().contains("anitrack"));
        assert!(err.to_string().contains("does not exist"));
    }
}
