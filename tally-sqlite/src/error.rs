//! Error types for SQLite operations.

use tally_query::QueryError;
use thiserror::Error;

/// Result type for SQLite operations.
pub type SqliteResult<T> = Result<T, SqliteError>;

/// Errors that can occur during SQLite operations.
#[derive(Error, Debug)]
pub enum SqliteError {
    /// Driver error, raised on the connection's worker thread.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] tokio_rusqlite::Error),

    /// Configuration error.
    #[error("configuration error: {0}")]
    Config(String),

    /// Connection error.
    #[error("connection error: {0}")]
    Connection(String),

    /// Query execution error.
    #[error("query error: {0}")]
    Query(String),
}

impl SqliteError {
    /// Create a configuration error.
    pub fn config(message: impl Into<String>) -> Self {
        Self::Config(message.into())
    }

    /// Create a connection error.
    pub fn connection(message: impl Into<String>) -> Self {
        Self::Connection(message.into())
    }

    /// Create a query error.
    pub fn query(message: impl Into<String>) -> Self {
        Self::Query(message.into())
    }

    /// Check if this is a connection error.
    pub fn is_connection_error(&self) -> bool {
        matches!(
            self,
            Self::Connection(_) | Self::Sqlite(tokio_rusqlite::Error::ConnectionClosed)
        )
    }
}

impl From<rusqlite::Error> for SqliteError {
    fn from(err: rusqlite::Error) -> Self {
        Self::Sqlite(tokio_rusqlite::Error::Rusqlite(err))
    }
}

impl From<SqliteError> for QueryError {
    fn from(err: SqliteError) -> Self {
        match err {
            SqliteError::Config(msg) => QueryError::invalid_configuration(msg),
            SqliteError::Connection(msg) => QueryError::connection(msg),
            SqliteError::Query(msg) => QueryError::database(msg),
            SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed) => {
                QueryError::connection("sqlite connection is closed")
            }
            SqliteError::Sqlite(tokio_rusqlite::Error::Rusqlite(e)) => {
                QueryError::database(e.to_string()).with_source(e)
            }
            SqliteError::Sqlite(e) => QueryError::database(e.to_string()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tally_query::ErrorCode;

    #[test]
    fn test_error_display() {
        assert_eq!(SqliteError::config("bad url").to_string(), "configuration error: bad url");
        assert_eq!(SqliteError::query("oops").to_string(), "query error: oops");
    }

    #[test]
    fn test_into_query_error() {
        let err: QueryError = SqliteError::config("bad url").into();
        assert_eq!(err.code, ErrorCode::InvalidConfiguration);

        let err: QueryError = SqliteError::connection("refused").into();
        assert!(err.is_connection_error());

        let closed = SqliteError::Sqlite(tokio_rusqlite::Error::ConnectionClosed);
        assert!(closed.is_connection_error());
        assert!(QueryError::from(closed).is_connection_error());

        let err: QueryError = SqliteError::from(rusqlite::Error::QueryReturnedNoRows).into();
        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert_eq!(err.message, rusqlite::Error::QueryReturnedNoRows.to_string());
        assert!(std::error::Error::source(&err).is_some());
    }
}
