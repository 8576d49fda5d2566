//! SQLite connection wrapper.

use rusqlite::types::Value;
use tokio_rusqlite::Connection;
use tracing::{debug, trace};

use tally_query::traits::Row;

use crate::config::{DatabasePath, SqliteConfig};
use crate::error::{SqliteError, SqliteResult};
use crate::types::row_to_json;

/// A handle to one SQLite connection running on its own worker thread.
///
/// Clones share the connection, so an in-memory database stays visible to
/// every clone.
#[derive(Clone)]
pub struct SqliteConnection {
    conn: Connection,
}

impl SqliteConnection {
    /// Open a connection and apply the configured pragmas.
    pub async fn open(config: &SqliteConfig) -> SqliteResult<Self> {
        let conn = match &config.path {
            DatabasePath::Memory => Connection::open_in_memory().await,
            DatabasePath::File(path) => Connection::open(path).await,
        }
        .map_err(|e| SqliteError::connection(e.to_string()))?;

        let foreign_keys = config.foreign_keys;
        let busy_timeout = config.busy_timeout();
        let synchronous = config.synchronous.as_pragma();
        let journal_mode = (!config.path.is_memory()).then(|| config.journal_mode.as_pragma());

        conn.call(move |conn| {
            conn.pragma_update(None, "foreign_keys", foreign_keys)?;
            if let Some(timeout) = busy_timeout {
                conn.busy_timeout(timeout)?;
            }
            conn.pragma_update(None, "synchronous", synchronous)?;
            if let Some(mode) = journal_mode {
                let applied: String =
                    conn.pragma_update_and_check(None, "journal_mode", mode, |row| row.get(0))?;
                trace!(journal_mode = %applied, "journal mode set");
            }
            Ok(())
        })
        .await?;

        debug!(path = ?config.path, foreign_keys, "opened sqlite connection");
        Ok(Self { conn })
    }

    /// Run a query with `?n` placeholders and return every row.
    pub async fn query_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<Vec<Row>> {
        let sql = sql.to_string();

        let rows = self
            .conn
            .call(move |conn| {
                let mut stmt = conn.prepare(&sql)?;
                let columns: Vec<String> = stmt.column_names().iter().map(|s| s.to_string()).collect();
                let rows = stmt.query_map(rusqlite::params_from_iter(params.iter()), |row| row_to_json(row, &columns))?;
                Ok(rows.collect::<Result<Vec<_>, _>>()?)
            })
            .await?;

        Ok(rows)
    }

    /// Run a statement with `?n` placeholders and return the affected row count.
    pub async fn execute_params(&self, sql: &str, params: Vec<Value>) -> SqliteResult<usize> {
        let sql = sql.to_string();

        let affected = self
            .conn
            .call(move |conn| Ok(conn.execute(&sql, rusqlite::params_from_iter(params.iter()))?))
            .await?;

        Ok(affected)
    }

    /// Run several semicolon-separated statements without parameters.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        let sql = sql.to_string();
        self.conn
            .call(move |conn| Ok(conn.execute_batch(&sql)?))
            .await?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[tokio::test]
    async fn test_clones_share_memory_database() {
        let conn = SqliteConnection::open(&SqliteConfig::memory()).await.unwrap();
        conn.execute_batch("CREATE TABLE posts (id INTEGER PRIMARY KEY, title TEXT);")
            .await
            .unwrap();

        let other = conn.clone();
        let inserted = other
            .execute_params("INSERT INTO posts (id, title) VALUES (?1, ?2)", vec![
                Value::Integer(1),
                Value::Text("hello".into()),
            ])
            .await
            .unwrap();
        assert_eq!(inserted, 1);

        let rows = conn.query_params("SELECT id, title FROM posts", vec![]).await.unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].get("title"), Some(&json!("hello")));
        let columns: Vec<&String> = rows[0].keys().collect();
        assert_eq!(columns, vec!["id", "title"]);
    }

    #[tokio::test]
    async fn test_foreign_keys_pragma() {
        let conn = SqliteConnection::open(&SqliteConfig::memory()).await.unwrap();
        let rows = conn.query_params("PRAGMA foreign_keys", vec![]).await.unwrap();
        assert_eq!(rows[0].get("foreign_keys"), Some(&json!(1)));
    }

    #[tokio::test]
    async fn test_file_database() {
        let dir = tempfile::tempdir().unwrap();
        let config = SqliteConfig::file(dir.path().join("tally.db"));
        let conn = SqliteConnection::open(&config).await.unwrap();

        conn.execute_batch("CREATE TABLE t (id INTEGER);").await.unwrap();
        let rows = conn.query_params("PRAGMA journal_mode", vec![]).await.unwrap();
        assert_eq!(rows[0].get("journal_mode"), Some(&json!("wal")));
    }

    #[tokio::test]
    async fn test_sql_error() {
        let conn = SqliteConnection::open(&SqliteConfig::memory()).await.unwrap();
        let err = conn.query_params("SELECT * FROM missing", vec![]).await.unwrap_err();
        assert!(err.to_string().contains("no such table"), "{err}");
    }
}
