//! SQLite query engine implementation.

use rusqlite::types::Value;
use tracing::{debug, instrument};

use tally_query::error::{QueryError, QueryResult};
use tally_query::filter::FilterValue;
use tally_query::traits::{BoxFuture, QueryEngine, Row};

use crate::config::SqliteConfig;
use crate::connection::SqliteConnection;
use crate::error::SqliteResult;
use crate::types::filter_value_to_sqlite;

/// SQLite query engine.
///
/// Clones share one connection; SQLite serializes statements on it.
#[derive(Clone)]
pub struct SqliteEngine {
    conn: SqliteConnection,
}

impl SqliteEngine {
    /// Create an engine over an open connection.
    pub fn new(conn: SqliteConnection) -> Self {
        Self { conn }
    }

    /// Open a connection with `config` and wrap it in an engine.
    pub async fn connect(config: &SqliteConfig) -> SqliteResult<Self> {
        Ok(Self::new(SqliteConnection::open(config).await?))
    }

    /// Open a private in-memory database.
    pub async fn memory() -> SqliteResult<Self> {
        Self::connect(&SqliteConfig::memory()).await
    }

    /// Open the database a URL such as `sqlite://app.db` names.
    pub async fn from_url(url: &str) -> SqliteResult<Self> {
        Self::connect(&SqliteConfig::from_url(url)?).await
    }

    /// The underlying connection.
    pub fn connection(&self) -> &SqliteConnection {
        &self.conn
    }

    /// Run several statements, such as a schema script.
    pub async fn execute_batch(&self, sql: &str) -> SqliteResult<()> {
        debug!(bytes = sql.len(), "executing batch");
        self.conn.execute_batch(sql).await
    }

    /// Run a query written with `$n` placeholders.
    #[instrument(skip(self, params), fields(params = params.len()))]
    pub async fn query(&self, sql: &str, params: Vec<FilterValue>) -> QueryResult<Vec<Row>> {
        let sql = convert_placeholders(sql);
        debug!(sql = %sql, "executing query");

        let rows = self
            .conn
            .query_params(&sql, to_values(&params))
            .await
            .map_err(|e| QueryError::from(e).with_sql(&sql))?;

        debug!(rows = rows.len(), "query returned");
        Ok(rows)
    }

    /// Run a statement written with `$n` placeholders.
    #[instrument(skip(self, params), fields(params = params.len()))]
    pub async fn execute_sql(&self, sql: &str, params: Vec<FilterValue>) -> QueryResult<u64> {
        let sql = convert_placeholders(sql);
        debug!(sql = %sql, "executing statement");

        let affected = self
            .conn
            .execute_params(&sql, to_values(&params))
            .await
            .map_err(|e| QueryError::from(e).with_sql(&sql))?;

        Ok(affected as u64)
    }
}

impl QueryEngine for SqliteEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        let sql = sql.to_string();
        Box::pin(async move { self.query(&sql, params).await })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        let sql = sql.to_string();
        Box::pin(async move { self.execute_sql(&sql, params).await })
    }
}

fn to_values(params: &[FilterValue]) -> Vec<Value> {
    params.iter().map(filter_value_to_sqlite).collect()
}

/// Rewrite `$n` placeholders as SQLite's numbered `?n`.
///
/// Text inside single-quoted literals and double-quoted identifiers is left
/// untouched, and `$10` is never mistaken for `$1` followed by `0`.
pub fn convert_placeholders(sql: &str) -> String {
    let mut out = String::with_capacity(sql.len());
    let mut quote: Option<char> = None;
    let mut chars = sql.chars().peekable();

    while let Some(c) = chars.next() {
        match (quote, c) {
            (Some(open), c) if c == open => {
                quote = None;
                out.push(c);
            }
            (Some(_), c) => out.push(c),
            (None, '\'' | '"') => {
                quote = Some(c);
                out.push(c);
            }
            (None, '$') if chars.peek().is_some_and(char::is_ascii_digit) => {
                out.push('?');
                while let Some(digit) = chars.next_if(char::is_ascii_digit) {
                    out.push(digit);
                }
            }
            (None, c) => out.push(c),
        }
    }

    out
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;
    use serde_json::json;
    use tally_query::ErrorCode;

    #[test]
    fn test_convert_placeholders() {
        assert_eq!(
            convert_placeholders("SELECT * FROM t WHERE a = $1 AND b IN ($2, $10)"),
            "SELECT * FROM t WHERE a = ?1 AND b IN (?2, ?10)"
        );
        assert_eq!(
            convert_placeholders("SELECT '$1', \"$2\" FROM t WHERE c = $3 AND d = 'it''s $4'"),
            "SELECT '$1', \"$2\" FROM t WHERE c = ?3 AND d = 'it''s $4'"
        );
        assert_eq!(convert_placeholders("SELECT $ FROM t"), "SELECT $ FROM t");
    }

    #[tokio::test]
    async fn test_query_rows_binds_parameters() {
        let engine = SqliteEngine::memory().await.unwrap();
        engine
            .execute_batch(
                "CREATE TABLE comments (id INTEGER PRIMARY KEY, post_id INTEGER, approved BOOLEAN);
                 INSERT INTO comments VALUES (1, 1, 1), (2, 1, 0), (3, 2, 1);",
            )
            .await
            .unwrap();

        let rows = engine
            .query_rows(
                "SELECT post_id, COUNT(id) AS n FROM comments WHERE approved = $1 AND post_id IN ($2, $3) \
                 GROUP BY post_id ORDER BY post_id",
                vec![FilterValue::Bool(true), FilterValue::Int(1), FilterValue::Int(2)],
            )
            .await
            .unwrap();

        assert_eq!(rows.len(), 2);
        assert_eq!(rows[0].get("n"), Some(&json!(1)));
        assert_eq!(rows[1].get("post_id"), Some(&json!(2)));
    }

    #[tokio::test]
    async fn test_execute_returns_affected_rows() {
        let engine = SqliteEngine::memory().await.unwrap();
        engine.execute_batch("CREATE TABLE posts (id INTEGER PRIMARY KEY);").await.unwrap();

        let affected = engine
            .execute("INSERT INTO posts (id) VALUES ($1), ($2)", vec![FilterValue::Int(1), FilterValue::Int(2)])
            .await
            .unwrap();
        assert_eq!(affected, 2);
    }

    #[tokio::test]
    async fn test_errors_carry_sql() {
        let engine = SqliteEngine::memory().await.unwrap();
        let err = engine.query_rows("SELECT * FROM missing WHERE id = $1", vec![FilterValue::Int(1)]).await.unwrap_err();

        assert_eq!(err.code, ErrorCode::DatabaseError);
        assert!(err.message.contains("no such table"), "{}", err.message);
        assert_eq!(err.context.sql.as_deref(), Some("SELECT * FROM missing WHERE id = ?1"));
    }
}
