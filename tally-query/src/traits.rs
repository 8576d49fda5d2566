//! The query engine seam between preloading and a database driver.

use std::future::Future;
use std::pin::Pin;
use std::sync::Arc;

use crate::error::QueryResult;
use crate::filter::FilterValue;

/// A boxed future type for async operations.
pub type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// A result row: column name to JSON value, in projection order.
pub type Row = serde_json::Map<String, serde_json::Value>;

/// Query engine trait for executing SQL.
///
/// SQL handed to an engine uses `$1, $2, ...` placeholders; engines rewrite
/// them into their driver's syntax.
pub trait QueryEngine: Send + Sync {
    /// Execute a SELECT and return every row.
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>>;

    /// Execute a statement and return the number of affected rows.
    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>>;
}

impl<E: QueryEngine + ?Sized> QueryEngine for Arc<E> {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        (**self).query_rows(sql, params)
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        (**self).execute(sql, params)
    }
}

impl<E: QueryEngine + ?Sized> QueryEngine for &E {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        (**self).query_rows(sql, params)
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        (**self).execute(sql, params)
    }
}
