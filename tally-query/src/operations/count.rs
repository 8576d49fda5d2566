//! Count operation for counting records.

use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::preload::read_count;
use crate::traits::QueryEngine;

/// Column the count is selected under.
const COUNT_ALIAS: &str = "count";

/// A count operation for counting records.
///
/// # Example
///
/// ```rust,ignore
/// let comments = builder
///     .count("Comment")?
///     .r#where(Filter::equals("comments.post_id", 1i64))
///     .exec()
///     .await?;
/// ```
pub struct CountOperation<E: QueryEngine> {
    engine: E,
    table: String,
    filter: Filter,
    distinct: Option<String>,
}

impl<E: QueryEngine> CountOperation<E> {
    /// Create a new Count operation over `table`.
    pub fn new(engine: E, table: impl Into<String>) -> Self {
        Self {
            engine,
            table: table.into(),
            filter: Filter::None,
            distinct: None,
        }
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        let new_filter = filter.into();
        self.filter = self.filter.and_then(new_filter);
        self
    }

    /// Count distinct values of a column.
    pub fn distinct(mut self, column: impl Into<String>) -> Self {
        self.distinct = Some(column.into());
        self
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let mut sql = String::from("SELECT COUNT(");
        match &self.distinct {
            Some(col) => {
                sql.push_str("DISTINCT ");
                sql.push_str(col);
            }
            None => sql.push('*'),
        }
        sql.push_str(") AS ");
        sql.push_str(COUNT_ALIAS);

        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        let mut params = Vec::new();
        if !self.filter.is_none() {
            let (where_sql, where_params) = self.filter.to_sql(0);
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params = where_params;
        }

        (sql, params)
    }

    /// Execute the count query.
    pub async fn exec(self) -> QueryResult<u64> {
        let (sql, params) = self.build_sql();
        let rows = self.engine.query_rows(&sql, params).await?;
        let row = rows
            .first()
            .ok_or_else(|| QueryError::deserialization("count query returned no rows").with_sql(&sql))?;
        read_count(row, COUNT_ALIAS)
    }
}
