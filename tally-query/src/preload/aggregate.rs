//! Grouped counting queries.

use serde_json::Value as JsonValue;

use crate::error::{QueryError, QueryResult};
use crate::scope::Scope;
use crate::traits::Row;
use crate::types::Select;

/// Alias of the grouping key column in aggregate rows.
pub const GROUP_KEY_ALIAS: &str = "tally_group_key";

/// Turns an association scope into one row per join key with a count.
///
/// ```rust
/// use tally_query::{AggregateQuery, Scope};
///
/// let scope = AggregateQuery::new("comments.post_id", "comments.id", "comments_count")
///     .build(Scope::new("comments"));
/// assert_eq!(
///     scope.build_sql().0,
///     "SELECT comments.post_id AS tally_group_key, COUNT(comments.id) AS comments_count \
///      FROM comments GROUP BY comments.post_id"
/// );
/// ```
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AggregateQuery {
    group_key: String,
    count_column: String,
    count_alias: String,
}

impl AggregateQuery {
    /// Group by `group_key`, counting `count_column` into `count_alias`.
    pub fn new(
        group_key: impl Into<String>,
        count_column: impl Into<String>,
        count_alias: impl Into<String>,
    ) -> Self {
        Self {
            group_key: group_key.into(),
            count_column: count_column.into(),
            count_alias: count_alias.into(),
        }
    }

    /// The alias the count is selected under.
    pub fn count_alias(&self) -> &str {
        &self.count_alias
    }

    /// Replace `base`'s select list with the key and the count, grouped by
    /// the key. Filters, joins, and ordering of `base` are kept.
    pub fn build(&self, base: Scope) -> Scope {
        // A one-to-many join repeats the counted row once per joined match.
        let count = if base.has_joins() {
            format!("COUNT(DISTINCT {})", self.count_column)
        } else {
            format!("COUNT({})", self.count_column)
        };

        base.select(Select::fields([
            format!("{} AS {}", self.group_key, GROUP_KEY_ALIAS),
            format!("{} AS {}", count, self.count_alias),
        ]))
        .group_by(self.group_key.clone())
    }

    /// Read the count out of an aggregate row.
    pub fn read_count(&self, row: &Row) -> QueryResult<u64> {
        read_count(row, &self.count_alias)
    }
}

/// Read a non-negative count from `column` of `row`. A null count is zero;
/// drivers that return numeric text are accepted.
pub(crate) fn read_count(row: &Row, column: &str) -> QueryResult<u64> {
    let invalid = |value: &JsonValue| {
        QueryError::deserialization(format!("column {} holds {} instead of a count", column, value))
    };

    match row.get(column) {
        None => Err(QueryError::deserialization(format!("row is missing column {}", column))),
        Some(JsonValue::Null) => Ok(0),
        Some(value @ JsonValue::Number(n)) => n
            .as_u64()
            .or_else(|| n.as_f64().filter(|f| *f >= 0.0 && f.fract() == 0.0).map(|f| f as u64))
            .ok_or_else(|| invalid(value)),
        Some(value @ JsonValue::String(s)) => s.trim().parse::<u64>().map_err(|_| invalid(value)),
        Some(value) => Err(invalid(value)),
    }
}
