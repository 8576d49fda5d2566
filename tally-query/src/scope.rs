//! Immutable SELECT builder over a single table.
//!
//! Every refinement consumes the scope and returns a new one, so a base
//! scope can be cloned and specialised per batch without affecting others.
//!
//! ```rust
//! use tally_query::{Filter, Scope};
//! use tally_query::types::OrderByField;
//!
//! let (sql, params) = Scope::new("comments")
//!     .r#where(Filter::equals("comments.approved", true))
//!     .order_by(OrderByField::desc("comments.id"))
//!     .build_sql();
//!
//! assert_eq!(sql, "SELECT comments.* FROM comments WHERE comments.approved = $1 ORDER BY comments.id DESC");
//! assert_eq!(params.len(), 1);
//! ```

use crate::filter::{Filter, FilterValue};
use crate::pagination::Pagination;
use crate::types::{OrderBy, Select};

/// A SELECT statement under construction.
#[derive(Debug, Clone, PartialEq)]
pub struct Scope {
    table: String,
    select: Select,
    distinct: bool,
    joins: Vec<String>,
    filter: Filter,
    group_by: Vec<String>,
    order_by: OrderBy,
    pagination: Pagination,
}

impl Scope {
    /// Select every column of `table`.
    pub fn new(table: impl Into<String>) -> Self {
        Self {
            table: table.into(),
            select: Select::All,
            distinct: false,
            joins: Vec::new(),
            filter: Filter::None,
            group_by: Vec::new(),
            order_by: OrderBy::none(),
            pagination: Pagination::default(),
        }
    }

    /// The table this scope reads from.
    pub fn table(&self) -> &str {
        &self.table
    }

    /// The accumulated filter.
    pub fn filter(&self) -> &Filter {
        &self.filter
    }

    /// Replace the select list.
    pub fn select(mut self, select: Select) -> Self {
        self.select = select;
        self
    }

    /// Emit `SELECT DISTINCT`.
    pub fn distinct(mut self) -> Self {
        self.distinct = true;
        self
    }

    /// Append a raw join clause (`LEFT OUTER JOIN ... ON ...`).
    pub fn join(mut self, clause: impl Into<String>) -> Self {
        self.joins.push(clause.into());
        self
    }

    /// Check if any join was added.
    pub fn has_joins(&self) -> bool {
        !self.joins.is_empty()
    }

    /// AND a filter onto the WHERE clause.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.filter = std::mem::take(&mut self.filter).and_then(filter.into());
        self
    }

    /// Append a GROUP BY expression.
    pub fn group_by(mut self, column: impl Into<String>) -> Self {
        self.group_by.push(column.into());
        self
    }

    /// Replace the ordering.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order_by = order.into();
        self
    }

    /// Skip `n` rows.
    pub fn skip(mut self, n: u64) -> Self {
        self.pagination = self.pagination.skip(n);
        self
    }

    /// Take at most `n` rows.
    pub fn take(mut self, n: u64) -> Self {
        self.pagination = self.pagination.take(n);
        self
    }

    /// Build the SQL and its bound parameters.
    ///
    /// A wildcard select over a joined scope becomes `SELECT DISTINCT
    /// table.*` so a joined one-to-many never duplicates base rows.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        let mut sql = String::with_capacity(128);
        sql.push_str("SELECT ");
        if self.distinct || (self.select.is_all() && self.has_joins()) {
            sql.push_str("DISTINCT ");
        }
        sql.push_str(&self.select.to_sql(&self.table));
        sql.push_str(" FROM ");
        sql.push_str(&self.table);

        for join in &self.joins {
            sql.push(' ');
            sql.push_str(join);
        }

        let mut params = Vec::new();
        if !self.filter.is_none() {
            let (where_sql, where_params) = self.filter.to_sql(0);
            sql.push_str(" WHERE ");
            sql.push_str(&where_sql);
            params = where_params;
        }

        if !self.group_by.is_empty() {
            sql.push_str(" GROUP BY ");
            sql.push_str(&self.group_by.join(", "));
        }

        if !self.order_by.is_empty() {
            sql.push_str(" ORDER BY ");
            self.order_by.write_sql(&mut sql);
        }

        if !self.pagination.is_empty() {
            sql.push(' ');
            self.pagination.write_sql(&mut sql);
        }

        (sql, params)
    }
}
