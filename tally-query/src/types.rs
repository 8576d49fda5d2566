//! Ordering and projection types shared by scopes and associations.

use std::borrow::Cow;
use std::fmt;

/// Sort direction.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default)]
pub enum SortOrder {
    /// Ascending.
    #[default]
    Asc,
    /// Descending.
    Desc,
}

impl SortOrder {
    /// Get the SQL keyword for this sort order.
    pub fn as_sql(&self) -> &'static str {
        match self {
            Self::Asc => "ASC",
            Self::Desc => "DESC",
        }
    }
}

impl fmt::Display for SortOrder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_sql())
    }
}

/// One `column direction` term of an ORDER BY clause.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct OrderByField {
    /// Qualified column, such as `books.title`.
    pub column: Cow<'static, str>,
    /// Direction.
    pub order: SortOrder,
}

impl OrderByField {
    /// Order by `column` in `order`.
    pub fn new(column: impl Into<Cow<'static, str>>, order: SortOrder) -> Self {
        Self {
            column: column.into(),
            order,
        }
    }

    /// Ascending order on `column`.
    pub fn asc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Asc)
    }

    /// Descending order on `column`.
    pub fn desc(column: impl Into<Cow<'static, str>>) -> Self {
        Self::new(column, SortOrder::Desc)
    }

    /// Append this term to `buffer`.
    ///
    /// ```rust
    /// use tally_query::types::OrderByField;
    ///
    /// let mut buffer = String::from("ORDER BY ");
    /// OrderByField::desc("books.title").write_sql(&mut buffer);
    /// assert_eq!(buffer, "ORDER BY books.title DESC");
    /// ```
    pub fn write_sql(&self, buffer: &mut String) {
        buffer.push_str(&self.column);
        buffer.push(' ');
        buffer.push_str(self.order.as_sql());
    }
}

/// An ORDER BY list, possibly empty.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct OrderBy(Vec<OrderByField>);

impl OrderBy {
    /// No ordering.
    pub fn none() -> Self {
        Self::default()
    }

    /// Whether no term is present.
    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Append a term.
    pub fn then(mut self, field: OrderByField) -> Self {
        self.0.push(field);
        self
    }

    /// The terms, in priority order.
    pub fn fields(&self) -> &[OrderByField] {
        &self.0
    }

    /// Append the comma-separated terms (without `ORDER BY`) to `buffer`.
    pub fn write_sql(&self, buffer: &mut String) {
        for (i, field) in self.0.iter().enumerate() {
            if i > 0 {
                buffer.push_str(", ");
            }
            field.write_sql(buffer);
        }
    }
}

impl From<OrderByField> for OrderBy {
    fn from(field: OrderByField) -> Self {
        Self(vec![field])
    }
}

impl From<Vec<OrderByField>> for OrderBy {
    fn from(fields: Vec<OrderByField>) -> Self {
        Self(fields)
    }
}

/// The projection of a scope.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub enum Select {
    /// Every column of the scope's own table.
    #[default]
    All,
    /// Explicit columns or expressions.
    Fields(Vec<String>),
}

impl Select {
    /// Select explicit columns or expressions.
    pub fn fields(fields: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self::Fields(fields.into_iter().map(Into::into).collect())
    }

    /// Check if this selects all columns.
    pub fn is_all(&self) -> bool {
        matches!(self, Self::All)
    }

    /// Generate the SQL column list. The wildcard is qualified with `table`
    /// so joined columns never leak into the projection.
    pub fn to_sql(&self, table: &str) -> String {
        match self {
            Self::All => format!("{}.*", table),
            Self::Fields(fields) => fields.join(", "),
        }
    }
}
