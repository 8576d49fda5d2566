//! Count request options.

use indexmap::IndexMap;

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::relations::PreloadOptions;
use crate::types::OrderBy;

/// Options for one count preload.
///
/// ```rust
/// use tally_query::{CountOptions, Filter, PreloadOptions};
///
/// let options = CountOptions::new()
///     .count_name("published_books")
///     .r#where(Filter::equals("books.published", true))
///     .through("contracts", PreloadOptions::new().r#where(Filter::equals("contracts.signed", true)));
///
/// assert_eq!(options.resolve_count_name("books").unwrap(), "published_books");
/// assert_eq!(CountOptions::new().resolve_count_name("books").unwrap(), "books_count");
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct CountOptions {
    /// Name the count is stored under. Defaults to `{association}_count`.
    pub count_name: Option<String>,
    /// Conditions on the counted rows, ANDed with the association's own.
    pub conditions: Filter,
    /// Ordering forwarded to the counting and intermediate queries.
    pub order: Option<OrderBy>,
    /// Association of the counted model to join for `conditions`.
    pub include: Option<String>,
    /// Concrete model for a polymorphic source.
    pub source_type: Option<String>,
    /// Per-intermediate-association overrides used when loading through
    /// associations, keyed by intermediate association name.
    pub through_options: IndexMap<String, PreloadOptions>,
}

impl CountOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// Store the count under `name`.
    pub fn count_name(mut self, name: impl Into<String>) -> Self {
        self.count_name = Some(name.into());
        self
    }

    /// AND a filter onto the counted rows.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.conditions = std::mem::take(&mut self.conditions).and_then(filter.into());
        self
    }

    /// Set the ordering.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Join an association of the counted model.
    pub fn include(mut self, association: impl Into<String>) -> Self {
        self.include = Some(association.into());
        self
    }

    /// Pin a polymorphic source to one model.
    pub fn source_type(mut self, model: impl Into<String>) -> Self {
        self.source_type = Some(model.into());
        self
    }

    /// Override how the intermediate association `name` is loaded.
    pub fn through(mut self, name: impl Into<String>, options: PreloadOptions) -> Self {
        self.through_options.insert(name.into(), options);
        self
    }

    /// The name the count for `association` is stored under.
    ///
    /// The name becomes a SQL column alias, so it must be a plain identifier.
    pub fn resolve_count_name(&self, association: &str) -> QueryResult<String> {
        let name = match &self.count_name {
            Some(name) => name.clone(),
            None => format!("{}_count", association),
        };

        let mut chars = name.chars();
        let valid = chars.next().is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
            && chars.all(|c| c.is_ascii_alphanumeric() || c == '_');
        if !valid {
            return Err(QueryError::invalid_input(
                "count_name",
                format!("'{}' is not a valid identifier", name),
            )
            .with_association(association));
        }
        Ok(name)
    }
}

/// A pending count preload recorded on a query chain.
#[derive(Debug, Clone, PartialEq)]
pub struct CountRequest {
    /// Association to count.
    pub association: String,
    /// Request options.
    pub options: CountOptions,
}

impl CountRequest {
    /// Create a request.
    pub fn new(association: impl Into<String>, options: CountOptions) -> Self {
        Self {
            association: association.into(),
            options,
        }
    }
}
