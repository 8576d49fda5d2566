//! Options for eager loading an association, and the joins they imply.

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::schema::{ModelSpec, Schema};
use crate::types::OrderBy;

use super::spec::AssociationKind;

/// Options for preloading one association onto a set of owners.
///
/// ```rust
/// use tally_query::{Filter, PreloadOptions};
///
/// let options = PreloadOptions::new()
///     .r#where(Filter::equals("books.published", true))
///     .include("book");
/// assert_eq!(options.include.as_deref(), Some("book"));
/// ```
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PreloadOptions {
    /// Extra conditions on the loaded rows, ANDed with the association's own.
    pub conditions: Filter,
    /// Ordering of the loaded rows; falls back to the association's order.
    pub order: Option<OrderBy>,
    /// Association on the loaded model to LEFT OUTER JOIN so that
    /// `conditions` may reference its columns.
    pub include: Option<String>,
}

impl PreloadOptions {
    /// Create empty options.
    pub fn new() -> Self {
        Self::default()
    }

    /// AND a filter onto the conditions.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.conditions = std::mem::take(&mut self.conditions).and_then(filter.into());
        self
    }

    /// Set the ordering.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order = Some(order.into());
        self
    }

    /// Join an association of the loaded model.
    pub fn include(mut self, association: impl Into<String>) -> Self {
        self.include = Some(association.into());
        self
    }

    /// Overlay `other` field by field: every field it sets replaces ours.
    pub fn overlay(mut self, other: &PreloadOptions) -> Self {
        if !other.conditions.is_none() {
            self.conditions = other.conditions.clone();
        }
        if other.order.is_some() {
            self.order = other.order.clone();
        }
        if other.include.is_some() {
            self.include = other.include.clone();
        }
        self
    }
}

/// Build the `LEFT OUTER JOIN` that brings `association` of `model` into a
/// query over `model`'s table.
pub(crate) fn join_clause(schema: &Schema, model: &ModelSpec, association: &str) -> QueryResult<String> {
    let spec = schema.describe_association(&model.name, association)?;
    if !matches!(
        spec.kind,
        AssociationKind::HasMany | AssociationKind::HasOne | AssociationKind::BelongsTo
    ) {
        return Err(QueryError::unsupported_association(&model.name, &spec.name, spec.kind)
            .with_context("joining an included association"));
    }
    let target = schema.target_model(spec, None)?;
    let missing_key = || {
        QueryError::invalid_input(&spec.name, "association declares no foreign key").with_model(&model.name)
    };

    match spec.kind {
        AssociationKind::HasMany | AssociationKind::HasOne => {
            let foreign_key = spec.foreign_key.as_deref().ok_or_else(missing_key)?;
            let owner_key = spec.primary_key.as_deref().unwrap_or(&model.primary_key);
            let mut clause = format!(
                "LEFT OUTER JOIN {} ON {} = {}",
                target.table,
                target.column(foreign_key),
                model.column(owner_key)
            );
            if let Some(type_column) = &spec.foreign_type {
                clause.push_str(&format!(
                    " AND {} = {}",
                    target.column(type_column),
                    quote_literal(&model.name)
                ));
            }
            Ok(clause)
        }
        AssociationKind::BelongsTo => {
            let foreign_key = spec.foreign_key.as_deref().ok_or_else(missing_key)?;
            let target_key = spec.primary_key.as_deref().unwrap_or(&target.primary_key);
            Ok(format!(
                "LEFT OUTER JOIN {} ON {} = {}",
                target.table,
                target.column(target_key),
                model.column(foreign_key)
            ))
        }
        _ => Err(QueryError::unsupported_association(&model.name, &spec.name, spec.kind)),
    }
}

fn quote_literal(value: &str) -> String {
    format!("'{}'", value.replace('\'', "''"))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::AssociationSpec;
    use pretty_assertions::assert_eq;

    fn schema() -> Schema {
        Schema::new()
            .model(
                ModelSpec::new("Contract", "contracts")
                    .association(AssociationSpec::belongs_to("book", "Book", "book_id"))
                    .association(AssociationSpec::has_many_through("editions", "book")),
            )
            .model(
                ModelSpec::new("Book", "books")
                    .association(AssociationSpec::has_many("taggings", "Tagging", "taggable_id").as_polymorphic("taggable_type")),
            )
            .model(ModelSpec::new("Tagging", "taggings"))
    }

    #[test]
    fn test_belongs_to_join() {
        let schema = schema();
        let contract = schema.get_model("Contract").unwrap();
        assert_eq!(
            join_clause(&schema, contract, "book").unwrap(),
            "LEFT OUTER JOIN books ON books.id = contracts.book_id"
        );
    }

    #[test]
    fn test_polymorphic_has_many_join() {
        let schema = schema();
        let book = schema.get_model("Book").unwrap();
        assert_eq!(
            join_clause(&schema, book, "taggings").unwrap(),
            "LEFT OUTER JOIN taggings ON taggings.taggable_id = books.id AND taggings.taggable_type = 'Book'"
        );
    }

    #[test]
    fn test_through_join_is_rejected() {
        let schema = schema();
        let contract = schema.get_model("Contract").unwrap();
        let err = join_clause(&schema, contract, "editions").unwrap_err();
        assert!(err.is_unsupported_association());
    }

    #[test]
    fn test_overlay() {
        let base = PreloadOptions::new()
            .r#where(Filter::equals("books.published", true))
            .include("book");
        let nested = PreloadOptions::new().r#where(Filter::equals("contracts.signed", true));

        let merged = base.overlay(&nested);
        assert_eq!(merged.conditions, Filter::equals("contracts.signed", true));
        assert_eq!(merged.include.as_deref(), Some("book"));
        assert_eq!(merged.order, None);
    }
}
