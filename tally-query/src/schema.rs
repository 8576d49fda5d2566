//! Model and association registry.
//!
//! ```rust
//! use tally_query::{AssociationSpec, ModelSpec, Schema};
//!
//! let schema = Schema::new()
//!     .model(ModelSpec::new("Post", "posts").association(AssociationSpec::has_many("comments", "Comment", "post_id")))
//!     .model(ModelSpec::new("Comment", "comments"));
//!
//! let comments = schema.describe_association("Post", "comments").unwrap();
//! assert_eq!(comments.foreign_key.as_deref(), Some("post_id"));
//! ```

use indexmap::IndexMap;

use crate::error::{QueryError, QueryResult};
use crate::relations::AssociationSpec;

/// A model: its table, primary key, and declared associations.
#[derive(Debug, Clone, PartialEq)]
pub struct ModelSpec {
    /// Model name.
    pub name: String,
    /// Table name.
    pub table: String,
    /// Primary key column.
    pub primary_key: String,
    associations: IndexMap<String, AssociationSpec>,
}

impl ModelSpec {
    /// Create a model with an `id` primary key.
    pub fn new(name: impl Into<String>, table: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            table: table.into(),
            primary_key: "id".to_string(),
            associations: IndexMap::new(),
        }
    }

    /// Set the primary key column.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = column.into();
        self
    }

    /// Declare an association. A later declaration with the same name
    /// replaces the earlier one.
    pub fn association(mut self, spec: AssociationSpec) -> Self {
        self.associations.insert(spec.name.clone(), spec);
        self
    }

    /// Look up an association by name.
    pub fn get_association(&self, name: &str) -> Option<&AssociationSpec> {
        self.associations.get(name)
    }

    /// Declared associations, in declaration order.
    pub fn associations(&self) -> impl Iterator<Item = &AssociationSpec> {
        self.associations.values()
    }

    /// The table-qualified form of one of this model's columns.
    pub fn column(&self, column: &str) -> String {
        qualify(&self.table, column)
    }
}

/// Registry of every model known to a query builder.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct Schema {
    models: IndexMap<String, ModelSpec>,
}

impl Schema {
    /// Create an empty schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Register a model.
    pub fn model(mut self, model: ModelSpec) -> Self {
        self.register(model);
        self
    }

    /// Register a model in place.
    pub fn register(&mut self, model: ModelSpec) {
        self.models.insert(model.name.clone(), model);
    }

    /// Look up a model by name.
    pub fn get_model(&self, name: &str) -> QueryResult<&ModelSpec> {
        self.models.get(name).ok_or_else(|| QueryError::unknown_model(name))
    }

    /// Resolve an association on a model.
    pub fn describe_association(&self, model: &str, name: &str) -> QueryResult<&AssociationSpec> {
        self.get_model(model)?
            .get_association(name)
            .ok_or_else(|| QueryError::unknown_association(model, name))
    }

    /// Resolve the model an association points at.
    ///
    /// A polymorphic `belongs_to` has no fixed target; `source_type` picks it.
    pub fn target_model(&self, spec: &AssociationSpec, source_type: Option<&str>) -> QueryResult<&ModelSpec> {
        match spec.target_model.as_deref().or(source_type) {
            Some(target) => self.get_model(target),
            None => Err(QueryError::new(
                crate::error::ErrorCode::InvalidSelect,
                format!("Polymorphic association '{}' needs a source_type to be counted", spec.name),
            )
            .with_association(&spec.name)
            .with_suggestion("Declare the through association with .source_type(\"Model\")")),
        }
    }

    /// Registered models, in registration order.
    pub fn models(&self) -> impl Iterator<Item = &ModelSpec> {
        self.models.values()
    }
}

/// Qualify a column with its table unless it already names one.
pub(crate) fn qualify(table: &str, column: &str) -> String {
    if column.contains('.') {
        column.to_string()
    } else {
        format!("{}.{}", table, column)
    }
}
