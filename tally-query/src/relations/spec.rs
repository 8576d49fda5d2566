//! Association specification types.

use std::fmt;

use crate::filter::Filter;
use crate::types::OrderBy;

/// Kind of association between models.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum AssociationKind {
    /// Owner has many targets keyed by a foreign key on the target table.
    HasMany,
    /// Owner reaches many targets through an intermediate association.
    HasManyThrough,
    /// Owner has one target keyed by a foreign key on the target table.
    HasOne,
    /// Owner holds the foreign key to a single target.
    BelongsTo,
    /// Many-to-many over a join table.
    HasAndBelongsToMany,
}

impl AssociationKind {
    /// The declaration name, as used in error messages.
    pub fn macro_name(&self) -> &'static str {
        match self {
            Self::HasMany => "has_many",
            Self::HasManyThrough => "has_many :through",
            Self::HasOne => "has_one",
            Self::BelongsTo => "belongs_to",
            Self::HasAndBelongsToMany => "has_and_belongs_to_many",
        }
    }

    /// Check if this association loads a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::HasMany | Self::HasManyThrough | Self::HasAndBelongsToMany)
    }

    /// Check if this association loads at most one record.
    pub fn is_singular(&self) -> bool {
        !self.is_collection()
    }
}

impl fmt::Display for AssociationKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.macro_name())
    }
}

/// Specification for a named association on a model.
///
/// Key columns follow the declaring side's conventions: for `has_many` and
/// `has_one` the foreign key lives on the target table and `primary_key`
/// names the owner column it references; for `belongs_to` the foreign key
/// lives on the owner and `primary_key` names the target column.
#[derive(Debug, Clone, PartialEq)]
pub struct AssociationSpec {
    /// Name of the association.
    pub name: String,
    /// Kind of association.
    pub kind: AssociationKind,
    /// Target model. `None` for a polymorphic `belongs_to`.
    pub target_model: Option<String>,
    /// Foreign key column.
    pub foreign_key: Option<String>,
    /// Referenced key column, when not the primary key.
    pub primary_key: Option<String>,
    /// Polymorphic type column (on the owner for `belongs_to`, on the
    /// target for `has_many`/`has_one` declared with `as`).
    pub foreign_type: Option<String>,
    /// Intermediate association for `has_many :through`.
    pub through: Option<String>,
    /// Source association on the intermediate model.
    pub source: Option<String>,
    /// Concrete model for a polymorphic source.
    pub source_type: Option<String>,
    /// Join table for `has_and_belongs_to_many`.
    pub join_table: Option<String>,
    /// Default conditions on the target rows.
    pub conditions: Filter,
    /// Default ordering of the target rows.
    pub order: OrderBy,
}

impl AssociationSpec {
    fn new(name: impl Into<String>, kind: AssociationKind) -> Self {
        Self {
            name: name.into(),
            kind,
            target_model: None,
            foreign_key: None,
            primary_key: None,
            foreign_type: None,
            through: None,
            source: None,
            source_type: None,
            join_table: None,
            conditions: Filter::None,
            order: OrderBy::none(),
        }
    }

    /// Create a `has_many` association.
    pub fn has_many(
        name: impl Into<String>,
        target_model: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let mut spec = Self::new(name, AssociationKind::HasMany);
        spec.target_model = Some(target_model.into());
        spec.foreign_key = Some(foreign_key.into());
        spec
    }

    /// Create a `has_one` association.
    pub fn has_one(
        name: impl Into<String>,
        target_model: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let mut spec = Self::new(name, AssociationKind::HasOne);
        spec.target_model = Some(target_model.into());
        spec.foreign_key = Some(foreign_key.into());
        spec
    }

    /// Create a `belongs_to` association.
    pub fn belongs_to(
        name: impl Into<String>,
        target_model: impl Into<String>,
        foreign_key: impl Into<String>,
    ) -> Self {
        let mut spec = Self::new(name, AssociationKind::BelongsTo);
        spec.target_model = Some(target_model.into());
        spec.foreign_key = Some(foreign_key.into());
        spec
    }

    /// Create a polymorphic `belongs_to` whose target model is stored in
    /// `type_column`.
    pub fn belongs_to_polymorphic(
        name: impl Into<String>,
        foreign_key: impl Into<String>,
        type_column: impl Into<String>,
    ) -> Self {
        let mut spec = Self::new(name, AssociationKind::BelongsTo);
        spec.foreign_key = Some(foreign_key.into());
        spec.foreign_type = Some(type_column.into());
        spec
    }

    /// Create a `has_many :through` association.
    pub fn has_many_through(name: impl Into<String>, through: impl Into<String>) -> Self {
        let mut spec = Self::new(name, AssociationKind::HasManyThrough);
        spec.through = Some(through.into());
        spec
    }

    /// Create a `has_and_belongs_to_many` association.
    pub fn has_and_belongs_to_many(
        name: impl Into<String>,
        target_model: impl Into<String>,
        join_table: impl Into<String>,
    ) -> Self {
        let mut spec = Self::new(name, AssociationKind::HasAndBelongsToMany);
        spec.target_model = Some(target_model.into());
        spec.join_table = Some(join_table.into());
        spec
    }

    /// Reference a column other than the primary key.
    pub fn primary_key(mut self, column: impl Into<String>) -> Self {
        self.primary_key = Some(column.into());
        self
    }

    /// Declare the target side polymorphic (`as:`); the target's
    /// `type_column` must hold the owner's model name.
    pub fn as_polymorphic(mut self, type_column: impl Into<String>) -> Self {
        self.foreign_type = Some(type_column.into());
        self
    }

    /// Name the source association of a through association.
    pub fn source(mut self, source: impl Into<String>) -> Self {
        self.source = Some(source.into());
        self
    }

    /// Pin a polymorphic source to one concrete model.
    pub fn source_type(mut self, model: impl Into<String>) -> Self {
        self.source_type = Some(model.into());
        self
    }

    /// Add default conditions on the target rows.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.conditions = std::mem::take(&mut self.conditions).and_then(filter.into());
        self
    }

    /// Set the default ordering of the target rows.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.order = order.into();
        self
    }

    /// Check if this is a polymorphic `belongs_to`.
    pub fn is_polymorphic_belongs_to(&self) -> bool {
        self.kind == AssociationKind::BelongsTo && self.foreign_type.is_some()
    }

    /// Association names tried, in order, when resolving the source of a
    /// through association on the intermediate model.
    pub fn source_candidates(&self) -> Vec<String> {
        match &self.source {
            Some(source) => vec![source.clone()],
            None => {
                let singular = singularize(&self.name);
                if singular == self.name {
                    vec![self.name.clone()]
                } else {
                    vec![self.name.clone(), singular]
                }
            }
        }
    }
}

/// Naive English singular used for source lookup (`books` → `book`,
/// `categories` → `category`).
pub(crate) fn singularize(name: &str) -> String {
    if let Some(stem) = name.strip_suffix("ies") {
        format!("{}y", stem)
    } else if let Some(stem) = name.strip_suffix("ses") {
        format!("{}s", stem)
    } else if let Some(stem) = name.strip_suffix('s').filter(|stem| !stem.ends_with('s')) {
        stem.to_string()
    } else {
        name.to_string()
    }
}
