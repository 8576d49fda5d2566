//! Generic association preloading.

use std::collections::{HashMap, HashSet};

use tracing::debug;

use crate::config::PreloadConfig;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::record::{LoadedAssociation, Record, RecordKey};
use crate::schema::{ModelSpec, Schema};
use crate::scope::Scope;
use crate::traits::QueryEngine;
use crate::types::OrderBy;

use super::include::{PreloadOptions, join_clause};
use super::spec::{AssociationKind, AssociationSpec};

/// The two columns that link an owner to its association targets.
#[derive(Debug, Clone, PartialEq, Eq)]
pub(crate) struct KeyColumns {
    /// Column read from each owner record.
    pub owner_key: String,
    /// Column on the target table matched against the owner key.
    pub target_key: String,
}

impl KeyColumns {
    /// Resolve the key columns of a direct (non-through) association.
    pub(crate) fn resolve(owner: &ModelSpec, spec: &AssociationSpec, target: &ModelSpec) -> QueryResult<Self> {
        let foreign_key = spec.foreign_key.clone().ok_or_else(|| {
            QueryError::invalid_input(&spec.name, "association declares no foreign key")
                .with_model(&owner.name)
                .with_association(&spec.name)
        })?;

        match spec.kind {
            AssociationKind::HasMany | AssociationKind::HasOne => Ok(Self {
                owner_key: spec.primary_key.clone().unwrap_or_else(|| owner.primary_key.clone()),
                target_key: foreign_key,
            }),
            AssociationKind::BelongsTo => Ok(Self {
                owner_key: foreign_key,
                target_key: spec.primary_key.clone().unwrap_or_else(|| target.primary_key.clone()),
            }),
            kind => Err(QueryError::unsupported_association(&owner.name, &spec.name, kind)),
        }
    }
}

/// The unfiltered-by-owner query for an association's targets: the
/// association's own conditions and order, the caller's additions, the
/// polymorphic `as` constraint, and an optional include join.
pub(crate) fn association_scope(
    schema: &Schema,
    owner: &ModelSpec,
    spec: &AssociationSpec,
    target: &ModelSpec,
    conditions: &Filter,
    order: Option<&OrderBy>,
    include: Option<&str>,
) -> QueryResult<Scope> {
    let mut scope = Scope::new(&target.table)
        .r#where(spec.conditions.clone())
        .r#where(conditions.clone());

    if spec.kind != AssociationKind::BelongsTo {
        if let Some(type_column) = &spec.foreign_type {
            scope = scope.r#where(Filter::equals(target.column(type_column), owner.name.as_str()));
        }
    }

    if let Some(include) = include {
        scope = scope.join(join_clause(schema, target, include)?);
    }

    let order = order.filter(|order| !order.is_empty()).unwrap_or(&spec.order);
    if !order.is_empty() {
        scope = scope.order_by(order.clone());
    }

    Ok(scope)
}

/// Distinct, non-null keys of the owners accepted by `eligible`, in
/// first-seen order.
pub(crate) fn owner_keys(
    owners: &[&mut Record],
    column: &str,
    eligible: impl Fn(&Record) -> bool,
) -> Vec<RecordKey> {
    let mut seen = HashSet::new();
    owners
        .iter()
        .map(|owner| &**owner)
        .filter(|&owner| eligible(owner))
        .filter_map(|owner| owner.key(column))
        .filter(|key| seen.insert(key.clone()))
        .collect()
}

/// Loads `has_many`, `has_one` and `belongs_to` associations for a batch of
/// owners with one query per IN batch.
///
/// Results replace whatever the owners had cached under the association
/// name. Every owner ends up with a cache entry, empty when nothing matched.
pub struct RelationLoader<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    schema: &'a Schema,
    config: PreloadConfig,
}

impl<'a, E: QueryEngine + ?Sized> RelationLoader<'a, E> {
    /// Create a loader over `schema`.
    pub fn new(engine: &'a E, schema: &'a Schema) -> Self {
        Self {
            engine,
            schema,
            config: PreloadConfig::default(),
        }
    }

    /// Set the preload configuration.
    pub fn with_config(mut self, config: PreloadConfig) -> Self {
        self.config = config;
        self
    }

    /// Preload `name` onto every owner. Owners must share one model.
    pub async fn preload(
        &self,
        owners: &mut [&mut Record],
        name: &str,
        options: &PreloadOptions,
    ) -> QueryResult<()> {
        let Some(model) = owners.first().map(|owner| owner.model().to_string()) else {
            return Ok(());
        };
        let owner_model = self.schema.get_model(&model)?;
        let spec = self.schema.describe_association(&model, name)?;

        if !matches!(
            spec.kind,
            AssociationKind::HasMany | AssociationKind::HasOne | AssociationKind::BelongsTo
        ) {
            return Err(QueryError::unsupported_association(&model, name, spec.kind)
                .with_context("preloading an association"));
        }

        let target = self.schema.target_model(spec, None)?;
        let keys = KeyColumns::resolve(owner_model, spec, target)?;
        let scope = association_scope(
            self.schema,
            owner_model,
            spec,
            target,
            &options.conditions,
            options.order.as_ref(),
            options.include.as_deref(),
        )?;

        let key_values: Vec<FilterValue> = owner_keys(owners, &keys.owner_key, |_| true)
            .iter()
            .map(RecordKey::to_filter_value)
            .collect();
        let target_column = target.column(&keys.target_key);

        let mut grouped: HashMap<RecordKey, Vec<Record>> = HashMap::new();
        for batch in self.config.batches(&key_values) {
            let (sql, params) = scope
                .clone()
                .r#where(Filter::in_list(target_column.clone(), batch.iter().cloned()))
                .build_sql();
            debug!(model = %model, association = name, keys = batch.len(), sql = %sql, "preloading association");

            let rows = self.engine.query_rows(&sql, params).await?;
            for row in rows {
                let record = Record::new(&target.name, row);
                if let Some(key) = record.key(&keys.target_key) {
                    grouped.entry(key).or_default().push(record);
                }
            }
        }

        for owner in owners.iter_mut() {
            let targets = owner
                .key(&keys.owner_key)
                .and_then(|key| grouped.get(&key))
                .cloned()
                .unwrap_or_default();
            let loaded = if spec.kind.is_collection() {
                LoadedAssociation::Many(targets)
            } else {
                LoadedAssociation::One(targets.into_iter().next().map(Box::new))
            };
            owner.set_association(name, loaded);
        }

        Ok(())
    }
}
