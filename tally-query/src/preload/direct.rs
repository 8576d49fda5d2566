//! Counting a directly keyed association with one grouped query per batch.

use std::collections::HashMap;

use tracing::{debug, trace};

use crate::config::PreloadConfig;
use crate::error::{QueryError, QueryResult};
use crate::filter::{Filter, FilterValue};
use crate::record::{Record, RecordKey};
use crate::relations::{AssociationSpec, KeyColumns, association_scope, owner_keys};
use crate::schema::Schema;
use crate::traits::QueryEngine;

use super::aggregate::{AggregateQuery, GROUP_KEY_ALIAS};
use super::options::CountOptions;

/// Counts the targets of a `has_many` (or, as a through source, a
/// `belongs_to` / `has_one`) for every owner.
pub struct DirectCount<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    schema: &'a Schema,
    config: &'a PreloadConfig,
}

impl<'a, E: QueryEngine + ?Sized> DirectCount<'a, E> {
    /// Create a direct counter.
    pub fn new(engine: &'a E, schema: &'a Schema, config: &'a PreloadConfig) -> Self {
        Self { engine, schema, config }
    }

    /// Add the number of `spec` targets of each owner to its `count_name`
    /// count. Every owner ends up with a count, zero when nothing matched.
    pub async fn preload(
        &self,
        owners: &mut [&mut Record],
        spec: &AssociationSpec,
        options: &CountOptions,
        count_name: &str,
    ) -> QueryResult<()> {
        let Some(model) = owners.first().map(|owner| owner.model().to_string()) else {
            return Ok(());
        };
        let owner_model = self.schema.get_model(&model)?;
        let source_type = options.source_type.as_deref().or(spec.source_type.as_deref());
        let target = self.schema.target_model(spec, source_type)?;
        let keys = KeyColumns::resolve(owner_model, spec, target)?;

        let base = association_scope(
            self.schema,
            owner_model,
            spec,
            target,
            &options.conditions,
            options.order.as_ref(),
            options.include.as_deref(),
        )?;

        // Owners of a polymorphic belongs_to only count when they point at
        // the resolved target model.
        let type_column = spec
            .is_polymorphic_belongs_to()
            .then_some(spec.foreign_type.as_deref())
            .flatten();
        let eligible = |owner: &Record| {
            type_column.is_none_or(|column| {
                owner.get(column).and_then(|value| value.as_str()) == Some(target.name.as_str())
            })
        };

        let group_key = target.column(&keys.target_key);
        let aggregate = AggregateQuery::new(group_key.clone(), target.column(&target.primary_key), count_name);
        let key_values: Vec<FilterValue> = owner_keys(owners, &keys.owner_key, &eligible)
            .iter()
            .map(RecordKey::to_filter_value)
            .collect();

        let mut totals: HashMap<RecordKey, u64> = HashMap::new();
        for batch in self.config.batches(&key_values) {
            let scope = aggregate.build(
                base.clone()
                    .r#where(Filter::in_list(group_key.clone(), batch.iter().cloned())),
            );
            let (sql, params) = scope.build_sql();
            debug!(
                model = %model,
                association = %spec.name,
                count_name,
                keys = batch.len(),
                sql = %sql,
                "counting association"
            );

            let rows = self.engine.query_rows(&sql, params).await?;
            for row in &rows {
                let key = row.get(GROUP_KEY_ALIAS).and_then(RecordKey::from_value).ok_or_else(|| {
                    QueryError::deserialization(format!("aggregate row has no usable {}", GROUP_KEY_ALIAS))
                        .with_association(&spec.name)
                        .with_sql(&sql)
                })?;
                *totals.entry(key).or_insert(0) += aggregate.read_count(row)?;
            }
        }

        for owner in owners.iter_mut() {
            let amount = if eligible(&**owner) {
                owner
                    .key(&keys.owner_key)
                    .and_then(|key| totals.get(&key).copied())
                    .unwrap_or(0)
            } else {
                0
            };
            let total = owner.add_count(count_name, amount);
            trace!(owner_key = ?owner.key(&keys.owner_key), amount, total, "accumulated count");
        }

        Ok(())
    }
}
