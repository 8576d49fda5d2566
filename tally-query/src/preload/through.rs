//! Counting `has_many :through` associations.
//!
//! The intermediate association is preloaded onto the owners with the
//! generic loader, the source association is counted on the flattened
//! intermediate records, and each owner then receives the sum of its own
//! intermediate records' counts.

use tracing::debug;

use crate::error::{QueryError, QueryResult};
use crate::filter::Filter;
use crate::record::Record;
use crate::relations::{AssociationSpec, PreloadOptions, RelationLoader};
use crate::schema::ModelSpec;
use crate::traits::QueryEngine;

use super::options::CountOptions;
use super::{CountPreloader, Position};

/// Counts a through association by delegating to its source.
pub struct ThroughCount<'p, 'a, E: QueryEngine + ?Sized> {
    preloader: &'p CountPreloader<'a, E>,
}

impl<'p, 'a, E: QueryEngine + ?Sized> ThroughCount<'p, 'a, E> {
    /// Create a through counter sharing `preloader`'s engine and schema.
    pub fn new(preloader: &'p CountPreloader<'a, E>) -> Self {
        Self { preloader }
    }

    /// Add the number of `spec` targets reachable through the intermediate
    /// association to each owner's `count_name` count.
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
        let schema = self.preloader.schema;
        let through_name = spec.through.as_deref().ok_or_else(|| {
            QueryError::invalid_input(&spec.name, "through association names no intermediate association")
                .with_model(&model)
        })?;
        let through = schema.describe_association(&model, through_name)?;
        let intermediate = schema.target_model(through, None)?;
        let source = resolve_source(intermediate, spec)?;

        let source_type = options.source_type.as_deref().or(spec.source_type.as_deref());

        // The intermediate query only sees the association's own options.
        // Caller conditions, include and order name the counted model and
        // apply to the source count.
        let mut through_options = PreloadOptions::new();
        match source_type {
            Some(source_type) => {
                let type_column = source
                    .is_polymorphic_belongs_to()
                    .then_some(source.foreign_type.as_deref())
                    .flatten()
                    .ok_or_else(|| {
                        QueryError::invalid_input(
                            "source_type",
                            format!("source '{}' of '{}' is not a polymorphic belongs_to", source.name, spec.name),
                        )
                        .with_model(&model)
                        .with_association(&spec.name)
                    })?;
                through_options = through_options.r#where(Filter::equals(intermediate.column(type_column), source_type));
            }
            None => {
                // Both name source columns, so the source is joined.
                if !spec.conditions.is_none() || !spec.order.is_empty() {
                    through_options = through_options
                        .r#where(spec.conditions.clone())
                        .include(source.name.clone());
                }
                if !spec.order.is_empty() {
                    through_options.order = Some(spec.order.clone());
                }
            }
        }
        if let Some(nested) = options.through_options.get(through_name) {
            through_options = through_options.overlay(nested);
        }

        debug!(
            model = %model,
            association = %spec.name,
            through = through_name,
            source = %source.name,
            "counting through association"
        );

        RelationLoader::new(self.preloader.engine, schema)
            .with_config(self.preloader.config.clone())
            .preload(owners, through_name, &through_options)
            .await?;

        let source_options = CountOptions {
            count_name: Some(count_name.to_string()),
            conditions: spec.conditions.clone().and_then(options.conditions.clone()),
            order: options
                .order
                .clone()
                .or_else(|| (!spec.order.is_empty()).then(|| spec.order.clone())),
            include: options.include.clone(),
            source_type: source_type.map(str::to_string),
            through_options: options.through_options.clone(),
        };

        {
            let mut intermediates: Vec<&mut Record> = owners
                .iter_mut()
                .flat_map(|owner| owner.association_records_mut(through_name).iter_mut())
                .collect();
            self.preloader
                .preload_at(&mut intermediates, &source.name, &source_options, Position::Source)
                .await?;
        }

        // The cache only holds the intermediates that point at the pinned
        // source type.
        let reset_cache = source_type.is_some() && through.kind.is_collection();
        for owner in owners.iter_mut() {
            let reached: u64 = owner
                .association(through_name)
                .map(|loaded| loaded.records().iter().filter_map(|record| record.count(count_name)).sum())
                .unwrap_or(0);
            owner.add_count(count_name, reached);
            if reset_cache {
                owner.reset_association(through_name);
            }
        }

        Ok(())
    }
}

/// Find the association on the intermediate model that a through
/// association reaches its targets by.
fn resolve_source<'s>(intermediate: &'s ModelSpec, spec: &AssociationSpec) -> QueryResult<&'s AssociationSpec> {
    let candidates = spec.source_candidates();
    candidates
        .iter()
        .find_map(|name| intermediate.get_association(name))
        .ok_or_else(|| {
            QueryError::unknown_association(&intermediate.name, candidates.join(" or "))
                .with_context(format!("resolving the source of '{}'", spec.name))
                .with_suggestion(format!("Name the source explicitly with .source(\"...\") on '{}'", spec.name))
        })
}
