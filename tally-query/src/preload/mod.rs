//! Association count preloading.
//!
//! Counting the children of many owners one owner at a time issues one query
//! per owner. The preloader instead issues a single grouped query per
//! association (per IN batch) and stores each owner's count on the record:
//!
//! ```sql
//! SELECT comments.post_id AS tally_group_key, COUNT(comments.id) AS comments_count
//! FROM comments WHERE comments.post_id IN ($1, $2, $3) GROUP BY comments.post_id
//! ```
//!
//! `has_many :through` associations preload the intermediate association
//! first and count the source association on the intermediate records.
//!
//! Counts accumulate: preloading the same name twice adds the second result
//! to the first, and owners without children receive zero.
//!
//! ```rust,ignore
//! let preloader = CountPreloader::new(&engine, &schema);
//! let mut owners: Vec<&mut Record> = posts.iter_mut().collect();
//! preloader.preload(&mut owners, "comments", &CountOptions::new()).await?;
//! assert_eq!(posts[0].count("comments_count"), Some(2));
//! ```

mod aggregate;
mod direct;
mod options;
mod through;

pub use aggregate::{AggregateQuery, GROUP_KEY_ALIAS};
pub(crate) use aggregate::read_count;
pub use direct::DirectCount;
pub use options::{CountOptions, CountRequest};
pub use through::ThroughCount;

use tracing::debug;

use crate::config::PreloadConfig;
use crate::error::{QueryError, QueryResult};
use crate::record::Record;
use crate::relations::{AssociationKind, AssociationSpec};
use crate::schema::Schema;
use crate::traits::{BoxFuture, QueryEngine};

/// Where in a count preload an association is being counted.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Position {
    /// Named directly by the caller.
    Request,
    /// The source of a through association, counted on intermediate records.
    Source,
}

/// How an association's count is computed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CountStrategy {
    /// One grouped query over the target table.
    Direct,
    /// Preload the intermediate association, then count its source.
    Through,
    /// Counting is not possible for this kind.
    Unsupported(AssociationKind),
}

impl CountStrategy {
    /// Pick the strategy for `spec` at `position`.
    ///
    /// Singular associations only count as the source of a through
    /// association, where each intermediate record reaches zero or one target.
    pub fn dispatch(spec: &AssociationSpec, position: Position) -> Self {
        match (spec.kind, position) {
            (AssociationKind::HasMany, _) => Self::Direct,
            (AssociationKind::HasManyThrough, _) => Self::Through,
            (AssociationKind::BelongsTo | AssociationKind::HasOne, Position::Source) => Self::Direct,
            (kind, _) => Self::Unsupported(kind),
        }
    }
}

/// Preloads association counts onto loaded records.
pub struct CountPreloader<'a, E: QueryEngine + ?Sized> {
    engine: &'a E,
    schema: &'a Schema,
    config: PreloadConfig,
}

impl<'a, E: QueryEngine + ?Sized> CountPreloader<'a, E> {
    /// Create a preloader over `schema`.
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

    /// Count `association` for every owner. Owners must share one model.
    ///
    /// Requests already applied to the owners are not rolled back when a
    /// later query fails.
    pub async fn preload(
        &self,
        owners: &mut [&mut Record],
        association: &str,
        options: &CountOptions,
    ) -> QueryResult<()> {
        self.preload_at(owners, association, options, Position::Request).await
    }

    fn preload_at<'f, 'r: 'f>(
        &'f self,
        owners: &'f mut [&'r mut Record],
        association: &'f str,
        options: &'f CountOptions,
        position: Position,
    ) -> BoxFuture<'f, QueryResult<()>> {
        Box::pin(async move {
            let Some(model) = owners.first().map(|owner| owner.model().to_string()) else {
                return Ok(());
            };
            let spec = self.schema.describe_association(&model, association)?;
            let count_name = options.resolve_count_name(association)?;

            debug!(
                model = %model,
                association,
                count_name = %count_name,
                owners = owners.len(),
                ?position,
                "preloading counts"
            );

            match CountStrategy::dispatch(spec, position) {
                CountStrategy::Direct => {
                    DirectCount::new(self.engine, self.schema, &self.config)
                        .preload(owners, spec, options, &count_name)
                        .await
                }
                CountStrategy::Through => {
                    ThroughCount::new(self)
                        .preload(owners, spec, options, &count_name)
                        .await
                }
                CountStrategy::Unsupported(kind) => Err(QueryError::unsupported_association(&model, association, kind)
                    .with_context("preloading association counts")),
            }
        })
    }
}
