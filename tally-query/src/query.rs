//! Query builder entry point.

use std::sync::Arc;

use crate::config::PreloadConfig;
use crate::error::QueryResult;
use crate::operations::{CountOperation, FindManyOperation};
use crate::preload::{CountOptions, CountPreloader};
use crate::record::Record;
use crate::relations::RelationLoader;
use crate::schema::Schema;
use crate::traits::QueryEngine;

/// The main query builder: an engine plus the schema it queries.
///
/// ```rust,ignore
/// let builder = QueryBuilder::new(engine, schema).with_config(PreloadConfig::from_env());
///
/// let authors = builder.find_many("Author")?.include_count("books").exec().await?;
/// let contracts = builder.count("Contract")?.exec().await?;
/// ```
pub struct QueryBuilder<E: QueryEngine + Clone> {
    engine: E,
    schema: Arc<Schema>,
    config: PreloadConfig,
}

impl<E: QueryEngine + Clone> QueryBuilder<E> {
    /// Create a new query builder.
    pub fn new(engine: E, schema: impl Into<Arc<Schema>>) -> Self {
        Self {
            engine,
            schema: schema.into(),
            config: PreloadConfig::default(),
        }
    }

    /// Set the preload configuration handed to every operation.
    pub fn with_config(mut self, config: PreloadConfig) -> Self {
        self.config = config;
        self
    }

    /// The schema queries resolve models against.
    pub fn schema(&self) -> &Schema {
        &self.schema
    }

    /// The engine queries run on.
    pub fn engine(&self) -> &E {
        &self.engine
    }

    /// Start a find_many query over `model`.
    pub fn find_many(&self, model: &str) -> QueryResult<FindManyOperation<E>> {
        let spec = self.schema.get_model(model)?;
        Ok(FindManyOperation::new(self.engine.clone(), self.schema.clone(), spec).with_config(self.config.clone()))
    }

    /// Start a count operation over `model`.
    pub fn count(&self, model: &str) -> QueryResult<CountOperation<E>> {
        let spec = self.schema.get_model(model)?;
        Ok(CountOperation::new(self.engine.clone(), &spec.table))
    }

    /// A count preloader sharing this builder's engine, schema and config.
    pub fn preloader(&self) -> CountPreloader<'_, E> {
        CountPreloader::new(&self.engine, &self.schema).with_config(self.config.clone())
    }

    /// An association loader sharing this builder's engine, schema and config.
    pub fn relation_loader(&self) -> RelationLoader<'_, E> {
        RelationLoader::new(&self.engine, &self.schema).with_config(self.config.clone())
    }

    /// Preload the count of `association` onto records loaded elsewhere.
    pub async fn preload_counts(
        &self,
        records: &mut [Record],
        association: &str,
        options: &CountOptions,
    ) -> QueryResult<()> {
        let mut owners: Vec<&mut Record> = records.iter_mut().collect();
        self.preloader().preload(&mut owners, association, options).await
    }
}

impl<E: QueryEngine + Clone> Clone for QueryBuilder<E> {
    fn clone(&self) -> Self {
        Self {
            engine: self.engine.clone(),
            schema: self.schema.clone(),
            config: self.config.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::AssociationSpec;
    use crate::schema::ModelSpec;
    use crate::testing::{MockEngine, records};
    use serde_json::json;

    fn builder(engine: MockEngine) -> QueryBuilder<Arc<MockEngine>> {
        let schema = Schema::new()
            .model(
                ModelSpec::new("Post", "posts")
                    .association(AssociationSpec::has_many("comments", "Comment", "post_id")),
            )
            .model(ModelSpec::new("Comment", "comments"));
        QueryBuilder::new(Arc::new(engine), schema)
    }

    #[test]
    fn test_unknown_model() {
        let builder = builder(MockEngine::new());
        assert!(builder.find_many("Widget").is_err());
        assert!(builder.count("Widget").is_err());
    }

    #[test]
    fn test_operations_use_model_table() {
        let builder = builder(MockEngine::new());
        assert_eq!(builder.find_many("Post").unwrap().build_sql().0, "SELECT posts.* FROM posts");
        assert_eq!(builder.count("Comment").unwrap().build_sql().0, "SELECT COUNT(*) AS count FROM comments");
    }

    #[tokio::test]
    async fn test_preload_counts_on_loaded_records() {
        let builder = builder(
            MockEngine::new()
                .respond(json!([{"tally_group_key": 1, "comments_count": 4}]))
                .respond(json!([{"tally_group_key": 1, "comments_count": 1}])),
        )
        .with_config(PreloadConfig::new().max_in_clause_len(10));
        let mut posts = records("Post", json!([{"id": 1}]));

        builder.preload_counts(&mut posts, "comments", &CountOptions::new()).await.unwrap();
        builder.preload_counts(&mut posts, "comments", &CountOptions::new()).await.unwrap();

        assert_eq!(posts[0].count("comments_count"), Some(5));
    }
}
