//! FindMany operation with count preloading.

use std::sync::Arc;

use tracing::debug;

use crate::config::PreloadConfig;
use crate::error::QueryResult;
use crate::filter::{Filter, FilterValue};
use crate::preload::{CountOptions, CountPreloader, CountRequest};
use crate::record::Record;
use crate::schema::{ModelSpec, Schema};
use crate::scope::Scope;
use crate::traits::QueryEngine;
use crate::types::OrderBy;

/// A query operation that finds multiple records and, once loaded, preloads
/// the association counts requested on it.
///
/// # Example
///
/// ```rust,ignore
/// let posts = builder
///     .find_many("Post")?
///     .r#where(Filter::equals("posts.published", true))
///     .include_count("comments")
///     .include_count_with("comments", CountOptions::new().count_name("approved").r#where(approved))
///     .exec()
///     .await?;
///
/// let total = posts[0].count("comments_count");
/// ```
///
/// Chains are cheap to clone. `include_count` never changes the chain it is
/// called on, so two queries built from one base do not see each other's
/// requests.
#[derive(Clone)]
pub struct FindManyOperation<E: QueryEngine + Clone> {
    engine: E,
    schema: Arc<Schema>,
    model: String,
    scope: Scope,
    count_requests: Vec<CountRequest>,
    config: PreloadConfig,
    records: Option<Vec<Record>>,
}

impl<E: QueryEngine + Clone> FindManyOperation<E> {
    /// Create a new FindMany operation over `model`.
    pub fn new(engine: E, schema: Arc<Schema>, model: &ModelSpec) -> Self {
        Self {
            engine,
            scope: Scope::new(&model.table),
            model: model.name.clone(),
            schema,
            count_requests: Vec::new(),
            config: PreloadConfig::default(),
            records: None,
        }
    }

    /// Set the preload configuration used for count requests.
    pub fn with_config(mut self, config: PreloadConfig) -> Self {
        self.config = config;
        self
    }

    /// Add a filter condition.
    pub fn r#where(mut self, filter: impl Into<Filter>) -> Self {
        self.scope = self.scope.r#where(filter);
        self.records = None;
        self
    }

    /// Set the order by clause.
    pub fn order_by(mut self, order: impl Into<OrderBy>) -> Self {
        self.scope = self.scope.order_by(order);
        self.records = None;
        self
    }

    /// Skip a number of records.
    pub fn skip(mut self, n: u64) -> Self {
        self.scope = self.scope.skip(n);
        self.records = None;
        self
    }

    /// Take a limited number of records.
    pub fn take(mut self, n: u64) -> Self {
        self.scope = self.scope.take(n);
        self.records = None;
        self
    }

    /// Request the count of `association` under its default name.
    pub fn include_count(&self, association: &str) -> Self {
        self.include_count_with(association, CountOptions::new())
    }

    /// Request the count of `association` with options.
    ///
    /// An empty association name leaves the chain as it is. Otherwise the
    /// returned chain is a new, unloaded copy carrying one more request.
    pub fn include_count_with(&self, association: &str, options: CountOptions) -> Self {
        let mut chain = self.clone();
        if association.trim().is_empty() {
            return chain;
        }
        chain.records = None;
        chain.count_requests.push(CountRequest::new(association, options));
        chain
    }

    /// Pending count requests, in the order they run.
    pub fn count_requests(&self) -> &[CountRequest] {
        &self.count_requests
    }

    /// The queried model.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// Whether the records have been loaded.
    pub fn is_loaded(&self) -> bool {
        self.records.is_some()
    }

    /// The loaded records, if loaded.
    pub fn records(&self) -> Option<&[Record]> {
        self.records.as_deref()
    }

    /// Build the SQL query.
    pub fn build_sql(&self) -> (String, Vec<FilterValue>) {
        self.scope.build_sql()
    }

    /// Load the records and run every count request against them.
    ///
    /// Loading is memoized: once loaded, later calls return the same records
    /// without querying or counting again. If a count request fails, the
    /// records and the counts of earlier requests stay in place.
    pub async fn load(&mut self) -> QueryResult<&mut [Record]> {
        if self.records.is_none() {
            let (sql, params) = self.build_sql();
            debug!(model = %self.model, requests = self.count_requests.len(), sql = %sql, "loading records");

            let rows = self.engine.query_rows(&sql, params).await?;
            let model = &self.model;
            let records = self
                .records
                .insert(rows.into_iter().map(|row| Record::new(model, row)).collect());

            let preloader = CountPreloader::new(&self.engine, &self.schema).with_config(self.config.clone());
            let mut owners: Vec<&mut Record> = records.iter_mut().collect();
            for request in &self.count_requests {
                preloader
                    .preload(&mut owners, &request.association, &request.options)
                    .await?;
            }
        }

        Ok(self.records.as_deref_mut().unwrap_or_default())
    }

    /// Execute the query.
    pub async fn exec(mut self) -> QueryResult<Vec<Record>> {
        self.load().await?;
        Ok(self.records.unwrap_or_default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::relations::AssociationSpec;
    use crate::testing::MockEngine;
    use crate::types::OrderByField;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    fn schema() -> Arc<Schema> {
        Arc::new(
            Schema::new()
                .model(
                    ModelSpec::new("Post", "posts")
                        .association(AssociationSpec::has_many("comments", "Comment", "post_id"))
                        .association(AssociationSpec::has_one("summary", "Summary", "post_id")),
                )
                .model(ModelSpec::new("Comment", "comments"))
                .model(ModelSpec::new("Summary", "summaries")),
        )
    }

    fn find_posts(engine: Arc<MockEngine>) -> FindManyOperation<Arc<MockEngine>> {
        let schema = schema();
        let posts = schema.get_model("Post").unwrap().clone();
        FindManyOperation::new(engine, schema, &posts)
    }

    #[test]
    fn test_build_sql() {
        let op = find_posts(Arc::new(MockEngine::new()))
            .r#where(Filter::equals("posts.published", true))
            .order_by(OrderByField::desc("posts.id"))
            .skip(5)
            .take(10);

        let (sql, params) = op.build_sql();
        assert_eq!(
            sql,
            "SELECT posts.* FROM posts WHERE posts.published = $1 ORDER BY posts.id DESC LIMIT 10 OFFSET 5"
        );
        assert_eq!(params, vec![FilterValue::Bool(true)]);
    }

    #[test]
    fn test_empty_association_name_is_a_no_op() {
        let base = find_posts(Arc::new(MockEngine::new()));
        assert!(base.include_count("").count_requests().is_empty());
        assert!(base.include_count("   ").count_requests().is_empty());
    }

    #[test]
    fn test_include_count_copies_the_chain() {
        let base = find_posts(Arc::new(MockEngine::new())).include_count("comments");
        let branch = base.include_count_with("comments", CountOptions::new().count_name("n"));

        assert_eq!(base.count_requests().len(), 1);
        assert_eq!(branch.count_requests().len(), 2);
        assert_eq!(branch.count_requests()[1].options.count_name.as_deref(), Some("n"));
    }

    #[tokio::test]
    async fn test_load_runs_requests_in_order() {
        let engine = Arc::new(
            MockEngine::new()
                .respond(json!([{"id": 1}, {"id": 2}]))
                .respond(json!([{"tally_group_key": 1, "comments_count": 2}]))
                .respond(json!([{"tally_group_key": 2, "n": 5}])),
        );
        let posts = find_posts(engine.clone())
            .include_count("comments")
            .include_count_with("comments", CountOptions::new().count_name("n"))
            .exec()
            .await
            .unwrap();

        assert_eq!(posts[0].count("comments_count"), Some(2));
        assert_eq!(posts[1].count("comments_count"), Some(0));
        assert_eq!(posts[1].count("n"), Some(5));
        assert_eq!(engine.queries().len(), 3);
    }

    #[tokio::test]
    async fn test_load_is_memoized() {
        let engine = Arc::new(
            MockEngine::new()
                .respond(json!([{"id": 1}]))
                .respond(json!([{"tally_group_key": 1, "comments_count": 2}])),
        );
        let mut op = find_posts(engine.clone()).include_count("comments");

        op.load().await.unwrap();
        let again = op.load().await.unwrap();

        assert_eq!(again[0].count("comments_count"), Some(2));
        assert_eq!(engine.queries().len(), 2);

        // A request added afterwards applies to a fresh copy only.
        let extended = op.include_count("comments");
        assert!(op.is_loaded());
        assert!(!extended.is_loaded());
    }

    #[tokio::test]
    async fn test_failed_request_keeps_earlier_counts() {
        let engine = Arc::new(
            MockEngine::new()
                .respond(json!([{"id": 1}]))
                .respond(json!([{"tally_group_key": 1, "comments_count": 2}])),
        );
        let mut op = find_posts(engine.clone())
            .include_count("comments")
            .include_count("summary")
            .include_count("comments");

        let err = op.load().await.unwrap_err();
        assert!(err.is_unsupported_association());

        let records = op.records().unwrap();
        assert_eq!(records[0].count("comments_count"), Some(2));
        // The request after the failing one never ran.
        assert_eq!(engine.queries().len(), 2);
    }

    #[tokio::test]
    async fn test_engine_error_propagates() {
        let engine = Arc::new(MockEngine::new().fail("database is locked"));
        let err = find_posts(engine).include_count("comments").exec().await.unwrap_err();
        assert_eq!(err.message, "database is locked");
        assert!(!err.is_unsupported_association());
    }
}
