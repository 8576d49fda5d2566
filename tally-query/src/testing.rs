//! Scripted engine for unit tests.

use std::collections::VecDeque;
use std::sync::Mutex;

use serde_json::Value as JsonValue;

use crate::error::{QueryError, QueryResult};
use crate::filter::FilterValue;
use crate::record::Record;
use crate::traits::{BoxFuture, QueryEngine, Row};

/// Answers queries from a queue of canned results and records every call.
#[derive(Default)]
pub(crate) struct MockEngine {
    responses: Mutex<VecDeque<QueryResult<Vec<Row>>>>,
    log: Mutex<Vec<(String, Vec<FilterValue>)>>,
}

impl MockEngine {
    pub(crate) fn new() -> Self {
        Self::default()
    }

    /// Queue the rows returned by the next query.
    pub(crate) fn respond(self, rows: JsonValue) -> Self {
        self.responses.lock().unwrap().push_back(Ok(rows_from(rows)));
        self
    }

    /// Queue a failure for the next query.
    pub(crate) fn fail(self, message: &str) -> Self {
        self.responses.lock().unwrap().push_back(Err(QueryError::database(message)));
        self
    }

    pub(crate) fn queries(&self) -> Vec<(String, Vec<FilterValue>)> {
        self.log.lock().unwrap().clone()
    }

    pub(crate) fn sql(&self) -> Vec<String> {
        self.queries().into_iter().map(|(sql, _)| sql).collect()
    }
}

impl QueryEngine for MockEngine {
    fn query_rows(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<Vec<Row>>> {
        self.log.lock().unwrap().push((sql.to_string(), params));
        let response = self.responses.lock().unwrap().pop_front().unwrap_or_else(|| Ok(Vec::new()));
        Box::pin(async move { response })
    }

    fn execute(&self, sql: &str, params: Vec<FilterValue>) -> BoxFuture<'_, QueryResult<u64>> {
        self.log.lock().unwrap().push((sql.to_string(), params));
        Box::pin(async move { Ok(0) })
    }
}

/// Convert a JSON array of objects into rows.
pub(crate) fn rows_from(value: JsonValue) -> Vec<Row> {
    match value {
        JsonValue::Array(items) => items
            .into_iter()
            .filter_map(|item| match item {
                JsonValue::Object(map) => Some(map),
                _ => None,
            })
            .collect(),
        _ => Vec::new(),
    }
}

/// Build records of `model` from a JSON array of objects.
pub(crate) fn records(model: &str, value: JsonValue) -> Vec<Record> {
    rows_from(value).into_iter().map(|row| Record::new(model, row)).collect()
}
