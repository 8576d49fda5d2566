//! Conversions between filter values, SQLite values and JSON rows.

use rusqlite::types::{Value, ValueRef};
use serde_json::Value as JsonValue;

use tally_query::filter::FilterValue;
use tally_query::traits::Row;

/// Convert a bound parameter to a SQLite value.
///
/// Booleans bind as integers. JSON and list values bind as their JSON text.
pub fn filter_value_to_sqlite(value: &FilterValue) -> Value {
    match value {
        FilterValue::Null => Value::Null,
        FilterValue::Bool(b) => Value::Integer(i64::from(*b)),
        FilterValue::Int(i) => Value::Integer(*i),
        FilterValue::Float(f) => Value::Real(*f),
        FilterValue::String(s) => Value::Text(s.clone()),
        FilterValue::Json(j) => Value::Text(j.to_string()),
        FilterValue::List(list) => {
            let items: Vec<JsonValue> = list.iter().map(filter_value_to_json).collect();
            Value::Text(JsonValue::Array(items).to_string())
        }
    }
}

fn filter_value_to_json(value: &FilterValue) -> JsonValue {
    match value {
        FilterValue::Null => JsonValue::Null,
        FilterValue::Bool(b) => JsonValue::Bool(*b),
        FilterValue::Int(i) => JsonValue::from(*i),
        FilterValue::Float(f) => serde_json::Number::from_f64(*f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        FilterValue::String(s) => JsonValue::String(s.clone()),
        FilterValue::Json(j) => j.clone(),
        FilterValue::List(list) => JsonValue::Array(list.iter().map(filter_value_to_json).collect()),
    }
}

/// Convert a SQLite value to JSON.
///
/// Text stays text, so string keys compare equal to the owner keys they came
/// from. Blobs become arrays of byte values.
pub fn from_sqlite_value(value: ValueRef<'_>) -> JsonValue {
    match value {
        ValueRef::Null => JsonValue::Null,
        ValueRef::Integer(i) => JsonValue::from(i),
        ValueRef::Real(f) => serde_json::Number::from_f64(f)
            .map(JsonValue::Number)
            .unwrap_or(JsonValue::Null),
        ValueRef::Text(bytes) => JsonValue::String(String::from_utf8_lossy(bytes).into_owned()),
        ValueRef::Blob(bytes) => JsonValue::Array(bytes.iter().map(|b| JsonValue::from(*b)).collect()),
    }
}

/// Read every column of a result row into a JSON map, in projection order.
pub fn row_to_json(row: &rusqlite::Row<'_>, columns: &[String]) -> rusqlite::Result<Row> {
    let mut map = Row::new();
    for (index, column) in columns.iter().enumerate() {
        map.insert(column.clone(), from_sqlite_value(row.get_ref(index)?));
    }
    Ok(map)
}
