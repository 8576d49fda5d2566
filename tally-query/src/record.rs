//! Loaded records with their association and count caches.

use std::fmt;

use indexmap::IndexMap;
use serde_json::Value as JsonValue;

use crate::filter::FilterValue;
use crate::traits::Row;

/// A normalized key value used to match owners with grouped rows.
///
/// Integer-valued floats and canonical integer strings (`"42"`, `"-3"`)
/// become [`RecordKey::Int`], so a `post_id` stored as text still matches
/// an integer primary key. Other strings stay text.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum RecordKey {
    /// Integer key.
    Int(i64),
    /// Text key.
    Text(String),
}

impl RecordKey {
    /// Read a key out of a JSON cell. Nulls, booleans and composite values
    /// have no key.
    pub fn from_value(value: &JsonValue) -> Option<Self> {
        match value {
            JsonValue::Number(n) => n
                .as_i64()
                .or_else(|| n.as_f64().filter(|f| f.fract() == 0.0).map(|f| f as i64))
                .map(Self::Int),
            JsonValue::String(s) => Some(Self::from_text(s)),
            _ => None,
        }
    }

    fn from_text(text: &str) -> Self {
        let digits = text.strip_prefix('+').unwrap_or(text);
        match digits.parse::<i64>() {
            // Leading zeros keep "007" and "7" apart.
            Ok(i) if i.to_string() == digits => Self::Int(i),
            _ => Self::Text(text.to_string()),
        }
    }

    /// Convert to a bindable parameter.
    pub fn to_filter_value(&self) -> FilterValue {
        match self {
            Self::Int(i) => FilterValue::Int(*i),
            Self::Text(s) => FilterValue::String(s.clone()),
        }
    }
}

impl fmt::Display for RecordKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Int(i) => write!(f, "{}", i),
            Self::Text(s) => write!(f, "{}", s),
        }
    }
}

impl From<i64> for RecordKey {
    fn from(v: i64) -> Self {
        Self::Int(v)
    }
}

impl From<&str> for RecordKey {
    fn from(v: &str) -> Self {
        Self::Text(v.to_string())
    }
}

/// The loaded target(s) of an association on one record.
#[derive(Debug, Clone, PartialEq)]
pub enum LoadedAssociation {
    /// A singular association (belongs_to / has_one).
    One(Option<Box<Record>>),
    /// A collection association.
    Many(Vec<Record>),
}

impl LoadedAssociation {
    /// Whether this holds a collection.
    pub fn is_collection(&self) -> bool {
        matches!(self, Self::Many(_))
    }

    /// The loaded records, as a slice of zero or more.
    pub fn records(&self) -> &[Record] {
        match self {
            Self::One(record) => record.as_deref().map(std::slice::from_ref).unwrap_or_default(),
            Self::Many(records) => records,
        }
    }

    /// The loaded records, mutably.
    pub fn records_mut(&mut self) -> &mut [Record] {
        match self {
            Self::One(record) => record.as_deref_mut().map(std::slice::from_mut).unwrap_or_default(),
            Self::Many(records) => records,
        }
    }

    /// Number of loaded records.
    pub fn len(&self) -> usize {
        self.records().len()
    }

    /// Whether nothing was loaded.
    pub fn is_empty(&self) -> bool {
        self.records().is_empty()
    }
}

/// A single model instance loaded from the database.
///
/// Besides its column values a record carries two caches: per-association
/// loaded targets, and per-name preloaded counts. Counts accumulate, so a
/// second preload into the same name adds to the first.
#[derive(Debug, Clone, PartialEq)]
pub struct Record {
    model: String,
    values: Row,
    counts: IndexMap<String, u64>,
    associations: IndexMap<String, LoadedAssociation>,
}

impl Record {
    /// Create a record of `model` from a result row.
    pub fn new(model: impl Into<String>, values: Row) -> Self {
        Self {
            model: model.into(),
            values,
            counts: IndexMap::new(),
            associations: IndexMap::new(),
        }
    }

    /// The model name.
    pub fn model(&self) -> &str {
        &self.model
    }

    /// All column values.
    pub fn values(&self) -> &Row {
        &self.values
    }

    /// A single column value.
    pub fn get(&self, column: &str) -> Option<&JsonValue> {
        self.values.get(column)
    }

    /// A column value as a matchable key.
    pub fn key(&self, column: &str) -> Option<RecordKey> {
        self.get(column).and_then(RecordKey::from_value)
    }

    /// A preloaded count, or `None` when nothing was preloaded under `name`.
    pub fn count(&self, name: &str) -> Option<u64> {
        self.counts.get(name).copied()
    }

    /// Every preloaded count, in the order they were first set.
    pub fn counts(&self) -> impl Iterator<Item = (&str, u64)> {
        self.counts.iter().map(|(name, count)| (name.as_str(), *count))
    }

    /// Add `amount` to the count stored under `name`, starting from zero.
    /// Returns the new total.
    pub fn add_count(&mut self, name: &str, amount: u64) -> u64 {
        let total = self.counts.entry(name.to_string()).or_insert(0);
        *total += amount;
        *total
    }

    /// The loaded targets of an association, if loaded.
    pub fn association(&self, name: &str) -> Option<&LoadedAssociation> {
        self.associations.get(name)
    }

    /// Whether an association has been loaded.
    pub fn is_loaded(&self, name: &str) -> bool {
        self.associations.contains_key(name)
    }

    /// Mutable access to the loaded targets of an association. Empty when
    /// the association is not loaded.
    pub fn association_records_mut(&mut self, name: &str) -> &mut [Record] {
        match self.associations.get_mut(name) {
            Some(loaded) => loaded.records_mut(),
            None => &mut [],
        }
    }

    /// Replace the cached targets of an association.
    pub fn set_association(&mut self, name: impl Into<String>, loaded: LoadedAssociation) {
        self.associations.insert(name.into(), loaded);
    }

    /// Drop the cached targets of an association so the next access reloads.
    pub fn reset_association(&mut self, name: &str) -> Option<LoadedAssociation> {
        self.associations.shift_remove(name)
    }
}
