//! Document store protocol
//!
//! Two operations over JSON documents:
//! - `get(collection, filter)` returns every matching document
//! - `upsert(collection, record, conflict_key)` merges into the document
//!   sharing the conflict key values, or inserts when none exists
//!
//! Natural key components for weeks are ISO-8601 date-only strings.

use async_trait::async_trait;
use serde_json::{Map, Value};
use thiserror::Error;

/// Document store client errors
#[derive(Debug, Clone, Error)]
pub enum StoreError {
    #[error("Network error: {0}")]
    Network(String),

    #[error("Store API error {0}: {1}")]
    Api(u16, String),

    #[error("Parse error: {0}")]
    Parse(String),

    #[error("Database error: {0}")]
    Database(String),
}

/// One stored JSON object
pub type Document = Map<String, Value>;

/// Collections the content engine reads and writes
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Collection {
    WeeklySignReadings,
    WeeklyPersonReadings,
    SkyContexts,
    CompatibilityPairs,
    WeeklyCompatibility,
}

impl Collection {
    pub fn name(self) -> &'static str {
        match self {
            Collection::WeeklySignReadings => "weekly_sign_readings",
            Collection::WeeklyPersonReadings => "weekly_person_readings",
            Collection::SkyContexts => "sky_contexts",
            Collection::CompatibilityPairs => "compatibility_pairs",
            Collection::WeeklyCompatibility => "weekly_compatibility",
        }
    }

    /// Natural key fields; upserts on equal values merge
    pub fn conflict_key(self) -> &'static [&'static str] {
        match self {
            Collection::WeeklySignReadings => &["sign", "week_start"],
            Collection::WeeklyPersonReadings => &["person_id", "week_start"],
            Collection::SkyContexts => &["week_start"],
            Collection::CompatibilityPairs => &["person_a", "person_b"],
            Collection::WeeklyCompatibility => &["person_a", "person_b", "week_start"],
        }
    }
}

/// Conjunction of field equality conditions
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct Filter {
    conditions: Vec<(String, String)>,
}

impl Filter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn eq(mut self, field: impl Into<String>, value: impl Into<String>) -> Self {
        self.conditions.push((field.into(), value.into()));
        self
    }

    pub fn conditions(&self) -> &[(String, String)] {
        &self.conditions
    }

    pub fn matches(&self, document: &Document) -> bool {
        self.conditions.iter().all(|(field, expected)| {
            document
                .get(field)
                .and_then(scalar_text)
                .is_some_and(|actual| actual == *expected)
        })
    }
}

/// Text form of a scalar JSON value, as compared by filters and natural keys
pub fn scalar_text(value: &Value) -> Option<String> {
    match value {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        Value::Bool(b) => Some(b.to_string()),
        Value::Null | Value::Array(_) | Value::Object(_) => None,
    }
}

/// Merge `incoming` into `existing`; incoming fields win, others are kept
pub fn merge_documents(existing: &mut Document, incoming: Document) {
    for (key, value) in incoming {
        existing.insert(key, value);
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn get(&self, collection: Collection, filter: &Filter) -> Result<Vec<Document>, StoreError>;

    async fn upsert(
        &self,
        collection: Collection,
        record: Document,
        conflict_key: &[&str],
    ) -> Result<Document, StoreError>;
}
