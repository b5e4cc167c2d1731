//! Document store adapter.
//!
//! Collections hold JSON object documents keyed by a store-assigned id.
//! Callers never read-modify-write: every change goes through [`DocumentStore::update`],
//! which applies a batch of [`FieldUpdate`]s atomically.

pub mod memory;
pub mod postgres;
pub mod query;

use async_trait::async_trait;
use serde_json::Value as JsonValue;

use crate::error::Result;

pub use memory::InMemoryStore;
pub use postgres::PgDocumentStore;
pub use query::{Direction, Filter, OrderBy, Query, RangeOp};

#[derive(Debug, Clone, PartialEq)]
pub struct Document {
    pub id: String,
    /// Top-level JSON object, without the id.
    pub data: JsonValue,
}

impl Document {
    /// Returns the document body with the id merged in under `"id"`.
    pub fn into_json(self) -> JsonValue {
        let mut data = self.data;
        if let JsonValue::Object(map) = &mut data {
            map.insert("id".to_string(), JsonValue::String(self.id));
        }
        data
    }
}

/// A single change applied to a top-level field.
#[derive(Debug, Clone, PartialEq)]
pub enum FieldUpdate {
    Set(String, JsonValue),
    /// Atomic numeric increment; a missing field counts as zero.
    Increment(String, i64),
}

impl FieldUpdate {
    pub fn set(field: impl Into<String>, value: impl Into<JsonValue>) -> Self {
        FieldUpdate::Set(field.into(), value.into())
    }

    pub fn increment(field: impl Into<String>, by: i64) -> Self {
        FieldUpdate::Increment(field.into(), by)
    }

    pub fn field(&self) -> &str {
        match self {
            FieldUpdate::Set(field, _) | FieldUpdate::Increment(field, _) => field,
        }
    }
}

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait DocumentStore: Send + Sync {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>>;

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>>;

    /// Inserts a new document under a freshly generated id.
    async fn create(&self, collection: &str, data: JsonValue) -> Result<Document>;

    /// Inserts or fully replaces the document stored under `id`.
    async fn set(&self, collection: &str, id: &str, data: JsonValue) -> Result<Document>;

    /// Applies all `changes` in one atomic write. Fails with `NotFound`
    /// when the document does not exist.
    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Vec<FieldUpdate>,
    ) -> Result<Document>;

    /// Hard delete. Returns whether a document was removed.
    async fn delete(&self, collection: &str, id: &str) -> Result<bool>;
}

pub(crate) fn ensure_object(data: &JsonValue) -> Result<()> {
    if data.is_object() {
        Ok(())
    } else {
        Err(crate::error::Error::BadRequest(
            "document body must be a JSON object".to_string(),
        ))
    }
}
