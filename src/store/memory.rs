use async_trait::async_trait;
use serde_json::{Map, Value as JsonValue};
use std::collections::{BTreeMap, HashMap};
use tokio::sync::RwLock;
use uuid::Uuid;

use super::{ensure_object, Document, DocumentStore, FieldUpdate, Query};
use crate::error::{Error, Result};

type Collection = BTreeMap<String, Map<String, JsonValue>>;

/// Process-local store. A single write lock covers each mutation, so
/// batched field updates and increments are atomic.
#[derive(Debug, Default)]
pub struct InMemoryStore {
    collections: RwLock<HashMap<String, Collection>>,
}

impl InMemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

fn to_map(data: JsonValue) -> Map<String, JsonValue> {
    match data {
        JsonValue::Object(map) => map,
        _ => Map::new(),
    }
}

fn to_document(id: &str, map: &Map<String, JsonValue>) -> Document {
    Document {
        id: id.to_string(),
        data: JsonValue::Object(map.clone()),
    }
}

fn apply(map: &mut Map<String, JsonValue>, change: FieldUpdate) -> Result<()> {
    match change {
        FieldUpdate::Set(field, value) => {
            map.insert(field, value);
        }
        FieldUpdate::Increment(field, by) => {
            let current = match map.get(&field) {
                None | Some(JsonValue::Null) => 0,
                Some(value) => value.as_i64().ok_or_else(|| {
                    Error::BadRequest(format!("field '{}' is not an integer", field))
                })?,
            };
            map.insert(field, JsonValue::from(current + by));
        }
    }
    Ok(())
}

#[async_trait]
impl DocumentStore for InMemoryStore {
    async fn query(&self, collection: &str, query: &Query) -> Result<Vec<Document>> {
        let guard = self.collections.read().await;
        let Some(docs) = guard.get(collection) else {
            return Ok(Vec::new());
        };

        let mut matched: Vec<(JsonValue, &String)> = docs
            .iter()
            .map(|(id, map)| (JsonValue::Object(map.clone()), id))
            .filter(|(data, _)| query.matches(data))
            .collect();
        matched.sort_by(|(a, _), (b, _)| query.compare(a, b));
        if let Some(limit) = query.limit {
            matched.truncate(limit);
        }

        Ok(matched
            .into_iter()
            .map(|(data, id)| Document {
                id: id.clone(),
                data,
            })
            .collect())
    }

    async fn get(&self, collection: &str, id: &str) -> Result<Option<Document>> {
        let guard = self.collections.read().await;
        Ok(guard
            .get(collection)
            .and_then(|docs| docs.get(id))
            .map(|map| to_document(id, map)))
    }

    async fn create(&self, collection: &str, data: JsonValue) -> Result<Document> {
        ensure_object(&data)?;
        let id = Uuid::new_v4().to_string();
        self.set(collection, &id, data).await
    }

    async fn set(&self, collection: &str, id: &str, data: JsonValue) -> Result<Document> {
        ensure_object(&data)?;
        let mut map = to_map(data);
        map.remove("id");
        let mut guard = self.collections.write().await;
        let docs = guard.entry(collection.to_string()).or_default();
        let doc = to_document(id, &map);
        docs.insert(id.to_string(), map);
        Ok(doc)
    }

    async fn update(
        &self,
        collection: &str,
        id: &str,
        changes: Vec<FieldUpdate>,
    ) -> Result<Document> {
        let mut guard = self.collections.write().await;
        let map = guard
            .get_mut(collection)
            .and_then(|docs| docs.get_mut(id))
            .ok_or_else(|| Error::NotFound(format!("{}/{} not found", collection, id)))?;

        // Work on a copy so a failing change leaves the document untouched.
        let mut next = map.clone();
        for change in changes {
            apply(&mut next, change)?;
        }
        *map = next;
        Ok(to_document(id, map))
    }

    async fn delete(&self, collection: &str, id: &str) -> Result<bool> {
        let mut guard = self.collections.write().await;
        Ok(guard
            .get_mut(collection)
            .map(|docs| docs.remove(id).is_some())
            .unwrap_or(false))
    }
}
