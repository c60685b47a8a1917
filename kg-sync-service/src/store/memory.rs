//! In-memory document store for testing and local runs

use super::{BulkSummary, DocumentStore, IDENTIFIER_FIELD, VIEWS_FIELD};
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use kg_sync_protocol::index::matches_pattern;
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{BTreeMap, HashSet};

#[derive(Debug, Clone, Default)]
struct MemoryIndex {
    body: Value,
    docs: BTreeMap<String, Value>,
}

/// Store operations, recorded in the order they were applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum StoreEvent {
    Created(String),
    Deleted(String),
    Bulk { index: String, chars: usize },
    Reindexed { source: String, target: String },
}

/// Document store keeping every index in memory
#[derive(Debug, Default)]
pub struct MemoryDocumentStore {
    indexes: RwLock<BTreeMap<String, MemoryIndex>>,
    events: RwLock<Vec<StoreEvent>>,
}

impl MemoryDocumentStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Names of all existing indexes, sorted
    pub fn index_names(&self) -> Vec<String> {
        self.indexes.read().keys().cloned().collect()
    }

    /// Every document of `index` as `(id, source)`, sorted by id
    pub fn documents(&self, index: &str) -> Vec<(String, Value)> {
        self.indexes
            .read()
            .get(index)
            .map(|i| {
                i.docs
                    .iter()
                    .map(|(id, doc)| (id.clone(), doc.clone()))
                    .collect()
            })
            .unwrap_or_default()
    }

    /// Creation body the index was created with
    pub fn index_body(&self, index: &str) -> Option<Value> {
        self.indexes.read().get(index).map(|i| i.body.clone())
    }

    pub fn events(&self) -> Vec<StoreEvent> {
        self.events.read().clone()
    }

    /// Write a document directly, bypassing bulk parsing
    pub fn put_document(&self, index: &str, id: &str, source: Value) {
        self.indexes
            .write()
            .entry(index.to_string())
            .or_default()
            .docs
            .insert(id.to_string(), source);
    }

    fn parse_action(line: &str) -> Result<(String, String)> {
        let action: Value = serde_json::from_str(line)?;
        let Some((name, meta)) = action.as_object().and_then(|o| o.iter().next()) else {
            return Err(SyncError::store(Some(400), format!("malformed bulk action: {}", line)));
        };
        let id = meta
            .get("_id")
            .and_then(Value::as_str)
            .ok_or_else(|| SyncError::store(Some(400), format!("bulk action without _id: {}", line)))?;
        Ok((name.clone(), id.to_string()))
    }
}

#[async_trait]
impl DocumentStore for MemoryDocumentStore {
    async fn create_index(&self, index: &str, body: &Value) -> Result<()> {
        let mut indexes = self.indexes.write();
        if indexes.contains_key(index) {
            return Err(SyncError::store(
                Some(400),
                format!("index {} already exists", index),
            ));
        }
        indexes.insert(
            index.to_string(),
            MemoryIndex {
                body: body.clone(),
                docs: BTreeMap::new(),
            },
        );
        self.events
            .write()
            .push(StoreEvent::Created(index.to_string()));
        Ok(())
    }

    async fn delete_index(&self, index: &str) -> Result<bool> {
        let existed = self.indexes.write().remove(index).is_some();
        if existed {
            self.events
                .write()
                .push(StoreEvent::Deleted(index.to_string()));
        }
        Ok(existed)
    }

    async fn index_exists(&self, index: &str) -> Result<bool> {
        Ok(self.indexes.read().contains_key(index))
    }

    async fn bulk(&self, index: &str, payload: &str) -> Result<BulkSummary> {
        let mut summary = BulkSummary::default();
        let mut lines = payload.lines().filter(|l| !l.trim().is_empty());
        let mut indexes = self.indexes.write();
        let target = indexes.entry(index.to_string()).or_default();

        while let Some(line) = lines.next() {
            let (action, id) = Self::parse_action(line)?;
            match action.as_str() {
                "index" => {
                    let source = lines.next().ok_or_else(|| {
                        SyncError::store(Some(400), format!("missing source for {}", id))
                    })?;
                    target.docs.insert(id, serde_json::from_str(source)?);
                    summary.indexed += 1;
                }
                "delete" => {
                    if target.docs.remove(&id).is_some() {
                        summary.deleted += 1;
                    } else {
                        summary.not_found += 1;
                    }
                }
                other => {
                    summary
                        .failed
                        .push((id, format!("unsupported action {}", other)));
                }
            }
        }
        drop(indexes);

        self.events.write().push(StoreEvent::Bulk {
            index: index.to_string(),
            chars: payload.len(),
        });
        Ok(summary)
    }

    async fn reindex(&self, source: &str, target: &str) -> Result<()> {
        let mut indexes = self.indexes.write();
        let docs = indexes
            .get(source)
            .map(|i| i.docs.clone())
            .ok_or_else(|| SyncError::store(Some(404), format!("no such index: {}", source)))?;
        indexes
            .entry(target.to_string())
            .or_default()
            .docs
            .extend(docs);
        drop(indexes);

        self.events.write().push(StoreEvent::Reindexed {
            source: source.to_string(),
            target: target.to_string(),
        });
        Ok(())
    }

    async fn document_ids(&self, index: &str, target_type: &str) -> Result<Vec<String>> {
        Ok(self
            .indexes
            .read()
            .get(index)
            .map(|i| {
                i.docs
                    .iter()
                    .filter(|(_, doc)| {
                        doc.pointer("/type/value").and_then(Value::as_str) == Some(target_type)
                    })
                    .map(|(id, _)| id.clone())
                    .collect()
            })
            .unwrap_or_default())
    }

    async fn identifiers(&self, pattern: &str) -> Result<HashSet<String>> {
        let indexes = self.indexes.read();
        let mut identifiers = HashSet::new();
        for (_, index) in indexes.iter().filter(|(name, _)| matches_pattern(pattern, name)) {
            for (id, doc) in &index.docs {
                match doc.get(IDENTIFIER_FIELD).and_then(Value::as_array) {
                    Some(values) => identifiers
                        .extend(values.iter().filter_map(Value::as_str).map(str::to_string)),
                    None => {
                        identifiers.insert(id.clone());
                    }
                }
            }
        }
        Ok(identifiers)
    }

    async fn top_views(&self, index: &str, size: usize) -> Result<Vec<u64>> {
        let indexes = self.indexes.read();
        let Some(index) = indexes.get(index) else {
            return Ok(Vec::new());
        };
        let mut views: Vec<u64> = index
            .docs
            .values()
            .filter_map(|doc| doc.get(VIEWS_FIELD).and_then(Value::as_u64))
            .collect();
        views.sort_unstable_by(|a, b| b.cmp(a));
        views.truncate(size);
        Ok(views)
    }

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>> {
        Ok(self
            .indexes
            .read()
            .get(index)
            .and_then(|i| i.docs.get(id).cloned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn test_bulk_index_and_delete() {
        let store = MemoryDocumentStore::new();
        let payload = concat!(
            "{ \"index\" : { \"_id\" : \"a\" } }\n",
            "{\"title\": \"A\"}\n",
            "{ \"index\" : { \"_id\" : \"b\" } }\n",
            "{\"title\": \"B\"}\n",
        );
        let summary = store.bulk("idx", payload).await.unwrap();
        assert_eq!(summary.indexed, 2);

        let summary = store
            .bulk(
                "idx",
                "{ \"delete\" : { \"_id\" : \"a\" } }\n{ \"delete\" : { \"_id\" : \"zzz\" } }\n",
            )
            .await
            .unwrap();
        assert_eq!(summary.deleted, 1);
        assert_eq!(summary.not_found, 1);

        let docs = store.documents("idx");
        assert_eq!(docs.len(), 1);
        assert_eq!(docs[0].1["title"], "B");
    }

    #[tokio::test]
    async fn test_create_existing_index_fails() {
        let store = MemoryDocumentStore::new();
        store.create_index("idx", &json!({})).await.unwrap();
        assert!(store.create_index("idx", &json!({})).await.is_err());
        assert!(store.delete_index("idx").await.unwrap());
        assert!(!store.delete_index("idx").await.unwrap());
    }

    #[tokio::test]
    async fn test_identifiers_across_pattern() {
        let store = MemoryDocumentStore::new();
        store.put_document("in_progress_identifiers", "a", json!({"identifier": ["a", "x"]}));
        store.put_document("in_progress_searchable_dataset", "b", json!({"identifier": ["b"]}));
        store.put_document("temporary_in_progress_searchable_dataset", "c", json!({"identifier": ["c"]}));
        store.put_document("publicly_released_identifiers", "d", json!({"identifier": ["d"]}));

        let ids = store.identifiers("in_progress_*").await.unwrap();
        let mut ids: Vec<_> = ids.into_iter().collect();
        ids.sort();
        assert_eq!(ids, vec!["a", "b", "x"]);
    }

    #[tokio::test]
    async fn test_top_views_sorted_and_truncated() {
        let store = MemoryDocumentStore::new();
        for (id, views) in [("a", 5), ("b", 50), ("c", 20), ("d", 1)] {
            store.put_document("idx", id, json!({"last30DaysViews": views}));
        }
        store.put_document("idx", "e", json!({"title": "never viewed"}));
        assert_eq!(store.top_views("idx", 3).await.unwrap(), vec![50, 20, 5]);
        assert!(store.top_views("missing", 3).await.unwrap().is_empty());
    }
}
