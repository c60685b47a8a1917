//! Document store backends
//!
//! The document store holds the physical indexes the pipeline writes to. Two
//! backends implement [`DocumentStore`]:
//!
//! - [`HttpDocumentStore`]: Elasticsearch-compatible REST API
//! - [`MemoryDocumentStore`]: in-process, for tests and local runs
//!
//! Bulk payloads use the newline-delimited action format (see
//! [`crate::batch`]). Index and id lookups that hit a missing index are
//! treated as empty, never as errors.

mod http;
mod memory;

pub use http::HttpDocumentStore;
pub use memory::{MemoryDocumentStore, StoreEvent};

use crate::error::Result;
use async_trait::async_trait;
use serde_json::Value;
use std::collections::HashSet;
use std::fmt::Debug;

/// Field holding every identifier of a stored document.
pub const IDENTIFIER_FIELD: &str = "identifier";

/// Field holding the target type of a stored document (`type.value`).
pub const TYPE_FIELD: &str = "type.value";

/// Field the trend threshold is computed from.
pub const VIEWS_FIELD: &str = "last30DaysViews";

/// Outcome of one bulk request.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BulkSummary {
    pub indexed: usize,
    pub deleted: usize,
    /// Deletes of documents that were already gone.
    pub not_found: usize,
    /// Item-level failures as `(id, reason)`.
    pub failed: Vec<(String, String)>,
}

impl BulkSummary {
    pub fn merge(&mut self, other: BulkSummary) {
        self.indexed += other.indexed;
        self.deleted += other.deleted;
        self.not_found += other.not_found;
        self.failed.extend(other.failed);
    }
}

/// Search document store
#[async_trait]
pub trait DocumentStore: Debug + Send + Sync {
    /// Create an index with the given settings/mappings body
    async fn create_index(&self, index: &str, body: &Value) -> Result<()>;

    /// Delete an index. Returns `false` if it did not exist.
    async fn delete_index(&self, index: &str) -> Result<bool>;

    async fn index_exists(&self, index: &str) -> Result<bool>;

    /// Execute a newline-delimited bulk payload against `index`
    async fn bulk(&self, index: &str, payload: &str) -> Result<BulkSummary>;

    /// Copy every document of `source` into `target`
    async fn reindex(&self, source: &str, target: &str) -> Result<()>;

    /// Ids of the documents of `target_type` in `index`
    async fn document_ids(&self, index: &str, target_type: &str) -> Result<Vec<String>>;

    /// Union of the identifier lists of every document in indexes matching `pattern`
    async fn identifiers(&self, pattern: &str) -> Result<HashSet<String>>;

    /// View counts of the `size` most viewed documents in `index`, highest first
    async fn top_views(&self, index: &str, size: usize) -> Result<Vec<u64>>;

    async fn get_document(&self, index: &str, id: &str) -> Result<Option<Value>>;
}
