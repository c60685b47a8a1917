//! Synchronization service for the knowledge-graph search.
//!
//! This crate pulls records from the graph-query service, translates them
//! into search documents and keeps the document store's indexes in line with
//! the graph. It speaks the `kg-sync-protocol` vocabulary.
//!
//! # Architecture
//!
//! - [`SyncService`]: entry point used by the HTTP layer
//! - [`SyncDriver`]: per-type retrieve/translate/write loop
//! - [`GraphQueryClient`]: paged query execution, query upload, badge publishing
//! - [`DocumentStore`]: index creation, bulk writes, reindex and id lookups
//! - [`IndexLifecycle`]: temporary indexes, cutover, reconciliation
//! - [`Translator`] + [`TranslatorRegistry`]: source record to document mapping
//! - [`sanitize`]: clears references to documents that are not indexed
//! - [`TrendEvaluator`]: trend threshold and badges
//!
//! # Example
//!
//! ```ignore
//! use kg_sync_service::{SyncService, SyncConfig, TypeFilter};
//!
//! let service = SyncService::new(graph, store, registry, &SyncConfig::default());
//! let report = service.full_replacement(Stage::Released, TypeFilter::NonAutoReleased).await?;
//! ```

pub mod batch;
pub mod config;
pub mod driver;
pub mod error;
pub mod graph;
pub mod lifecycle;
pub mod queries;
pub mod sanitize;
pub mod store;
pub mod translate;
pub mod trend;

pub use batch::BulkBatcher;
pub use config::SyncConfig;
pub use driver::{SyncDriver, SyncMode, SyncOutcome, TypeFilter, UpdateResult};
pub use error::{Result, SyncError};
pub use graph::{GraphQueryClient, HttpGraphClient, MemoryGraphSource};
pub use lifecycle::{IndexKind, IndexLifecycle};
pub use queries::QueryUploader;
pub use sanitize::{sanitize, SanitizeStats};
pub use store::{BulkSummary, DocumentStore, HttpDocumentStore, MemoryDocumentStore};
pub use translate::{
    render_query, JsonDocument, JsonTranslator, QueryDefinition, Translator,
    TranslatorRegistration, TranslatorRegistry, DEFAULT_BULK_SIZE,
};
pub use trend::TrendEvaluator;

use kg_sync_protocol::{ErrorReportResult, Stage};
use serde_json::Value;
use std::sync::Arc;

/// Synchronization service.
///
/// Bundles the driver, the query uploader and resource maintenance over one
/// graph client, one document store and one translator registry.
#[derive(Debug)]
pub struct SyncService {
    driver: SyncDriver,
    uploader: QueryUploader,
}

impl SyncService {
    pub fn new(
        graph: Arc<dyn GraphQueryClient>,
        store: Arc<dyn DocumentStore>,
        registry: Arc<TranslatorRegistry>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            driver: SyncDriver::new(graph.clone(), store, registry.clone(), config),
            uploader: QueryUploader::new(graph, registry),
        }
    }

    pub fn driver(&self) -> &SyncDriver {
        &self.driver
    }

    pub fn registry(&self) -> &TranslatorRegistry {
        self.driver.registry()
    }

    pub async fn full_replacement(
        &self,
        stage: Stage,
        filter: TypeFilter,
    ) -> Result<ErrorReportResult> {
        self.driver.full_replacement(stage, filter).await
    }

    pub async fn incremental_update(
        &self,
        stage: Stage,
        filter: TypeFilter,
    ) -> Result<ErrorReportResult> {
        self.driver.incremental_update(stage, filter).await
    }

    pub async fn upload_queries(&self) -> Result<usize> {
        self.uploader.upload_all().await
    }

    pub async fn ensure_resources_index(&self) -> Result<()> {
        self.driver.lifecycle().ensure_resources_index().await
    }

    pub async fn upsert_resource(&self, id: &str, resource: &Value) -> Result<()> {
        self.driver.lifecycle().upsert_resource(id, resource).await
    }

    pub async fn get_resource(&self, id: &str) -> Result<Option<Value>> {
        self.driver.lifecycle().get_resource(id).await
    }

    pub async fn delete_resource(&self, id: &str) -> Result<()> {
        self.driver.lifecycle().delete_resource(id).await
    }
}
