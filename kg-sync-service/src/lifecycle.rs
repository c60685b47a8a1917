//! Index lifecycle management
//!
//! Owns every write to the document store: index (re)creation, bulk writes,
//! stale-document reconciliation and the temporary-to-real cutover of full
//! rebuilds.
//!
//! # Cutover
//!
//! A full rebuild fills a `temporary_` index, then:
//!
//! 1. deletes and recreates the real index with the same mapping
//! 2. copies temporary into real with a native reindex
//! 3. deletes the temporary index
//!
//! Between 1 and 2 the real index is empty. Readers querying during that
//! window see no documents of the type.

use crate::batch::{delete_operation, index_operation, BulkBatcher};
use crate::error::{Result, SyncError};
use crate::store::{BulkSummary, DocumentStore};
use crate::translate::{identifiers_index_body, TranslatorRegistration};
use kg_sync_protocol::{index, ErrorReport, Stage, TargetDocument};
use serde_json::{json, Value};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, warn};

/// The kinds of index a document can be written to
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IndexKind {
    /// Full-text searchable, one per type
    Searchable,
    /// Non-searchable documents of an auto-released type, one per type
    AutoReleased,
    /// Non-searchable documents of every other type, shared
    Identifiers,
}

impl IndexKind {
    pub fn index_name(&self, stage: Stage, target_type: &str, temporary: bool) -> String {
        match self {
            IndexKind::Searchable => index::search_index(stage, target_type, temporary),
            IndexKind::AutoReleased => index::auto_released_index(stage, target_type, temporary),
            IndexKind::Identifiers => index::identifiers_index(stage),
        }
    }

    /// Per-type indexes of a registration; these are rebuilt through a
    /// temporary index on full replacement.
    pub fn owned_by(registration: &TranslatorRegistration) -> &'static [IndexKind] {
        if registration.auto_release {
            &[IndexKind::AutoReleased, IndexKind::Searchable]
        } else {
            &[IndexKind::Searchable]
        }
    }

    /// Index receiving the non-searchable documents of a registration
    pub fn non_searchable_for(registration: &TranslatorRegistration) -> IndexKind {
        if registration.auto_release {
            IndexKind::AutoReleased
        } else {
            IndexKind::Identifiers
        }
    }

    fn creation_body(&self, registration: &TranslatorRegistration) -> Result<Value> {
        match self {
            IndexKind::Identifiers => Ok(identifiers_index_body()),
            _ => registration.index_body(),
        }
    }
}

/// Manages physical indexes in a document store
#[derive(Debug, Clone)]
pub struct IndexLifecycle {
    store: Arc<dyn DocumentStore>,
    batcher: BulkBatcher,
}

impl IndexLifecycle {
    pub fn new(store: Arc<dyn DocumentStore>, batcher: BulkBatcher) -> Self {
        Self { store, batcher }
    }

    pub fn store(&self) -> &dyn DocumentStore {
        self.store.as_ref()
    }

    /// Delete (if present) and create `index`.
    pub async fn recreate_index(&self, index: &str, body: &Value) -> Result<()> {
        if self.store.delete_index(index).await? {
            info!(index, "deleted index");
        }
        self.store.create_index(index, body).await?;
        info!(index, "created index");
        Ok(())
    }

    /// Recreate one index of a registration.
    ///
    /// Mapping problems surface here, before anything is written.
    pub async fn recreate(
        &self,
        kind: IndexKind,
        registration: &TranslatorRegistration,
        stage: Stage,
        temporary: bool,
    ) -> Result<String> {
        let body = kind.creation_body(registration)?;
        let name = kind.index_name(stage, &registration.target_type, temporary);
        self.recreate_index(&name, &body).await?;
        Ok(name)
    }

    pub async fn recreate_identifiers_index(&self, stage: Stage) -> Result<()> {
        self.recreate_index(&index::identifiers_index(stage), &identifiers_index_body())
            .await
    }

    pub async fn ensure_resources_index(&self) -> Result<()> {
        if !self.store.index_exists(index::RESOURCES_INDEX).await? {
            self.store
                .create_index(index::RESOURCES_INDEX, &json!({}))
                .await?;
            info!(index = index::RESOURCES_INDEX, "created index");
        }
        Ok(())
    }

    /// Delete an index; a missing index is not an error.
    pub async fn delete_index(&self, index: &str) -> Result<bool> {
        self.store.delete_index(index).await
    }

    /// Write documents to `index` in size-bounded bulk requests.
    ///
    /// Documents that cannot be serialized, or that the store rejects, are
    /// recorded in `errors` and do not abort the write.
    pub async fn write_documents(
        &self,
        index: &str,
        target_type: &str,
        documents: &[Box<dyn TargetDocument>],
        errors: &mut ErrorReport,
    ) -> Result<BulkSummary> {
        let mut operations = Vec::with_capacity(documents.len());
        for document in documents {
            match stored_source(document.as_ref(), target_type)
                .and_then(|source| index_operation(document.id(), &source).map_err(Into::into))
            {
                Ok(operation) => operations.push(operation),
                Err(e) => errors.record(document.id(), e.to_string()),
            }
        }
        let summary = self.send(index, operations).await?;
        for (id, reason) in &summary.failed {
            errors.record(id.clone(), format!("rejected by {}: {}", index, reason));
        }
        Ok(summary)
    }

    /// Delete documents by id. Ids already missing are counted, not failed.
    pub async fn delete_documents(&self, index: &str, ids: &[String]) -> Result<BulkSummary> {
        let operations = ids
            .iter()
            .map(|id| delete_operation(id))
            .collect::<serde_json::Result<Vec<_>>>()?;
        self.send(index, operations).await
    }

    async fn send(&self, index: &str, operations: Vec<String>) -> Result<BulkSummary> {
        let mut summary = BulkSummary::default();
        for payload in self.batcher.batch(&operations) {
            summary.merge(self.store.bulk(index, &payload).await?);
        }
        debug!(
            index,
            indexed = summary.indexed,
            deleted = summary.deleted,
            failed = summary.failed.len(),
            "bulk write finished"
        );
        Ok(summary)
    }

    /// Every identifier of every document in the stage's real indexes.
    pub async fn known_identifiers(&self, stage: Stage) -> Result<HashSet<String>> {
        let identifiers = self.store.identifiers(&index::stage_pattern(stage)).await?;
        info!(%stage, count = identifiers.len(), "loaded existing identifiers");
        Ok(identifiers)
    }

    /// Delete documents of `target_type` in `index` whose id is not in `keep`.
    ///
    /// Returns the number of documents removed.
    pub async fn remove_stale(
        &self,
        index: &str,
        target_type: &str,
        keep: &HashSet<String>,
    ) -> Result<usize> {
        let stale: Vec<String> = self
            .store
            .document_ids(index, target_type)
            .await?
            .into_iter()
            .filter(|id| !keep.contains(id))
            .collect();
        if stale.is_empty() {
            return Ok(0);
        }

        let summary = self.delete_documents(index, &stale).await?;
        if !summary.failed.is_empty() {
            warn!(index, failed = summary.failed.len(), "some stale documents could not be removed");
        }
        info!(index, target_type, removed = summary.deleted, "removed stale documents");
        Ok(summary.deleted)
    }

    /// Replace the real index of `kind` with the contents of its temporary
    /// counterpart, then drop the temporary index.
    pub async fn cutover(
        &self,
        kind: IndexKind,
        registration: &TranslatorRegistration,
        stage: Stage,
    ) -> Result<()> {
        if kind == IndexKind::Identifiers {
            return Err(SyncError::Config(
                "the identifiers index has no temporary counterpart".to_string(),
            ));
        }
        let temporary = kind.index_name(stage, &registration.target_type, true);
        let real = self.recreate(kind, registration, stage, false).await?;
        self.store.reindex(&temporary, &real).await?;
        self.store.delete_index(&temporary).await?;
        info!(from = %temporary, to = %real, "reindexed temporary index");
        Ok(())
    }

    /// Create or replace an opaque resource document.
    pub async fn upsert_resource(&self, id: &str, resource: &Value) -> Result<()> {
        let operation = index_operation(id, resource)?;
        self.send(index::RESOURCES_INDEX, vec![operation]).await?;
        Ok(())
    }

    pub async fn get_resource(&self, id: &str) -> Result<Option<Value>> {
        self.store.get_document(index::RESOURCES_INDEX, id).await
    }

    /// Remove a resource document; removing a missing one succeeds.
    pub async fn delete_resource(&self, id: &str) -> Result<()> {
        self.delete_documents(index::RESOURCES_INDEX, &[id.to_string()])
            .await?;
        Ok(())
    }
}

/// JSON body stored for a document, with the pipeline's bookkeeping fields
/// (`identifier`, `type.value`) filled in when the translator left them out.
fn stored_source(document: &dyn TargetDocument, target_type: &str) -> Result<Value> {
    let mut source = document.to_source()?;
    let Some(fields) = source.as_object_mut() else {
        return Err(SyncError::Mapping(format!(
            "document {} is not a JSON object",
            document.id()
        )));
    };

    fields
        .entry("identifier")
        .or_insert_with(|| json!(document.identifiers()));

    let type_field = fields.entry("type").or_insert_with(|| json!({}));
    if !type_field.is_object() {
        *type_field = json!({});
    }
    if let Some(type_field) = type_field.as_object_mut() {
        type_field
            .entry("value")
            .or_insert_with(|| Value::String(target_type.to_string()));
    }
    Ok(source)
}
