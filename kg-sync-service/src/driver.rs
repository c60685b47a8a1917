//! Sync driver orchestrating the retrieve/translate/write loop
//!
//! For one target type and stage, the `SyncDriver` pages through every query
//! of the type's translator, translates and sanitizes each page, places the
//! documents in the searchable or identifier-only index, and finally removes
//! documents that the run did not produce.
//!
//! Pages of one query are fetched strictly in order. Run state (ids seen,
//! errors, badges) lives in the [`UpdateResult`] of the run, so runs for
//! different types never share anything mutable.

use crate::batch::BulkBatcher;
use crate::config::SyncConfig;
use crate::error::{Result, SyncError};
use crate::graph::GraphQueryClient;
use crate::lifecycle::{IndexKind, IndexLifecycle};
use crate::sanitize::sanitize;
use crate::store::DocumentStore;
use crate::translate::{TranslatorRegistration, TranslatorRegistry};
use crate::trend::TrendEvaluator;
use chrono::{DateTime, Utc};
use kg_sync_protocol::{
    BadgeCollection, ErrorReport, ErrorReportResult, SourceTypeErrors, Stage, TargetDocument,
    TargetTypeErrors,
};
use std::collections::HashSet;
use std::fmt::Debug;
use std::sync::Arc;
use tracing::{debug, error, info, warn};

/// Whether a run rebuilds the type's indexes from scratch
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SyncMode {
    /// Write into the live indexes
    Incremental,
    /// Write into temporary indexes, then cut over
    Full,
}

/// Which registrations a batch run covers
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeFilter {
    NonAutoReleased,
    AutoReleased,
    Type(String),
}

/// Per-run state of one target type
#[derive(Debug, Default)]
pub struct UpdateResult {
    pub searchable_ids: HashSet<String>,
    pub non_searchable_ids: HashSet<String>,
    pub errors: ErrorReport,
    pub badges: BadgeCollection,
    pub pages_fetched: usize,
    pub documents_written: usize,
    pub references_cleared: usize,
    pub documents_removed: usize,
}

/// Result of synchronizing one target type
#[derive(Debug)]
pub struct SyncOutcome {
    pub target_type: String,
    pub source_type: String,
    pub update: UpdateResult,
}

impl SyncOutcome {
    /// Record errors of the run, grouped by source type, if there were any
    pub fn error_summary(&self) -> Option<TargetTypeErrors> {
        if self.update.errors.is_empty() {
            return None;
        }
        Some(TargetTypeErrors {
            target_type: self.target_type.clone(),
            errors_by_source: vec![SourceTypeErrors {
                source_type: self.source_type.clone(),
                errors: self.update.errors.clone(),
            }],
        })
    }
}

/// Fixed inputs of one type run
struct RunContext<'a> {
    registration: &'a TranslatorRegistration,
    stage: Stage,
    excluded: &'a HashSet<String>,
    known: &'a HashSet<String>,
    threshold: Option<u64>,
    now: DateTime<Utc>,
    search_index: String,
    non_search_index: String,
}

/// Orchestrates synchronization of target types into the document store
pub struct SyncDriver {
    graph: Arc<dyn GraphQueryClient>,
    lifecycle: IndexLifecycle,
    trend: TrendEvaluator,
    registry: Arc<TranslatorRegistry>,
}

impl Debug for SyncDriver {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SyncDriver")
            .field(
                "types",
                &self
                    .registry
                    .iter()
                    .map(|r| r.target_type.as_str())
                    .collect::<Vec<_>>(),
            )
            .finish()
    }
}

impl SyncDriver {
    pub fn new(
        graph: Arc<dyn GraphQueryClient>,
        store: Arc<dyn DocumentStore>,
        registry: Arc<TranslatorRegistry>,
        config: &SyncConfig,
    ) -> Self {
        Self {
            graph,
            lifecycle: IndexLifecycle::new(store, BulkBatcher::new(config.max_bulk_chars)),
            trend: TrendEvaluator::from_config(config),
            registry,
        }
    }

    pub fn registry(&self) -> &TranslatorRegistry {
        &self.registry
    }

    pub fn lifecycle(&self) -> &IndexLifecycle {
        &self.lifecycle
    }

    fn select(&self, filter: &TypeFilter) -> Result<Vec<&TranslatorRegistration>> {
        match filter {
            TypeFilter::NonAutoReleased => {
                Ok(self.registry.iter().filter(|r| !r.auto_release).collect())
            }
            TypeFilter::AutoReleased => {
                Ok(self.registry.iter().filter(|r| r.auto_release).collect())
            }
            TypeFilter::Type(name) => self
                .registry
                .get(name)
                .map(|r| vec![r])
                .ok_or_else(|| SyncError::UnknownType(name.clone())),
        }
    }

    /// Rebuild every selected type from scratch.
    ///
    /// Rebuilding all non-auto-released types also recreates the stage's
    /// shared identifiers index first.
    pub async fn full_replacement(
        &self,
        stage: Stage,
        filter: TypeFilter,
    ) -> Result<ErrorReportResult> {
        let registrations = self.select(&filter)?;
        if filter == TypeFilter::NonAutoReleased {
            self.lifecycle.recreate_identifiers_index(stage).await?;
        }
        self.run_all(registrations, stage, SyncMode::Full).await
    }

    /// Update every selected type in place.
    pub async fn incremental_update(
        &self,
        stage: Stage,
        filter: TypeFilter,
    ) -> Result<ErrorReportResult> {
        let registrations = self.select(&filter)?;
        self.run_all(registrations, stage, SyncMode::Incremental)
            .await
    }

    async fn run_all(
        &self,
        registrations: Vec<&TranslatorRegistration>,
        stage: Stage,
        mode: SyncMode,
    ) -> Result<ErrorReportResult> {
        let excluded = HashSet::new();
        let mut result = ErrorReportResult::default();
        for registration in registrations {
            let outcome = self
                .synchronize(registration, stage, mode, &excluded)
                .await
                .map_err(|e| {
                    error!(
                        target_type = %registration.target_type,
                        %stage,
                        error = %e,
                        "synchronization aborted"
                    );
                    e
                })?;
            if let Some(errors) = outcome.error_summary() {
                result.push(errors);
            }
        }
        Ok(result)
    }

    /// Synchronize one target type for one stage.
    ///
    /// Records in `excluded` are translated but never written. Record-level
    /// failures end up in the outcome's error report; transport failures
    /// abort the run.
    pub async fn synchronize(
        &self,
        registration: &TranslatorRegistration,
        stage: Stage,
        mode: SyncMode,
        excluded: &HashSet<String>,
    ) -> Result<SyncOutcome> {
        let target_type = registration.target_type.as_str();
        let temporary = mode == SyncMode::Full;
        info!(target_type, %stage, ?mode, "synchronizing");

        if temporary {
            for kind in IndexKind::owned_by(registration) {
                self.lifecycle
                    .recreate(*kind, registration, stage, true)
                    .await?;
            }
        }

        let update = match self
            .populate(registration, stage, temporary, excluded)
            .await
        {
            Ok(update) => update,
            Err(e) => {
                if temporary {
                    self.discard_temporary(registration, stage).await;
                }
                return Err(e);
            }
        };

        if temporary {
            for kind in IndexKind::owned_by(registration) {
                if let Err(e) = self.lifecycle.cutover(*kind, registration, stage).await {
                    warn!(
                        index = %kind.index_name(stage, target_type, true),
                        "cutover failed, temporary index left in place"
                    );
                    return Err(e);
                }
            }
        }

        if !update.badges.is_empty() {
            if let Err(e) = self.graph.publish_badges(target_type, &update.badges).await {
                warn!(target_type, error = %e, "could not publish badges");
            }
        }

        info!(
            target_type,
            %stage,
            pages = update.pages_fetched,
            written = update.documents_written,
            removed = update.documents_removed,
            errors = update.errors.len(),
            "synchronization finished"
        );

        Ok(SyncOutcome {
            target_type: registration.target_type.clone(),
            source_type: registration.translator.source_type().to_string(),
            update,
        })
    }

    /// Fetch, translate and write every page of the type, then reconcile the
    /// indexes written against the ids the run produced.
    async fn populate(
        &self,
        registration: &TranslatorRegistration,
        stage: Stage,
        temporary: bool,
        excluded: &HashSet<String>,
    ) -> Result<UpdateResult> {
        let target_type = registration.target_type.as_str();
        let live_search_index = IndexKind::Searchable.index_name(stage, target_type, false);
        let threshold = self
            .trend
            .threshold(self.lifecycle.store(), &live_search_index)
            .await?;
        let known = self.lifecycle.known_identifiers(stage).await?;

        let ctx = RunContext {
            registration,
            stage,
            excluded,
            known: &known,
            threshold,
            now: Utc::now(),
            search_index: IndexKind::Searchable.index_name(stage, target_type, temporary),
            non_search_index: IndexKind::non_searchable_for(registration).index_name(
                stage,
                target_type,
                temporary,
            ),
        };

        let mut update = UpdateResult::default();
        for query in registration.translator.queries() {
            self.sync_query(&ctx, &query.query_id, &mut update).await?;
        }

        update.documents_removed += self
            .lifecycle
            .remove_stale(&ctx.search_index, target_type, &update.searchable_ids)
            .await?;
        update.documents_removed += self
            .lifecycle
            .remove_stale(&ctx.non_search_index, target_type, &update.non_searchable_ids)
            .await?;
        Ok(update)
    }

    /// Drop the temporary indexes of a full run that did not finish.
    async fn discard_temporary(&self, registration: &TranslatorRegistration, stage: Stage) {
        for kind in IndexKind::owned_by(registration) {
            let index = kind.index_name(stage, &registration.target_type, true);
            match self.lifecycle.store().delete_index(&index).await {
                Ok(_) => warn!(%index, "dropped temporary index of failed run"),
                Err(e) => warn!(%index, error = %e, "could not drop temporary index of failed run"),
            }
        }
    }

    async fn sync_query(
        &self,
        ctx: &RunContext<'_>,
        query_id: &str,
        update: &mut UpdateResult,
    ) -> Result<()> {
        let registration = ctx.registration;
        let target_type = registration.target_type.as_str();
        let size = registration.bulk_size;
        let mut from = 0u64;
        let mut last_total = None;

        loop {
            let page = self
                .graph
                .execute_query(query_id, ctx.stage, from, size)
                .await?;
            update.pages_fetched += 1;
            info!(
                target_type,
                query_id,
                from,
                size,
                total = ?page.total,
                records = page.data.len(),
                "fetched page"
            );

            let mut page_errors = ErrorReport::new();
            let mut documents: Vec<Box<dyn TargetDocument>> = Vec::with_capacity(page.data.len());
            for record in page.data.iter().filter(|r| !r.is_null()) {
                match registration.translator.translate(record, ctx.stage) {
                    Ok(document) => {
                        debug!(target_type, id = document.id(), "translated instance");
                        documents.push(document);
                    }
                    Err(e) => {
                        debug!(target_type, id = %e.identifier, error = %e.message, "translation failed");
                        page_errors.record(e.identifier, e.message);
                    }
                }
            }
            documents.retain(|d| !ctx.excluded.contains(d.id()));

            let stats = sanitize(&mut documents, ctx.known);
            update.references_cleared += stats.cleared;

            let (searchable, non_searchable): (Vec<_>, Vec<_>) =
                documents.into_iter().partition(|d| d.is_searchable());
            let searchable = self.finish_documents(ctx, searchable, update, true);
            let non_searchable = self.finish_documents(ctx, non_searchable, update, false);

            if !searchable.is_empty() {
                let summary = self
                    .lifecycle
                    .write_documents(&ctx.search_index, target_type, &searchable, &mut page_errors)
                    .await?;
                update.documents_written += summary.indexed;
            }
            if !non_searchable.is_empty() {
                let summary = self
                    .lifecycle
                    .write_documents(
                        &ctx.non_search_index,
                        target_type,
                        &non_searchable,
                        &mut page_errors,
                    )
                    .await?;
                update.documents_written += summary.indexed;
            }

            if !page_errors.is_empty() {
                debug!(target_type, query_id, from, errors = page_errors.len(), "page had record errors");
                update.errors.merge(page_errors);
            }

            if page.total.is_some() {
                last_total = page.total;
            }
            let total = match last_total {
                Some(total) => total,
                None => break,
            };
            let next = match page.next_from(from, size) {
                Some(next) => next,
                None => {
                    warn!(target_type, query_id, from, "page window overflows, stopping");
                    break;
                }
            };
            if next >= total {
                break;
            }
            if next <= from {
                warn!(target_type, query_id, from, "page did not advance, stopping");
                break;
            }
            from = next;
        }
        Ok(())
    }

    /// Apply badges and record ids of documents about to be written.
    fn finish_documents(
        &self,
        ctx: &RunContext<'_>,
        mut documents: Vec<Box<dyn TargetDocument>>,
        update: &mut UpdateResult,
        searchable: bool,
    ) -> Vec<Box<dyn TargetDocument>> {
        for document in documents.iter_mut() {
            let badges = self.trend.evaluate(
                &document.release_info(),
                &document.content_signals(),
                ctx.threshold,
                ctx.now,
            );
            document.set_badges(&badges);
            update.badges.record(document.id(), &badges);

            let id = document.id().to_string();
            if searchable {
                update.searchable_ids.insert(id);
            } else {
                update.non_searchable_ids.insert(id);
            }
        }
        documents
    }
}
