//! In-memory graph source for testing and local runs

use super::GraphQueryClient;
use crate::error::{Result, SyncError};
use async_trait::async_trait;
use kg_sync_protocol::{BadgeCollection, SourcePage, Stage};
use parking_lot::RwLock;
use serde_json::Value;
use std::collections::{HashMap, VecDeque};

/// A page request as seen by the source.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageRequest {
    pub query_id: String,
    pub stage: Stage,
    pub from: u64,
    pub size: u64,
}

/// Graph source serving records held in memory.
///
/// Records every request so tests can assert on paging order, uploaded
/// queries and published badges.
#[derive(Debug, Default)]
pub struct MemoryGraphSource {
    records: RwLock<HashMap<(String, Stage), Vec<Value>>>,
    scripted: RwLock<HashMap<(String, Stage), VecDeque<SourcePage>>>,
    omit_total: RwLock<bool>,
    failing_queries: RwLock<HashMap<String, u16>>,
    requests: RwLock<Vec<PageRequest>>,
    uploads: RwLock<Vec<(String, String)>>,
    badges: RwLock<Vec<(String, BadgeCollection)>>,
}

impl MemoryGraphSource {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the records a query returns for a stage
    pub fn set_records(&self, query_id: &str, stage: Stage, records: Vec<Value>) {
        self.records
            .write()
            .insert((query_id.to_string(), stage), records);
    }

    /// Serve `pages` verbatim, one per request, before falling back to the
    /// records set for the query
    pub fn script_pages(&self, query_id: &str, stage: Stage, pages: Vec<SourcePage>) {
        self.scripted
            .write()
            .insert((query_id.to_string(), stage), pages.into());
    }

    /// Serve pages without a `total`, like a service that cannot count
    pub fn omit_total(&self, omit: bool) {
        *self.omit_total.write() = omit;
    }

    /// Make every request for `query_id` fail with `status`
    pub fn fail_query(&self, query_id: &str, status: u16) {
        self.failing_queries
            .write()
            .insert(query_id.to_string(), status);
    }

    pub fn requests(&self) -> Vec<PageRequest> {
        self.requests.read().clone()
    }

    pub fn uploads(&self) -> Vec<(String, String)> {
        self.uploads.read().clone()
    }

    pub fn published_badges(&self) -> Vec<(String, BadgeCollection)> {
        self.badges.read().clone()
    }
}

#[async_trait]
impl GraphQueryClient for MemoryGraphSource {
    async fn execute_query(
        &self,
        query_id: &str,
        stage: Stage,
        from: u64,
        size: u64,
    ) -> Result<SourcePage> {
        self.requests.write().push(PageRequest {
            query_id: query_id.to_string(),
            stage,
            from,
            size,
        });

        if let Some(status) = self.failing_queries.read().get(query_id) {
            return Err(SyncError::graph(
                Some(*status),
                format!("query {} failed with status {}", query_id, status),
            ));
        }

        let key = (query_id.to_string(), stage);
        if let Some(page) = self
            .scripted
            .write()
            .get_mut(&key)
            .and_then(VecDeque::pop_front)
        {
            return Ok(page);
        }

        let records = self.records.read();
        let all = records
            .get(&key)
            .map(Vec::as_slice)
            .unwrap_or_default();
        let start = (from as usize).min(all.len());
        let end = start.saturating_add(size as usize).min(all.len());

        Ok(SourcePage {
            data: all[start..end].to_vec(),
            total: if *self.omit_total.read() {
                None
            } else {
                Some(all.len() as u64)
            },
            from: Some(from),
            size: Some((end - start) as u64),
        })
    }

    async fn upload_query(&self, query_id: &str, payload: &str) -> Result<()> {
        self.uploads
            .write()
            .push((query_id.to_string(), payload.to_string()));
        Ok(())
    }

    async fn publish_badges(&self, target_type: &str, badges: &BadgeCollection) -> Result<()> {
        self.badges
            .write()
            .push((target_type.to_string(), badges.clone()));
        Ok(())
    }
}
