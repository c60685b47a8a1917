//! Graph-query service client
//!
//! The graph service stores named queries and executes them page by page for
//! a lifecycle stage. It also receives the badge holders collected during a
//! run.

mod http;
mod memory;

pub use http::HttpGraphClient;
pub use memory::{MemoryGraphSource, PageRequest};

use crate::error::Result;
use async_trait::async_trait;
use kg_sync_protocol::{BadgeCollection, SourcePage, Stage};
use std::fmt::Debug;

/// Client for the upstream graph-query service
#[async_trait]
pub trait GraphQueryClient: Debug + Send + Sync {
    /// Execute a stored query and return one page of raw records
    async fn execute_query(
        &self,
        query_id: &str,
        stage: Stage,
        from: u64,
        size: u64,
    ) -> Result<SourcePage>;

    /// Store (create or replace) a query under `query_id`
    async fn upload_query(&self, query_id: &str, payload: &str) -> Result<()>;

    /// Publish the holders of the new/trending badges of one target type
    async fn publish_badges(&self, target_type: &str, badges: &BadgeCollection) -> Result<()>;
}
