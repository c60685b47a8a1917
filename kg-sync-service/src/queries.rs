//! Upload of stored queries to the graph service

use crate::error::Result;
use crate::graph::GraphQueryClient;
use crate::translate::{render_query, TranslatorRegistration, TranslatorRegistry};
use futures::future::try_join_all;
use std::sync::Arc;
use tracing::{info, warn};

/// Uploads the query of every semantic type of every registered translator
#[derive(Debug, Clone)]
pub struct QueryUploader {
    graph: Arc<dyn GraphQueryClient>,
    registry: Arc<TranslatorRegistry>,
}

impl QueryUploader {
    pub fn new(graph: Arc<dyn GraphQueryClient>, registry: Arc<TranslatorRegistry>) -> Self {
        Self { graph, registry }
    }

    /// Upload every query, translators in parallel.
    ///
    /// The first failed upload fails the whole operation. Returns the number
    /// of queries uploaded.
    pub async fn upload_all(&self) -> Result<usize> {
        let uploads = self.registry.iter().map(|r| self.upload_for(r));
        let counts = try_join_all(uploads).await?;
        Ok(counts.into_iter().sum())
    }

    async fn upload_for(&self, registration: &TranslatorRegistration) -> Result<usize> {
        let translator = &registration.translator;
        let mut uploaded = 0;
        for query in translator.queries() {
            let Some(template) = translator.query_template(&query.semantic_type) else {
                warn!(
                    target_type = %registration.target_type,
                    query_id = %query.query_id,
                    "no query template, skipping upload"
                );
                continue;
            };
            let payload = render_query(&template, &query.semantic_type);
            self.graph.upload_query(&query.query_id, &payload).await?;
            info!(
                target_type = %registration.target_type,
                query_id = %query.query_id,
                semantic_type = %query.semantic_type,
                "uploaded query"
            );
            uploaded += 1;
        }
        Ok(uploaded)
    }
}
