//! Application state management

use crate::config::ServerConfig;
use crate::config_file::build_registry;
use crate::error::{Result, ServerError};
use kg_sync_service::{
    DocumentStore, GraphQueryClient, HttpDocumentStore, HttpGraphClient, MemoryDocumentStore,
    SyncService,
};
use std::sync::Arc;
use std::time::Instant;

/// Application state shared across handlers
#[derive(Debug)]
pub struct AppState {
    pub config: ServerConfig,
    pub service: SyncService,
    pub start_time: Instant,
}

impl AppState {
    /// Connect to the graph service and document store named in `config`.
    pub fn new(config: ServerConfig) -> Result<Self> {
        let graph_endpoint = config
            .graph_endpoint
            .clone()
            .ok_or_else(|| ServerError::config("a graph endpoint is required"))?;
        let graph: Arc<dyn GraphQueryClient> = Arc::new(HttpGraphClient::new(
            graph_endpoint,
            config.graph_token.clone(),
            config.query_space.clone(),
            config.http_timeout(),
        )?);

        let store: Arc<dyn DocumentStore> = if config.memory_store {
            Arc::new(MemoryDocumentStore::new())
        } else {
            let store_endpoint = config.store_endpoint.clone().ok_or_else(|| {
                ServerError::config("a store endpoint is required unless --memory-store is set")
            })?;
            Arc::new(
                HttpDocumentStore::new(
                    store_endpoint,
                    config.store_token.clone(),
                    config.http_timeout(),
                )?
                .with_page_size(config.sync.id_page_size),
            )
        };

        Self::with_backends(config, graph, store)
    }

    /// State over explicit backends
    pub fn with_backends(
        config: ServerConfig,
        graph: Arc<dyn GraphQueryClient>,
        store: Arc<dyn DocumentStore>,
    ) -> Result<Self> {
        let registry = Arc::new(build_registry(&config.types)?);
        if registry.is_empty() {
            tracing::warn!("no target types configured");
        }
        let service = SyncService::new(graph, store, registry, &config.sync);
        Ok(Self {
            config,
            service,
            start_time: Instant::now(),
        })
    }
}
