//! Knowledge-graph search synchronization HTTP server
//!
//! A thin HTTP wrapper around `kg-sync-service`: each endpoint triggers a
//! full or incremental synchronization for one lifecycle stage and returns
//! the per-record error report of the run.
//!
//! # Endpoints
//!
//! - `POST|PUT /indexing?databaseScope=` - all non-auto-released types
//! - `POST|PUT /indexing/categories/:type?databaseScope=` - one type
//! - `POST|PUT /indexing/autorelease?databaseScope=` - auto-released types
//! - `POST /indexing/queries` - upload the stored queries
//! - `GET|PUT|DELETE /indexing/resources/:id` - opaque resource documents
//! - `GET /health`
//!
//! `POST` rebuilds through temporary indexes, `PUT` updates in place.
//!
//! # Example
//!
//! ```ignore
//! use kg_sync_httpd::{ServerConfig, SyncServer};
//!
//! let server = SyncServer::new(ServerConfig::default())?;
//! server.run().await?;
//! ```

pub mod config;
pub mod config_file;
pub mod error;
pub mod routes;
pub mod state;
pub mod telemetry;

pub use config::ServerConfig;
pub use error::{Result, ServerError};
pub use state::AppState;
pub use telemetry::{init_logging, TelemetryConfig};

use axum::Router;
use std::sync::Arc;
use tokio::net::TcpListener;
use tracing::{error, info};

/// Synchronization HTTP server
pub struct SyncServer {
    state: Arc<AppState>,
    router: Router,
}

impl SyncServer {
    pub fn new(config: ServerConfig) -> Result<Self> {
        Ok(Self::from_state(Arc::new(AppState::new(config)?)))
    }

    pub fn from_state(state: Arc<AppState>) -> Self {
        let router = routes::build_router(state.clone());
        Self { state, router }
    }

    pub fn state(&self) -> &Arc<AppState> {
        &self.state
    }

    /// Get the router for testing
    pub fn router(&self) -> Router {
        self.router.clone()
    }

    /// Prepare the store, then serve until ctrl-c.
    ///
    /// Query upload on start runs in the background; its failure is logged
    /// and does not stop the server.
    pub async fn run(self) -> std::result::Result<(), Box<dyn std::error::Error>> {
        self.state.service.ensure_resources_index().await?;

        let upload_task = if self.state.config.upload_queries_on_start {
            let state = self.state.clone();
            Some(tokio::spawn(async move {
                match state.service.upload_queries().await {
                    Ok(uploaded) => info!(uploaded, "uploaded stored queries"),
                    Err(e) => error!(error = %e, "query upload failed"),
                }
            }))
        } else {
            None
        };

        let addr = self.state.config.listen;
        let listener = TcpListener::bind(addr).await?;
        info!(
            addr = %addr,
            store = self.state.config.store_type_str(),
            target_types = self.state.service.registry().len(),
            "kg-sync server starting"
        );

        let result = axum::serve(listener, self.router)
            .with_graceful_shutdown(shutdown_signal())
            .await;

        if let Some(task) = upload_task {
            task.abort();
        }

        result.map_err(Into::into)
    }
}

async fn shutdown_signal() {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
    info!("shutdown signal received");
}
