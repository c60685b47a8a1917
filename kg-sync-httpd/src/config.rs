//! Server configuration

use crate::config_file::TypeFileConfig;
use clap::Parser;
use kg_sync_service::SyncConfig;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::time::Duration;

/// Knowledge-graph search synchronization server
#[derive(Parser, Debug, Clone)]
#[command(name = "kg-sync-httpd")]
#[command(about = "HTTP server synchronizing the knowledge graph into the search indexes")]
#[command(version)]
pub struct ServerConfig {
    /// Address to listen on
    #[arg(long, env = "KG_SYNC_LISTEN", default_value = "0.0.0.0:8090")]
    pub listen: SocketAddr,

    /// Base URL of the graph-query service
    #[arg(long, env = "KG_SYNC_GRAPH_ENDPOINT")]
    pub graph_endpoint: Option<String>,

    /// Bearer token for the graph-query service
    #[arg(long, env = "KG_SYNC_GRAPH_TOKEN", hide_env_values = true)]
    pub graph_token: Option<String>,

    /// Space stored queries and badge registrations are written to
    #[arg(long, env = "KG_SYNC_QUERY_SPACE", default_value = "kg-search")]
    pub query_space: String,

    /// Base URL of the search document store
    #[arg(long, env = "KG_SYNC_STORE_ENDPOINT")]
    pub store_endpoint: Option<String>,

    /// Bearer token for the search document store
    #[arg(long, env = "KG_SYNC_STORE_TOKEN", hide_env_values = true)]
    pub store_token: Option<String>,

    /// Keep every index in memory instead of using a document store
    #[arg(long, env = "KG_SYNC_MEMORY_STORE", default_value = "false")]
    pub memory_store: bool,

    /// Timeout of every outbound HTTP request, in seconds
    #[arg(long, env = "KG_SYNC_HTTP_TIMEOUT_SECS", default_value = "300")]
    pub http_timeout_secs: u64,

    /// Log level (trace, debug, info, warn, error)
    #[arg(long, env = "KG_SYNC_LOG_LEVEL", default_value = "info")]
    pub log_level: String,

    /// Enable CORS (Cross-Origin Resource Sharing)
    #[arg(long, env = "KG_SYNC_CORS_ENABLED", default_value = "false")]
    pub cors_enabled: bool,

    /// Upload every stored query in the background after startup
    #[arg(long, env = "KG_SYNC_UPLOAD_QUERIES_ON_START", default_value = "false")]
    pub upload_queries_on_start: bool,

    /// TOML file with type registrations and tuning
    #[arg(long = "config", env = "KG_SYNC_CONFIG")]
    pub config_file: Option<PathBuf>,

    /// Synchronization tuning, from the config file
    #[arg(skip)]
    pub sync: SyncConfig,

    /// Type registrations, from the config file
    #[arg(skip)]
    pub types: Vec<TypeFileConfig>,
}

impl Default for ServerConfig {
    fn default() -> Self {
        Self {
            listen: SocketAddr::from(([0, 0, 0, 0], 8090)),
            graph_endpoint: None,
            graph_token: None,
            query_space: "kg-search".to_string(),
            store_endpoint: None,
            store_token: None,
            memory_store: false,
            http_timeout_secs: 300,
            log_level: "info".to_string(),
            cors_enabled: false,
            upload_queries_on_start: false,
            config_file: None,
            sync: SyncConfig::default(),
            types: Vec::new(),
        }
    }
}

impl ServerConfig {
    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn store_type_str(&self) -> &'static str {
        if self.memory_store {
            "memory"
        } else {
            "http"
        }
    }
}
