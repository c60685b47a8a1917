//! kg-sync server CLI
//!
//! Run with: `cargo run -p kg-sync-httpd -- --help`

use clap::{CommandFactory, FromArgMatches};
use kg_sync_httpd::{
    config_file::load_and_merge_config,
    telemetry::{init_logging, TelemetryConfig},
    ServerConfig, SyncServer,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    // 1. Parse CLI + env via clap (typed config and raw matches)
    let matches = ServerConfig::command().get_matches();
    let mut config = ServerConfig::from_arg_matches(&matches)?;

    // 2. Merge the config file; file values apply only where CLI/env didn't set one
    load_and_merge_config(&mut config, &matches)?;

    let telemetry_config = TelemetryConfig::with_server_config(&config);
    init_logging(&telemetry_config);

    tracing::info!(
        version = env!("CARGO_PKG_VERSION"),
        addr = %config.listen,
        store = config.store_type_str(),
        graph = ?config.graph_endpoint,
        types = config.types.len(),
        log_format = ?telemetry_config.log_format,
        "Starting kg-sync server"
    );

    let server = SyncServer::new(config)?;
    server.run().await
}
