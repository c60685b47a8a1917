//! Configuration file support.
//!
//! The TOML file declares the target types to synchronize and may override
//! server settings and synchronization tuning:
//!
//! ```toml
//! [server]
//! graph_endpoint = "https://core.kg.example.org/v3"
//! store_endpoint = "http://localhost:9200"
//!
//! [sync]
//! trending_top_k = 5
//!
//! [[types]]
//! name = "Dataset"
//! source_type = "DatasetVersion"
//! query_template = '{"meta": {"type": "${type}"}}'
//! searchable = "/searchable"
//! bulk_size = 10
//!
//! [[types.queries]]
//! id = "0a1b2c3d-dataset-versions"
//! semantic_type = "https://openminds.ebrains.eu/core/DatasetVersion"
//!
//! [types.mapping.properties.title]
//! type = "text"
//! ```
//!
//! ## Precedence (highest to lowest)
//!
//! 1. CLI arguments
//! 2. Environment variables
//! 3. Config file (`[server]`)
//! 4. Hardcoded defaults

use clap::ArgMatches;
use kg_sync_service::{
    JsonTranslator, QueryDefinition, SyncConfig, SyncError, TranslatorRegistration,
    TranslatorRegistry, DEFAULT_BULK_SIZE,
};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::config::ServerConfig;

/// Top-level config file structure
#[derive(Debug, Default, Deserialize, Serialize)]
pub struct SyncFileConfig {
    #[serde(default)]
    pub server: Option<ServerFileConfig>,

    #[serde(default)]
    pub sync: Option<SyncConfig>,

    #[serde(default)]
    pub types: Vec<TypeFileConfig>,
}

/// The `[server]` section. Every field is `Option` so the file only needs to
/// contain values the user wants to set.
#[derive(Debug, Default, Clone, Deserialize, Serialize)]
pub struct ServerFileConfig {
    pub listen: Option<String>,
    pub graph_endpoint: Option<String>,
    pub query_space: Option<String>,
    pub store_endpoint: Option<String>,
    pub http_timeout_secs: Option<u64>,
    pub log_level: Option<String>,
    pub cors_enabled: Option<bool>,
}

/// One `[[types]]` entry
#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct TypeFileConfig {
    /// Target type name, also used in index names
    pub name: String,
    /// Name errors are grouped under; defaults to `name`
    #[serde(default)]
    pub source_type: Option<String>,
    #[serde(default)]
    pub queries: Vec<QueryFileConfig>,
    /// Stored query payload with `${type}` placeholders
    #[serde(default)]
    pub query_template: Option<String>,
    #[serde(default)]
    pub auto_release: bool,
    #[serde(default)]
    pub bulk_size: Option<u64>,
    /// JSON pointer to the boolean searchable flag of a record
    #[serde(default)]
    pub searchable: Option<String>,
    /// Index mapping of the type's indexes
    #[serde(default)]
    pub mapping: Option<Value>,
}

#[derive(Debug, Clone, Deserialize, Serialize)]
pub struct QueryFileConfig {
    pub id: String,
    pub semantic_type: String,
}

impl TypeFileConfig {
    /// Registration backed by a passthrough translator
    pub fn registration(&self) -> TranslatorRegistration {
        let queries = self
            .queries
            .iter()
            .map(|q| QueryDefinition {
                query_id: q.id.clone(),
                semantic_type: q.semantic_type.clone(),
            })
            .collect();
        let source_type = self.source_type.clone().unwrap_or_else(|| self.name.clone());
        let mut translator = JsonTranslator::new(source_type, queries);
        if let Some(ref template) = self.query_template {
            translator = translator.with_query_template(template.clone());
        }
        if let Some(ref pointer) = self.searchable {
            translator = translator.with_searchable_pointer(pointer.clone());
        }

        let mut registration = TranslatorRegistration::new(self.name.clone(), Arc::new(translator))
            .with_auto_release(self.auto_release)
            .with_bulk_size(self.bulk_size.unwrap_or(DEFAULT_BULK_SIZE));
        if let Some(ref mapping) = self.mapping {
            registration = registration.with_mapping(mapping.clone());
        }
        registration
    }
}

/// Build the translator registry from the configured types
pub fn build_registry(types: &[TypeFileConfig]) -> Result<TranslatorRegistry, SyncError> {
    TranslatorRegistry::new(types.iter().map(TypeFileConfig::registration).collect())
}

#[derive(Debug, Error)]
pub enum ConfigFileError {
    #[error("Failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("Failed to parse config file {path}: {detail}")]
    Parse { path: PathBuf, detail: String },
}

/// Load and parse a config file
pub fn load_config(path: &Path) -> Result<SyncFileConfig, ConfigFileError> {
    let content = std::fs::read_to_string(path).map_err(|e| ConfigFileError::Io {
        path: path.to_path_buf(),
        source: e,
    })?;

    if content.trim().is_empty() {
        return Ok(SyncFileConfig::default());
    }

    toml::from_str(&content).map_err(|e| ConfigFileError::Parse {
        path: path.to_path_buf(),
        detail: e.to_string(),
    })
}

/// Apply file values to `config` where CLI and environment left the default
pub fn apply_to_server_config(
    file: &ServerFileConfig,
    config: &mut ServerConfig,
    matches: &ArgMatches,
) {
    use clap::parser::ValueSource;

    // clap derive uses the field name as the arg id
    let is_default = |arg_name: &str| -> bool {
        matches!(
            matches.value_source(arg_name),
            None | Some(ValueSource::DefaultValue)
        )
    };

    if is_default("listen") {
        if let Some(ref addr) = file.listen {
            match addr.parse() {
                Ok(addr) => config.listen = addr,
                Err(_) => warn!(value = %addr, "Invalid listen address in config file, ignoring"),
            }
        }
    }
    if is_default("graph_endpoint") {
        if let Some(ref endpoint) = file.graph_endpoint {
            config.graph_endpoint = Some(endpoint.clone());
        }
    }
    if is_default("query_space") {
        if let Some(ref space) = file.query_space {
            config.query_space = space.clone();
        }
    }
    if is_default("store_endpoint") {
        if let Some(ref endpoint) = file.store_endpoint {
            config.store_endpoint = Some(endpoint.clone());
        }
    }
    if is_default("http_timeout_secs") {
        if let Some(secs) = file.http_timeout_secs {
            config.http_timeout_secs = secs;
        }
    }
    if is_default("log_level") {
        if let Some(ref level) = file.log_level {
            config.log_level = level.clone();
        }
    }
    if is_default("cors_enabled") {
        if let Some(enabled) = file.cors_enabled {
            config.cors_enabled = enabled;
        }
    }
}

/// Load the config file named by `--config` (if any) and merge it into `config`.
pub fn load_and_merge_config(
    config: &mut ServerConfig,
    matches: &ArgMatches,
) -> Result<(), ConfigFileError> {
    let Some(path) = config.config_file.clone() else {
        debug!("No config file given, using CLI args and defaults only");
        return Ok(());
    };

    info!(path = %path.display(), "Loading configuration file");
    let file_config = load_config(&path)?;

    if let Some(ref server) = file_config.server {
        apply_to_server_config(server, config, matches);
    }
    if let Some(sync) = file_config.sync {
        config.sync = sync;
    }
    config.types = file_config.types;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::{CommandFactory, FromArgMatches};
    use kg_sync_protocol::{Stage, TargetDocument};
    use kg_sync_service::Translator;
    use serde_json::json;

    const CONFIG: &str = r#"
[server]
graph_endpoint = "http://graph.local"
log_level = "debug"

[sync]
trending_top_k = 3

[[types]]
name = "Dataset"
source_type = "DatasetVersion"
query_template = '{"type": "${type}"}'
searchable = "/searchable"
bulk_size = 25

[[types.queries]]
id = "q-dataset"
semantic_type = "https://openminds.ebrains.eu/core/DatasetVersion"

[types.mapping.properties.title]
type = "text"

[[types]]
name = "ControlledTerm"
auto_release = true
"#;

    #[test]
    fn test_parse_types() {
        let config: SyncFileConfig = toml::from_str(CONFIG).unwrap();
        assert_eq!(config.types.len(), 2);
        assert_eq!(config.sync.unwrap().trending_top_k, 3);

        let dataset = config.types[0].registration();
        assert_eq!(dataset.target_type, "Dataset");
        assert_eq!(dataset.bulk_size, 25);
        assert!(!dataset.auto_release);
        assert_eq!(dataset.translator.source_type(), "DatasetVersion");
        assert_eq!(dataset.translator.queries()[0].query_id, "q-dataset");
        assert_eq!(
            dataset.mapping,
            json!({"properties": {"title": {"type": "text"}}})
        );
        let doc = dataset
            .translator
            .translate(&json!({"id": "a", "searchable": false}), Stage::Released)
            .unwrap();
        assert!(!doc.is_searchable());

        let term = config.types[1].registration();
        assert!(term.auto_release);
        assert_eq!(term.bulk_size, DEFAULT_BULK_SIZE);
        assert_eq!(term.translator.source_type(), "ControlledTerm");
    }

    #[test]
    fn test_duplicate_types_rejected() {
        let config: SyncFileConfig = toml::from_str(
            r#"
[[types]]
name = "Dataset"

[[types]]
name = "dataset"
"#,
        )
        .unwrap();
        assert!(build_registry(&config.types).is_err());
    }

    #[test]
    fn test_cli_wins_over_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("kg-sync.toml");
        std::fs::write(&path, CONFIG).unwrap();

        let matches = ServerConfig::command()
            .try_get_matches_from([
                "kg-sync-httpd",
                "--config",
                path.to_str().unwrap(),
                "--log-level",
                "warn",
            ])
            .unwrap();
        let mut config = ServerConfig::from_arg_matches(&matches).unwrap();
        load_and_merge_config(&mut config, &matches).unwrap();

        assert_eq!(config.log_level, "warn");
        assert_eq!(config.graph_endpoint.as_deref(), Some("http://graph.local"));
        assert_eq!(config.sync.trending_top_k, 3);
        assert_eq!(config.types.len(), 2);
    }

    #[test]
    fn test_missing_file_is_an_error() {
        let err = load_config(Path::new("/nonexistent/kg-sync.toml")).unwrap_err();
        assert!(matches!(err, ConfigFileError::Io { .. }));
    }
}
