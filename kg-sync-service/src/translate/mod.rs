//! Translator contract
//!
//! A translator turns raw graph records of one source type into
//! [`TargetDocument`]s of one target type. The pipeline only relies on the
//! contract below; the per-type mapping logic lives with each implementation.

mod json;
mod registry;

pub use json::{JsonDocument, JsonTranslator};
pub use registry::{TranslatorRegistration, TranslatorRegistry, DEFAULT_BULK_SIZE};
pub(crate) use registry::identifiers_index_body;

use kg_sync_protocol::{Stage, TargetDocument, TranslationError};
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::fmt::Debug;

/// A stored query on the graph service, one per semantic source type.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct QueryDefinition {
    pub query_id: String,
    pub semantic_type: String,
}

/// Turns raw source records into target documents
pub trait Translator: Debug + Send + Sync {
    /// Name of the source type, used to group error reports
    fn source_type(&self) -> &str;

    /// Queries to page through, in order
    fn queries(&self) -> &[QueryDefinition];

    /// Query payload for `semantic_type`, with `${type}` placeholders left in
    fn query_template(&self, semantic_type: &str) -> Option<String>;

    /// Translate one raw record.
    ///
    /// Deserialization problems must be reported as a [`TranslationError`]
    /// carrying the record id, never as a panic.
    fn translate(
        &self,
        record: &Value,
        stage: Stage,
    ) -> Result<Box<dyn TargetDocument>, TranslationError>;
}

/// Substitutes every `${type}` placeholder in a query template.
pub fn render_query(template: &str, semantic_type: &str) -> String {
    template.replace("${type}", semantic_type)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_render_query() {
        let template = r#"{"meta": {"type": "${type}"}, "filter": "${type}"}"#;
        assert_eq!(
            render_query(template, "https://openminds.ebrains.eu/core/Dataset"),
            r#"{"meta": {"type": "https://openminds.ebrains.eu/core/Dataset"}, "filter": "https://openminds.ebrains.eu/core/Dataset"}"#
        );
    }
}
