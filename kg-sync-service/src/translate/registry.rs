//! Static registry of target types

use super::Translator;
use crate::error::{Result, SyncError};
use serde_json::{json, Map, Value};
use std::sync::Arc;

/// Records fetched per page and written per batch unless configured otherwise.
pub const DEFAULT_BULK_SIZE: u64 = 10;

/// Everything the pipeline needs to know about one target type.
#[derive(Debug, Clone)]
pub struct TranslatorRegistration {
    pub target_type: String,
    pub translator: Arc<dyn Translator>,
    /// Documents of this type go to a dedicated auto-released index instead
    /// of the shared identifiers index.
    pub auto_release: bool,
    pub bulk_size: u64,
    /// Index mapping (`{"properties": {...}}`) for this type's indexes.
    pub mapping: Value,
}

impl TranslatorRegistration {
    pub fn new(target_type: impl Into<String>, translator: Arc<dyn Translator>) -> Self {
        Self {
            target_type: target_type.into(),
            translator,
            auto_release: false,
            bulk_size: DEFAULT_BULK_SIZE,
            mapping: json!({}),
        }
    }

    pub fn with_auto_release(mut self, auto_release: bool) -> Self {
        self.auto_release = auto_release;
        self
    }

    pub fn with_bulk_size(mut self, bulk_size: u64) -> Self {
        self.bulk_size = bulk_size.max(1);
        self
    }

    pub fn with_mapping(mut self, mapping: Value) -> Self {
        self.mapping = mapping;
        self
    }

    /// Index creation body for this type.
    ///
    /// Adds keyword mappings for `identifier` and `type.value`, which id
    /// listing and type-scoped reconciliation filter on.
    pub fn index_body(&self) -> Result<Value> {
        let mut mapping = self.mapping.clone();
        let Some(root) = mapping.as_object_mut() else {
            return Err(SyncError::Mapping(format!(
                "mapping for {} must be a JSON object",
                self.target_type
            )));
        };
        let properties = root
            .entry("properties")
            .or_insert_with(|| Value::Object(Map::new()));
        let Some(properties) = properties.as_object_mut() else {
            return Err(SyncError::Mapping(format!(
                "mapping properties for {} must be a JSON object",
                self.target_type
            )));
        };
        add_pipeline_fields(properties);
        Ok(json!({ "mappings": mapping }))
    }
}

/// Index creation body for the shared identifiers index.
pub(crate) fn identifiers_index_body() -> Value {
    let mut properties = Map::new();
    add_pipeline_fields(&mut properties);
    json!({ "mappings": { "properties": properties } })
}

fn add_pipeline_fields(properties: &mut Map<String, Value>) {
    properties
        .entry("identifier")
        .or_insert_with(|| json!({ "type": "keyword" }));
    properties
        .entry("type")
        .or_insert_with(|| json!({ "properties": { "value": { "type": "keyword" } } }));
}

/// Immutable set of registrations, built once at startup.
#[derive(Debug, Default)]
pub struct TranslatorRegistry {
    registrations: Vec<TranslatorRegistration>,
}

impl TranslatorRegistry {
    /// Build a registry, rejecting duplicate target type names.
    pub fn new(registrations: Vec<TranslatorRegistration>) -> Result<Self> {
        for (i, registration) in registrations.iter().enumerate() {
            let duplicate = registrations[..i]
                .iter()
                .any(|r| r.target_type.eq_ignore_ascii_case(&registration.target_type));
            if duplicate {
                return Err(SyncError::Config(format!(
                    "target type '{}' registered twice",
                    registration.target_type
                )));
            }
        }
        Ok(Self { registrations })
    }

    /// Look up a registration by target type name (case-insensitive).
    pub fn get(&self, target_type: &str) -> Option<&TranslatorRegistration> {
        self.registrations
            .iter()
            .find(|r| r.target_type.eq_ignore_ascii_case(target_type))
    }

    pub fn iter(&self) -> impl Iterator<Item = &TranslatorRegistration> {
        self.registrations.iter()
    }

    pub fn len(&self) -> usize {
        self.registrations.len()
    }

    pub fn is_empty(&self) -> bool {
        self.registrations.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::translate::JsonTranslator;

    fn translator() -> Arc<dyn Translator> {
        Arc::new(JsonTranslator::new("Source", vec![]))
    }

    #[test]
    fn test_duplicate_types_rejected() {
        let result = TranslatorRegistry::new(vec![
            TranslatorRegistration::new("Dataset", translator()),
            TranslatorRegistration::new("dataset", translator()),
        ]);
        assert!(matches!(result, Err(SyncError::Config(_))));
    }

    #[test]
    fn test_lookup_case_insensitive() {
        let registry = TranslatorRegistry::new(vec![
            TranslatorRegistration::new("Dataset", translator()),
            TranslatorRegistration::new("ControlledTerm", translator()).with_auto_release(true),
        ])
        .unwrap();
        assert!(registry.get("controlledterm").unwrap().auto_release);
        assert!(registry.get("Software").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn test_index_body_keeps_custom_properties() {
        let registration = TranslatorRegistration::new("Dataset", translator()).with_mapping(
            json!({"properties": {"title": {"type": "text"}}, "dynamic": false}),
        );
        let body = registration.index_body().unwrap();
        assert_eq!(body["mappings"]["properties"]["title"]["type"], "text");
        assert_eq!(body["mappings"]["properties"]["identifier"]["type"], "keyword");
        assert_eq!(body["mappings"]["dynamic"], false);
    }

    #[test]
    fn test_index_body_rejects_non_object() {
        let registration =
            TranslatorRegistration::new("Dataset", translator()).with_mapping(json!(["nope"]));
        assert!(matches!(registration.index_body(), Err(SyncError::Mapping(_))));
    }
}
