//! Passthrough translator for types declared in configuration
//!
//! Source records are already shaped like their target documents: the record
//! is copied as is, internal references are any objects carrying a
//! `reference` member, and the well-known fields below feed the badges.
//!
//! | field | use |
//! |---|---|
//! | `id` / `@id` | document id (last path segment) |
//! | `identifier` | extra identifiers |
//! | `firstRelease`, `issueDate` | RFC 3339 timestamps for the new badge |
//! | `last30DaysViews` | view count for the trending badge |
//! | `contentTypes`, `services` | content badges |

use super::{QueryDefinition, Translator};
use chrono::{DateTime, Utc};
use kg_sync_protocol::{
    record_identifier, Badge, ContentSignals, HasReferences, InternalReference, ReleaseInfo,
    Stage, TargetDocument, TranslationError,
};
use serde_json::Value;
use std::collections::HashMap;

/// Translator copying records through unchanged.
#[derive(Debug, Clone)]
pub struct JsonTranslator {
    source_type: String,
    queries: Vec<QueryDefinition>,
    templates: HashMap<String, String>,
    default_template: Option<String>,
    searchable_pointer: Option<String>,
}

impl JsonTranslator {
    pub fn new(source_type: impl Into<String>, queries: Vec<QueryDefinition>) -> Self {
        Self {
            source_type: source_type.into(),
            queries,
            templates: HashMap::new(),
            default_template: None,
            searchable_pointer: None,
        }
    }

    /// Template used for every semantic type without a specific one.
    pub fn with_query_template(mut self, template: impl Into<String>) -> Self {
        self.default_template = Some(template.into());
        self
    }

    pub fn with_type_template(
        mut self,
        semantic_type: impl Into<String>,
        template: impl Into<String>,
    ) -> Self {
        self.templates.insert(semantic_type.into(), template.into());
        self
    }

    /// JSON pointer to a boolean deciding searchability. Without one, every
    /// document is searchable.
    pub fn with_searchable_pointer(mut self, pointer: impl Into<String>) -> Self {
        self.searchable_pointer = Some(pointer.into());
        self
    }

    fn is_searchable(&self, record: &Value) -> bool {
        match &self.searchable_pointer {
            Some(pointer) => record
                .pointer(pointer)
                .and_then(Value::as_bool)
                .unwrap_or(false),
            None => true,
        }
    }
}

impl Translator for JsonTranslator {
    fn source_type(&self) -> &str {
        &self.source_type
    }

    fn queries(&self) -> &[QueryDefinition] {
        &self.queries
    }

    fn query_template(&self, semantic_type: &str) -> Option<String> {
        self.templates
            .get(semantic_type)
            .or(self.default_template.as_ref())
            .cloned()
    }

    fn translate(
        &self,
        record: &Value,
        _stage: Stage,
    ) -> Result<Box<dyn TargetDocument>, TranslationError> {
        let id = record_identifier(record);
        let Some(fields) = record.as_object() else {
            return Err(TranslationError::new(id, "record is not a JSON object"));
        };
        if id == "unknown" {
            return Err(TranslationError::new(id, "record has no id"));
        }

        let mut identifiers = vec![id.clone()];
        if let Some(extra) = fields.get("identifier").and_then(Value::as_array) {
            for value in extra.iter().filter_map(Value::as_str) {
                if !identifiers.iter().any(|i| i == value) {
                    identifiers.push(value.to_string());
                }
            }
        }

        let release = ReleaseInfo {
            first_release: parse_timestamp(&id, fields.get("firstRelease"))?,
            issue_date: parse_timestamp(&id, fields.get("issueDate"))?,
            recent_views: fields.get("last30DaysViews").and_then(Value::as_u64),
        };

        let signals = ContentSignals {
            content_types: string_list(fields.get("contentTypes")),
            services: string_list(fields.get("services")),
            used_in_live_paper: flag(fields.get("usedInLivePaper")),
            used_by_others: flag(fields.get("usedByOthers")),
            using_others: flag(fields.get("usingOthers")),
            has_protocol_executions: flag(fields.get("hasProtocolExecutions")),
            has_learning_resources: flag(fields.get("hasLearningResources")),
        };

        let mut source = record.clone();
        source["id"] = Value::String(id.clone());

        Ok(Box::new(JsonDocument {
            id,
            identifiers,
            searchable: self.is_searchable(record),
            release,
            signals,
            source,
        }))
    }
}

fn parse_timestamp(
    id: &str,
    value: Option<&Value>,
) -> Result<Option<DateTime<Utc>>, TranslationError> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => DateTime::parse_from_rfc3339(s)
            .map(|d| Some(d.with_timezone(&Utc)))
            .map_err(|e| TranslationError::new(id, format!("invalid timestamp '{}': {}", s, e))),
        Some(other) => Err(TranslationError::new(
            id,
            format!("expected timestamp string, got {}", other),
        )),
    }
}

fn string_list(value: Option<&Value>) -> Vec<String> {
    value
        .and_then(Value::as_array)
        .map(|items| {
            items
                .iter()
                .filter_map(Value::as_str)
                .map(str::to_string)
                .collect()
        })
        .unwrap_or_default()
}

fn flag(value: Option<&Value>) -> bool {
    value.and_then(Value::as_bool).unwrap_or(false)
}

/// Document produced by [`JsonTranslator`]
#[derive(Debug, Clone)]
pub struct JsonDocument {
    id: String,
    identifiers: Vec<String>,
    searchable: bool,
    release: ReleaseInfo,
    signals: ContentSignals,
    source: Value,
}

impl HasReferences for JsonDocument {
    fn visit_references(&mut self, visit: &mut dyn FnMut(&mut InternalReference)) {
        self.source.visit_references(visit);
    }
}

impl TargetDocument for JsonDocument {
    fn id(&self) -> &str {
        &self.id
    }

    fn identifiers(&self) -> Vec<String> {
        self.identifiers.clone()
    }

    fn is_searchable(&self) -> bool {
        self.searchable
    }

    fn release_info(&self) -> ReleaseInfo {
        self.release.clone()
    }

    fn content_signals(&self) -> ContentSignals {
        self.signals.clone()
    }

    fn set_badges(&mut self, badges: &[Badge]) {
        self.source["badges"] = Value::Array(
            badges
                .iter()
                .map(|b| Value::String(b.as_str().to_string()))
                .collect(),
        );
    }

    fn to_source(&self) -> serde_json::Result<Value> {
        Ok(self.source.clone())
    }
}
