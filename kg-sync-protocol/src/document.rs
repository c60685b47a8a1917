//! The contract between translators and the pipeline.

use crate::{Badge, HasReferences};
use chrono::{DateTime, Utc};
use serde_json::Value;
use std::fmt::Debug;

/// Release metadata used by the time-based and popularity badges.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ReleaseInfo {
    /// When the document was first released.
    pub first_release: Option<DateTime<Utc>>,
    /// Publication date; takes precedence over `first_release` when set.
    pub issue_date: Option<DateTime<Utc>>,
    /// Views over the last 30 days.
    pub recent_views: Option<u64>,
}

impl ReleaseInfo {
    /// Date the "new" badge is measured from.
    pub fn release_date(&self) -> Option<DateTime<Utc>> {
        self.issue_date.or(self.first_release)
    }
}

/// Content facts a translator knows about a document, used by the content
/// badges. All empty by default.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContentSignals {
    /// Media types of the files the document ships.
    pub content_types: Vec<String>,
    /// Names of external viewers/services the document links to.
    pub services: Vec<String>,
    pub used_in_live_paper: bool,
    /// Other documents point at this one.
    pub used_by_others: bool,
    /// This document points at other documents.
    pub using_others: bool,
    pub has_protocol_executions: bool,
    pub has_learning_resources: bool,
}

/// A flat, search-ready document produced by a translator.
///
/// Implementations expose their internal references through
/// [`HasReferences`] so the sanitizer can clear dangling links.
pub trait TargetDocument: HasReferences + Debug + Send + Sync {
    /// Primary id of the document, unique within its target type.
    fn id(&self) -> &str;

    /// Every identifier this document is known under. Always contains `id()`.
    fn identifiers(&self) -> Vec<String> {
        vec![self.id().to_string()]
    }

    /// Whether the document belongs in the full-text searchable index.
    fn is_searchable(&self) -> bool;

    fn release_info(&self) -> ReleaseInfo {
        ReleaseInfo::default()
    }

    fn content_signals(&self) -> ContentSignals {
        ContentSignals::default()
    }

    /// Replaces the badges of the document.
    fn set_badges(&mut self, badges: &[Badge]);

    /// JSON body written to the document store.
    fn to_source(&self) -> serde_json::Result<Value>;
}

/// Best-effort id of a raw source record, used to file translation errors.
///
/// Looks at `id` then `@id`; fully qualified ids are reduced to their last
/// path segment. Returns `"unknown"` when neither is present.
pub fn record_identifier(record: &Value) -> String {
    record
        .get("id")
        .or_else(|| record.get("@id"))
        .and_then(Value::as_str)
        .map(|id| id.rsplit('/').next().unwrap_or(id).to_string())
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| "unknown".to_string())
}
