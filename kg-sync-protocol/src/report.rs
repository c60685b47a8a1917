//! Per-record error reporting.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Failures keyed by source record id.
///
/// Merging appends messages; an entry is never overwritten.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ErrorReport(BTreeMap<String, Vec<String>>);

impl ErrorReport {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn record(&mut self, identifier: impl Into<String>, message: impl Into<String>) {
        self.0
            .entry(identifier.into())
            .or_default()
            .push(message.into());
    }

    pub fn merge(&mut self, other: ErrorReport) {
        for (identifier, messages) in other.0 {
            self.0.entry(identifier).or_default().extend(messages);
        }
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Number of records with at least one error.
    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn get(&self, identifier: &str) -> Option<&[String]> {
        self.0.get(identifier).map(Vec::as_slice)
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }
}

/// Errors of one run across every target type.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ErrorReportResult {
    pub errors_by_target: Vec<TargetTypeErrors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TargetTypeErrors {
    pub target_type: String,
    pub errors_by_source: Vec<SourceTypeErrors>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SourceTypeErrors {
    pub source_type: String,
    pub errors: ErrorReport,
}

impl ErrorReportResult {
    pub fn is_empty(&self) -> bool {
        self.errors_by_target.is_empty()
    }

    /// Adds the errors of one target type; empty entries are skipped.
    pub fn push(&mut self, errors: TargetTypeErrors) {
        if !errors.errors_by_source.is_empty() {
            self.errors_by_target.push(errors);
        }
    }
}
