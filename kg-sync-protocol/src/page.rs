//! Paged results from the graph-query service.

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// One page of raw source records.
///
/// `total` may be absent; the pipeline then keeps the last total it saw and
/// stops once it has none at all.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourcePage {
    #[serde(default)]
    pub data: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub total: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub from: Option<u64>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub size: Option<u64>,
}

impl SourcePage {
    /// Offset of the page following this one.
    ///
    /// Uses the pagination echoed by the service, falling back to the
    /// requested window when it is missing. `None` when the echoed window
    /// does not fit in a `u64`.
    pub fn next_from(&self, requested_from: u64, requested_size: u64) -> Option<u64> {
        self.from
            .unwrap_or(requested_from)
            .checked_add(self.size.unwrap_or(requested_size))
    }
}
