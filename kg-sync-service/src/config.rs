//! Tunables for synchronization runs

use serde::{Deserialize, Serialize};

/// Maximum characters of one bulk request body.
pub const DEFAULT_MAX_BULK_CHARS: usize = 1_000_000;

/// Number of top documents considered for the trend threshold.
pub const DEFAULT_TRENDING_TOP_K: usize = 5;

/// Floor of the trend threshold.
pub const DEFAULT_TRENDING_MIN_VIEWS: u64 = 10;

/// Days after release during which a document counts as new.
pub const DEFAULT_NEW_BADGE_DAYS: i64 = 8;

/// Hits per page when listing ids from the document store.
pub const DEFAULT_ID_PAGE_SIZE: usize = 10_000;

/// Synchronization settings
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct SyncConfig {
    pub max_bulk_chars: usize,
    pub trending_top_k: usize,
    pub trending_min_views: u64,
    pub new_badge_days: i64,
    pub id_page_size: usize,
}

impl Default for SyncConfig {
    fn default() -> Self {
        Self {
            max_bulk_chars: DEFAULT_MAX_BULK_CHARS,
            trending_top_k: DEFAULT_TRENDING_TOP_K,
            trending_min_views: DEFAULT_TRENDING_MIN_VIEWS,
            new_badge_days: DEFAULT_NEW_BADGE_DAYS,
            id_page_size: DEFAULT_ID_PAGE_SIZE,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_override() {
        let config: SyncConfig = serde_json::from_str(r#"{"trending_top_k": 3}"#).unwrap();
        assert_eq!(config.trending_top_k, 3);
        assert_eq!(config.max_bulk_chars, DEFAULT_MAX_BULK_CHARS);
    }
}
