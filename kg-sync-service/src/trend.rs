//! Trend threshold and badge evaluation
//!
//! The trend threshold of a type is derived from the most viewed documents
//! currently in its search index: the second smallest distinct view count
//! among the top K, floored to a minimum. A type with fewer than two distinct
//! counts among its top documents has no threshold and nothing trends.

use crate::config::SyncConfig;
use crate::error::Result;
use crate::store::DocumentStore;
use chrono::{DateTime, Duration, Utc};
use kg_sync_protocol::{Badge, ContentSignals, ReleaseInfo};
use std::collections::BTreeSet;
use tracing::debug;

/// Media types of community data standards
const COMMUNITY_STANDARDS: &[&str] = &[
    "application/vnd.bids",
    "application/vnd.bids.electrodesformat",
    "application/vnd.g-node.nix.neo",
    "application/vnd.g-node.nix+hdf5",
    "application/vnd.nwb.nwbn+hdf",
    "application/vnd.g-node.odml",
];

const IMAGE_VIEWER_SERVICES: &[&str] = &["LocaliZoom", "Multi-Image-OSd"];

const ATLAS_SERVICES: &[&str] = &["Neuroglancer", "siibra-explorer"];

/// Computes trend thresholds and per-document badges
#[derive(Debug, Clone)]
pub struct TrendEvaluator {
    top_k: usize,
    min_views: u64,
    new_window: Duration,
}

impl Default for TrendEvaluator {
    fn default() -> Self {
        Self::from_config(&SyncConfig::default())
    }
}

impl TrendEvaluator {
    pub fn new(top_k: usize, min_views: u64, new_window: Duration) -> Self {
        Self {
            top_k: top_k.max(1),
            min_views,
            new_window,
        }
    }

    pub fn from_config(config: &SyncConfig) -> Self {
        Self::new(
            config.trending_top_k,
            config.trending_min_views,
            Duration::days(config.new_badge_days),
        )
    }

    /// Threshold from view counts sorted highest first.
    pub fn threshold_from_views(&self, views: &[u64]) -> Option<u64> {
        let distinct: BTreeSet<u64> = views.iter().take(self.top_k).copied().collect();
        let second_smallest = distinct.iter().nth(1)?;
        Some((*second_smallest).max(self.min_views))
    }

    /// Threshold for the documents currently in `index`.
    ///
    /// A missing index has no threshold.
    pub async fn threshold(&self, store: &dyn DocumentStore, index: &str) -> Result<Option<u64>> {
        let views = store.top_views(index, self.top_k + 1).await?;
        let threshold = self.threshold_from_views(&views);
        debug!(index, ?views, ?threshold, "computed trend threshold");
        Ok(threshold)
    }

    /// Badges of one document.
    pub fn evaluate(
        &self,
        release: &ReleaseInfo,
        signals: &ContentSignals,
        threshold: Option<u64>,
        now: DateTime<Utc>,
    ) -> Vec<Badge> {
        let mut badges = Vec::new();

        if release
            .release_date()
            .is_some_and(|date| date > now - self.new_window)
        {
            badges.push(Badge::IsNew);
        }
        if let (Some(threshold), Some(views)) = (threshold, release.recent_views) {
            if threshold > 0 && views >= threshold {
                badges.push(Badge::IsTrending);
            }
        }

        if signals.has_learning_resources {
            badges.push(Badge::IsLearningResourceAvailable);
        }
        if any_in(&signals.services, IMAGE_VIEWER_SERVICES) {
            badges.push(Badge::IsLinkedToImageViewer);
        }
        if any_in(&signals.services, ATLAS_SERVICES) {
            badges.push(Badge::IsIntegratedWithAtlas);
        }
        if any_in(&signals.content_types, COMMUNITY_STANDARDS) {
            badges.push(Badge::IsFollowingStandards);
        }
        if signals.used_in_live_paper {
            badges.push(Badge::IsUsedInLivePaper);
        }
        if signals.used_by_others {
            badges.push(Badge::IsUsedByOthers);
        }
        if signals.using_others {
            badges.push(Badge::IsUsingOthers);
        }
        if signals.has_protocol_executions {
            badges.push(Badge::HasInDepthMetaData);
        }

        badges
    }
}

fn any_in(values: &[String], allowed: &[&str]) -> bool {
    values.iter().any(|v| allowed.contains(&v.as_str()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::MemoryDocumentStore;
    use serde_json::json;

    fn evaluator() -> TrendEvaluator {
        TrendEvaluator::default()
    }

    #[test]
    fn test_threshold_second_smallest_of_top_k() {
        assert_eq!(
            evaluator().threshold_from_views(&[50, 50, 20, 20, 5, 1]),
            Some(20)
        );
    }

    #[test]
    fn test_threshold_floored_to_minimum() {
        assert_eq!(evaluator().threshold_from_views(&[9, 8, 3]), Some(10));
    }

    #[test]
    fn test_threshold_needs_two_distinct_values() {
        assert_eq!(evaluator().threshold_from_views(&[30, 30, 30]), None);
        assert_eq!(evaluator().threshold_from_views(&[]), None);
    }

    #[tokio::test]
    async fn test_threshold_from_store() {
        let store = MemoryDocumentStore::new();
        for (i, views) in [50u64, 50, 20, 20, 5, 1].iter().enumerate() {
            store.put_document("idx", &i.to_string(), json!({"last30DaysViews": views}));
        }
        assert_eq!(evaluator().threshold(&store, "idx").await.unwrap(), Some(20));
        assert_eq!(evaluator().threshold(&store, "missing").await.unwrap(), None);
    }

    #[test]
    fn test_new_and_trending() {
        let now = Utc::now();
        let release = ReleaseInfo {
            first_release: Some(now - Duration::days(2)),
            issue_date: None,
            recent_views: Some(25),
        };
        let badges = evaluator().evaluate(&release, &ContentSignals::default(), Some(20), now);
        assert_eq!(badges, vec![Badge::IsNew, Badge::IsTrending]);

        let old = ReleaseInfo {
            first_release: Some(now - Duration::days(30)),
            issue_date: None,
            recent_views: Some(19),
        };
        assert!(evaluator()
            .evaluate(&old, &ContentSignals::default(), Some(20), now)
            .is_empty());
    }

    #[test]
    fn test_no_trending_without_threshold() {
        let release = ReleaseInfo {
            recent_views: Some(1_000),
            ..Default::default()
        };
        let badges = evaluator().evaluate(&release, &ContentSignals::default(), None, Utc::now());
        assert!(!badges.contains(&Badge::IsTrending));
    }

    #[test]
    fn test_content_badges() {
        let signals = ContentSignals {
            content_types: vec!["application/vnd.bids".to_string()],
            services: vec!["siibra-explorer".to_string()],
            used_by_others: true,
            has_protocol_executions: true,
            ..Default::default()
        };
        let badges = evaluator().evaluate(&ReleaseInfo::default(), &signals, None, Utc::now());
        assert_eq!(
            badges,
            vec![
                Badge::IsIntegratedWithAtlas,
                Badge::IsFollowingStandards,
                Badge::IsUsedByOthers,
                Badge::HasInDepthMetaData
            ]
        );
    }
}
