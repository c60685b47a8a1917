//! Badges attached to target documents.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

/// Vocabulary namespace of badge properties in the graph service.
pub const BADGE_VOCAB: &str = "https://search.kg.ebrains.eu/vocab/badges";

/// A derived flag shown next to a search result.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub enum Badge {
    IsNew,
    IsTrending,
    IsFollowingStandards,
    IsLinkedToImageViewer,
    IsIntegratedWithAtlas,
    IsUsedInLivePaper,
    IsUsedByOthers,
    IsUsingOthers,
    HasInDepthMetaData,
    IsLearningResourceAvailable,
}

impl Badge {
    pub fn as_str(&self) -> &'static str {
        match self {
            Badge::IsNew => "isNew",
            Badge::IsTrending => "isTrending",
            Badge::IsFollowingStandards => "isFollowingStandards",
            Badge::IsLinkedToImageViewer => "isLinkedToImageViewer",
            Badge::IsIntegratedWithAtlas => "isIntegratedWithAtlas",
            Badge::IsUsedInLivePaper => "isUsedInLivePaper",
            Badge::IsUsedByOthers => "isUsedByOthers",
            Badge::IsUsingOthers => "isUsingOthers",
            Badge::HasInDepthMetaData => "hasInDepthMetaData",
            Badge::IsLearningResourceAvailable => "isLearningResourceAvailable",
        }
    }

    /// Badges whose holders are published back to the graph service.
    pub fn is_published(&self) -> bool {
        matches!(self, Badge::IsNew | Badge::IsTrending)
    }

    /// Fully qualified property name, e.g. `.../vocab/badges/isNew`.
    pub fn property(&self) -> String {
        format!("{}/{}", BADGE_VOCAB, self.as_str())
    }
}

impl fmt::Display for Badge {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Document ids holding each published badge, collected over one run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct BadgeCollection {
    holders: BTreeMap<Badge, BTreeSet<String>>,
}

impl BadgeCollection {
    pub fn new() -> Self {
        Self::default()
    }

    /// Records `id` for every published badge in `badges`.
    pub fn record(&mut self, id: &str, badges: &[Badge]) {
        for badge in badges.iter().filter(|b| b.is_published()) {
            self.holders
                .entry(*badge)
                .or_default()
                .insert(id.to_string());
        }
    }

    pub fn is_empty(&self) -> bool {
        self.holders.is_empty()
    }

    pub fn holders(&self, badge: Badge) -> impl Iterator<Item = &str> {
        self.holders
            .get(&badge)
            .into_iter()
            .flat_map(|ids| ids.iter().map(String::as_str))
    }

    pub fn iter(&self) -> impl Iterator<Item = (Badge, &BTreeSet<String>)> {
        self.holders.iter().map(|(badge, ids)| (*badge, ids))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_only_published_badges_are_collected() {
        let mut badges = BadgeCollection::new();
        badges.record("a", &[Badge::IsNew, Badge::IsFollowingStandards]);
        badges.record("b", &[Badge::IsUsedByOthers]);
        badges.record("c", &[Badge::IsTrending, Badge::IsNew]);

        assert_eq!(badges.holders(Badge::IsNew).collect::<Vec<_>>(), vec!["a", "c"]);
        assert_eq!(badges.holders(Badge::IsTrending).collect::<Vec<_>>(), vec!["c"]);
        assert_eq!(badges.holders(Badge::IsFollowingStandards).count(), 0);
    }

    #[test]
    fn test_badge_names() {
        assert_eq!(
            serde_json::to_string(&Badge::HasInDepthMetaData).unwrap(),
            "\"hasInDepthMetaData\""
        );
        assert_eq!(
            Badge::IsNew.property(),
            "https://search.kg.ebrains.eu/vocab/badges/isNew"
        );
    }
}
