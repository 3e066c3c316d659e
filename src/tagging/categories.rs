//! Tag categories, the per-category quota, and categorized tag sets.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// The six fixed tag categories.
///
/// Declaration order is priority order, which `Ord` (and therefore every
/// `CategorizedTags` iteration) follows.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TagCategory {
    PrimaryGenre,
    SubGenre,
    EnergyVibe,
    SituationEnvironment,
    Components,
    TimePeriod,
}

impl TagCategory {
    pub const ALL: [TagCategory; 6] = [
        TagCategory::PrimaryGenre,
        TagCategory::SubGenre,
        TagCategory::EnergyVibe,
        TagCategory::SituationEnvironment,
        TagCategory::Components,
        TagCategory::TimePeriod,
    ];

    pub fn key(&self) -> &'static str {
        match self {
            TagCategory::PrimaryGenre => "primary_genre",
            TagCategory::SubGenre => "sub_genre",
            TagCategory::EnergyVibe => "energy_vibe",
            TagCategory::SituationEnvironment => "situation_environment",
            TagCategory::Components => "components",
            TagCategory::TimePeriod => "time_period",
        }
    }

    /// Categories that always get exactly one slot.
    pub fn is_single(&self) -> bool {
        matches!(self, TagCategory::PrimaryGenre | TagCategory::TimePeriod)
    }

    /// The two least essential categories, which the service may leave empty.
    pub fn is_optional(&self) -> bool {
        matches!(self, TagCategory::Components | TagCategory::TimePeriod)
    }
}

/// Settings a tagging batch runs with.
///
/// Built once per batch and passed down explicitly, so changing the stored
/// tag limit never affects a batch already in flight.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TaggingConfig {
    /// Maximum tags for each "nice-to-have" category.
    pub tag_limit: u32,
    /// Send a response schema that bounds every array server-side.
    pub response_schema: bool,
}

impl Default for TaggingConfig {
    fn default() -> Self {
        Self {
            tag_limit: DEFAULT_TAG_LIMIT,
            response_schema: false,
        }
    }
}

pub const DEFAULT_TAG_LIMIT: u32 = 1;

/// How many tags `category` may hold under `config`.
pub fn quota_for(category: TagCategory, config: &TaggingConfig) -> usize {
    if category.is_single() {
        1
    } else {
        config.tag_limit as usize
    }
}

/// Tags grouped by category, iterated in priority order.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct CategorizedTags(BTreeMap<TagCategory, Vec<String>>);

impl CategorizedTags {
    pub fn from_pairs<I, V, S>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (TagCategory, V)>,
        V: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self(
            pairs
                .into_iter()
                .map(|(category, tags)| (category, tags.into_iter().map(Into::into).collect()))
                .collect(),
        )
    }

    pub fn insert(&mut self, category: TagCategory, tags: Vec<String>) {
        self.0.insert(category, tags);
    }

    pub fn get(&self, category: TagCategory) -> &[String] {
        self.0.get(&category).map(Vec::as_slice).unwrap_or(&[])
    }

    pub fn iter(&self) -> impl Iterator<Item = (TagCategory, &[String])> + '_ {
        self.0.iter().map(|(category, tags)| (*category, tags.as_slice()))
    }

    /// Total number of tags across all categories.
    pub fn count(&self) -> usize {
        self.0.values().map(Vec::len).sum()
    }

    /// True when there is no tag at all, even if some categories are present.
    pub fn is_empty(&self) -> bool {
        self.count() == 0
    }

    /// Every tag in priority order, then stored order, joined with `", "`.
    pub fn flat_list(&self) -> String {
        self.0
            .values()
            .flatten()
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join(", ")
    }

    /// Whether every category respects its quota under `config`.
    pub fn within_quota(&self, config: &TaggingConfig) -> bool {
        self.iter()
            .all(|(category, tags)| tags.len() <= quota_for(category, config))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_quota_for() {
        let config = TaggingConfig {
            tag_limit: 3,
            ..Default::default()
        };
        assert_eq!(quota_for(TagCategory::PrimaryGenre, &config), 1);
        assert_eq!(quota_for(TagCategory::TimePeriod, &config), 1);
        assert_eq!(quota_for(TagCategory::SubGenre, &config), 3);
        assert_eq!(quota_for(TagCategory::EnergyVibe, &config), 3);
        assert_eq!(quota_for(TagCategory::SituationEnvironment, &config), 3);
        assert_eq!(quota_for(TagCategory::Components, &config), 3);

        let zero = TaggingConfig {
            tag_limit: 0,
            ..Default::default()
        };
        assert_eq!(quota_for(TagCategory::PrimaryGenre, &zero), 1);
        assert_eq!(quota_for(TagCategory::Components, &zero), 0);
    }

    #[test]
    fn test_default_tag_limit_is_one() {
        assert_eq!(TaggingConfig::default().tag_limit, 1);
    }

    #[test]
    fn test_flat_list_follows_priority_order() {
        let tags = CategorizedTags::from_pairs([
            (TagCategory::TimePeriod, vec!["1990s"]),
            (TagCategory::PrimaryGenre, vec!["house"]),
            (TagCategory::EnergyVibe, vec!["uplifting", "warm"]),
        ]);
        assert_eq!(tags.flat_list(), "house, uplifting, warm, 1990s");
        assert_eq!(tags.count(), 4);
    }

    #[test]
    fn test_serializes_with_category_keys() {
        let tags = CategorizedTags::from_pairs([
            (TagCategory::SubGenre, vec!["acid"]),
            (TagCategory::PrimaryGenre, vec!["techno"]),
        ]);
        let json = serde_json::to_string(&tags).unwrap();
        assert_eq!(json, r#"{"primary_genre":["techno"],"sub_genre":["acid"]}"#);

        let back: CategorizedTags = serde_json::from_str(&json).unwrap();
        assert_eq!(back, tags);
    }

    #[test]
    fn test_within_quota() {
        let config = TaggingConfig::default();
        let ok = CategorizedTags::from_pairs([(TagCategory::SubGenre, vec!["a"])]);
        let over = CategorizedTags::from_pairs([(TagCategory::SubGenre, vec!["a", "b"])]);
        assert!(ok.within_quota(&config));
        assert!(!over.within_quota(&config));
    }

    #[test]
    fn test_empty_categories_count_as_empty() {
        let tags = CategorizedTags::from_pairs([(TagCategory::Components, Vec::<String>::new())]);
        assert!(tags.is_empty());
        assert_eq!(tags.flat_list(), "");
    }
}
