use serde::{Deserialize, Serialize};

use crate::category::Category;
use crate::progression::level_for_xp;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryStats {
    pub xp: u64,
    pub level: u64,
    pub quests_completed: u64,
}

impl CategoryStats {
    /// Build a category record whose level is derived from `xp`.
    pub fn from_xp(xp: u64, quests_completed: u64) -> Self {
        Self {
            xp,
            level: level_for_xp(xp),
            quests_completed,
        }
    }
}

impl Default for CategoryStats {
    fn default() -> Self {
        Self::from_xp(0, 0)
    }
}

/// Fully populated progression state for one user.
///
/// `Default` is the state of a user who has never completed a quest.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UserStats {
    #[serde(rename = "globalXP")]
    pub global_xp: u64,
    pub global_level: u64,
    pub social: CategoryStats,
    pub fitness: CategoryStats,
    pub fun: CategoryStats,
}

impl Default for UserStats {
    fn default() -> Self {
        Self {
            global_xp: 0,
            global_level: level_for_xp(0),
            social: CategoryStats::default(),
            fitness: CategoryStats::default(),
            fun: CategoryStats::default(),
        }
    }
}

impl UserStats {
    /// Stats of a user whose very first completion granted `xp_gained` in `category`.
    pub fn first_completion(category: Category, xp_gained: u64) -> Self {
        let mut stats = Self::default();
        *stats.category_mut(category) = CategoryStats::from_xp(xp_gained, 1);
        stats.global_xp = xp_gained;
        stats.global_level = level_for_xp(xp_gained);
        stats
    }

    pub fn category(&self, category: Category) -> &CategoryStats {
        match category {
            Category::Social => &self.social,
            Category::Fitness => &self.fitness,
            Category::Fun => &self.fun,
        }
    }

    pub fn category_mut(&mut self, category: Category) -> &mut CategoryStats {
        match category {
            Category::Social => &mut self.social,
            Category::Fitness => &mut self.fitness,
            Category::Fun => &mut self.fun,
        }
    }

    pub fn total_quests_completed(&self) -> u64 {
        Category::ALL
            .into_iter()
            .map(|category| self.category(category).quests_completed)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::{CategoryStats, UserStats};
    use crate::category::Category;

    #[test]
    fn default_stats_are_level_one_everywhere() {
        let stats = UserStats::default();
        assert_eq!(stats.global_xp, 0);
        assert_eq!(stats.global_level, 1);
        for category in Category::ALL {
            assert_eq!(*stats.category(category), CategoryStats::default());
            assert_eq!(stats.category(category).level, 1);
        }
    }

    #[test]
    fn first_completion_touches_only_target_category() {
        let stats = UserStats::first_completion(Category::Fitness, 120);
        assert_eq!(stats.fitness.xp, 120);
        assert_eq!(stats.fitness.level, 2);
        assert_eq!(stats.fitness.quests_completed, 1);
        assert_eq!(stats.social, CategoryStats::default());
        assert_eq!(stats.fun, CategoryStats::default());
        assert_eq!(stats.global_xp, 120);
        assert_eq!(stats.global_level, 2);
        assert_eq!(stats.total_quests_completed(), 1);
    }

    #[test]
    fn serializes_with_document_field_names() {
        let json = serde_json::to_value(UserStats::first_completion(Category::Social, 20))
            .expect("stats serialize");
        assert_eq!(json["globalXP"], 20);
        assert_eq!(json["globalLevel"], 1);
        assert_eq!(json["social"]["questsCompleted"], 1);
        assert_eq!(json["fun"]["level"], 1);
    }
}
