use crate::category::Category;
use crate::stats::UserStats;

/// Title for users with no XP in any category.
pub const ROOKIE_TITLE: &str = "Rookie Adventurer";

/// Category levels covered by each rung of a title ladder.
pub const LEVELS_PER_TITLE: u64 = 5;

const SOCIAL_TITLES: [&str; 4] = [
    "Social Butterfly",
    "People Person",
    "Connector",
    "Community Champion",
];
const FITNESS_TITLES: [&str; 4] = ["Fitness Fanatic", "Gym Rat", "Iron Will", "Warrior"];
const FUN_TITLES: [&str; 4] = [
    "Fun Seeker",
    "Joy Explorer",
    "Adventure Seeker",
    "Life Enthusiast",
];

pub fn title_ladder(category: Category) -> &'static [&'static str; 4] {
    match category {
        Category::Social => &SOCIAL_TITLES,
        Category::Fitness => &FITNESS_TITLES,
        Category::Fun => &FUN_TITLES,
    }
}

/// Category with the strictly highest XP, first in [`Category::ALL`] on ties.
///
/// Returns `None` while every category is still at zero XP.
pub fn dominant_category(stats: &UserStats) -> Option<Category> {
    let mut best: Option<(Category, u64)> = None;

    for category in Category::ALL {
        let xp = stats.category(category).xp;
        let current = best.map_or(0, |(_, best_xp)| best_xp);
        if xp > current {
            best = Some((category, xp));
        }
    }

    best.map(|(category, _)| category)
}

/// Title rung for a category at the given category level.
pub fn title_for_level(category: Category, level: u64) -> &'static str {
    let ladder = title_ladder(category);
    let index = usize::try_from(level / LEVELS_PER_TITLE)
        .unwrap_or(usize::MAX)
        .min(ladder.len() - 1);
    ladder[index]
}

/// User-facing title derived from the highest-XP category and its level.
pub fn title_for_stats(stats: &UserStats) -> &'static str {
    match dominant_category(stats) {
        Some(category) => title_for_level(category, stats.category(category).level),
        None => ROOKIE_TITLE,
    }
}

#[cfg(test)]
mod tests {
    use super::{ROOKIE_TITLE, dominant_category, title_for_level, title_for_stats};
    use crate::category::Category;
    use crate::stats::{CategoryStats, UserStats};

    fn stats_with(social: u64, fitness: u64, fun: u64) -> UserStats {
        UserStats {
            global_xp: social + fitness + fun,
            global_level: crate::level_for_xp(social + fitness + fun),
            social: CategoryStats::from_xp(social, 1),
            fitness: CategoryStats::from_xp(fitness, 1),
            fun: CategoryStats::from_xp(fun, 1),
        }
    }

    #[test]
    fn zero_xp_is_a_rookie() {
        assert_eq!(title_for_stats(&UserStats::default()), ROOKIE_TITLE);
        assert_eq!(dominant_category(&UserStats::default()), None);
    }

    #[test]
    fn ties_go_to_the_first_category() {
        let stats = stats_with(50, 50, 0);
        assert_eq!(dominant_category(&stats), Some(Category::Social));
        assert_eq!(title_for_stats(&stats), "Social Butterfly");

        let stats = stats_with(0, 40, 40);
        assert_eq!(dominant_category(&stats), Some(Category::Fitness));
        assert_eq!(title_for_stats(&stats), "Fitness Fanatic");
    }

    #[test]
    fn highest_category_wins() {
        assert_eq!(title_for_stats(&stats_with(10, 20, 30)), "Fun Seeker");
        assert_eq!(title_for_stats(&stats_with(10, 200, 30)), "Fitness Fanatic");
    }

    #[test]
    fn ladder_advances_every_five_levels() {
        assert_eq!(title_for_level(Category::Social, 1), "Social Butterfly");
        assert_eq!(title_for_level(Category::Social, 4), "Social Butterfly");
        assert_eq!(title_for_level(Category::Social, 5), "People Person");
        assert_eq!(title_for_level(Category::Fitness, 10), "Iron Will");
        assert_eq!(title_for_level(Category::Fun, 15), "Life Enthusiast");
        assert_eq!(title_for_level(Category::Fitness, 999), "Warrior");
    }

    #[test]
    fn title_uses_the_winning_category_level() {
        // fitness level 11 -> index 2
        let stats = stats_with(30, 1_050, 0);
        assert_eq!(title_for_stats(&stats), "Iron Will");
    }
}
