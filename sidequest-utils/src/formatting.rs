use crate::category::Category;
use crate::progression::XP_PER_LEVEL;
use crate::stats::{CategoryStats, UserStats};
use crate::titles::title_for_stats;

/// XP still needed to reach the next level bucket.
pub fn xp_to_next_level(xp: u64) -> u64 {
    XP_PER_LEVEL - xp % XP_PER_LEVEL
}

/// One-line summary of a category, e.g. `fitness  Lv 2  120 XP  (80 to next)  3 quests`.
pub fn format_category_line(category: Category, stats: &CategoryStats) -> String {
    format!(
        "{:<8} Lv {}  {} XP  ({} to next)  {}",
        category.as_str(),
        stats.level,
        stats.xp,
        xp_to_next_level(stats.xp),
        quest_count(stats.quests_completed)
    )
}

fn quest_count(count: u64) -> String {
    if count == 1 {
        "1 quest".to_owned()
    } else {
        format!("{count} quests")
    }
}

/// Multi-line profile summary: title, global progress, then each category.
pub fn format_stats_summary(stats: &UserStats) -> String {
    let mut lines = vec![
        title_for_stats(stats).to_owned(),
        format!(
            "Global   Lv {}  {} XP  ({} to next)  {}",
            stats.global_level,
            stats.global_xp,
            xp_to_next_level(stats.global_xp),
            quest_count(stats.total_quests_completed())
        ),
    ];
    lines.extend(
        Category::ALL
            .into_iter()
            .map(|category| format_category_line(category, stats.category(category))),
    );
    lines.join("\n")
}

#[cfg(test)]
mod tests {
    use super::{format_category_line, format_stats_summary, xp_to_next_level};
    use crate::category::Category;
    use crate::stats::{CategoryStats, UserStats};

    #[test]
    fn next_level_distance() {
        assert_eq!(xp_to_next_level(0), 100);
        assert_eq!(xp_to_next_level(99), 1);
        assert_eq!(xp_to_next_level(100), 100);
        assert_eq!(xp_to_next_level(250), 50);
    }

    #[test]
    fn category_lines_pluralize_quests() {
        assert_eq!(
            format_category_line(Category::Fun, &CategoryStats::from_xp(20, 1)),
            "fun      Lv 1  20 XP  (80 to next)  1 quest"
        );
        assert_eq!(
            format_category_line(Category::Fitness, &CategoryStats::from_xp(120, 3)),
            "fitness  Lv 2  120 XP  (80 to next)  3 quests"
        );
    }

    #[test]
    fn summary_starts_with_title() {
        let summary = format_stats_summary(&UserStats::default());
        let mut lines = summary.lines();
        assert_eq!(lines.next(), Some("Rookie Adventurer"));
        assert_eq!(lines.next(), Some("Global   Lv 1  0 XP  (100 to next)  0 quests"));
        assert_eq!(summary.lines().count(), 5);
    }

    #[test]
    fn global_line_counts_quests_across_categories() {
        let mut stats = UserStats::first_completion(Category::Social, 60);
        stats.fitness = CategoryStats::from_xp(40, 2);
        stats.global_xp = 100;
        stats.global_level = 2;

        let summary = format_stats_summary(&stats);
        assert_eq!(
            summary.lines().nth(1),
            Some("Global   Lv 2  100 XP  (100 to next)  3 quests")
        );
    }
}
