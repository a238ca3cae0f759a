/// Quest category parsing with the unknown-category fallback.
pub mod category;
/// Human-readable stats summaries.
pub mod formatting;
/// Pure reward and level math.
pub mod progression;
/// Canonical per-user stats model.
pub mod stats;
/// Title ladders and title derivation.
pub mod titles;

pub use category::Category;
pub use progression::{level_for_xp, xp_for_completion, xp_for_quest};
pub use stats::{CategoryStats, UserStats};
pub use titles::title_for_stats;
