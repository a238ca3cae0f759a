pub mod progression;

pub use progression::completion::{CompletionReward, QuestCompletion, apply_quest_completion};
pub use progression::fetch_user_stats;
pub use progression::subscription::{StatsSubscription, subscribe_to_user_stats};
pub use sidequest_utils::{level_for_xp, title_for_stats, xp_for_completion};
