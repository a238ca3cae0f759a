pub mod user_stats;
