/// XP granted at the lowest difficulty.
pub const BASE_XP: u64 = 20;
/// Width of every level bucket, global and per category.
pub const XP_PER_LEVEL: u64 = 100;

pub const MIN_DIFFICULTY: u8 = 1;
pub const MAX_DIFFICULTY: u8 = 5;
/// Difficulty assumed when a quest does not carry one.
pub const DEFAULT_DIFFICULTY: f64 = 2.0;

/// Round to the nearest whole difficulty and clamp into `[1, 5]`.
///
/// NaN has no nearest integer and is treated as [`DEFAULT_DIFFICULTY`].
pub fn clamp_difficulty(difficulty: f64) -> u8 {
    let difficulty = if difficulty.is_nan() {
        DEFAULT_DIFFICULTY
    } else {
        difficulty
    };

    difficulty
        .round()
        .clamp(f64::from(MIN_DIFFICULTY), f64::from(MAX_DIFFICULTY)) as u8
}

/// Linear interpolation: difficulty 1 is 1.0x, difficulty 5 is 3.0x.
pub fn difficulty_multiplier(difficulty: f64) -> f64 {
    let clamped = f64::from(clamp_difficulty(difficulty));
    1.0 + ((clamped - f64::from(MIN_DIFFICULTY)) / 4.0) * 2.0
}

/// XP reward for completing a quest at the given difficulty.
pub fn xp_for_completion(difficulty: f64) -> u64 {
    (BASE_XP as f64 * difficulty_multiplier(difficulty)).round() as u64
}

/// Like [`xp_for_completion`], for quests whose difficulty may be missing.
pub fn xp_for_quest(difficulty: Option<f64>) -> u64 {
    xp_for_completion(difficulty.unwrap_or(DEFAULT_DIFFICULTY))
}

pub fn level_for_xp(xp: u64) -> u64 {
    xp / XP_PER_LEVEL + 1
}
