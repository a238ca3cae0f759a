use anyhow::Context as _;
use tracing::{debug, info, warn};

use sidequest_core::{AuthSession, ProgressionError};
use sidequest_database::Database;
use sidequest_database::impls::user_stats::{
    create_user_stats_record, invalidate_user_stats, read_user_stats_record,
    update_user_stats_record,
};
use sidequest_database::model::user_stats::{
    CreateOutcome, FieldWrite, StatsField, StatsRecord, canonical_stats,
};
use sidequest_utils::{Category, UserStats, level_for_xp, xp_for_quest};

/// A finished quest as reported by the posting flow.
#[derive(Clone, Copy, Debug)]
pub struct QuestCompletion<'a> {
    /// Raw category name; anything unrecognized counts as `fun`.
    pub category: &'a str,
    pub difficulty: Option<f64>,
}

impl<'a> QuestCompletion<'a> {
    pub fn new(category: &'a str, difficulty: Option<f64>) -> Self {
        Self {
            category,
            difficulty,
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CompletionReward {
    pub category: Category,
    pub xp_gained: u64,
    /// Whether this completion created the user's stats record.
    pub created: bool,
}

/// Credit a quest completion to the signed-in user.
///
/// Exactly one store mutation is issued: a create for first-time users,
/// otherwise a single batched write of commutative increments plus the
/// recomputed level fields. Store failures are returned as
/// [`ProgressionError::StoreUnavailable`] and are never retried.
pub async fn apply_quest_completion(
    db: &Database,
    session: &AuthSession,
    completion: QuestCompletion<'_>,
) -> Result<CompletionReward, ProgressionError> {
    let user_id = session.require_user()?;

    let category = Category::parse_or_fallback(completion.category);
    if Category::parse(completion.category).is_none() {
        debug!(
            raw_category = completion.category,
            "unrecognized quest category; counting it as {}",
            Category::FALLBACK
        );
    }
    let xp_gained = xp_for_quest(completion.difficulty);

    let created = record_completion(db, user_id.as_str(), category, xp_gained)
        .await
        .map_err(ProgressionError::StoreUnavailable)?;

    if let Err(err) = invalidate_user_stats(db, user_id.as_str()).await {
        warn!(?err, user_id = %user_id, "failed to invalidate cached stats");
    }

    info!(
        user_id = %user_id,
        %category,
        xp_gained,
        created,
        "quest completion recorded"
    );

    Ok(CompletionReward {
        category,
        xp_gained,
        created,
    })
}

async fn record_completion(
    db: &Database,
    user_id: &str,
    category: Category,
    xp_gained: u64,
) -> anyhow::Result<bool> {
    let snapshot = match read_user_stats_record(db, user_id).await? {
        Some(snapshot) => snapshot,
        None => {
            let record = StatsRecord::from_stats(&UserStats::first_completion(category, xp_gained))?;
            match create_user_stats_record(db, user_id, &record).await? {
                CreateOutcome::Created => return Ok(true),
                CreateOutcome::AlreadyExists => {
                    debug!(user_id, "stats record created concurrently; applying as increment");
                    read_user_stats_record(db, user_id)
                        .await?
                        .unwrap_or_default()
                }
            }
        }
    };

    let writes = completion_writes(&snapshot, category, xp_gained)?;
    update_user_stats_record(db, user_id, &writes).await?;
    Ok(false)
}

/// The batched write for one completion against an existing record.
///
/// XP and quest counters are deltas. Levels are plain sets derived from the
/// snapshot plus the gain, so under concurrent writers they may lag until the
/// next completion; readers re-derive them anyway.
pub fn completion_writes(
    snapshot: &StatsRecord,
    category: Category,
    xp_gained: u64,
) -> anyhow::Result<[FieldWrite; 5]> {
    let current = canonical_stats(Some(snapshot));
    let category_xp = current.category(category).xp.saturating_add(xp_gained);
    let global_xp = current.global_xp.saturating_add(xp_gained);

    let delta = i64::try_from(xp_gained).context("xp_gained out of i64 range")?;
    let category_level =
        i64::try_from(level_for_xp(category_xp)).context("category level out of i64 range")?;
    let global_level =
        i64::try_from(level_for_xp(global_xp)).context("global level out of i64 range")?;

    Ok([
        FieldWrite::increment(StatsField::Xp(category), delta),
        FieldWrite::increment(StatsField::QuestsCompleted(category), 1),
        FieldWrite::set(StatsField::Level(category), category_level),
        FieldWrite::increment(StatsField::GlobalXp, delta),
        FieldWrite::set(StatsField::GlobalLevel, global_level),
    ])
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::{QuestCompletion, apply_quest_completion, completion_writes};
    use sidequest_core::{AuthSession, ProgressionError, UserId};
    use sidequest_database::impls::user_stats::read_user_stats_record;
    use sidequest_database::model::user_stats::{
        CategoryRecord, FieldWrite, StatsField, StatsRecord, canonical_stats,
    };
    use sidequest_database::{Database, MemoryStatsStore};
    use sidequest_utils::{Category, UserStats};

    fn session(user: &str) -> AuthSession {
        AuthSession::SignedIn(UserId::new(user).unwrap())
    }

    async fn stats(db: &Database, user: &str) -> UserStats {
        let record = read_user_stats_record(db, user).await.unwrap();
        canonical_stats(record.as_ref())
    }

    #[tokio::test]
    async fn anonymous_sessions_never_touch_the_store() {
        let store = MemoryStatsStore::new();
        store.set_offline(true);
        let db = Database::with_memory_store(store);

        let err = apply_quest_completion(
            &db,
            &AuthSession::Anonymous,
            QuestCompletion::new("fitness", Some(3.0)),
        )
        .await
        .unwrap_err();

        assert!(matches!(err, ProgressionError::Unauthenticated));
    }

    #[tokio::test]
    async fn first_completion_creates_the_record() {
        let db = Database::in_memory();
        let reward = apply_quest_completion(
            &db,
            &session("new"),
            QuestCompletion::new("social", Some(5.0)),
        )
        .await
        .unwrap();

        assert!(reward.created);
        assert_eq!(reward.xp_gained, 60);
        assert_eq!(stats(&db, "new").await, UserStats::first_completion(Category::Social, 60));

        let stored = read_user_stats_record(&db, "new").await.unwrap().unwrap();
        assert_eq!(stored.get(StatsField::Xp(Category::Fun)), Some(0));
        assert_eq!(stored.get(StatsField::Level(Category::Fitness)), Some(1));
    }

    #[tokio::test]
    async fn sequential_fitness_completions_accumulate() {
        let db = Database::in_memory();
        let session = session("runner");

        apply_quest_completion(&db, &session, QuestCompletion::new("fitness", Some(5.0)))
            .await
            .unwrap();
        let second =
            apply_quest_completion(&db, &session, QuestCompletion::new("fitness", Some(1.0)))
                .await
                .unwrap();
        assert!(!second.created);

        let stats = stats(&db, "runner").await;
        assert_eq!(stats.fitness.xp, 80);
        assert_eq!(stats.fitness.level, 1);
        assert_eq!(stats.fitness.quests_completed, 2);
        assert_eq!(stats.global_xp, 80);
        assert_eq!(stats.global_level, 1);

        let stored = read_user_stats_record(&db, "runner").await.unwrap().unwrap();
        assert_eq!(stored.get(StatsField::Level(Category::Fitness)), Some(1));
        assert_eq!(stored.get(StatsField::GlobalLevel), Some(1));
    }

    #[tokio::test]
    async fn stored_levels_follow_xp_across_buckets() {
        let db = Database::in_memory();
        let session = session("climber");

        for _ in 0..4 {
            apply_quest_completion(&db, &session, QuestCompletion::new("social", Some(5.0)))
                .await
                .unwrap();
        }
        apply_quest_completion(&db, &session, QuestCompletion::new("fun", Some(1.0)))
            .await
            .unwrap();

        let stored = read_user_stats_record(&db, "climber").await.unwrap().unwrap();
        assert_eq!(stored.get(StatsField::Xp(Category::Social)), Some(240));
        assert_eq!(stored.get(StatsField::Level(Category::Social)), Some(3));
        assert_eq!(stored.get(StatsField::GlobalXp), Some(260));
        assert_eq!(stored.get(StatsField::GlobalLevel), Some(3));
        assert_eq!(stored.get(StatsField::Level(Category::Fun)), Some(1));
    }

    #[tokio::test]
    async fn unknown_categories_count_as_fun() {
        let badminton = Database::in_memory();
        let fun = Database::in_memory();

        for (db, category) in [(&badminton, "badminton"), (&fun, "fun")] {
            let quest = QuestCompletion::new(category, Some(4.0));
            let reward = apply_quest_completion(db, &session("u"), quest).await.unwrap();
            assert_eq!(reward.category, Category::Fun);
        }

        assert_eq!(stats(&badminton, "u").await, stats(&fun, "u").await);
        assert_eq!(stats(&badminton, "u").await.fun.xp, 50);
    }

    #[tokio::test]
    async fn missing_difficulty_grants_default_reward() {
        let db = Database::in_memory();
        let reward = apply_quest_completion(&db, &session("u"), QuestCompletion::new("fun", None))
            .await
            .unwrap();
        assert_eq!(reward.xp_gained, 30);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_completions_never_lose_increments() {
        let db = Arc::new(Database::in_memory());
        let busy = session("busy");
        let quest = QuestCompletion::new("social", Some(1.0));
        apply_quest_completion(&db, &busy, quest).await.unwrap();

        let (a, b) = tokio::join!(
            apply_quest_completion(&db, &busy, quest),
            apply_quest_completion(&db, &busy, quest),
        );
        a.unwrap();
        b.unwrap();

        let mut tasks = Vec::new();
        for _ in 0..32 {
            let db = Arc::clone(&db);
            let busy = busy.clone();
            tasks.push(tokio::spawn(async move {
                apply_quest_completion(&db, &busy, QuestCompletion::new("social", Some(1.0))).await
            }));
        }
        for task in tasks {
            task.await.unwrap().unwrap();
        }

        let stats = stats(&db, "busy").await;
        assert_eq!(stats.social.xp, 20 * 35);
        assert_eq!(stats.social.quests_completed, 35);
        assert_eq!(stats.global_xp, 20 * 35);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_first_completions_are_both_counted() {
        let db = Database::in_memory();
        let twin = session("twin");
        let quest = QuestCompletion::new("fun", Some(1.0));

        let (a, b) = tokio::join!(
            apply_quest_completion(&db, &twin, quest),
            apply_quest_completion(&db, &twin, quest),
        );
        let created = [a.unwrap().created, b.unwrap().created];
        assert_eq!(created.iter().filter(|created| **created).count(), 1);

        let stats = stats(&db, "twin").await;
        assert_eq!(stats.fun.xp, 40);
        assert_eq!(stats.fun.quests_completed, 2);
        assert_eq!(stats.global_xp, 40);
    }

    #[tokio::test]
    async fn store_failures_propagate_and_leave_state_untouched() {
        let store = MemoryStatsStore::new();
        let db = Database::with_memory_store(store.clone());
        let quest = QuestCompletion::new("fitness", Some(2.0));
        apply_quest_completion(&db, &session("u"), quest).await.unwrap();
        let before = stats(&db, "u").await;

        store.set_offline(true);
        let err = apply_quest_completion(&db, &session("u"), quest)
            .await
            .unwrap_err();
        assert!(matches!(err, ProgressionError::StoreUnavailable(_)));

        store.set_offline(false);
        assert_eq!(stats(&db, "u").await, before);
    }

    #[test]
    fn writes_are_deltas_plus_derived_levels() {
        let snapshot = StatsRecord {
            global_xp: Some(90),
            global_level: Some(1),
            fitness: Some(CategoryRecord {
                xp: Some(90),
                level: Some(1),
                quests_completed: Some(3),
            }),
            ..StatsRecord::default()
        };

        let writes = completion_writes(&snapshot, Category::Fitness, 20).unwrap();
        assert_eq!(
            writes,
            [
                FieldWrite::increment(StatsField::Xp(Category::Fitness), 20),
                FieldWrite::increment(StatsField::QuestsCompleted(Category::Fitness), 1),
                FieldWrite::set(StatsField::Level(Category::Fitness), 2),
                FieldWrite::increment(StatsField::GlobalXp, 20),
                FieldWrite::set(StatsField::GlobalLevel, 2),
            ]
        );
    }
}
