use anyhow::Context as _;
use sqlx::postgres::PgListener;
use sqlx::{PgPool, Postgres, QueryBuilder};
use sidequest_utils::{Category, UserStats};
use tracing::warn;

use crate::cache::user_stats_key;
use crate::database::{Database, StatsStore};
use crate::memory::MemoryWatch;
use crate::model::user_stats::{
    CategoryRecord, CreateOutcome, FieldOp, FieldWrite, StatsField, StatsRecord, canonical_stats,
};

/// Channel the `user_stats_changed` trigger notifies with the changed user id.
pub const USER_STATS_CHANNEL: &str = "user_stats_changed";

/// Every column of a stats row, in insert order.
const RECORD_FIELDS: [StatsField; 11] = [
    StatsField::GlobalXp,
    StatsField::GlobalLevel,
    StatsField::Xp(Category::Social),
    StatsField::Level(Category::Social),
    StatsField::QuestsCompleted(Category::Social),
    StatsField::Xp(Category::Fitness),
    StatsField::Level(Category::Fitness),
    StatsField::QuestsCompleted(Category::Fitness),
    StatsField::Xp(Category::Fun),
    StatsField::Level(Category::Fun),
    StatsField::QuestsCompleted(Category::Fun),
];

#[derive(sqlx::FromRow)]
struct UserStatsRow {
    global_xp: Option<i64>,
    global_level: Option<i64>,
    social_xp: Option<i64>,
    social_level: Option<i64>,
    social_quests_completed: Option<i64>,
    fitness_xp: Option<i64>,
    fitness_level: Option<i64>,
    fitness_quests_completed: Option<i64>,
    fun_xp: Option<i64>,
    fun_level: Option<i64>,
    fun_quests_completed: Option<i64>,
}

impl From<UserStatsRow> for StatsRecord {
    fn from(row: UserStatsRow) -> Self {
        let category = |xp, level, quests_completed| {
            Some(CategoryRecord {
                xp,
                level,
                quests_completed,
            })
        };

        StatsRecord {
            global_xp: row.global_xp,
            global_level: row.global_level,
            social: category(row.social_xp, row.social_level, row.social_quests_completed),
            fitness: category(
                row.fitness_xp,
                row.fitness_level,
                row.fitness_quests_completed,
            ),
            fun: category(row.fun_xp, row.fun_level, row.fun_quests_completed),
        }
    }
}

/// Read the stored record for a user, if one exists.
pub async fn read_user_stats_record(
    db: &Database,
    user_id: &str,
) -> anyhow::Result<Option<StatsRecord>> {
    match db.store() {
        StatsStore::Postgres(pool) => {
            let row = sqlx::query_as::<_, UserStatsRow>(
                "SELECT global_xp, global_level, \
                 social_xp, social_level, social_quests_completed, \
                 fitness_xp, fitness_level, fitness_quests_completed, \
                 fun_xp, fun_level, fun_quests_completed \
                 FROM user_stats WHERE user_id = $1",
            )
            .bind(user_id)
            .fetch_optional(pool)
            .await
            .with_context(|| format!("failed to read stats for `{user_id}`"))?;

            Ok(row.map(StatsRecord::from))
        }
        StatsStore::Memory(store) => store.get(user_id).await,
    }
}

/// Persist a brand-new record. Never merges into or overwrites an existing one.
pub async fn create_user_stats_record(
    db: &Database,
    user_id: &str,
    record: &StatsRecord,
) -> anyhow::Result<CreateOutcome> {
    match db.store() {
        StatsStore::Postgres(pool) => create_postgres(pool, user_id, record).await,
        StatsStore::Memory(store) => store.create(user_id, *record).await,
    }
}

/// Apply a batch of writes to an existing record as one atomic mutation.
///
/// A batch may touch each field at most once.
pub async fn update_user_stats_record(
    db: &Database,
    user_id: &str,
    writes: &[FieldWrite],
) -> anyhow::Result<()> {
    if writes.is_empty() {
        return Ok(());
    }
    if let Some(field) = duplicate_field(writes) {
        anyhow::bail!(
            "stats batch for `{user_id}` writes `{}` more than once",
            field.path()
        );
    }

    match db.store() {
        StatsStore::Postgres(pool) => update_postgres(pool, user_id, writes).await,
        StatsStore::Memory(store) => store.update(user_id, writes).await,
    }
}

pub async fn atomic_increment(
    db: &Database,
    user_id: &str,
    field: StatsField,
    delta: i64,
) -> anyhow::Result<()> {
    update_user_stats_record(db, user_id, &[FieldWrite::increment(field, delta)]).await
}

pub async fn set_field(
    db: &Database,
    user_id: &str,
    field: StatsField,
    value: i64,
) -> anyhow::Result<()> {
    update_user_stats_record(db, user_id, &[FieldWrite::set(field, value)]).await
}

/// Start watching a user's record. The watch is armed before this returns, so
/// a read issued afterwards cannot miss a change.
pub async fn watch_user_stats(db: &Database, user_id: &str) -> anyhow::Result<StatsWatch> {
    match db.store() {
        StatsStore::Postgres(pool) => {
            let mut listener = PgListener::connect_with(pool)
                .await
                .context("failed to open stats listener connection")?;
            listener
                .listen(USER_STATS_CHANNEL)
                .await
                .with_context(|| format!("failed to LISTEN on `{USER_STATS_CHANNEL}`"))?;

            Ok(StatsWatch::Postgres(PgStatsWatch {
                key: user_id.to_owned(),
                listener,
            }))
        }
        StatsStore::Memory(store) => Ok(StatsWatch::Memory(store.watch(user_id)?)),
    }
}

/// Canonical stats for one-shot reads, served through the read cache.
///
/// A load that reads the record just before a completion writes it can still
/// fill the cache after that completion's invalidation. Such a stale entry
/// lives at most for the stats TTL. Callers that need every change should
/// subscribe instead.
pub async fn load_user_stats(db: &Database, user_id: &str) -> anyhow::Result<UserStats> {
    let cache = db.cache();
    let key = user_stats_key(cache, user_id);

    cache
        .get_or_load_json(&key, cache.stats_ttl(), || async move {
            let record = read_user_stats_record(db, user_id).await?;
            Ok(canonical_stats(record.as_ref()))
        })
        .await
}

pub async fn invalidate_user_stats(db: &Database, user_id: &str) -> anyhow::Result<()> {
    let cache = db.cache();
    cache.del(&user_stats_key(cache, user_id)).await
}

fn duplicate_field(writes: &[FieldWrite]) -> Option<StatsField> {
    writes.iter().enumerate().find_map(|(index, write)| {
        writes[..index]
            .iter()
            .any(|earlier| earlier.field == write.field)
            .then_some(write.field)
    })
}

fn create_query(user_id: &str, record: &StatsRecord) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("INSERT INTO user_stats (user_id");
    for field in RECORD_FIELDS {
        builder.push(", ").push(field.column());
    }
    builder.push(") VALUES (").push_bind(user_id.to_owned());
    for field in RECORD_FIELDS {
        builder.push(", ").push_bind(record.get(field));
    }
    builder.push(") ON CONFLICT (user_id) DO NOTHING");
    builder
}

fn update_query(user_id: &str, writes: &[FieldWrite]) -> QueryBuilder<'static, Postgres> {
    let mut builder = QueryBuilder::<Postgres>::new("UPDATE user_stats SET ");
    {
        let mut assignments = builder.separated(", ");
        for write in writes {
            let column = write.field.column();
            match write.op {
                FieldOp::Increment(delta) => {
                    assignments.push(format!("{column} = COALESCE({column}, 0) + "));
                    assignments.push_bind_unseparated(delta);
                }
                FieldOp::Set(value) => {
                    assignments.push(format!("{column} = "));
                    assignments.push_bind_unseparated(value);
                }
            }
        }
    }
    builder.push(" WHERE user_id = ").push_bind(user_id.to_owned());
    builder
}

async fn create_postgres(
    pool: &PgPool,
    user_id: &str,
    record: &StatsRecord,
) -> anyhow::Result<CreateOutcome> {
    let inserted = create_query(user_id, record)
        .build()
        .execute(pool)
        .await
        .with_context(|| format!("failed to create stats for `{user_id}`"))?
        .rows_affected();

    Ok(if inserted == 0 {
        CreateOutcome::AlreadyExists
    } else {
        CreateOutcome::Created
    })
}

async fn update_postgres(pool: &PgPool, user_id: &str, writes: &[FieldWrite]) -> anyhow::Result<()> {
    let updated = update_query(user_id, writes)
        .build()
        .execute(pool)
        .await
        .with_context(|| format!("failed to update stats for `{user_id}`"))?
        .rows_affected();

    if updated == 0 {
        anyhow::bail!("stats record `{user_id}` does not exist");
    }

    Ok(())
}

/// Change feed for one user's stats record.
pub enum StatsWatch {
    Postgres(PgStatsWatch),
    Memory(MemoryWatch),
}

impl StatsWatch {
    /// Wait until the watched record changes.
    pub async fn changed(&mut self) -> anyhow::Result<()> {
        match self {
            StatsWatch::Postgres(watch) => watch.changed().await,
            StatsWatch::Memory(watch) => watch.changed().await,
        }
    }
}

pub struct PgStatsWatch {
    key: String,
    listener: PgListener,
}

impl PgStatsWatch {
    /// Notifications sent while the listener connection was down are lost,
    /// so a dropped connection also counts as a change. The listener has
    /// already reconnected by then and the caller's re-read sees those writes.
    async fn changed(&mut self) -> anyhow::Result<()> {
        loop {
            let notification = self
                .listener
                .try_recv()
                .await
                .with_context(|| format!("stats listener failed for `{}`", self.key))?;

            if notification.is_none() {
                warn!(
                    user_id = %self.key,
                    "stats listener reconnected; notifications may have been missed"
                );
            }
            if wakes_watch(notification.as_ref().map(|n| n.payload()), &self.key) {
                return Ok(());
            }
        }
    }
}

/// `None` stands for a lost listener connection.
fn wakes_watch(payload: Option<&str>, key: &str) -> bool {
    payload.is_none_or(|payload| payload == key)
}
