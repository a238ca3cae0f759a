use anyhow::Context as _;
use serde::{Deserialize, Serialize};
use sidequest_utils::{Category, CategoryStats, UserStats, level_for_xp};

/// Per-category part of a stored stats document. Any field may be missing.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CategoryRecord {
    #[serde(default)]
    pub xp: Option<i64>,
    #[serde(default)]
    pub level: Option<i64>,
    #[serde(default)]
    pub quests_completed: Option<i64>,
}

/// Stats document exactly as persisted. Readers never use this directly; they
/// go through [`canonical_stats`].
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct StatsRecord {
    #[serde(default, rename = "globalXP")]
    pub global_xp: Option<i64>,
    #[serde(default)]
    pub global_level: Option<i64>,
    #[serde(default)]
    pub social: Option<CategoryRecord>,
    #[serde(default)]
    pub fitness: Option<CategoryRecord>,
    #[serde(default)]
    pub fun: Option<CategoryRecord>,
}

/// Result of a create-if-absent write.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CreateOutcome {
    Created,
    AlreadyExists,
}

/// Addressable numeric field of a stats document.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum StatsField {
    GlobalXp,
    GlobalLevel,
    Xp(Category),
    Level(Category),
    QuestsCompleted(Category),
}

impl StatsField {
    /// Dotted document path, e.g. `fitness.questsCompleted`.
    pub fn path(self) -> String {
        match self {
            StatsField::GlobalXp => "globalXP".to_owned(),
            StatsField::GlobalLevel => "globalLevel".to_owned(),
            StatsField::Xp(category) => format!("{category}.xp"),
            StatsField::Level(category) => format!("{category}.level"),
            StatsField::QuestsCompleted(category) => format!("{category}.questsCompleted"),
        }
    }

    /// Column backing this field in the `user_stats` table.
    pub fn column(self) -> &'static str {
        use Category::{Fitness, Fun, Social};

        match self {
            StatsField::GlobalXp => "global_xp",
            StatsField::GlobalLevel => "global_level",
            StatsField::Xp(Social) => "social_xp",
            StatsField::Xp(Fitness) => "fitness_xp",
            StatsField::Xp(Fun) => "fun_xp",
            StatsField::Level(Social) => "social_level",
            StatsField::Level(Fitness) => "fitness_level",
            StatsField::Level(Fun) => "fun_level",
            StatsField::QuestsCompleted(Social) => "social_quests_completed",
            StatsField::QuestsCompleted(Fitness) => "fitness_quests_completed",
            StatsField::QuestsCompleted(Fun) => "fun_quests_completed",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldOp {
    /// Server-applied delta; commutes with concurrent increments.
    Increment(i64),
    /// Last-write-wins assignment.
    Set(i64),
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct FieldWrite {
    pub field: StatsField,
    pub op: FieldOp,
}

impl FieldWrite {
    pub fn increment(field: StatsField, delta: i64) -> Self {
        Self {
            field,
            op: FieldOp::Increment(delta),
        }
    }

    pub fn set(field: StatsField, value: i64) -> Self {
        Self {
            field,
            op: FieldOp::Set(value),
        }
    }
}

impl StatsRecord {
    /// Fully populated record for freshly synthesized stats.
    pub fn from_stats(stats: &UserStats) -> anyhow::Result<Self> {
        let category = |category: Category| -> anyhow::Result<Option<CategoryRecord>> {
            let stats = stats.category(category);
            Ok(Some(CategoryRecord {
                xp: Some(to_i64(stats.xp, "xp")?),
                level: Some(to_i64(stats.level, "level")?),
                quests_completed: Some(to_i64(stats.quests_completed, "questsCompleted")?),
            }))
        };

        Ok(Self {
            global_xp: Some(to_i64(stats.global_xp, "globalXP")?),
            global_level: Some(to_i64(stats.global_level, "globalLevel")?),
            social: category(Category::Social)?,
            fitness: category(Category::Fitness)?,
            fun: category(Category::Fun)?,
        })
    }

    pub fn get(&self, field: StatsField) -> Option<i64> {
        match field {
            StatsField::GlobalXp => self.global_xp,
            StatsField::GlobalLevel => self.global_level,
            StatsField::Xp(category) => self.category(category).and_then(|c| c.xp),
            StatsField::Level(category) => self.category(category).and_then(|c| c.level),
            StatsField::QuestsCompleted(category) => {
                self.category(category).and_then(|c| c.quests_completed)
            }
        }
    }

    /// Apply one write in place. Increments on a missing field start from zero.
    pub fn apply(&mut self, write: &FieldWrite) {
        let slot = self.slot_mut(write.field);
        *slot = Some(match write.op {
            FieldOp::Increment(delta) => slot.unwrap_or(0).saturating_add(delta),
            FieldOp::Set(value) => value,
        });
    }

    fn category(&self, category: Category) -> Option<&CategoryRecord> {
        match category {
            Category::Social => self.social.as_ref(),
            Category::Fitness => self.fitness.as_ref(),
            Category::Fun => self.fun.as_ref(),
        }
    }

    fn category_mut(&mut self, category: Category) -> &mut CategoryRecord {
        let slot = match category {
            Category::Social => &mut self.social,
            Category::Fitness => &mut self.fitness,
            Category::Fun => &mut self.fun,
        };
        slot.get_or_insert_with(CategoryRecord::default)
    }

    fn slot_mut(&mut self, field: StatsField) -> &mut Option<i64> {
        match field {
            StatsField::GlobalXp => &mut self.global_xp,
            StatsField::GlobalLevel => &mut self.global_level,
            StatsField::Xp(c) => &mut self.category_mut(c).xp,
            StatsField::Level(c) => &mut self.category_mut(c).level,
            StatsField::QuestsCompleted(c) => &mut self.category_mut(c).quests_completed,
        }
    }
}

/// Canonicalize a stored record (or its absence) into fully defaulted stats.
///
/// Missing or negative counters read as zero and every level is re-derived
/// from its paired XP, so stale level fields never reach callers.
pub fn canonical_stats(record: Option<&StatsRecord>) -> UserStats {
    let Some(record) = record else {
        return UserStats::default();
    };

    let mut stats = UserStats::default();
    for category in Category::ALL {
        *stats.category_mut(category) = CategoryStats::from_xp(
            non_negative(record.get(StatsField::Xp(category))),
            non_negative(record.get(StatsField::QuestsCompleted(category))),
        );
    }
    stats.global_xp = non_negative(record.global_xp);
    stats.global_level = level_for_xp(stats.global_xp);
    stats
}

fn non_negative(value: Option<i64>) -> u64 {
    value.and_then(|v| u64::try_from(v).ok()).unwrap_or(0)
}

fn to_i64(value: u64, field: &str) -> anyhow::Result<i64> {
    i64::try_from(value).with_context(|| format!("{field} out of i64 range"))
}

#[cfg(test)]
mod tests {
    use super::{CategoryRecord, FieldWrite, StatsField, StatsRecord, canonical_stats};
    use sidequest_utils::{Category, UserStats};

    #[test]
    fn absent_record_is_default_stats() {
        assert_eq!(canonical_stats(None), UserStats::default());
        assert_eq!(
            canonical_stats(Some(&StatsRecord::default())),
            UserStats::default()
        );
    }

    #[test]
    fn malformed_fields_read_as_zero() {
        let record = StatsRecord {
            global_xp: Some(-40),
            global_level: None,
            social: Some(CategoryRecord {
                xp: None,
                level: Some(9),
                quests_completed: Some(-3),
            }),
            fitness: None,
            fun: None,
        };

        assert_eq!(canonical_stats(Some(&record)), UserStats::default());
    }

    #[test]
    fn stale_levels_are_rederived() {
        let record = StatsRecord {
            global_xp: Some(230),
            global_level: Some(1),
            fitness: Some(CategoryRecord {
                xp: Some(230),
                level: Some(2),
                quests_completed: Some(5),
            }),
            ..StatsRecord::default()
        };

        let stats = canonical_stats(Some(&record));
        assert_eq!(stats.global_level, 3);
        assert_eq!(stats.fitness.level, 3);
        assert_eq!(stats.fitness.quests_completed, 5);
    }

    #[test]
    fn increments_start_from_zero_on_missing_fields() {
        let mut record = StatsRecord::default();
        record.apply(&FieldWrite::increment(StatsField::Xp(Category::Fun), 20));
        record.apply(&FieldWrite::increment(StatsField::Xp(Category::Fun), 30));
        record.apply(&FieldWrite::set(StatsField::Level(Category::Fun), 1));

        assert_eq!(record.get(StatsField::Xp(Category::Fun)), Some(50));
        assert_eq!(record.get(StatsField::Level(Category::Fun)), Some(1));
        assert_eq!(record.get(StatsField::Xp(Category::Social)), None);
    }

    #[test]
    fn from_stats_round_trips_through_canonicalization() {
        let stats = UserStats::first_completion(Category::Social, 60);
        let record = StatsRecord::from_stats(&stats).expect("record");
        assert_eq!(canonical_stats(Some(&record)), stats);
    }

    #[test]
    fn field_paths_and_columns() {
        assert_eq!(StatsField::GlobalXp.path(), "globalXP");
        assert_eq!(
            StatsField::QuestsCompleted(Category::Fitness).path(),
            "fitness.questsCompleted"
        );
        assert_eq!(StatsField::Level(Category::Social).column(), "social_level");
        assert_eq!(
            StatsField::QuestsCompleted(Category::Fun).column(),
            "fun_quests_completed"
        );
    }

    #[test]
    fn partial_documents_deserialize() {
        let record: StatsRecord =
            serde_json::from_str(r#"{"globalXP": 20, "fun": {"xp": 20}}"#).expect("parse");
        let stats = canonical_stats(Some(&record));
        assert_eq!(stats.global_xp, 20);
        assert_eq!(stats.fun.xp, 20);
        assert_eq!(stats.fun.quests_completed, 0);
    }
}
