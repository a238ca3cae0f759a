use std::env;
use std::time::Duration;

use anyhow::Context as _;
use sidequest_database::cache::DEFAULT_STATS_CACHE_TTL;

pub const DEFAULT_REDIS_KEY_PREFIX: &str = "sidequest:prod";
pub const DEFAULT_MAX_CONNECTIONS: u64 = 5;

/// Runtime settings read from the environment (and `.env`, if present).
#[derive(Clone, Debug)]
pub struct AppConfig {
    pub database_url: String,
    pub database_max_connections: u32,
    pub redis_enabled: bool,
    pub redis_url: Option<String>,
    pub redis_key_prefix: String,
    pub stats_cache_ttl: Duration,
    pub auto_run_migrations: bool,
    pub default_user_id: Option<String>,
}

impl AppConfig {
    pub fn from_env() -> anyhow::Result<Self> {
        let database_url = env::var("DATABASE_URL").context("DATABASE_URL is not set")?;
        let database_max_connections =
            u32::try_from(env_u64("DATABASE_MAX_CONNECTIONS", DEFAULT_MAX_CONNECTIONS))
                .context("DATABASE_MAX_CONNECTIONS out of u32 range")?;

        Ok(Self {
            database_url,
            database_max_connections,
            redis_enabled: env_bool("REDIS_ENABLED", false),
            redis_url: env_non_empty("REDIS_URL"),
            redis_key_prefix: env_non_empty("REDIS_KEY_PREFIX")
                .unwrap_or_else(|| DEFAULT_REDIS_KEY_PREFIX.to_string()),
            stats_cache_ttl: Duration::from_secs(env_u64(
                "STATS_CACHE_TTL_SECONDS",
                DEFAULT_STATS_CACHE_TTL.as_secs(),
            )),
            auto_run_migrations: env_bool("AUTO_RUN_MIGRATIONS", true),
            default_user_id: env_non_empty("SIDEQUEST_USER_ID"),
        })
    }
}

fn env_bool(key: &str, default: bool) -> bool {
    parse_bool(env::var(key).ok().as_deref(), default)
}

fn env_u64(key: &str, default: u64) -> u64 {
    parse_u64(env::var(key).ok().as_deref(), default)
}

fn env_non_empty(key: &str) -> Option<String> {
    env::var(key)
        .ok()
        .map(|value| value.trim().to_owned())
        .filter(|value| !value.is_empty())
}

fn parse_bool(value: Option<&str>, default: bool) -> bool {
    match value {
        Some(value) => matches!(
            value.trim().to_ascii_lowercase().as_str(),
            "1" | "true" | "yes" | "on"
        ),
        None => default,
    }
}

fn parse_u64(value: Option<&str>, default: u64) -> u64 {
    match value {
        Some(value) => value.trim().parse::<u64>().unwrap_or(default),
        None => default,
    }
}
