mod commands;
mod config;

use clap::{Parser, Subcommand};
use tracing::{info, warn};
use tracing_subscriber::Layer;
use tracing_subscriber::filter::filter_fn;
use tracing_subscriber::layer::SubscriberExt;
use tracing_subscriber::util::SubscriberInitExt;

use rustls::crypto::ring::default_provider;
use sqlx::postgres::PgPoolOptions;

use config::AppConfig;
use sidequest_core::{AuthSession, Data};
use sidequest_database::{CacheService, Database, MIGRATOR};

#[derive(Parser)]
#[command(name = "sidequest")]
#[command(about = "Sidequest progression engine operator tool", long_about = None)]
struct Cli {
    /// Act as this user (defaults to SIDEQUEST_USER_ID)
    #[arg(long, global = true)]
    user: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Credit a completed quest to the acting user
    Complete {
        /// social, fitness or fun (anything else counts as fun)
        #[arg(long)]
        category: String,

        /// 1 (easy) to 5 (hard); omitted means 2
        #[arg(long)]
        difficulty: Option<f64>,
    },

    /// Show the acting user's stats
    Stats,

    /// Show the acting user's title
    Title,

    /// Stream the acting user's stats until interrupted
    Watch,

    /// Print the XP reward for each difficulty
    Rewards,

    /// Apply database migrations and exit
    Migrate,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let fmt_layer = tracing_subscriber::fmt::layer().with_filter(filter_fn(|metadata| {
        let within_info_level = *metadata.level() <= tracing::Level::INFO;
        within_info_level && !metadata.target().starts_with("sqlx::query")
    }));

    tracing_subscriber::registry().with(fmt_layer).init();

    default_provider()
        .install_default()
        .map_err(|_| anyhow::anyhow!("failed to install rustls ring provider"))?;

    // Load the .env file
    dotenvy::dotenv().ok();

    let cli = Cli::parse();

    if let Commands::Rewards = cli.command {
        commands::rewards();
        return Ok(());
    }

    let config = AppConfig::from_env()?;
    let data = connect(&config).await?;

    if let Commands::Migrate = cli.command {
        MIGRATOR.run(require_pool(&data)?).await?;
        info!("Database migrations applied.");
        return Ok(());
    }

    if config.auto_run_migrations {
        MIGRATOR.run(require_pool(&data)?).await?;
        info!("Database migrations applied.");
    } else {
        info!("Auto migrations disabled (set AUTO_RUN_MIGRATIONS=true to run at startup).");
    }

    let acting_user = cli.user.as_deref().or(config.default_user_id.as_deref());
    let session = AuthSession::from_user_id(acting_user);

    match cli.command {
        Commands::Complete {
            category,
            difficulty,
        } => commands::complete(&data, &session, &category, difficulty).await,
        Commands::Stats => commands::stats(&data, &session).await,
        Commands::Title => commands::title(&data, &session).await,
        Commands::Watch => commands::watch(&data, &session).await,
        Commands::Rewards | Commands::Migrate => Ok(()),
    }
}

async fn connect(config: &AppConfig) -> anyhow::Result<Data> {
    let db_pool = PgPoolOptions::new()
        .max_connections(config.database_max_connections)
        .connect(&config.database_url)
        .await?;
    info!("PostgreSQL connection established.");

    let mut cache = build_cache(config);
    cache.configure_stats_ttl(config.stats_cache_ttl);

    if cache.is_redis_enabled() {
        if let Err(err) = cache.ping().await {
            warn!(
                ?err,
                "Redis cache ping failed; cache operations will continue with fallback behavior."
            );
        } else {
            info!("Redis cache health check passed.");
        }
    }

    Ok(Data {
        db: Database::with_cache(db_pool, cache),
    })
}

fn build_cache(config: &AppConfig) -> CacheService {
    let prefix = config.redis_key_prefix.clone();

    if !config.redis_enabled {
        info!("Redis cache disabled (set REDIS_ENABLED=true to enable).");
        return CacheService::disabled(prefix);
    }

    match config.redis_url.as_deref() {
        Some(redis_url) => match CacheService::redis(redis_url, prefix.clone()) {
            Ok(cache) => {
                info!(key_prefix = %prefix, stats_ttl_seconds = config.stats_cache_ttl.as_secs(), "Redis cache enabled.");
                cache
            }
            Err(err) => {
                warn!(?err, key_prefix = %prefix, "Failed to initialize Redis cache; continuing with store-only mode.");
                CacheService::disabled(prefix)
            }
        },
        None => {
            warn!(key_prefix = %prefix, "REDIS_ENABLED=true but REDIS_URL is missing; continuing with store-only mode.");
            CacheService::disabled(prefix)
        }
    }
}

fn require_pool(data: &Data) -> anyhow::Result<&sqlx::PgPool> {
    data.db
        .pool()
        .ok_or_else(|| anyhow::anyhow!("migrations need a Postgres-backed database"))
}
