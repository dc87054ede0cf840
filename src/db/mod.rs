pub mod migrations;
pub mod schema;

use sqlx::postgres::{PgPool, PgPoolOptions};
use std::time::Duration;
use tracing::{info, warn};

use crate::config::StorageConfig;
use crate::error::{Result, StoreError};

/// Maximum connection attempts before giving up at startup.
const MAX_CONNECT_ATTEMPTS: u32 = 10;
const INITIAL_BACKOFF: Duration = Duration::from_secs(1);
const MAX_BACKOFF: Duration = Duration::from_secs(30);

/// Connect a pool to the archive database, retrying connection-class
/// failures with exponential backoff (1 s → 30 s, ×2, up to 10 attempts).
///
/// Schema and SQL errors are not retried; they surface immediately as fatal
/// startup failures.
pub async fn connect_pool(config: &StorageConfig) -> Result<PgPool> {
    let build_options = || {
        PgPoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(1)
            .idle_timeout(Duration::from_secs(300))
            .max_lifetime(Duration::from_secs(1800))
    };

    let mut backoff = INITIAL_BACKOFF;
    let mut attempt = 1;
    loop {
        match build_options().connect(&config.database_url).await {
            Ok(pool) => {
                info!(attempt, "database pool connected");
                return Ok(pool);
            }
            Err(e) => {
                let err = StoreError::from(e);
                if !err.is_retryable() || attempt >= MAX_CONNECT_ATTEMPTS {
                    return Err(err);
                }
                warn!(
                    attempt,
                    backoff_secs = backoff.as_secs(),
                    error = %err,
                    "database connection failed, retrying"
                );
                tokio::time::sleep(backoff).await;
                backoff = (backoff * 2).min(MAX_BACKOFF);
                attempt += 1;
            }
        }
    }
}

/// Open a pool and bring the schema fully up to date. The standard startup
/// path for every subcommand.
pub async fn open_database(config: &StorageConfig) -> Result<PgPool> {
    let pool = connect_pool(config).await?;
    schema::init_schema(&pool, config.embedding_dim).await?;
    migrations::run_migrations(&pool).await?;
    info!("archive schema current, pool ready");
    Ok(pool)
}

/// What [`check_database_health`] found: extension state, schema version,
/// and per-table row counts.
pub struct HealthReport {
    pub schema_version: u32,
    pub vector_extension: Option<String>,
    pub chat_count: i64,
    pub fact_count: i64,
    pub live_fact_count: i64,
    pub link_count: i64,
    pub metric_count: i64,
}

/// Collect the diagnostics the `doctor` subcommand prints.
pub async fn check_database_health(pool: &PgPool) -> Result<HealthReport> {
    let schema_version = migrations::get_schema_version(pool).await?;

    let vector_extension: Option<String> = sqlx::query_scalar(
        "SELECT extversion FROM pg_extension WHERE extname = 'vector'",
    )
    .fetch_optional(pool)
    .await?;

    let chat_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM chats")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    let fact_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    let live_fact_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM facts WHERE valid_to IS NULL")
            .fetch_one(pool)
            .await
            .unwrap_or(0);

    let link_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM links")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    let metric_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM salience_decay_metrics")
        .fetch_one(pool)
        .await
        .unwrap_or(0);

    Ok(HealthReport {
        schema_version,
        vector_extension,
        chat_count,
        fact_count,
        live_fact_count,
        link_count,
        metric_count,
    })
}

/// Current wall-clock time in Unix milliseconds.
pub fn now_ms() -> i64 {
    chrono::Utc::now().timestamp_millis()
}
