//! Versioned schema upgrades.
//!
//! A single `schema_version` row in `schema_meta` records how far the
//! database has been upgraded; [`run_migrations`] replays every step above
//! it, in order, until the stored version matches what this binary ships.
//! Steps only ever move forward — version 1 is the plain archive, version 2
//! bolts on the salience decay columns, their partial indexes, and the
//! run-metric table.

use sqlx::PgPool;

use crate::error::{Result, StoreError};

/// Schema version this binary was built against.
pub const CURRENT_SCHEMA_VERSION: u32 = 2;

/// Read the stored schema version (0 when the row is unparseable).
pub async fn get_schema_version(pool: &PgPool) -> Result<u32> {
    let value: String =
        sqlx::query_scalar("SELECT value FROM schema_meta WHERE key = 'schema_version'")
            .fetch_one(pool)
            .await?;
    Ok(value.parse::<u32>().unwrap_or(0))
}

async fn set_schema_version(pool: &PgPool, version: u32) -> Result<()> {
    sqlx::query("UPDATE schema_meta SET value = $1 WHERE key = 'schema_version'")
        .bind(version.to_string())
        .execute(pool)
        .await?;
    Ok(())
}

/// Bring the database up to [`CURRENT_SCHEMA_VERSION`], one step at a time.
/// Each step is stamped into `schema_meta` as soon as it lands, so a crash
/// mid-upgrade resumes where it left off.
pub async fn run_migrations(pool: &PgPool) -> Result<()> {
    let stored = get_schema_version(pool).await?;
    if stored >= CURRENT_SCHEMA_VERSION {
        tracing::debug!(version = stored, "schema already current");
        return Ok(());
    }

    for step in (stored + 1)..=CURRENT_SCHEMA_VERSION {
        apply_step(pool, step).await?;
        set_schema_version(pool, step).await?;
        tracing::info!(version = step, "schema upgraded");
    }

    Ok(())
}

async fn apply_step(pool: &PgPool, target: u32) -> Result<()> {
    match target {
        2 => migrate_v1_to_v2(pool).await,
        other => Err(StoreError::Schema(format!(
            "no migration registered for schema version {other}"
        ))),
    }
}

/// Migration v1 → v2: salience decay engine.
///
/// Adds the decay columns to `chats` and `facts`, the partial indexes the
/// cycle scan depends on, and the `salience_decay_metrics` run log.
async fn migrate_v1_to_v2(pool: &PgPool) -> Result<()> {
    const V2_SQL: &str = r#"
ALTER TABLE chats ADD COLUMN IF NOT EXISTS memory_type TEXT
    CHECK (memory_type IN ('episodic','semantic','procedural','emotional','default'));
ALTER TABLE chats ADD COLUMN IF NOT EXISTS salience DOUBLE PRECISION NOT NULL DEFAULT 0.4
    CHECK (salience >= 0.0 AND salience <= 1.0);
ALTER TABLE chats ADD COLUMN IF NOT EXISTS recall_count INTEGER NOT NULL DEFAULT 0;
ALTER TABLE chats ADD COLUMN IF NOT EXISTS last_accessed_at BIGINT NOT NULL DEFAULT 0;
ALTER TABLE chats ADD COLUMN IF NOT EXISTS decay_metadata JSONB NOT NULL DEFAULT '{}'::jsonb;

ALTER TABLE facts ADD COLUMN IF NOT EXISTS salience DOUBLE PRECISION NOT NULL DEFAULT 0.5
    CHECK (salience >= 0.0 AND salience <= 1.0);
ALTER TABLE facts ADD COLUMN IF NOT EXISTS recall_count INTEGER NOT NULL DEFAULT 0;
ALTER TABLE facts ADD COLUMN IF NOT EXISTS last_accessed_at BIGINT NOT NULL DEFAULT 0;
ALTER TABLE facts ADD COLUMN IF NOT EXISTS decay_metadata JSONB NOT NULL DEFAULT '{}'::jsonb;

-- Rows already below the activity threshold are invisible to the cycle scan,
-- so the indexes only need to cover salience > 0.1.
CREATE INDEX IF NOT EXISTS idx_chats_last_accessed
    ON chats (last_accessed_at) WHERE salience > 0.1;
CREATE INDEX IF NOT EXISTS idx_facts_last_accessed
    ON facts (last_accessed_at) WHERE salience > 0.1;

CREATE TABLE IF NOT EXISTS salience_decay_metrics (
    id BIGINT GENERATED ALWAYS AS IDENTITY PRIMARY KEY,
    run_timestamp BIGINT NOT NULL,
    items_processed BIGINT NOT NULL DEFAULT 0,
    items_decayed BIGINT NOT NULL DEFAULT 0,
    error_count BIGINT NOT NULL DEFAULT 0,
    average_decay_amount DOUBLE PRECISION NOT NULL DEFAULT 0,
    memory_entropy DOUBLE PRECISION NOT NULL DEFAULT 0,
    environmental_context TEXT NOT NULL DEFAULT 'low_activity',
    processing_duration_ms BIGINT NOT NULL DEFAULT 0
);

CREATE INDEX IF NOT EXISTS idx_decay_metrics_run
    ON salience_decay_metrics (run_timestamp DESC);

-- Backfill: initialise last_accessed_at from created_at where unset
UPDATE chats SET last_accessed_at = created_at WHERE last_accessed_at = 0;
UPDATE facts SET last_accessed_at = created_at WHERE last_accessed_at = 0;
"#;

    sqlx::raw_sql(V2_SQL)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Schema(format!("migration v1 -> v2 failed: {e}")))?;
    Ok(())
}
