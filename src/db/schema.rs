//! DDL for the archive tables.
//!
//! Covers `chats`, `facts`, `links`, and `schema_meta`; the decay columns
//! and metric table arrive through the v2 migration. Every statement is
//! written so it can be replayed against an already-initialised database,
//! and the pgvector column dimension is substituted from the deployment
//! configuration before execution.

use sqlx::PgPool;

use crate::error::{Result, StoreError};

/// Required Postgres extensions: `vector` for embeddings, `pgcrypto` for
/// `gen_random_uuid()` on fact ids.
const EXTENSIONS_SQL: &str = r#"
CREATE EXTENSION IF NOT EXISTS vector;
CREATE EXTENSION IF NOT EXISTS pgcrypto;
"#;

/// Base archive tables. `{dim}` is replaced with the configured embedding
/// dimension before execution.
const BASE_TABLES_SQL: &str = r#"
-- Archived conversations and notes
CREATE TABLE IF NOT EXISTS chats (
    id TEXT PRIMARY KEY,
    kind TEXT NOT NULL DEFAULT 'chat' CHECK (kind IN ('chat','note')),
    title TEXT NOT NULL DEFAULT '',
    summary TEXT NOT NULL DEFAULT '',
    content TEXT NOT NULL DEFAULT '',
    tags JSONB NOT NULL DEFAULT '[]'::jsonb,
    source TEXT NOT NULL DEFAULT 'Other',
    file_name TEXT,
    assets JSONB NOT NULL DEFAULT '[]'::jsonb,
    created_at BIGINT NOT NULL,
    updated_at BIGINT NOT NULL,
    embedding vector({dim})
);

CREATE INDEX IF NOT EXISTS idx_chats_created_at ON chats (created_at DESC);
CREATE INDEX IF NOT EXISTS idx_chats_source ON chats (source);
CREATE INDEX IF NOT EXISTS idx_chats_kind ON chats (kind);

-- Temporal fact triples extracted from chats
CREATE TABLE IF NOT EXISTS facts (
    id UUID PRIMARY KEY DEFAULT gen_random_uuid(),
    chat_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    subject TEXT NOT NULL,
    predicate TEXT NOT NULL,
    object TEXT NOT NULL,
    confidence DOUBLE PRECISION NOT NULL DEFAULT 1.0
        CHECK (confidence >= 0.0 AND confidence <= 1.0),
    valid_from BIGINT NOT NULL,
    valid_to BIGINT,
    created_at BIGINT NOT NULL
);

CREATE INDEX IF NOT EXISTS idx_facts_subject ON facts (subject);
CREATE INDEX IF NOT EXISTS idx_facts_predicate ON facts (predicate);
CREATE INDEX IF NOT EXISTS idx_facts_chat ON facts (chat_id);

-- Manual edges between items; one row per unordered pair
CREATE TABLE IF NOT EXISTS links (
    from_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    to_id TEXT NOT NULL REFERENCES chats(id) ON DELETE CASCADE,
    link_type TEXT,
    created_at BIGINT NOT NULL,
    PRIMARY KEY (from_id, to_id)
);

-- Schema metadata
CREATE TABLE IF NOT EXISTS schema_meta (
    key TEXT PRIMARY KEY,
    value TEXT NOT NULL
);
"#;

/// Approximate cosine index over embeddings. Created separately because HNSW
/// build options may need tuning per deployment.
const VECTOR_INDEX_SQL: &str = r#"
CREATE INDEX IF NOT EXISTS idx_chats_embedding
    ON chats USING hnsw (embedding vector_cosine_ops);
"#;

/// Create extensions and base tables, safe to call on every startup.
pub async fn init_schema(pool: &PgPool, embedding_dim: usize) -> Result<()> {
    sqlx::raw_sql(EXTENSIONS_SQL)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Schema(format!("failed to create extensions: {e}")))?;

    let ddl = BASE_TABLES_SQL.replace("{dim}", &embedding_dim.to_string());
    sqlx::raw_sql(sqlx::AssertSqlSafe(ddl))
        .execute(pool)
        .await
        .map_err(|e| StoreError::Schema(format!("failed to create tables: {e}")))?;

    sqlx::raw_sql(VECTOR_INDEX_SQL)
        .execute(pool)
        .await
        .map_err(|e| StoreError::Schema(format!("failed to create vector index: {e}")))?;

    // Seed the version row so migrations have a baseline to advance from;
    // an existing row wins.
    sqlx::query("INSERT INTO schema_meta (key, value) VALUES ('schema_version', '1') ON CONFLICT (key) DO NOTHING")
        .execute(pool)
        .await?;

    Ok(())
}
