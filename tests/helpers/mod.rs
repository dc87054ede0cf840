#![allow(dead_code)]

//! Shared fixtures for the live-database integration suites.
//!
//! These tests run against a real Postgres with the `vector` extension.
//! Point `DATABASE_URL` at a scratch database and run with
//! `cargo test -- --ignored`.

use chronicle::archive::types::{DecayMetadata, Item, ItemKind, MemoryType};
use chronicle::config::StorageConfig;
use chronicle::db;
use sqlx::PgPool;

/// Embedding dimension the test schema is created with.
pub const TEST_EMBEDDING_DIM: usize = 768;

/// Open a pool against the configured database with schema and migrations
/// applied. Honors `DATABASE_URL`; falls back to the default local archive.
pub async fn test_pool() -> PgPool {
    let mut storage = StorageConfig::default();
    if let Ok(url) = std::env::var("DATABASE_URL") {
        storage.database_url = url;
    }
    storage.embedding_dim = TEST_EMBEDDING_DIM;
    db::open_database(&storage)
        .await
        .expect("failed to open test database — is Postgres with pgvector running?")
}

/// A unique item id so suites can share one database without colliding.
pub fn unique_id(prefix: &str) -> String {
    format!("{prefix}-{}", uuid::Uuid::new_v4())
}

/// A deterministic embedding with a spike at `dim`.
pub fn test_embedding(dim: usize) -> Vec<f32> {
    let mut v = vec![0.0f32; TEST_EMBEDDING_DIM];
    v[dim % TEST_EMBEDDING_DIM] = 1.0;
    v
}

/// A spike dimension unlikely to collide with rows left by other suites.
pub fn random_dimension() -> usize {
    (uuid::Uuid::new_v4().as_u128() % TEST_EMBEDDING_DIM as u128) as usize
}

/// Build a minimal item with sensible defaults.
pub fn make_item(id: &str) -> Item {
    let now = db::now_ms();
    Item {
        id: id.to_string(),
        kind: ItemKind::Chat,
        title: format!("Test chat {id}"),
        summary: "integration fixture".into(),
        content: "transcript body".into(),
        tags: vec![],
        source: "Manual".into(),
        file_name: None,
        assets: vec![],
        created_at: now,
        updated_at: now,
        embedding: None,
        memory_type: None,
        salience: 0.4,
        recall_count: 0,
        last_accessed_at: now,
        decay_metadata: DecayMetadata::default(),
    }
}

/// Build an item with a memory type, salience, and embedding spike.
pub fn make_typed_item(
    id: &str,
    memory_type: MemoryType,
    salience: f64,
    embedding_dim: Option<usize>,
) -> Item {
    let mut item = make_item(id);
    item.memory_type = Some(memory_type);
    item.salience = salience;
    item.embedding = embedding_dim.map(test_embedding);
    item
}

/// Backdate an item's `last_accessed_at` by `hours` (direct SQL, bypassing
/// the store so the rehearsal path stays untouched).
pub async fn backdate_access(pool: &PgPool, id: &str, hours: f64) {
    let then = db::now_ms() - (hours * 3_600_000.0) as i64;
    sqlx::query("UPDATE chats SET last_accessed_at = $2 WHERE id = $1")
        .bind(id)
        .bind(then)
        .execute(pool)
        .await
        .expect("failed to backdate access");
}

/// Remove an item and everything cascading from it.
pub async fn cleanup_item(pool: &PgPool, id: &str) {
    sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await
        .ok();
}
