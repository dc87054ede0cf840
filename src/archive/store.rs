//! Item write and read path.
//!
//! [`upsert_items`] is the single ingest entry point, used by both the import
//! flow and the note editor. Read-path rehearsal ([`boost_salience`],
//! [`track_view`]) runs as short atomic updates that never wait on the decay
//! scheduler.

use sqlx::PgPool;

use crate::archive::types::{dedup_tags, Item, MemoryType};
use crate::archive::{item_from_row, ITEM_COLUMNS};
use crate::db::now_ms;
use crate::error::{Result, StoreError};

/// Salience gained by an explicit rehearsal of an item.
const ITEM_RECALL_BOOST: f64 = 0.05;
/// Salience gained by each of the item's live facts on rehearsal.
const FACT_RECALL_BOOST: f64 = 0.03;

/// Transactional bulk insert/update keyed by `id`.
///
/// On update, `updated_at` is set to now and `created_at`, `recall_count`,
/// `last_accessed_at`, and `decay_metadata` keep their stored values; all
/// other columns are overwritten from the payload. Salience is clamped to
/// `[floor(memory_type), 1.0]` before the write. Embeddings must match the
/// deployment dimension.
pub async fn upsert_items(pool: &PgPool, items: &[Item], embedding_dim: usize) -> Result<()> {
    for item in items {
        if let Some(ref embedding) = item.embedding {
            if embedding.len() != embedding_dim {
                return Err(StoreError::validation(
                    "embedding",
                    format!(
                        "expected dimension {embedding_dim}, got {} for item {}",
                        embedding.len(),
                        item.id
                    ),
                ));
            }
        }
    }

    let now = now_ms();
    let mut tx = pool.begin().await?;

    for item in items {
        let memory_type = item.memory_type.map(|t| t.as_str());
        let floor = item.effective_memory_type().salience_floor();
        let salience = item.salience.clamp(floor, 1.0);
        let tags = serde_json::to_value(dedup_tags(item.tags.clone()))?;
        let assets = serde_json::to_value(&item.assets)?;
        let decay_metadata = serde_json::to_value(&item.decay_metadata)?;
        let embedding = item
            .embedding
            .as_ref()
            .map(|v| pgvector::Vector::from(v.clone()));
        let last_accessed_at = if item.last_accessed_at > 0 {
            item.last_accessed_at
        } else {
            item.created_at
        };

        sqlx::query(
            "INSERT INTO chats (id, kind, title, summary, content, tags, source, file_name, \
             assets, created_at, updated_at, embedding, memory_type, salience, recall_count, \
             last_accessed_at, decay_metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11, $12, $13, $14, $15, $16, $17) \
             ON CONFLICT (id) DO UPDATE SET \
                 kind = EXCLUDED.kind, \
                 title = EXCLUDED.title, \
                 summary = EXCLUDED.summary, \
                 content = EXCLUDED.content, \
                 tags = EXCLUDED.tags, \
                 source = EXCLUDED.source, \
                 file_name = EXCLUDED.file_name, \
                 assets = EXCLUDED.assets, \
                 updated_at = $18, \
                 embedding = EXCLUDED.embedding, \
                 memory_type = EXCLUDED.memory_type, \
                 salience = EXCLUDED.salience",
        )
        .bind(&item.id)
        .bind(item.kind.as_str())
        .bind(&item.title)
        .bind(&item.summary)
        .bind(&item.content)
        .bind(&tags)
        .bind(&item.source)
        .bind(&item.file_name)
        .bind(&assets)
        .bind(item.created_at)
        .bind(item.updated_at)
        .bind(&embedding)
        .bind(memory_type)
        .bind(salience)
        .bind(item.recall_count)
        .bind(last_accessed_at)
        .bind(&decay_metadata)
        .bind(now)
        .execute(&mut *tx)
        .await?;
    }

    tx.commit().await?;
    tracing::debug!(count = items.len(), "items upserted");
    Ok(())
}

/// All items, newest first.
pub async fn load_items(pool: &PgPool) -> Result<Vec<Item>> {
    let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
        "SELECT {ITEM_COLUMNS} FROM chats ORDER BY created_at DESC"
    )))
    .fetch_all(pool)
    .await?;

    rows.iter().map(item_from_row).collect()
}

/// The `count` most recent items (clamped to at least 1).
pub async fn list_recent(pool: &PgPool, count: i64) -> Result<Vec<Item>> {
    let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
        "SELECT {ITEM_COLUMNS} FROM chats ORDER BY created_at DESC LIMIT $1"
    )))
    .bind(count.max(1))
    .fetch_all(pool)
    .await?;

    rows.iter().map(item_from_row).collect()
}

/// Fetch a single item by id.
pub async fn get_item(pool: &PgPool, id: &str) -> Result<Item> {
    let row = sqlx::query(sqlx::AssertSqlSafe(format!(
        "SELECT {ITEM_COLUMNS} FROM chats WHERE id = $1"
    )))
        .bind(id)
        .fetch_optional(pool)
        .await?
        .ok_or_else(|| StoreError::NotFound(id.to_string()))?;

    item_from_row(&row)
}

/// Delete an item; links and facts cascade via foreign keys. No-op when the
/// id is absent.
pub async fn delete_item(pool: &PgPool, id: &str) -> Result<()> {
    let result = sqlx::query("DELETE FROM chats WHERE id = $1")
        .bind(id)
        .execute(pool)
        .await?;
    if result.rows_affected() > 0 {
        tracing::debug!(id, "item deleted");
    }
    Ok(())
}

/// Read-path rehearsal: bump the item's salience by 0.05 (capped at 1.0),
/// increment its recall count, refresh `last_accessed_at`, and give the
/// item's live facts a smaller 0.03 bump.
pub async fn boost_salience(pool: &PgPool, chat_id: &str) -> Result<()> {
    let now = now_ms();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE chats SET salience = LEAST(salience + $2, 1.0), \
         recall_count = recall_count + 1, last_accessed_at = $3 \
         WHERE id = $1",
    )
    .bind(chat_id)
    .bind(ITEM_RECALL_BOOST)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(chat_id.to_string()));
    }

    sqlx::query(
        "UPDATE facts SET salience = LEAST(salience + $2, 1.0), last_accessed_at = $3 \
         WHERE chat_id = $1 AND valid_to IS NULL",
    )
    .bind(chat_id)
    .bind(FACT_RECALL_BOOST)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Passive view tracking: same recall/timestamp refresh as
/// [`boost_salience`] but without the salience bumps.
pub async fn track_view(pool: &PgPool, chat_id: &str) -> Result<()> {
    let now = now_ms();
    let mut tx = pool.begin().await?;

    let result = sqlx::query(
        "UPDATE chats SET recall_count = recall_count + 1, last_accessed_at = $2 \
         WHERE id = $1",
    )
    .bind(chat_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(chat_id.to_string()));
    }

    sqlx::query(
        "UPDATE facts SET last_accessed_at = $2 WHERE chat_id = $1 AND valid_to IS NULL",
    )
    .bind(chat_id)
    .bind(now)
    .execute(&mut *tx)
    .await?;

    tx.commit().await?;
    Ok(())
}

/// Reclassify an item. Salience is re-clamped to the new type's floor so the
/// clamp invariant holds across the mutation.
pub async fn update_memory_type(
    pool: &PgPool,
    chat_id: &str,
    memory_type: MemoryType,
) -> Result<()> {
    let result = sqlx::query(
        "UPDATE chats SET memory_type = $2, \
         salience = LEAST(GREATEST(salience, $3), 1.0), updated_at = $4 \
         WHERE id = $1",
    )
    .bind(chat_id)
    .bind(memory_type.as_str())
    .bind(memory_type.salience_floor())
    .bind(now_ms())
    .execute(pool)
    .await?;

    if result.rows_affected() == 0 {
        return Err(StoreError::NotFound(chat_id.to_string()));
    }
    Ok(())
}

/// Distinct tag strings across all items, sorted ascending.
pub async fn list_tags(pool: &PgPool) -> Result<Vec<String>> {
    let tags: Vec<String> = sqlx::query_scalar(
        "SELECT DISTINCT t.tag FROM chats \
         CROSS JOIN LATERAL jsonb_array_elements_text(chats.tags) AS t(tag) \
         ORDER BY t.tag ASC",
    )
    .fetch_all(pool)
    .await?;
    Ok(tags)
}
