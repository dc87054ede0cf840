//! Manual link edges between archived items.
//!
//! A link is logically an unordered pair: insertion stores one direction,
//! removal matches both. Repeating an insert for the same ordered pair is
//! idempotent.

use sqlx::PgPool;

use crate::archive::types::Link;
use crate::db::now_ms;
use crate::error::{Result, StoreError};

/// Create a link edge between two items. Both endpoints must exist.
pub async fn add_link(
    pool: &PgPool,
    from_id: &str,
    to_id: &str,
    link_type: Option<&str>,
) -> Result<()> {
    validate_endpoint(pool, from_id).await?;
    validate_endpoint(pool, to_id).await?;

    sqlx::query(
        "INSERT INTO links (from_id, to_id, link_type, created_at) \
         VALUES ($1, $2, $3, $4) \
         ON CONFLICT (from_id, to_id) DO NOTHING",
    )
    .bind(from_id)
    .bind(to_id)
    .bind(link_type)
    .bind(now_ms())
    .execute(pool)
    .await?;
    Ok(())
}

/// Remove a link edge; `(a, b)` and `(b, a)` match the same stored row.
/// No-op when no edge exists.
pub async fn remove_link(pool: &PgPool, a: &str, b: &str) -> Result<()> {
    sqlx::query(
        "DELETE FROM links \
         WHERE (from_id = $1 AND to_id = $2) OR (from_id = $2 AND to_id = $1)",
    )
    .bind(a)
    .bind(b)
    .execute(pool)
    .await?;
    Ok(())
}

/// All link edges, oldest first.
pub async fn load_links(pool: &PgPool) -> Result<Vec<Link>> {
    let links = sqlx::query_as::<_, (String, String, Option<String>, i64)>(
        "SELECT from_id, to_id, link_type, created_at FROM links ORDER BY created_at ASC",
    )
    .fetch_all(pool)
    .await?
    .into_iter()
    .map(|(from_id, to_id, link_type, created_at)| Link {
        from_id,
        to_id,
        link_type,
        created_at,
    })
    .collect();
    Ok(links)
}

/// Validate that a link endpoint exists.
async fn validate_endpoint(pool: &PgPool, id: &str) -> Result<()> {
    let exists: bool = sqlx::query_scalar("SELECT EXISTS(SELECT 1 FROM chats WHERE id = $1)")
        .bind(id)
        .fetch_one(pool)
        .await?;
    if !exists {
        return Err(StoreError::NotFound(id.to_string()));
    }
    Ok(())
}
