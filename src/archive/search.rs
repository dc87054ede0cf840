//! Keyword and vector search over archived items.
//!
//! Keyword search is a case-insensitive substring match across title,
//! summary, and tags. Vector search delegates k-nearest-neighbour selection
//! to the pgvector cosine index, tie-broken by ascending id so result order
//! is deterministic.

use sqlx::PgPool;

use crate::archive::types::{Item, MemoryType};
use crate::archive::{item_from_row, ITEM_COLUMNS};
use crate::error::{Result, StoreError};

/// Maximum results returned by keyword search.
const KEYWORD_SEARCH_LIMIT: i64 = 10;

/// Filters recognised by both search paths.
#[derive(Debug, Clone, Default)]
pub struct SearchFilters {
    pub memory_type: Option<MemoryType>,
    pub min_salience: Option<f64>,
    pub exclude_id: Option<String>,
}

/// A vector search hit with its cosine distance to the query.
#[derive(Debug, Clone)]
pub struct KnnHit {
    pub item: Item,
    /// Cosine distance in `[0, 2]`; similarity is `1 − distance`.
    pub distance: f64,
}

/// Case-insensitive substring search across title, summary, and tags.
/// Returns up to 10 items, newest first.
pub async fn keyword_search(
    pool: &PgPool,
    pattern: &str,
    filters: &SearchFilters,
) -> Result<Vec<Item>> {
    let like = format!("%{}%", escape_like(pattern));

    let mut conditions = vec![
        "(title ILIKE $1 OR summary ILIKE $1 OR EXISTS ( \
          SELECT 1 FROM jsonb_array_elements_text(chats.tags) AS t(tag) WHERE t.tag ILIKE $1))"
            .to_string(),
    ];
    let mut param_idx = 2;
    if filters.memory_type.is_some() {
        conditions.push(format!("memory_type = ${param_idx}"));
        param_idx += 1;
    }
    if filters.min_salience.is_some() {
        conditions.push(format!("salience >= ${param_idx}"));
        param_idx += 1;
    }
    if filters.exclude_id.is_some() {
        conditions.push(format!("id <> ${param_idx}"));
        param_idx += 1;
    }

    let sql = format!(
        "SELECT {ITEM_COLUMNS} FROM chats WHERE {} \
         ORDER BY created_at DESC LIMIT ${param_idx}",
        conditions.join(" AND ")
    );

    let mut query = sqlx::query(sqlx::AssertSqlSafe(sql)).bind(like);
    if let Some(memory_type) = filters.memory_type {
        query = query.bind(memory_type.as_str());
    }
    if let Some(min_salience) = filters.min_salience {
        query = query.bind(min_salience);
    }
    if let Some(ref exclude_id) = filters.exclude_id {
        query = query.bind(exclude_id.clone());
    }
    query = query.bind(KEYWORD_SEARCH_LIMIT);

    let rows = query.fetch_all(pool).await?;
    rows.iter().map(item_from_row).collect()
}

/// Up to `k` embedded items nearest to `query_vec`, ordered by ascending
/// cosine distance (ties broken by id). The query dimension must match the
/// deployment dimension.
pub async fn vector_knn(
    pool: &PgPool,
    query_vec: &[f32],
    k: i64,
    filters: &SearchFilters,
    embedding_dim: usize,
) -> Result<Vec<KnnHit>> {
    if query_vec.len() != embedding_dim {
        return Err(StoreError::validation(
            "query_vec",
            format!(
                "expected dimension {embedding_dim}, got {}",
                query_vec.len()
            ),
        ));
    }

    let mut conditions = vec!["embedding IS NOT NULL".to_string()];
    let mut param_idx = 2;
    if filters.memory_type.is_some() {
        conditions.push(format!("memory_type = ${param_idx}"));
        param_idx += 1;
    }
    if filters.min_salience.is_some() {
        conditions.push(format!("salience >= ${param_idx}"));
        param_idx += 1;
    }
    if filters.exclude_id.is_some() {
        conditions.push(format!("id <> ${param_idx}"));
        param_idx += 1;
    }

    let sql = format!(
        "SELECT {ITEM_COLUMNS}, (embedding <=> $1) AS distance FROM chats WHERE {} \
         ORDER BY embedding <=> $1, id ASC LIMIT ${param_idx}",
        conditions.join(" AND ")
    );

    let query_vector = pgvector::Vector::from(query_vec.to_vec());
    let mut query = sqlx::query(sqlx::AssertSqlSafe(sql)).bind(query_vector);
    if let Some(memory_type) = filters.memory_type {
        query = query.bind(memory_type.as_str());
    }
    if let Some(min_salience) = filters.min_salience {
        query = query.bind(min_salience);
    }
    if let Some(ref exclude_id) = filters.exclude_id {
        query = query.bind(exclude_id.clone());
    }
    query = query.bind(k.max(0));

    let rows = query.fetch_all(pool).await?;
    rows.iter()
        .map(|row| {
            use sqlx::Row;
            let distance: f64 = row.try_get("distance")?;
            Ok(KnnHit {
                item: item_from_row(row)?,
                distance,
            })
        })
        .collect()
}

/// Escape LIKE wildcards so the user's pattern matches literally.
fn escape_like(pattern: &str) -> String {
    pattern
        .replace('\\', "\\\\")
        .replace('%', "\\%")
        .replace('_', "\\_")
}
