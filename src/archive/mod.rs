//! The archive store — durable persistence for items, facts, and links.
//!
//! Split by concern: [`store`] owns the item write/read path, [`facts`] the
//! temporal triples, [`links`] the manual edges, [`search`] the keyword and
//! vector queries, with the shared data model in [`types`]. Every public
//! operation takes the shared [`sqlx::PgPool`] and returns an explicit
//! result; writes run inside a single transaction per call.

pub mod facts;
pub mod links;
pub mod search;
pub mod store;
pub mod types;

use sqlx::postgres::PgRow;
use sqlx::Row;
use uuid::Uuid;

use crate::error::{Result, StoreError};
use types::{DecayMetadata, Fact, Item, ItemKind, MemoryType};

/// Column list shared by every item query.
pub(crate) const ITEM_COLUMNS: &str = "id, kind, title, summary, content, tags, source, \
     file_name, assets, created_at, updated_at, embedding, memory_type, \
     salience, recall_count, last_accessed_at, decay_metadata";

/// Map a `chats` row to an [`Item`].
pub(crate) fn item_from_row(row: &PgRow) -> Result<Item> {
    let kind: String = row.try_get("kind")?;
    let kind: ItemKind = kind
        .parse()
        .map_err(|e: String| StoreError::validation("kind", e))?;

    let memory_type: Option<String> = row.try_get("memory_type")?;
    let memory_type = memory_type
        .map(|s| s.parse::<MemoryType>())
        .transpose()
        .map_err(|e| StoreError::validation("memory_type", e))?;

    let tags: serde_json::Value = row.try_get("tags")?;
    let assets: serde_json::Value = row.try_get("assets")?;
    let decay_metadata: serde_json::Value = row.try_get("decay_metadata")?;

    let embedding: Option<pgvector::Vector> = row.try_get("embedding")?;

    Ok(Item {
        id: row.try_get("id")?,
        kind,
        title: row.try_get("title")?,
        summary: row.try_get("summary")?,
        content: row.try_get("content")?,
        tags: serde_json::from_value(tags)?,
        source: row.try_get("source")?,
        file_name: row.try_get("file_name")?,
        assets: serde_json::from_value(assets)?,
        created_at: row.try_get("created_at")?,
        updated_at: row.try_get("updated_at")?,
        embedding: embedding.map(|v| v.to_vec()),
        memory_type,
        salience: row.try_get("salience")?,
        recall_count: row.try_get("recall_count")?,
        last_accessed_at: row.try_get("last_accessed_at")?,
        decay_metadata: serde_json::from_value::<DecayMetadata>(decay_metadata)
            .unwrap_or_default(),
    })
}

/// Column list shared by every fact query.
pub(crate) const FACT_COLUMNS: &str = "id, chat_id, subject, predicate, object, confidence, \
     salience, valid_from, valid_to, created_at, last_accessed_at, \
     recall_count, decay_metadata";

/// Map a `facts` row to a [`Fact`].
pub(crate) fn fact_from_row(row: &PgRow) -> Result<Fact> {
    let id: Uuid = row.try_get("id")?;
    let decay_metadata: serde_json::Value = row.try_get("decay_metadata")?;

    Ok(Fact {
        id,
        chat_id: row.try_get("chat_id")?,
        subject: row.try_get("subject")?,
        predicate: row.try_get("predicate")?,
        object: row.try_get("object")?,
        confidence: row.try_get("confidence")?,
        salience: row.try_get("salience")?,
        valid_from: row.try_get("valid_from")?,
        valid_to: row.try_get("valid_to")?,
        created_at: row.try_get("created_at")?,
        last_accessed_at: row.try_get("last_accessed_at")?,
        recall_count: row.try_get("recall_count")?,
        decay_metadata: serde_json::from_value::<DecayMetadata>(decay_metadata)
            .unwrap_or_default(),
    })
}
