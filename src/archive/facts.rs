//! Bitemporal fact storage with `(subject, predicate)` supersession.
//!
//! Facts are never deleted by re-extraction. Writing a new value for an
//! existing `(subject, predicate)` closes the prior live fact by stamping its
//! `valid_to`, so the history of a triple stays queryable while at most one
//! row per `(subject, predicate)` is live at any time.

use serde::Serialize;
use sqlx::PgPool;

use crate::archive::types::{ExtractedFact, Fact};
use crate::archive::{fact_from_row, FACT_COLUMNS};
use crate::db::now_ms;
use crate::error::Result;

/// Initial salience for a freshly extracted fact.
const NEW_FACT_SALIENCE: f64 = 0.5;

/// Result returned from a save_facts operation.
#[derive(Debug, Default, Serialize)]
pub struct SaveFactsResult {
    /// Facts inserted as new live rows.
    pub inserted: usize,
    /// Prior live facts closed by supersession.
    pub superseded: usize,
    /// Incoming triples identical to an existing live fact, silently ignored.
    pub duplicates: usize,
}

/// Persist a batch of extracted facts for a chat, superseding stale values.
///
/// For each incoming `(subject, predicate, object, confidence)`:
/// - an identical live triple already in the store is a silent no-op;
/// - otherwise any live fact with the same `(subject, predicate)` is closed
///   (`valid_to = now`) and the new fact is inserted live with salience 0.5.
///
/// The whole batch runs in one transaction.
pub async fn save_facts(
    pool: &PgPool,
    chat_id: &str,
    extracted: &[ExtractedFact],
) -> Result<SaveFactsResult> {
    let now = now_ms();
    let mut result = SaveFactsResult::default();
    let mut tx = pool.begin().await?;

    for fact in extracted {
        // Identical live triple: nothing to do.
        let duplicate: Option<uuid::Uuid> = sqlx::query_scalar(
            "SELECT id FROM facts \
             WHERE subject = $1 AND predicate = $2 AND object = $3 AND valid_to IS NULL",
        )
        .bind(&fact.subject)
        .bind(&fact.predicate)
        .bind(&fact.object)
        .fetch_optional(&mut *tx)
        .await?;

        if duplicate.is_some() {
            result.duplicates += 1;
            continue;
        }

        // Close the prior live value for this (subject, predicate).
        let closed = sqlx::query(
            "UPDATE facts SET valid_to = $3 \
             WHERE subject = $1 AND predicate = $2 AND valid_to IS NULL",
        )
        .bind(&fact.subject)
        .bind(&fact.predicate)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        result.superseded += closed.rows_affected() as usize;

        sqlx::query(
            "INSERT INTO facts (chat_id, subject, predicate, object, confidence, salience, \
             valid_from, created_at, last_accessed_at, recall_count, decay_metadata) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $7, $7, 0, '{}'::jsonb)",
        )
        .bind(chat_id)
        .bind(&fact.subject)
        .bind(&fact.predicate)
        .bind(&fact.object)
        .bind(fact.confidence.clamp(0.0, 1.0))
        .bind(NEW_FACT_SALIENCE)
        .bind(now)
        .execute(&mut *tx)
        .await?;
        result.inserted += 1;
    }

    tx.commit().await?;
    tracing::debug!(
        chat_id,
        inserted = result.inserted,
        superseded = result.superseded,
        duplicates = result.duplicates,
        "facts saved"
    );
    Ok(result)
}

/// Live facts for a chat, strongest first.
pub async fn load_facts(pool: &PgPool, chat_id: &str) -> Result<Vec<Fact>> {
    let rows = sqlx::query(sqlx::AssertSqlSafe(format!(
        "SELECT {FACT_COLUMNS} FROM facts \
         WHERE chat_id = $1 AND valid_to IS NULL \
         ORDER BY salience DESC, created_at DESC"
    )))
    .bind(chat_id)
    .fetch_all(pool)
    .await?;

    rows.iter().map(fact_from_row).collect()
}
