//! Similarity kernel — cosine distance, k-nearest-neighbour selection, and
//! memory entropy.
//!
//! Pure functions shared by the in-process search path and the decay
//! scheduler's observability metrics. The database carries its own cosine
//! index for bulk KNN; this module covers the in-memory cases (tool-level
//! reranking, entropy over live salience values).

use crate::archive::types::Item;

/// Cosine similarity between two vectors in `[-1, 1]`.
///
/// Returns `0.0` when the dimensions differ or either magnitude is zero.
/// Deterministic for a given input pair.
pub fn cosine(a: &[f32], b: &[f32]) -> f64 {
    if a.len() != b.len() {
        return 0.0;
    }
    let mut dot = 0.0f64;
    let mut norm_a = 0.0f64;
    let mut norm_b = 0.0f64;
    for (x, y) in a.iter().zip(b.iter()) {
        dot += *x as f64 * *y as f64;
        norm_a += (*x as f64) * (*x as f64);
        norm_b += (*y as f64) * (*y as f64);
    }
    if norm_a == 0.0 || norm_b == 0.0 {
        return 0.0;
    }
    dot / (norm_a.sqrt() * norm_b.sqrt())
}

/// Top-`k` items by cosine similarity to `query`, descending.
///
/// Items without an embedding are skipped.
pub fn knn<'a>(query: &[f32], items: &'a [Item], k: usize) -> Vec<(&'a Item, f64)> {
    let mut scored: Vec<(&Item, f64)> = items
        .iter()
        .filter_map(|item| {
            item.embedding
                .as_ref()
                .map(|emb| (item, cosine(query, emb)))
        })
        .collect();
    scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
    scored.truncate(k);
    scored
}

/// Normalised Shannon entropy of a salience distribution.
///
/// Values are bucketed into 10 equal bins over `[0, 1]` (last bin inclusive
/// of 1.0); the entropy in bits is normalised by `log2(10)` and clamped to
/// `[0, 1]`. Empty input yields `0.0`.
pub fn entropy(salience_values: &[f64]) -> f64 {
    if salience_values.is_empty() {
        return 0.0;
    }
    let mut bins = [0usize; 10];
    for &v in salience_values {
        let idx = (v.clamp(0.0, 1.0) * 10.0) as usize;
        bins[idx.min(9)] += 1;
    }
    let n = salience_values.len() as f64;
    let h: f64 = bins
        .iter()
        .filter(|&&count| count > 0)
        .map(|&count| {
            let p = count as f64 / n;
            -p * p.log2()
        })
        .sum();
    (h / 10f64.log2()).clamp(0.0, 1.0)
}
