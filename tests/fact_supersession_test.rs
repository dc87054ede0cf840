//! Temporal fact supersession: at most one live fact per (subject, predicate).

mod helpers;

use chronicle::archive::types::ExtractedFact;
use chronicle::archive::{facts, store};
use helpers::*;

fn extracted(subject: &str, predicate: &str, object: &str, confidence: f64) -> ExtractedFact {
    ExtractedFact {
        subject: subject.into(),
        predicate: predicate.into(),
        object: object.into(),
        confidence,
    }
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn new_value_supersedes_prior_live_fact() {
    let pool = test_pool().await;
    let chat = unique_id("facts");
    store::upsert_items(&pool, &[make_item(&chat)], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let subject = unique_id("Alice");

    let first = facts::save_facts(
        &pool,
        &chat,
        &[extracted(&subject, "lives_in", "Paris", 0.9)],
    )
    .await
    .unwrap();
    assert_eq!(first.inserted, 1);
    assert_eq!(first.superseded, 0);

    let second = facts::save_facts(
        &pool,
        &chat,
        &[extracted(&subject, "lives_in", "Berlin", 0.95)],
    )
    .await
    .unwrap();
    assert_eq!(second.inserted, 1);
    assert_eq!(second.superseded, 1);

    // Only Berlin is live
    let live = facts::load_facts(&pool, &chat).await.unwrap();
    let live_for_subject: Vec<_> = live.iter().filter(|f| f.subject == subject).collect();
    assert_eq!(live_for_subject.len(), 1);
    assert_eq!(live_for_subject[0].object, "Berlin");
    assert!((live_for_subject[0].salience - 0.5).abs() < 1e-9);

    // The Paris row persists, closed
    let (object, valid_to): (String, Option<i64>) = sqlx::query_as(
        "SELECT object, valid_to FROM facts \
         WHERE subject = $1 AND predicate = 'lives_in' AND valid_to IS NOT NULL",
    )
    .bind(&subject)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(object, "Paris");
    assert!(valid_to.is_some());

    cleanup_item(&pool, &chat).await;
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn identical_triple_is_silently_ignored() {
    let pool = test_pool().await;
    let chat = unique_id("facts-dup");
    store::upsert_items(&pool, &[make_item(&chat)], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let subject = unique_id("Bob");
    let fact = extracted(&subject, "works_at", "Acme", 0.8);

    facts::save_facts(&pool, &chat, &[fact.clone()]).await.unwrap();
    let rerun = facts::save_facts(&pool, &chat, &[fact]).await.unwrap();
    assert_eq!(rerun.inserted, 0);
    assert_eq!(rerun.superseded, 0);
    assert_eq!(rerun.duplicates, 1);

    let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts WHERE subject = $1")
        .bind(&subject)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(count, 1);

    cleanup_item(&pool, &chat).await;
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn repeated_re_extraction_keeps_one_live_fact() {
    let pool = test_pool().await;
    let chat = unique_id("facts-chain");
    store::upsert_items(&pool, &[make_item(&chat)], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let subject = unique_id("Carol");
    for city in ["Oslo", "Lisbon", "Kyoto", "Quito"] {
        facts::save_facts(
            &pool,
            &chat,
            &[extracted(&subject, "lives_in", city, 0.9)],
        )
        .await
        .unwrap();
    }

    let live_count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM facts \
         WHERE subject = $1 AND predicate = 'lives_in' AND valid_to IS NULL",
    )
    .bind(&subject)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(live_count, 1, "temporal exclusivity violated");

    let total: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM facts WHERE subject = $1 AND predicate = 'lives_in'",
    )
    .bind(&subject)
    .fetch_one(&pool)
    .await
    .unwrap();
    assert_eq!(total, 4, "superseded facts are expired, not deleted");

    let live = facts::load_facts(&pool, &chat).await.unwrap();
    assert_eq!(
        live.iter().find(|f| f.subject == subject).unwrap().object,
        "Quito"
    );

    cleanup_item(&pool, &chat).await;
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn load_facts_orders_by_salience_then_recency() {
    let pool = test_pool().await;
    let chat = unique_id("facts-order");
    store::upsert_items(&pool, &[make_item(&chat)], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let weak = unique_id("weak");
    let strong = unique_id("strong");
    facts::save_facts(
        &pool,
        &chat,
        &[
            extracted(&weak, "likes", "tea", 0.9),
            extracted(&strong, "likes", "coffee", 0.9),
        ],
    )
    .await
    .unwrap();

    sqlx::query("UPDATE facts SET salience = 0.9 WHERE subject = $1")
        .bind(&strong)
        .execute(&pool)
        .await
        .unwrap();

    let live = facts::load_facts(&pool, &chat).await.unwrap();
    let positions: Vec<&str> = live.iter().map(|f| f.subject.as_str()).collect();
    let strong_pos = positions.iter().position(|s| *s == strong).unwrap();
    let weak_pos = positions.iter().position(|s| *s == weak).unwrap();
    assert!(strong_pos < weak_pos, "stronger fact must sort first");

    cleanup_item(&pool, &chat).await;
}
