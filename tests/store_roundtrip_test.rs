//! Item upsert/load round-trips and field preservation on update.

mod helpers;

use chronicle::archive::store;
use chronicle::archive::types::{DecayHistoryEntry, DecayModifiers, MemoryType};
use chronicle::db::now_ms;
use helpers::*;

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn upsert_then_get_round_trips_every_field() {
    let pool = test_pool().await;
    let id = unique_id("roundtrip");

    let mut item = make_typed_item(&id, MemoryType::Semantic, 0.7, Some(3));
    item.tags = vec!["alpha".into(), "beta".into(), "alpha".into()];
    item.file_name = Some("export.json".into());
    item.assets = vec!["asset://one".into()];

    store::upsert_items(&pool, &[item.clone()], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let loaded = store::get_item(&pool, &id).await.unwrap();
    assert_eq!(loaded.title, item.title);
    assert_eq!(loaded.memory_type, Some(MemoryType::Semantic));
    assert!((loaded.salience - 0.7).abs() < 1e-9);
    // duplicate tag collapsed, order preserved
    assert_eq!(loaded.tags, vec!["alpha", "beta"]);
    assert_eq!(loaded.file_name.as_deref(), Some("export.json"));
    assert_eq!(loaded.assets, vec!["asset://one"]);
    let embedding = loaded.embedding.expect("embedding survived the round trip");
    assert_eq!(embedding.len(), TEST_EMBEDDING_DIM);
    assert!((embedding[3] - 1.0).abs() < 1e-6);

    cleanup_item(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn update_preserves_decay_state_and_created_at() {
    let pool = test_pool().await;
    let id = unique_id("preserve");

    let item = make_item(&id);
    let original_created = item.created_at;
    store::upsert_items(&pool, &[item.clone()], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    // Rehearse so recall_count and decay state diverge from the payload
    store::boost_salience(&pool, &id).await.unwrap();
    sqlx::query("UPDATE chats SET decay_metadata = $2 WHERE id = $1")
        .bind(&id)
        .bind(
            serde_json::to_value(chronicle::archive::types::DecayMetadata {
                last_decay_run: Some(now_ms()),
                history: vec![DecayHistoryEntry {
                    previous_salience: 0.5,
                    new_salience: 0.45,
                    hours_since_access: 4.0,
                    modifiers: DecayModifiers::identity(),
                }],
            })
            .unwrap(),
        )
        .execute(&pool)
        .await
        .unwrap();

    // Re-import the same item with a stale payload
    let mut stale = make_item(&id);
    stale.title = "Edited title".into();
    stale.created_at = 1; // must NOT overwrite
    store::upsert_items(&pool, &[stale], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let loaded = store::get_item(&pool, &id).await.unwrap();
    assert_eq!(loaded.title, "Edited title");
    assert_eq!(loaded.created_at, original_created);
    assert_eq!(loaded.recall_count, 1, "recall_count must survive upsert");
    assert_eq!(loaded.decay_metadata.history.len(), 1);
    assert!(loaded.updated_at >= original_created, "updated_at refreshed");

    cleanup_item(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn upsert_clamps_salience_to_type_floor() {
    let pool = test_pool().await;
    let id = unique_id("clamp");

    // Procedural floor is 0.20; a payload below it gets clamped up
    let item = make_typed_item(&id, MemoryType::Procedural, 0.01, None);
    store::upsert_items(&pool, &[item], TEST_EMBEDDING_DIM)
        .await
        .unwrap();

    let loaded = store::get_item(&pool, &id).await.unwrap();
    assert!((loaded.salience - 0.20).abs() < 1e-9);

    cleanup_item(&pool, &id).await;
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn upsert_rejects_wrong_embedding_dimension() {
    let pool = test_pool().await;
    let id = unique_id("baddim");

    let mut item = make_item(&id);
    item.embedding = Some(vec![1.0f32; 32]);

    let err = store::upsert_items(&pool, &[item], TEST_EMBEDDING_DIM)
        .await
        .unwrap_err();
    assert!(err.to_string().contains("embedding"));

    // Nothing was written
    assert!(store::get_item(&pool, &id).await.is_err());
}

#[tokio::test]
#[ignore = "requires a live Postgres with pgvector (set DATABASE_URL)"]
async fn delete_cascades_to_links_and_facts() {
    let pool = test_pool().await;
    let id_a = unique_id("cascade-a");
    let id_b = unique_id("cascade-b");

    store::upsert_items(
        &pool,
        &[make_item(&id_a), make_item(&id_b)],
        TEST_EMBEDDING_DIM,
    )
    .await
    .unwrap();

    chronicle::archive::links::add_link(&pool, &id_a, &id_b, Some("related"))
        .await
        .unwrap();
    chronicle::archive::facts::save_facts(
        &pool,
        &id_a,
        &[chronicle::archive::types::ExtractedFact {
            subject: unique_id("subj"),
            predicate: "mentions".into(),
            object: "something".into(),
            confidence: 0.9,
        }],
    )
    .await
    .unwrap();

    store::delete_item(&pool, &id_a).await.unwrap();

    let link_count: i64 =
        sqlx::query_scalar("SELECT COUNT(*) FROM links WHERE from_id = $1 OR to_id = $1")
            .bind(&id_a)
            .fetch_one(&pool)
            .await
            .unwrap();
    assert_eq!(link_count, 0);

    let fact_count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM facts WHERE chat_id = $1")
        .bind(&id_a)
        .fetch_one(&pool)
        .await
        .unwrap();
    assert_eq!(fact_count, 0);

    // Deleting again is a no-op, not an error
    store::delete_item(&pool, &id_a).await.unwrap();

    cleanup_item(&pool, &id_b).await;
}
