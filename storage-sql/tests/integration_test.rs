//! End-to-end integration tests for the SQL-backed stores against a real
//! (file-based) libSQL database.

use askdocs_core::storage::{ChunkStore, SessionLog, WorkflowMemoryStore};
use askdocs_core::types::{ChunkId, FeedbackStatus, Session, SessionId, Usefulness};
use askdocs_storage_sql::SqlStore;
use chrono::Utc;
use libsql::params;
use tempfile::TempDir;

async fn create_test_store() -> (SqlStore, TempDir) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("file:{}", db_path.to_str().unwrap());
    let store = SqlStore::new(&url, "").await.unwrap();
    store.initialize_schema().await.unwrap();
    (store, dir)
}

// There is no ChunkStore::insert (ingestion is external to this engine);
// seed directly against the schema the way an ingester would.
async fn seed_chunk_at(db_path: &std::path::Path, content: &str, embedding: &str) {
    let db = libsql::Builder::new_local(db_path).build().await.unwrap();
    let conn = db.connect().unwrap();
    conn.execute(
        "INSERT INTO chunks (content, repo, path, section, embedding, accuracy_weight, \
         times_retrieved, times_useful) VALUES (?1, 'acme/widgets', 'docs/guide.md', \
         'overview', ?2, 1.0, 0, 0)",
        params![content, embedding],
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn schema_initialization_is_idempotent() {
    let (store, _dir) = create_test_store().await;
    store.initialize_schema().await.expect("second init is a no-op");
}

#[tokio::test]
async fn fetch_candidates_and_get_round_trip() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("file:{}", db_path.to_str().unwrap());
    let store = SqlStore::new(&url, "").await.unwrap();
    store.initialize_schema().await.unwrap();

    seed_chunk_at(&db_path, "first chunk", "[1.0,0.0]").await;
    seed_chunk_at(&db_path, "second chunk", "[0.0,1.0]").await;

    let results = store.fetch_candidates(&[1.0, 0.0], 10).await.expect("fetches");
    assert_eq!(results.len(), 2);
    assert_eq!(results[0].0.content, "first chunk");
    assert!(results[0].1 > results[1].1);

    let fetched = store.get(results[0].0.id).await.expect("fetches by id");
    assert_eq!(fetched.content, "first chunk");
}

#[tokio::test]
async fn weight_mutations_persist_across_connections() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let url = format!("file:{}", db_path.to_str().unwrap());
    let store = SqlStore::new(&url, "").await.unwrap();
    store.initialize_schema().await.unwrap();
    seed_chunk_at(&db_path, "only chunk", "[1.0,0.0]").await;

    let chunk_id = store.fetch_candidates(&[1.0, 0.0], 10).await.unwrap()[0].0.id;
    store.adjust_weight(chunk_id, 0.5, 0.5, 2.0).await.expect("adjusts");

    let reopened = SqlStore::new(&url, "").await.unwrap();
    let chunk = reopened.get(chunk_id).await.expect("fetches after reopen");
    assert_eq!(chunk.accuracy_weight, 1.5);
}

#[tokio::test]
async fn workflow_memory_round_trips_through_store_and_find() {
    let (store, _dir) = create_test_store().await;

    let session = Session {
        id: SessionId(0),
        query: "how do I deploy?".to_string(),
        query_embedding: vec![1.0, 0.0],
        answer: "run the deploy script".to_string(),
        retrieved: vec![],
        reasoning_steps: vec![],
        feedback_status: FeedbackStatus::Pending,
        correction_text: None,
        created_at: Utc::now(),
    };
    let session_id = store.create(session).await.expect("creates session");

    store
        .record(vec![1.0, 0.0], session_id, vec![ChunkId(1)])
        .await
        .expect("records workflow memory");

    let hits = store.find_similar(&[1.0, 0.0], 3, 0.5).await.expect("searches");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].0.source_session_id, session_id);

    let count = store.count().await.expect("counts");
    assert_eq!(count, 1);
}

#[tokio::test]
async fn stats_track_feedback_lifecycle() {
    let (store, _dir) = create_test_store().await;

    let make_session = || Session {
        id: SessionId(0),
        query: "q".to_string(),
        query_embedding: vec![1.0],
        answer: "a".to_string(),
        retrieved: vec![],
        reasoning_steps: vec![],
        feedback_status: FeedbackStatus::Pending,
        correction_text: None,
        created_at: Utc::now(),
    };

    let a = store.create(make_session()).await.unwrap();
    let _b = store.create(make_session()).await.unwrap();
    store
        .update_feedback(a, FeedbackStatus::Correct, &[(ChunkId(1), Usefulness::Useful)], None)
        .await
        .unwrap();

    let stats = store.stats().await.unwrap();
    assert_eq!(stats.total, 2);
    assert_eq!(stats.correct, 1);
    assert_eq!(stats.pending, 1);
}
