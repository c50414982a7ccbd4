//! SQL injection prevention tests for the SQL storage backend.
//!
//! These tests verify that parameterized queries prevent SQL injection
//! attacks: malicious input is stored and retrieved as literal text,
//! never executed.

use askdocs_core::storage::{ChunkStore, SessionLog};
use askdocs_core::types::{FeedbackStatus, Session, SessionId};
use askdocs_storage_sql::SqlStore;
use chrono::Utc;
use libsql::params;
use tempfile::TempDir;

async fn test_store() -> (SqlStore, std::path::PathBuf, TempDir) {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    let db = libsql::Builder::new_local(&db_path).build().await.unwrap();
    let store = SqlStore::from_database(db);
    store.initialize_schema().await.unwrap();
    (store, db_path, dir)
}

async fn insert_raw_chunk(db_path: &std::path::Path, content: &str, path: &str) {
    let db = libsql::Builder::new_local(db_path).build().await.unwrap();
    let conn = db.connect().unwrap();
    conn.execute(
        "INSERT INTO chunks (content, repo, path, section, embedding, accuracy_weight, \
         times_retrieved, times_useful) VALUES (?1, 'acme/widgets', ?2, 'overview', '[1.0,0.0]', 1.0, 0, 0)",
        params![content, path],
    )
    .await
    .unwrap();
}

#[tokio::test]
async fn chunk_content_with_injection_payload_is_stored_literally() {
    let (store, db_path, _dir) = test_store().await;

    let malicious = "'; DROP TABLE chunks; --";
    insert_raw_chunk(&db_path, malicious, "docs/guide.md").await;

    let results = store.fetch_candidates(&[1.0, 0.0], 10).await.expect("table still exists");
    assert_eq!(results.len(), 1);
    assert_eq!(results[0].0.content, malicious);
}

#[tokio::test]
async fn session_query_with_injection_payload_is_stored_literally() {
    let (store, _db_path, _dir) = test_store().await;

    let malicious_query = "'); DELETE FROM sessions; --";
    let session = Session {
        id: SessionId(0),
        query: malicious_query.to_string(),
        query_embedding: vec![1.0],
        answer: "answer text".to_string(),
        retrieved: vec![],
        reasoning_steps: vec![],
        feedback_status: FeedbackStatus::Pending,
        correction_text: None,
        created_at: Utc::now(),
    };

    let id = store.create(session).await.expect("inserts safely");
    let fetched = store.get(id).await.expect("table still exists");
    assert_eq!(fetched.query, malicious_query);
}

#[tokio::test]
async fn chunk_path_with_quotes_round_trips_exactly() {
    let (store, db_path, _dir) = test_store().await;
    let tricky_path = "docs/\"quoted\" file's guide.md";

    insert_raw_chunk(&db_path, "normal content", tricky_path).await;

    let results = store.fetch_candidates(&[1.0, 0.0], 10).await.expect("fetches");
    assert_eq!(results[0].0.path, tricky_path);
}

#[tokio::test]
async fn correction_text_with_injection_payload_is_stored_literally() {
    let (store, _db_path, _dir) = test_store().await;

    let session = Session {
        id: SessionId(0),
        query: "how do I install?".to_string(),
        query_embedding: vec![1.0],
        answer: "answer text".to_string(),
        retrieved: vec![],
        reasoning_steps: vec![],
        feedback_status: FeedbackStatus::Pending,
        correction_text: None,
        created_at: Utc::now(),
    };
    let id = store.create(session).await.expect("inserts");

    let malicious_correction = "x'; UPDATE sessions SET feedback_status='correct'; --";
    store
        .update_feedback(id, FeedbackStatus::Incorrect, &[], Some(malicious_correction.to_string()))
        .await
        .expect("applies feedback safely");

    let fetched = store.get(id).await.expect("fetches");
    assert_eq!(fetched.correction_text.as_deref(), Some(malicious_correction));
    assert_eq!(fetched.feedback_status, FeedbackStatus::Incorrect);
}
