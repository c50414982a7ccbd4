//! End-to-end tests driving the built `askdocs` binary.

use assert_cmd::Command;
use libsql::params;
use tempfile::TempDir;

/// Seeds one chunk into a fresh file database. Schema creation is left to
/// the binary itself (every invocation initialises it if missing), so this
/// runs `stats` once first and then inserts directly, the way an ingester
/// would — there is no `ChunkStore::insert` exposed to callers.
async fn seed_db(db_path: &std::path::Path, content: &str) {
    askdocs_cmd(db_path).arg("stats").assert().success();

    let db = libsql::Builder::new_local(db_path).build().await.unwrap();
    let conn = db.connect().unwrap();
    conn.execute(
        "INSERT INTO chunks (content, repo, path, section, embedding, accuracy_weight, \
         times_retrieved, times_useful) VALUES (?1, 'acme/widgets', 'docs/guide.md', \
         'overview', '[1.0,0.0]', 1.0, 0, 0)",
        params![content],
    )
    .await
    .unwrap();
}

fn askdocs_cmd(db_path: &std::path::Path) -> Command {
    let mut cmd = Command::cargo_bin("askdocs").unwrap();
    cmd.arg("--database-url").arg(format!("file:{}", db_path.to_str().unwrap()));
    cmd
}

#[tokio::test]
async fn stats_on_empty_in_memory_store_reports_zero_sessions() {
    let mut cmd = Command::cargo_bin("askdocs").unwrap();
    cmd.arg("stats");
    cmd.assert().success().stdout(predicates::str::contains("sessions: 0"));
}

#[tokio::test]
async fn ask_with_no_chunks_still_returns_an_answer() {
    let mut cmd = Command::cargo_bin("askdocs").unwrap();
    cmd.args(["--format", "json", "ask", "how do I deploy?"]);
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["answer"].as_str().unwrap().contains("no context chunks"));
    assert!(json["session_id"].as_i64().unwrap() > 0);
}

#[tokio::test]
async fn ask_retrieves_seeded_chunk_from_sql_store() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    seed_db(&db_path, "install with cargo install askdocs").await;

    let mut cmd = askdocs_cmd(&db_path);
    cmd.args(["--format", "json", "ask", "how do I install?"]);
    let output = cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    assert!(json["answer"].as_str().unwrap().contains("install with cargo"));
    assert_eq!(json["sources"].as_array().unwrap().len(), 1);
}

#[tokio::test]
async fn chunk_edit_persists_new_weight() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    seed_db(&db_path, "chunk content").await;

    let mut cmd = askdocs_cmd(&db_path);
    cmd.args(["chunk-edit", "1", "1.75", "--reason", "test override"]);
    cmd.assert().success().stdout(predicates::str::contains("1.750"));

    let db = libsql::Builder::new_local(&db_path).build().await.unwrap();
    let conn = db.connect().unwrap();
    let mut rows = conn.query("SELECT accuracy_weight FROM chunks WHERE id = 1", ()).await.unwrap();
    let row = rows.next().await.unwrap().unwrap();
    let weight: f64 = row.get(0).unwrap();
    assert_eq!(weight, 1.75);
}

#[tokio::test]
async fn ask_then_feedback_round_trips_across_separate_invocations() {
    let dir = TempDir::new().unwrap();
    let db_path = dir.path().join("test.db");
    seed_db(&db_path, "chunk content").await;

    let mut ask_cmd = askdocs_cmd(&db_path);
    ask_cmd.args(["--format", "json", "ask", "a question"]);
    let output = ask_cmd.output().unwrap();
    assert!(output.status.success());
    let json: serde_json::Value = serde_json::from_slice(&output.stdout).unwrap();
    let session_id = json["session_id"].as_i64().unwrap().to_string();

    let mut feedback_cmd = askdocs_cmd(&db_path);
    feedback_cmd.args(["feedback", &session_id, "--correct", "--chunk", "1:true"]);
    feedback_cmd.assert().success().stdout(predicates::str::contains("updated 1 chunk"));

    let mut second_feedback_cmd = askdocs_cmd(&db_path);
    second_feedback_cmd.args(["feedback", &session_id, "--correct"]);
    second_feedback_cmd.assert().failure();
}
