//! [`ChunkStore`], [`WorkflowMemoryStore`], and [`SessionLog`] implementations
//! backed by [`SqlStore`](crate::SqlStore).
//!
//! Embeddings and reasoning traces are stored as JSON text columns; every
//! read that needs similarity scoring pulls the full table and scores in
//! Rust with [`cosine_similarity`], matching the in-memory reference
//! implementation's contract (the core's fanout budget assumes a corpus
//! that fits comfortably in a scan).

use crate::SqlStore;
use askdocs_core::embedder::cosine_similarity;
use askdocs_core::error::{Error, Result};
use askdocs_core::storage::{ChunkStore, SessionLog, SessionStats, WorkflowMemoryStore};
use askdocs_core::types::{
    Chunk, ChunkId, FeedbackStatus, Phase, ReasoningStep, RetrievedEntry, Session, SessionId,
    Usefulness, WorkflowMemory, WorkflowMemoryId,
};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use libsql::{params, Row};

fn encode_embedding(embedding: &[f32]) -> Result<String> {
    serde_json::to_string(embedding).map_err(Error::from)
}

fn decode_embedding(text: &str) -> Result<Vec<f32>> {
    serde_json::from_str(text).map_err(Error::from)
}

fn row_to_chunk(row: &Row) -> Result<Chunk> {
    let id: i64 = row.get(0).map_err(|e| Error::Store(format!("reading chunk id: {e}")))?;
    let content: String = row.get(1).map_err(|e| Error::Store(format!("reading chunk content: {e}")))?;
    let repo: String = row.get(2).map_err(|e| Error::Store(format!("reading chunk repo: {e}")))?;
    let path: String = row.get(3).map_err(|e| Error::Store(format!("reading chunk path: {e}")))?;
    let section: String = row.get(4).map_err(|e| Error::Store(format!("reading chunk section: {e}")))?;
    let embedding_text: String = row.get(5).map_err(|e| Error::Store(format!("reading chunk embedding: {e}")))?;
    let accuracy_weight: f64 = row.get(6).map_err(|e| Error::Store(format!("reading chunk weight: {e}")))?;
    let times_retrieved: i64 = row.get(7).map_err(|e| Error::Store(format!("reading times_retrieved: {e}")))?;
    let times_useful: i64 = row.get(8).map_err(|e| Error::Store(format!("reading times_useful: {e}")))?;

    Ok(Chunk {
        id: ChunkId(id),
        content,
        repo,
        path,
        section,
        embedding: decode_embedding(&embedding_text)?,
        accuracy_weight,
        times_retrieved: times_retrieved as u64,
        times_useful: times_useful as u64,
    })
}

#[async_trait]
impl ChunkStore for SqlStore {
    async fn fetch_candidates(&self, query_vec: &[f32], n: usize) -> Result<Vec<(Chunk, f64)>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, content, repo, path, section, embedding, accuracy_weight, \
                 times_retrieved, times_useful FROM chunks",
                (),
            )
            .await
            .map_err(|e| Error::Store(format!("fetching candidates: {e}")))?;

        let mut scored: Vec<(Chunk, f64)> = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))? {
            let chunk = row_to_chunk(&row)?;
            let sim = cosine_similarity(query_vec, &chunk.embedding)?;
            scored.push((chunk, sim));
        }

        scored.sort_by(|a, b| {
            b.1.partial_cmp(&a.1)
                .unwrap_or(std::cmp::Ordering::Equal)
                .then_with(|| a.0.id.cmp(&b.0.id))
        });
        scored.truncate(n);
        Ok(scored)
    }

    async fn get(&self, id: ChunkId) -> Result<Chunk> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, content, repo, path, section, embedding, accuracy_weight, \
                 times_retrieved, times_useful FROM chunks WHERE id = ?1",
                params![id.0],
            )
            .await
            .map_err(|e| Error::Store(format!("fetching chunk: {e}")))?;

        let row = rows
            .next()
            .await
            .map_err(|e| Error::Store(format!("reading row: {e}")))?
            .ok_or_else(|| Error::NotFound(format!("chunk {id}")))?;
        row_to_chunk(&row)
    }

    async fn bump_counters(&self, id: ChunkId, useful: bool) -> Result<()> {
        let conn = self.get_connection().await?;
        let rows_changed = if useful {
            conn.execute(
                "UPDATE chunks SET times_retrieved = times_retrieved + 1, \
                 times_useful = times_useful + 1, updated_at = strftime('%s', 'now') WHERE id = ?1",
                params![id.0],
            )
        } else {
            conn.execute(
                "UPDATE chunks SET times_retrieved = times_retrieved + 1, \
                 updated_at = strftime('%s', 'now') WHERE id = ?1",
                params![id.0],
            )
        }
        .await
        .map_err(|e| Error::Store(format!("bumping counters: {e}")))?;

        if rows_changed == 0 {
            return Err(Error::NotFound(format!("chunk {id}")));
        }
        Ok(())
    }

    async fn adjust_weight(&self, id: ChunkId, delta: f64, w_min: f64, w_max: f64) -> Result<f64> {
        let chunk = self.get(id).await?;
        let new_weight = (chunk.accuracy_weight + delta).clamp(w_min, w_max);
        self.set_weight(id, new_weight, w_min, w_max).await
    }

    async fn set_weight(&self, id: ChunkId, new_weight: f64, w_min: f64, w_max: f64) -> Result<f64> {
        let clamped = new_weight.clamp(w_min, w_max);
        let conn = self.get_connection().await?;
        let rows_changed = conn
            .execute(
                "UPDATE chunks SET accuracy_weight = ?1, updated_at = strftime('%s', 'now') WHERE id = ?2",
                params![clamped, id.0],
            )
            .await
            .map_err(|e| Error::Store(format!("setting weight: {e}")))?;

        if rows_changed == 0 {
            return Err(Error::NotFound(format!("chunk {id}")));
        }
        Ok(clamped)
    }

    async fn all(&self) -> Result<Vec<Chunk>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, content, repo, path, section, embedding, accuracy_weight, \
                 times_retrieved, times_useful FROM chunks",
                (),
            )
            .await
            .map_err(|e| Error::Store(format!("fetching all chunks: {e}")))?;

        let mut chunks = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))? {
            chunks.push(row_to_chunk(&row)?);
        }
        Ok(chunks)
    }
}

#[async_trait]
impl WorkflowMemoryStore for SqlStore {
    async fn find_similar(
        &self,
        query_vec: &[f32],
        top_m: usize,
        min_sim: f64,
    ) -> Result<Vec<(WorkflowMemory, f64)>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id, summary_embedding, source_session_id, useful_chunk_ids, created_at \
                 FROM workflow_memories",
                (),
            )
            .await
            .map_err(|e| Error::Store(format!("fetching workflow memories: {e}")))?;

        let mut scored: Vec<(WorkflowMemory, f64)> = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))? {
            let id_text: String = row.get(0).map_err(|e| Error::Store(format!("reading memory id: {e}")))?;
            let embedding_text: String =
                row.get(1).map_err(|e| Error::Store(format!("reading memory embedding: {e}")))?;
            let source_session_id: i64 =
                row.get(2).map_err(|e| Error::Store(format!("reading source session: {e}")))?;
            let useful_ids_text: String =
                row.get(3).map_err(|e| Error::Store(format!("reading useful chunk ids: {e}")))?;
            let created_at_epoch: i64 =
                row.get(4).map_err(|e| Error::Store(format!("reading created_at: {e}")))?;

            let summary_embedding = decode_embedding(&embedding_text)?;
            let sim = cosine_similarity(query_vec, &summary_embedding)?;
            if sim < min_sim {
                continue;
            }

            let id = id_text
                .parse::<uuid::Uuid>()
                .map_err(|e| Error::Internal(format!("corrupt workflow memory id: {e}")))?;
            let useful_chunk_ids: Vec<ChunkId> =
                serde_json::from_str::<Vec<i64>>(&useful_ids_text)?.into_iter().map(ChunkId).collect();
            let created_at = DateTime::<Utc>::from_timestamp(created_at_epoch, 0)
                .ok_or_else(|| Error::Internal("corrupt workflow memory timestamp".to_string()))?;

            scored.push((
                WorkflowMemory {
                    id: WorkflowMemoryId(id),
                    summary_embedding,
                    source_session_id: SessionId(source_session_id),
                    useful_chunk_ids,
                    created_at,
                },
                sim,
            ));
        }

        scored.sort_by(|a, b| b.1.partial_cmp(&a.1).unwrap_or(std::cmp::Ordering::Equal));
        scored.truncate(top_m);
        Ok(scored)
    }

    async fn record(
        &self,
        summary_vec: Vec<f32>,
        source_session_id: SessionId,
        useful_chunk_ids: Vec<ChunkId>,
    ) -> Result<WorkflowMemoryId> {
        let conn = self.get_connection().await?;

        let mut existing = conn
            .query(
                "SELECT 1 FROM workflow_memories WHERE source_session_id = ?1",
                params![source_session_id.0],
            )
            .await
            .map_err(|e| Error::Store(format!("checking existing workflow memory: {e}")))?;
        if existing.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))?.is_some() {
            return Err(Error::InvalidInput(format!(
                "workflow memory already recorded for session {source_session_id}"
            )));
        }

        let id = WorkflowMemoryId::new();
        let embedding_text = encode_embedding(&summary_vec)?;
        let useful_ids: Vec<i64> = useful_chunk_ids.iter().map(|c| c.0).collect();
        let useful_ids_text = serde_json::to_string(&useful_ids)?;

        conn.execute(
            "INSERT INTO workflow_memories (id, summary_embedding, source_session_id, useful_chunk_ids) \
             VALUES (?1, ?2, ?3, ?4)",
            params![id.0.to_string(), embedding_text, source_session_id.0, useful_ids_text],
        )
        .await
        .map_err(|e| Error::Store(format!("inserting workflow memory: {e}")))?;

        Ok(id)
    }

    async fn count(&self) -> Result<usize> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query("SELECT COUNT(*) FROM workflow_memories", ())
            .await
            .map_err(|e| Error::Store(format!("counting workflow memories: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| Error::Store(format!("reading row: {e}")))?
            .ok_or_else(|| Error::Internal("COUNT query returned no row".to_string()))?;
        let count: i64 = row.get(0).map_err(|e| Error::Store(format!("reading count: {e}")))?;
        Ok(count as usize)
    }
}

fn feedback_status_to_str(status: FeedbackStatus) -> &'static str {
    match status {
        FeedbackStatus::Pending => "pending",
        FeedbackStatus::Correct => "correct",
        FeedbackStatus::Incorrect => "incorrect",
    }
}

fn feedback_status_from_str(s: &str) -> Result<FeedbackStatus> {
    match s {
        "pending" => Ok(FeedbackStatus::Pending),
        "correct" => Ok(FeedbackStatus::Correct),
        "incorrect" => Ok(FeedbackStatus::Incorrect),
        other => Err(Error::Internal(format!("corrupt feedback status: {other}"))),
    }
}

fn usefulness_to_str(u: Usefulness) -> &'static str {
    match u {
        Usefulness::Useful => "useful",
        Usefulness::NotUseful => "not_useful",
        Usefulness::Unknown => "unknown",
    }
}

fn usefulness_from_str(s: &str) -> Result<Usefulness> {
    match s {
        "useful" => Ok(Usefulness::Useful),
        "not_useful" => Ok(Usefulness::NotUseful),
        "unknown" => Ok(Usefulness::Unknown),
        other => Err(Error::Internal(format!("corrupt usefulness: {other}"))),
    }
}

#[async_trait]
impl SessionLog for SqlStore {
    async fn create(&self, session: Session) -> Result<SessionId> {
        let conn = self.get_connection().await?;

        let query_embedding_text = encode_embedding(&session.query_embedding)?;
        let reasoning_steps_text = serde_json::to_string(&session.reasoning_steps)?;
        let status = feedback_status_to_str(session.feedback_status);

        conn.execute(
            "INSERT INTO sessions (query, query_embedding, answer, reasoning_steps, \
             feedback_status, correction_text) VALUES (?1, ?2, ?3, ?4, ?5, ?6)",
            params![
                session.query,
                query_embedding_text,
                session.answer,
                reasoning_steps_text,
                status,
                session.correction_text.clone()
            ],
        )
        .await
        .map_err(|e| Error::Store(format!("inserting session: {e}")))?;

        let session_id = conn.last_insert_rowid();

        for entry in &session.retrieved {
            conn.execute(
                "INSERT INTO embedding_links (session_id, chunk_id, rank, raw_similarity, \
                 effective_score, workflow_boosted, was_useful) VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7)",
                params![
                    session_id,
                    entry.chunk_id.0,
                    entry.rank as i64,
                    entry.raw_similarity,
                    entry.effective_score,
                    i64::from(entry.workflow_boosted),
                    usefulness_to_str(entry.was_useful)
                ],
            )
            .await
            .map_err(|e| Error::Store(format!("inserting embedding link: {e}")))?;
        }

        Ok(SessionId(session_id))
    }

    async fn get(&self, id: SessionId) -> Result<Session> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query(
                "SELECT query, query_embedding, answer, reasoning_steps, feedback_status, \
                 correction_text, created_at FROM sessions WHERE id = ?1",
                params![id.0],
            )
            .await
            .map_err(|e| Error::Store(format!("fetching session: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| Error::Store(format!("reading row: {e}")))?
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;

        let query: String = row.get(0).map_err(|e| Error::Store(format!("reading query: {e}")))?;
        let query_embedding_text: String =
            row.get(1).map_err(|e| Error::Store(format!("reading query embedding: {e}")))?;
        let answer: String = row.get(2).map_err(|e| Error::Store(format!("reading answer: {e}")))?;
        let reasoning_steps_text: String =
            row.get(3).map_err(|e| Error::Store(format!("reading reasoning steps: {e}")))?;
        let feedback_status_text: String =
            row.get(4).map_err(|e| Error::Store(format!("reading feedback status: {e}")))?;
        let correction_text: Option<String> =
            row.get(5).map_err(|e| Error::Store(format!("reading correction: {e}")))?;
        let created_at_epoch: i64 =
            row.get(6).map_err(|e| Error::Store(format!("reading created_at: {e}")))?;

        let retrieved = self.fetch_embedding_links(id).await?;

        Ok(Session {
            id,
            query,
            query_embedding: decode_embedding(&query_embedding_text)?,
            answer,
            retrieved,
            reasoning_steps: serde_json::from_str::<Vec<ReasoningStep>>(&reasoning_steps_text)?,
            feedback_status: feedback_status_from_str(&feedback_status_text)?,
            correction_text,
            created_at: DateTime::<Utc>::from_timestamp(created_at_epoch, 0)
                .ok_or_else(|| Error::Internal("corrupt session timestamp".to_string()))?,
        })
    }

    async fn list_pending(&self) -> Result<Vec<Session>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT id FROM sessions WHERE feedback_status = 'pending' ORDER BY id DESC",
                (),
            )
            .await
            .map_err(|e| Error::Store(format!("listing pending sessions: {e}")))?;

        let mut ids = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))? {
            let id: i64 = row.get(0).map_err(|e| Error::Store(format!("reading id: {e}")))?;
            ids.push(SessionId(id));
        }

        let mut sessions = Vec::with_capacity(ids.len());
        for id in ids {
            sessions.push(self.get(id).await?);
        }
        Ok(sessions)
    }

    async fn update_feedback(
        &self,
        id: SessionId,
        status: FeedbackStatus,
        usefulness: &[(ChunkId, Usefulness)],
        correction: Option<String>,
    ) -> Result<()> {
        let conn = self.get_connection().await?;

        let mut rows = conn
            .query("SELECT feedback_status FROM sessions WHERE id = ?1", params![id.0])
            .await
            .map_err(|e| Error::Store(format!("fetching session status: {e}")))?;
        let row = rows
            .next()
            .await
            .map_err(|e| Error::Store(format!("reading row: {e}")))?
            .ok_or_else(|| Error::NotFound(format!("session {id}")))?;
        let current_status_text: String =
            row.get(0).map_err(|e| Error::Store(format!("reading current status: {e}")))?;
        if feedback_status_from_str(&current_status_text)? != FeedbackStatus::Pending {
            return Err(Error::AlreadyFinalised(format!("session {id}")));
        }

        conn.execute(
            "UPDATE sessions SET feedback_status = ?1, correction_text = ?2 WHERE id = ?3",
            params![feedback_status_to_str(status), correction, id.0],
        )
        .await
        .map_err(|e| Error::Store(format!("updating session feedback: {e}")))?;

        for (chunk_id, useful) in usefulness {
            conn.execute(
                "UPDATE embedding_links SET was_useful = ?1 WHERE session_id = ?2 AND chunk_id = ?3",
                params![usefulness_to_str(*useful), id.0, chunk_id.0],
            )
            .await
            .map_err(|e| Error::Store(format!("updating embedding link usefulness: {e}")))?;
        }

        Ok(())
    }

    async fn stats(&self) -> Result<SessionStats> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT feedback_status, COUNT(*) FROM sessions GROUP BY feedback_status",
                (),
            )
            .await
            .map_err(|e| Error::Store(format!("aggregating session stats: {e}")))?;

        let mut stats = SessionStats::default();
        while let Some(row) = rows.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))? {
            let status_text: String = row.get(0).map_err(|e| Error::Store(format!("reading status: {e}")))?;
            let count: i64 = row.get(1).map_err(|e| Error::Store(format!("reading count: {e}")))?;
            let count = count as u64;
            stats.total += count;
            match feedback_status_from_str(&status_text)? {
                FeedbackStatus::Pending => stats.pending = count,
                FeedbackStatus::Correct => stats.correct = count,
                FeedbackStatus::Incorrect => stats.incorrect = count,
            }
        }
        Ok(stats)
    }
}

impl SqlStore {
    async fn fetch_embedding_links(&self, session_id: SessionId) -> Result<Vec<RetrievedEntry>> {
        let conn = self.get_connection().await?;
        let mut rows = conn
            .query(
                "SELECT chunk_id, rank, raw_similarity, effective_score, workflow_boosted, was_useful \
                 FROM embedding_links WHERE session_id = ?1 ORDER BY rank ASC",
                params![session_id.0],
            )
            .await
            .map_err(|e| Error::Store(format!("fetching embedding links: {e}")))?;

        let mut entries = Vec::new();
        while let Some(row) = rows.next().await.map_err(|e| Error::Store(format!("reading row: {e}")))? {
            let chunk_id: i64 = row.get(0).map_err(|e| Error::Store(format!("reading chunk id: {e}")))?;
            let rank: i64 = row.get(1).map_err(|e| Error::Store(format!("reading rank: {e}")))?;
            let raw_similarity: f64 = row.get(2).map_err(|e| Error::Store(format!("reading raw similarity: {e}")))?;
            let effective_score: f64 =
                row.get(3).map_err(|e| Error::Store(format!("reading effective score: {e}")))?;
            let workflow_boosted: i64 =
                row.get(4).map_err(|e| Error::Store(format!("reading workflow_boosted: {e}")))?;
            let was_useful_text: String =
                row.get(5).map_err(|e| Error::Store(format!("reading was_useful: {e}")))?;

            entries.push(RetrievedEntry {
                chunk_id: ChunkId(chunk_id),
                rank: rank as usize,
                raw_similarity,
                effective_score,
                workflow_boosted: workflow_boosted != 0,
                was_useful: usefulness_from_str(&was_useful_text)?,
            });
        }
        Ok(entries)
    }
}
