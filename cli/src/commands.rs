//! Handlers for the seven `AskdocsEngine` operations, each producing a
//! serialisable result type implementing [`crate::output::Output`].

use crate::output::Output;
use askdocs_core::engine::{AskOutput, BulkFeedbackOutcome, EngineStats, InspectedSession, WorkflowSearchHit};
use askdocs_core::feedback::FeedbackOutcome;
use askdocs_core::types::{ChunkId, FeedbackStatus, Usefulness};
use askdocs_core::AskdocsEngine;
use serde::Serialize;

#[derive(Serialize)]
pub struct AskResult {
    pub answer: String,
    pub session_id: i64,
    pub sources: Vec<String>,
    pub reasoning_steps: Vec<String>,
}

impl From<AskOutput> for AskResult {
    fn from(out: AskOutput) -> Self {
        let reasoning_steps = out
            .reasoning_chain
            .map(|trace| {
                trace
                    .steps
                    .iter()
                    .map(|s| format!("[{}] {}", s.phase.as_str(), s.description))
                    .collect()
            })
            .unwrap_or_default();
        Self { answer: out.answer, session_id: out.session_id.0, sources: out.sources, reasoning_steps }
    }
}

impl Output for AskResult {
    fn write_human(&self) -> String {
        let mut out = format!("{}\n\nsession: {}\n", self.answer, self.session_id);
        if !self.sources.is_empty() {
            out.push_str("\nsources:\n");
            for s in &self.sources {
                out.push_str(&format!("  - {s}\n"));
            }
        }
        if !self.reasoning_steps.is_empty() {
            out.push_str("\nreasoning:\n");
            for s in &self.reasoning_steps {
                out.push_str(&format!("  {s}\n"));
            }
        }
        out
    }
}

/// `ASK`.
///
/// # Errors
///
/// Propagates the engine's error.
pub async fn ask(
    engine: &AskdocsEngine,
    query: &str,
    k: usize,
    include_trace: bool,
) -> anyhow::Result<AskResult> {
    Ok(engine.ask(query, k, include_trace).await?.into())
}

#[derive(Serialize)]
pub struct InspectedEntryResult {
    pub chunk_id: i64,
    pub rank: usize,
    pub raw_similarity: f64,
    pub effective_score: f64,
    pub accuracy_weight: f64,
    pub content_preview: String,
    pub was_useful: String,
}

#[derive(Serialize)]
pub struct InspectSessionResult {
    pub session_id: i64,
    pub query: String,
    pub answer: String,
    pub feedback_status: String,
    pub entries: Vec<InspectedEntryResult>,
}

impl From<InspectedSession> for InspectSessionResult {
    fn from(inspected: InspectedSession) -> Self {
        let entries = inspected
            .entries
            .into_iter()
            .map(|e| InspectedEntryResult {
                chunk_id: e.chunk_id.0,
                rank: e.rank,
                raw_similarity: e.raw_similarity,
                effective_score: e.effective_score,
                accuracy_weight: e.accuracy_weight,
                content_preview: e.content_preview,
                was_useful: usefulness_str(e.was_useful).to_string(),
            })
            .collect();
        Self {
            session_id: inspected.session.id.0,
            query: inspected.session.query,
            answer: inspected.session.answer,
            feedback_status: feedback_status_str(inspected.session.feedback_status).to_string(),
            entries,
        }
    }
}

impl Output for InspectSessionResult {
    fn write_human(&self) -> String {
        let mut out = format!(
            "session {}: {} ({})\nquery: {}\nanswer: {}\n\nretrieved:\n",
            self.session_id, self.feedback_status, self.session_id, self.query, self.answer
        );
        for e in &self.entries {
            out.push_str(&format!(
                "  #{} chunk {} sim={:.3} score={:.3} weight={:.2} useful={}\n      {}\n",
                e.rank, e.chunk_id, e.raw_similarity, e.effective_score, e.accuracy_weight, e.was_useful,
                e.content_preview
            ));
        }
        out
    }
}

/// `INSPECT SESSION`.
///
/// # Errors
///
/// Propagates the engine's error.
pub async fn inspect_session(engine: &AskdocsEngine, session_id: i64) -> anyhow::Result<InspectSessionResult> {
    Ok(engine.inspect_session(askdocs_core::types::SessionId(session_id)).await?.into())
}

#[derive(Serialize)]
pub struct FeedbackResult {
    pub chunks_updated: usize,
    pub workflow_memory_created: bool,
}

impl From<FeedbackOutcome> for FeedbackResult {
    fn from(outcome: FeedbackOutcome) -> Self {
        Self { chunks_updated: outcome.chunks_updated, workflow_memory_created: outcome.workflow_memory_created }
    }
}

impl Output for FeedbackResult {
    fn write_human(&self) -> String {
        format!(
            "updated {} chunk(s); workflow memory created: {}",
            self.chunks_updated, self.workflow_memory_created
        )
    }
}

/// `FEEDBACK (single)`.
///
/// # Errors
///
/// Propagates the engine's error.
pub async fn feedback(
    engine: &AskdocsEngine,
    session_id: i64,
    is_correct: bool,
    chunk_feedback: &[(i64, bool)],
    correction: Option<String>,
) -> anyhow::Result<FeedbackResult> {
    let chunk_feedback: Vec<_> = chunk_feedback
        .iter()
        .map(|(id, useful)| askdocs_core::feedback::ChunkFeedback { chunk_id: ChunkId(*id), was_useful: *useful })
        .collect();
    Ok(engine
        .feedback(askdocs_core::types::SessionId(session_id), is_correct, &chunk_feedback, correction)
        .await?
        .into())
}

#[derive(Serialize)]
pub struct BulkFeedbackResult {
    pub succeeded: usize,
    pub failed: usize,
    pub items: Vec<BulkFeedbackItemResult>,
}

#[derive(Serialize)]
pub struct BulkFeedbackItemResult {
    pub session_id: i64,
    pub ok: bool,
    pub detail: String,
}

impl From<BulkFeedbackOutcome> for BulkFeedbackResult {
    fn from(outcome: BulkFeedbackOutcome) -> Self {
        let items = outcome
            .items
            .into_iter()
            .map(|item| match item.result {
                Ok(applied) => BulkFeedbackItemResult {
                    session_id: item.session_id.0,
                    ok: true,
                    detail: format!(
                        "updated {} chunk(s); workflow memory created: {}",
                        applied.chunks_updated, applied.workflow_memory_created
                    ),
                },
                Err(e) => BulkFeedbackItemResult { session_id: item.session_id.0, ok: false, detail: e },
            })
            .collect();
        Self { succeeded: outcome.succeeded, failed: outcome.failed, items }
    }
}

impl Output for BulkFeedbackResult {
    fn write_human(&self) -> String {
        let mut out = format!("{} succeeded, {} failed\n", self.succeeded, self.failed);
        for item in &self.items {
            let mark = if item.ok { "ok" } else { "FAIL" };
            out.push_str(&format!("  [{mark}] session {}: {}\n", item.session_id, item.detail));
        }
        out
    }
}

/// `FEEDBACK (bulk)`. A request item's own feedback failure does not fail
/// the call as a whole, so this never returns `Err` from the engine call
/// itself.
pub async fn feedback_bulk(
    engine: &AskdocsEngine,
    requests: Vec<(i64, bool, Vec<(i64, bool)>, Option<String>)>,
) -> BulkFeedbackResult {
    let requests = requests
        .into_iter()
        .map(|(session_id, is_correct, chunk_feedback, correction)| askdocs_core::engine::FeedbackRequest {
            session_id: askdocs_core::types::SessionId(session_id),
            is_correct,
            chunk_feedback: chunk_feedback
                .into_iter()
                .map(|(id, useful)| askdocs_core::feedback::ChunkFeedback { chunk_id: ChunkId(id), was_useful: useful })
                .collect(),
            correction,
        })
        .collect();
    engine.feedback_bulk(requests).await.into()
}

#[derive(Serialize)]
pub struct ChunkEditResult {
    pub chunk_id: i64,
    pub new_weight: f64,
}

impl Output for ChunkEditResult {
    fn write_human(&self) -> String {
        format!("chunk {} weight is now {:.3}", self.chunk_id, self.new_weight)
    }
}

/// `CHUNK EDIT`.
///
/// # Errors
///
/// Propagates the engine's error.
pub async fn chunk_edit(
    engine: &AskdocsEngine,
    chunk_id: i64,
    new_weight: f64,
    reason: &str,
) -> anyhow::Result<ChunkEditResult> {
    let new_weight = engine.chunk_edit(ChunkId(chunk_id), new_weight, reason).await?;
    Ok(ChunkEditResult { chunk_id, new_weight })
}

#[derive(Serialize)]
pub struct WorkflowSearchResult {
    pub hits: Vec<WorkflowSearchHitResult>,
}

#[derive(Serialize)]
pub struct WorkflowSearchHitResult {
    pub memory_id: String,
    pub source_session_id: i64,
    pub similarity: f64,
    pub useful_chunk_ids: Vec<i64>,
}

impl From<Vec<WorkflowSearchHit>> for WorkflowSearchResult {
    fn from(hits: Vec<WorkflowSearchHit>) -> Self {
        Self {
            hits: hits
                .into_iter()
                .map(|h| WorkflowSearchHitResult {
                    memory_id: h.memory.id.to_string(),
                    source_session_id: h.memory.source_session_id.0,
                    similarity: h.similarity,
                    useful_chunk_ids: h.memory.useful_chunk_ids.iter().map(|c| c.0).collect(),
                })
                .collect(),
        }
    }
}

impl Output for WorkflowSearchResult {
    fn write_human(&self) -> String {
        if self.hits.is_empty() {
            return "no workflow memories matched".to_string();
        }
        let mut out = String::new();
        for hit in &self.hits {
            out.push_str(&format!(
                "{} sim={:.3} from session {} useful={:?}\n",
                hit.memory_id, hit.similarity, hit.source_session_id, hit.useful_chunk_ids
            ));
        }
        out
    }
}

/// `WORKFLOW SEARCH`.
///
/// # Errors
///
/// Propagates the engine's error.
pub async fn workflow_search(
    engine: &AskdocsEngine,
    query_embedding: &[f32],
    min_similarity: f64,
    top_k: usize,
) -> anyhow::Result<WorkflowSearchResult> {
    Ok(engine.workflow_search(query_embedding, min_similarity, top_k).await?.into())
}

#[derive(Serialize)]
pub struct StatsResult {
    pub total_sessions: u64,
    pub accuracy_rate: Option<f64>,
    pub pending_feedback_count: u64,
    pub top_chunks_by_usefulness: Vec<(i64, f64)>,
    pub asks_served: u64,
    pub feedback_applied: u64,
    pub workflow_memories_created: u64,
}

impl From<EngineStats> for StatsResult {
    fn from(stats: EngineStats) -> Self {
        Self {
            total_sessions: stats.total_sessions,
            accuracy_rate: stats.accuracy_rate,
            pending_feedback_count: stats.pending_feedback_count,
            top_chunks_by_usefulness: stats.top_chunks_by_usefulness.into_iter().map(|(id, r)| (id.0, r)).collect(),
            asks_served: stats.asks_served,
            feedback_applied: stats.feedback_applied,
            workflow_memories_created: stats.workflow_memories_created,
        }
    }
}

impl Output for StatsResult {
    fn write_human(&self) -> String {
        let accuracy = self
            .accuracy_rate
            .map(|r| format!("{:.1}%", r * 100.0))
            .unwrap_or_else(|| "n/a (no resolved feedback yet)".to_string());
        let mut out = format!(
            "sessions: {}\naccuracy: {}\npending feedback: {}\nasks served: {}\nfeedback applied: {}\nworkflow memories created: {}\n",
            self.total_sessions,
            accuracy,
            self.pending_feedback_count,
            self.asks_served,
            self.feedback_applied,
            self.workflow_memories_created
        );
        if !self.top_chunks_by_usefulness.is_empty() {
            out.push_str("\ntop chunks by usefulness:\n");
            for (id, rate) in &self.top_chunks_by_usefulness {
                out.push_str(&format!("  chunk {id}: {:.1}%\n", rate * 100.0));
            }
        }
        out
    }
}

/// `STATS`.
///
/// # Errors
///
/// Propagates the engine's error.
pub async fn stats(engine: &AskdocsEngine) -> anyhow::Result<StatsResult> {
    Ok(engine.stats().await?.into())
}

fn feedback_status_str(status: FeedbackStatus) -> &'static str {
    match status {
        FeedbackStatus::Pending => "pending",
        FeedbackStatus::Correct => "correct",
        FeedbackStatus::Incorrect => "incorrect",
    }
}

fn usefulness_str(usefulness: Usefulness) -> &'static str {
    match usefulness {
        Usefulness::Useful => "useful",
        Usefulness::NotUseful => "not_useful",
        Usefulness::Unknown => "unknown",
    }
}
