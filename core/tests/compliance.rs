//! BDD-style compliance tests for the quantified invariants and boundary
//! behaviours of §8: P1-P5 (weight bounds, rank contiguity, finalisation,
//! workflow-memory provenance, usefulness bound) and B1-B3 (query length,
//! weight clamping, short-candidate-list retrieval).
//!
//! All tests follow the Given-When-Then pattern and focus on observable
//! behaviour through `AskdocsEngine`/`FeedbackProcessor`, not internals.

mod common;

use askdocs_core::error::Error;
use askdocs_core::feedback::ChunkFeedback;
use askdocs_core::types::ChunkId;
use common::{build_engine, chunk, circle_embedding, EngineConfigOverrides, QUERY_AXIS};

// ============================================================================
// P1: W_min <= weight <= W_max, for all chunks at all times
// ============================================================================

#[tokio::test]
async fn p1_weight_never_leaves_its_configured_bounds_even_under_repeated_feedback() {
    // Given: a chunk at the upper bound
    let overrides = EngineConfigOverrides { delta: 0.3, w_min: 0.5, w_max: 2.0, ..EngineConfigOverrides::default() };
    let test = build_engine(overrides);
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 2.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());

    // When: positive feedback is applied repeatedly across separate sessions
    for _ in 0..5 {
        let output = test.engine.ask("q", 1, false).await.expect("asks");
        test.engine
            .feedback(output.session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
            .await
            .expect("applies");
    }

    // Then: weight never exceeds W_max
    let inspected = test
        .engine
        .inspect_session(test.engine.ask("q", 1, false).await.expect("asks").session_id)
        .await
        .expect("inspects");
    assert_eq!(inspected.entries[0].accuracy_weight, 2.0);
}

#[tokio::test]
async fn p1_chunk_edit_rejects_a_weight_outside_the_configured_bounds() {
    // Given: an engine with bounds [0.5, 2.0]
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 1.0));

    // When: an out-of-range weight is requested
    let result = test.engine.chunk_edit(ChunkId(1), 2.5, "manual").await;

    // Then: it is rejected, and the stored weight is untouched
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

// ============================================================================
// P2: ranks form 1..n with no gaps; effective_score is non-increasing
// ============================================================================

#[tokio::test]
async fn p2_retrieved_ranks_are_contiguous_and_scores_are_non_increasing() {
    // Given: five chunks with distinct similarities
    let test = build_engine(EngineConfigOverrides::default());
    for (id, sim) in [(1, 0.95), (2, 0.80), (3, 0.60), (4, 0.40), (5, 0.20)] {
        test.chunk_store.insert(chunk(id, circle_embedding(sim), 1.0));
    }
    test.embedder.register("q", QUERY_AXIS.to_vec());

    // When: asked with k=5
    let output = test.engine.ask("q", 5, true).await.expect("asks");
    let trace = output.reasoning_chain.expect("trace requested");

    // Then: ranks are exactly 1..=5 with no gaps, in order
    let ranks: Vec<usize> = trace.retrieved.iter().map(|r| r.rank).collect();
    assert_eq!(ranks, vec![1, 2, 3, 4, 5]);

    // And: effective_score never increases moving down the rank list
    for window in trace.retrieved.windows(2) {
        assert!(window[0].effective_score >= window[1].effective_score);
    }
}

// ============================================================================
// P3 / R1 overlap: a second feedback call leaves the store unchanged
// (idempotence itself is exercised in property_tests.rs; this checks the
// contract from the engine's point of view)
// ============================================================================

#[tokio::test]
async fn p3_a_finalised_session_rejects_a_second_feedback_call() {
    // Given: a session with feedback already applied
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 1.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());
    let output = test.engine.ask("q", 1, false).await.expect("asks");
    test.engine
        .feedback(output.session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
        .await
        .expect("first call applies");

    // When: feedback is applied again
    let result = test
        .engine
        .feedback(output.session_id, false, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: false }], None)
        .await;

    // Then: it is rejected as AlreadyFinalised
    assert!(matches!(result, Err(Error::AlreadyFinalised(_))));
}

// ============================================================================
// P4: every WorkflowMemory's session is `correct` and its useful_chunk_ids
// intersects the session's retrieved list non-trivially
// ============================================================================

#[tokio::test]
async fn p4_workflow_memory_is_only_created_for_correct_sessions_with_a_useful_chunk() {
    // Given: a session marked correct with no useful chunks
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 1.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());
    let output = test.engine.ask("q", 1, false).await.expect("asks");

    // When: feedback says correct but nothing was useful
    let outcome = test
        .engine
        .feedback(output.session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: false }], None)
        .await
        .expect("applies");

    // Then: no workflow memory is created
    assert!(!outcome.workflow_memory_created);
    let hits = test.engine.workflow_search(&QUERY_AXIS, 0.0, 10).await.expect("searches");
    assert!(hits.is_empty());
}

#[tokio::test]
async fn p4_workflow_memory_useful_chunk_ids_are_a_subset_of_the_retrieved_list() {
    // Given: a session retrieving two chunks, one reported useful
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(0.9), 1.0));
    test.chunk_store.insert(chunk(2, circle_embedding(0.8), 1.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());
    test.embedder.register(
        "SUCCESSFUL QUERY: q\nUSEFUL SOURCES: acme/widgets/docs/guide.md#section",
        QUERY_AXIS.to_vec(),
    );
    let output = test.engine.ask("q", 2, false).await.expect("asks");

    // When: feedback reports chunk 1 useful, chunk 2 not
    test.engine
        .feedback(
            output.session_id,
            true,
            &[
                ChunkFeedback { chunk_id: ChunkId(1), was_useful: true },
                ChunkFeedback { chunk_id: ChunkId(2), was_useful: false },
            ],
            None,
        )
        .await
        .expect("applies");

    // Then: the recorded memory names exactly the useful chunk
    let hits = test.engine.workflow_search(&QUERY_AXIS, 0.0, 10).await.expect("searches");
    assert_eq!(hits.len(), 1);
    assert_eq!(hits[0].memory.useful_chunk_ids, vec![ChunkId(1)]);
}

// ============================================================================
// P5: times_useful <= times_retrieved, for any chunk
// ============================================================================

#[tokio::test]
async fn p5_times_useful_never_exceeds_times_retrieved() {
    // Given: a chunk fed back on as useful multiple times
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 1.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());

    for _ in 0..3 {
        let output = test.engine.ask("q", 1, false).await.expect("asks");
        test.engine
            .feedback(output.session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
            .await
            .expect("applies");
    }

    // Then: the usefulness rate reported by STATS never exceeds 1.0
    let stats = test.engine.stats().await.expect("stats");
    let (_, rate) = stats.top_chunks_by_usefulness.iter().find(|(id, _)| *id == ChunkId(1)).expect("present");
    assert!(*rate <= 1.0);
}

// ============================================================================
// B1: query at exactly Q_max characters is accepted; Q_max+1 is rejected
// ============================================================================

#[tokio::test]
async fn b1_query_at_exactly_q_max_is_accepted_and_one_over_is_rejected() {
    // Given: the default Q_max of 4000
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 1.0));
    let at_limit = "q".repeat(4000);
    let over_limit = "q".repeat(4001);
    test.embedder.register(at_limit.clone(), QUERY_AXIS.to_vec());

    // When/Then: the limit query succeeds
    let result = test.engine.ask(&at_limit, 1, false).await;
    assert!(result.is_ok());

    // When/Then: one character over is rejected before the embedder is ever called
    let result = test.engine.ask(&over_limit, 1, false).await;
    assert!(matches!(result, Err(Error::InvalidInput(_))));
}

// ============================================================================
// B2: positive feedback at W_max leaves the weight at W_max
// ============================================================================

#[tokio::test]
async fn b2_positive_feedback_at_w_max_does_not_overshoot() {
    // Given: a chunk already at W_max
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(1.0), 2.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());
    let output = test.engine.ask("q", 1, false).await.expect("asks");

    // When: positive feedback is applied
    test.engine
        .feedback(output.session_id, true, &[ChunkFeedback { chunk_id: ChunkId(1), was_useful: true }], None)
        .await
        .expect("applies");

    // Then: the weight remains exactly W_max
    let inspected = test.engine.inspect_session(output.session_id).await.expect("inspects");
    assert_eq!(inspected.entries[0].accuracy_weight, 2.0);
}

// ============================================================================
// B3: fewer than K chunks exist: retrieval returns all of them, ranks 1..m
// ============================================================================

#[tokio::test]
async fn b3_fewer_chunks_than_k_returns_all_of_them_with_contiguous_ranks() {
    // Given: two chunks, k=5 requested
    let test = build_engine(EngineConfigOverrides::default());
    test.chunk_store.insert(chunk(1, circle_embedding(0.9), 1.0));
    test.chunk_store.insert(chunk(2, circle_embedding(0.5), 1.0));
    test.embedder.register("q", QUERY_AXIS.to_vec());

    // When: asked for k=5
    let output = test.engine.ask("q", 5, true).await.expect("asks");
    let trace = output.reasoning_chain.expect("trace requested");

    // Then: only the two existing chunks are returned, ranked 1 and 2
    assert_eq!(trace.retrieved.len(), 2);
    assert_eq!(trace.retrieved[0].rank, 1);
    assert_eq!(trace.retrieved[1].rank, 2);
}
