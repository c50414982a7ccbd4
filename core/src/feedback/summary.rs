//! Composes the deterministic summary text embedded into a workflow
//! memory's `summary_embedding`.

use crate::types::Chunk;

/// Deterministically combine the session query, a short provenance slug
/// per useful chunk, and a success marker. The exact wording is not
/// normative per the contract; only that it include the query and the
/// set of useful chunk provenances.
#[must_use]
pub fn compose_summary(query: &str, useful_chunks: &[Chunk]) -> String {
    let mut slugs: Vec<String> = useful_chunks.iter().map(Chunk::provenance_slug).collect();
    slugs.sort();

    format!("SUCCESSFUL QUERY: {query}\nUSEFUL SOURCES: {}", slugs.join(", "))
}
