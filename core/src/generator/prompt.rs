//! Prompt assembly from retrieved chunks.

use crate::types::Chunk;

/// Build the prompt sent to the LLM provider: system role, enumerated
/// retrieved chunks with provenance, then the echoed query.
#[must_use]
pub fn build_prompt(query: &str, chunks: &[Chunk]) -> String {
    let mut prompt = String::from(
        "You are a documentation assistant. Answer the question using only the \
         numbered context chunks below. Cite chunk provenance when relevant.\n\n",
    );

    for (i, chunk) in chunks.iter().enumerate() {
        prompt.push_str(&format!(
            "[{}] ({}) {}\n{}\n\n",
            i + 1,
            chunk.provenance_slug(),
            chunk.section,
            chunk.content
        ));
    }

    prompt.push_str(&format!("Question: {query}\n"));
    prompt
}
