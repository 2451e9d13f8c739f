pub mod answer;
pub mod orchestrator;
pub mod retriever;
pub mod scoring;

use common::storage::types::book_chunk::BookChunk;

pub use answer::{GenerationProvider, OpenAiGenerationProvider};
pub use orchestrator::{QueryConfig, QueryOutcome, QueryService};

/// A retrieved chunk plus its cosine similarity to the query.
#[derive(Debug, Clone)]
pub struct ScoredChunk {
    pub chunk: BookChunk,
    pub similarity: f32,
}
