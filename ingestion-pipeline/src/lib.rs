pub mod chunker;
pub mod markdown;
pub mod pipeline;

pub use chunker::{ChunkerConfig, DocumentChunk};
pub use pipeline::IngestionPipeline;
