use std::{path::Path, sync::Arc};

use async_trait::async_trait;
use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::{book_chunk::BookChunk, ingestion_run::IngestionRun},
    },
    utils::embedding::EmbeddingProvider,
};
use serde_json::json;
use tracing::{info, instrument, warn};

use crate::chunker::ChunkerConfig;

/// Embedding seam for the pipeline. Production wires the shared
/// `EmbeddingProvider`; tests inject failing stubs to exercise run-failure
/// paths.
#[async_trait]
pub trait EmbeddingService: Send + Sync {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError>;
    fn dimension(&self) -> usize;
    fn model_code(&self) -> String;
}

#[async_trait]
impl EmbeddingService for EmbeddingProvider {
    async fn embed_batch(&self, texts: Vec<String>) -> Result<Vec<Vec<f32>>, AppError> {
        EmbeddingProvider::embed_batch(self, texts).await
    }

    fn dimension(&self) -> usize {
        EmbeddingProvider::dimension(self)
    }

    fn model_code(&self) -> String {
        EmbeddingProvider::model_code(self).to_string()
    }
}

/// Offline job that turns a directory of markdown sources into indexed
/// chunks. Not meant to run inline with user-facing requests.
pub struct IngestionPipeline {
    db: Arc<SurrealDbClient>,
    embedding: Arc<dyn EmbeddingService>,
    chunker: ChunkerConfig,
}

impl IngestionPipeline {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedding: Arc<dyn EmbeddingService>,
        chunker: ChunkerConfig,
    ) -> Self {
        Self {
            db,
            embedding,
            chunker,
        }
    }

    /// Runs one full ingestion pass over `source_dir`. Returns the run
    /// record in its terminal state: `completed` with final counts, or
    /// `failed` with the error message and the counts reached so far.
    /// A `running` run row belonging to another ingestion rejects the
    /// start; documents already upserted by a failing run are kept, while
    /// the failing document itself is rolled back.
    #[instrument(skip(self), fields(source_dir = %source_dir.display()))]
    pub async fn run(&self, source_dir: &Path) -> Result<IngestionRun, AppError> {
        let metadata = json!({
            "source_dir": source_dir.display().to_string(),
            "chunk_max_chars": self.chunker.max_chars,
            "chunk_overlap_chars": self.chunker.overlap_chars,
            "embedding_model": self.embedding.model_code(),
            "embedding_dimensions": self.embedding.dimension(),
        });
        let run = IngestionRun::begin(&self.db, metadata).await?;
        info!(run_id = %run.id, "Ingestion run started");

        let mut total_chunks = 0;
        let mut total_files = 0;

        match self
            .ingest_all(source_dir, &mut total_chunks, &mut total_files)
            .await
        {
            Ok(()) => {
                let run = run.complete(&self.db, total_chunks, total_files).await?;
                info!(
                    run_id = %run.id,
                    total_files,
                    total_chunks,
                    "Ingestion run completed"
                );
                Ok(run)
            }
            Err(err) => {
                warn!(run_id = %run.id, error = %err, "Ingestion run failed");
                run.fail(&self.db, total_chunks, total_files, err.to_string())
                    .await
            }
        }
    }

    async fn ingest_all(
        &self,
        source_dir: &Path,
        total_chunks: &mut usize,
        total_files: &mut usize,
    ) -> Result<(), AppError> {
        // Dimension mismatch against an existing collection is fatal and
        // marks the run failed.
        self.db
            .ensure_collection(&self.embedding.model_code(), self.embedding.dimension())
            .await?;

        let files = discover_markdown_files(source_dir)?;
        if files.is_empty() {
            return Err(AppError::Validation(format!(
                "no markdown files found in {}",
                source_dir.display()
            )));
        }
        info!(file_count = files.len(), "Discovered source files");

        for path in files {
            let count = self.ingest_document(&path).await?;
            *total_chunks += count;
            *total_files += 1;
        }

        Ok(())
    }

    /// Per-document atomicity: embeddings are generated before any write,
    /// and a failed upsert rolls back the document's chunks before the
    /// error propagates.
    async fn ingest_document(&self, path: &Path) -> Result<usize, AppError> {
        let source_file = path
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .ok_or_else(|| {
                AppError::Validation(format!("invalid source path {}", path.display()))
            })?;

        let content = tokio::fs::read_to_string(path).await?;
        let chunks = self.chunker.chunk_document(&content, &source_file)?;
        if chunks.is_empty() {
            info!(%source_file, "Document is empty, skipping");
            return Ok(0);
        }

        let texts: Vec<String> = chunks.iter().map(|chunk| chunk.text.clone()).collect();
        let embeddings = self.embedding.embed_batch(texts).await?;

        let expected = self.embedding.dimension();
        for embedding in &embeddings {
            if embedding.len() != expected {
                return Err(AppError::DimensionMismatch {
                    expected,
                    actual: embedding.len(),
                });
            }
        }

        // Replace semantics: prior chunks of this file go away before the
        // new set lands.
        BookChunk::delete_by_source_file(&source_file, &self.db).await?;

        let count = chunks.len();
        for (chunk, embedding) in chunks.into_iter().zip(embeddings) {
            let record = BookChunk::new(
                chunk.source_file,
                chunk.chapter,
                chunk.section,
                chunk.heading_path,
                chunk.chunk_index,
                chunk.text,
                embedding,
            );
            if let Err(err) = self.db.upsert_item(record).await {
                BookChunk::delete_by_source_file(&source_file, &self.db).await?;
                return Err(err.into());
            }
        }

        info!(%source_file, chunk_count = count, "Document ingested");
        Ok(count)
    }
}

fn discover_markdown_files(source_dir: &Path) -> Result<Vec<std::path::PathBuf>, AppError> {
    if !source_dir.is_dir() {
        return Err(AppError::Validation(format!(
            "source directory not found: {}",
            source_dir.display()
        )));
    }

    let mut files: Vec<_> = std::fs::read_dir(source_dir)?
        .filter_map(Result::ok)
        .map(|entry| entry.path())
        .filter(|path| path.extension().is_some_and(|ext| ext == "md"))
        .collect();

    // Sorted by filename for consistent processing order.
    files.sort();
    Ok(files)
}
