use common::{
    error::AppError,
    storage::{
        db::{SurrealDbClient, CHUNK_TABLE},
        types::book_chunk::BookChunk,
    },
    utils::embedding::EmbeddingProvider,
};
use tracing::debug;

use crate::{scoring::cosine_similarity, ScoredChunk};

/// Minimum HNSW search width. Higher values trade query latency for recall;
/// the effective width never drops below the requested candidate count.
const KNN_EF: usize = 40;

/// Nearest-neighbour search over the chunk collection. Candidates come back
/// ranked by the cosine index; each is re-scored against the query vector and
/// dropped when it falls below `similarity_threshold`. The result is ordered
/// by descending similarity and capped at `top_k`.
pub async fn search_similar_chunks(
    db: &SurrealDbClient,
    query_embedding: &[f32],
    top_k: usize,
    similarity_threshold: f32,
) -> Result<Vec<ScoredChunk>, AppError> {
    if top_k == 0 || query_embedding.is_empty() {
        return Ok(Vec::new());
    }

    let ef = KNN_EF.max(top_k);
    let query =
        format!("SELECT * FROM {CHUNK_TABLE} WHERE embedding <|{top_k},{ef}|> $embedding");

    let candidates: Vec<BookChunk> = db
        .client
        .query(query)
        .bind(("embedding", query_embedding.to_vec()))
        .await
        .map_err(|e| AppError::VectorIndex(format!("knn query failed: {e}")))?
        .take(0)
        .map_err(|e| AppError::VectorIndex(format!("knn result decode failed: {e}")))?;

    let mut scored: Vec<ScoredChunk> = candidates
        .into_iter()
        .map(|chunk| {
            let similarity = cosine_similarity(query_embedding, &chunk.embedding);
            ScoredChunk { chunk, similarity }
        })
        .filter(|scored| scored.similarity >= similarity_threshold)
        .collect();

    scored.sort_by(|a, b| {
        b.similarity
            .partial_cmp(&a.similarity)
            .unwrap_or(std::cmp::Ordering::Equal)
    });
    scored.truncate(top_k);

    debug!(
        retained = scored.len(),
        threshold = similarity_threshold,
        "vector search complete"
    );

    Ok(scored)
}

/// Embeds the query text and searches the chunk collection with it.
pub async fn retrieve(
    db: &SurrealDbClient,
    embedding: &EmbeddingProvider,
    query_text: &str,
    top_k: usize,
    similarity_threshold: f32,
) -> Result<Vec<ScoredChunk>, AppError> {
    let query_embedding = embedding.embed(query_text).await?;
    search_similar_chunks(db, &query_embedding, top_k, similarity_threshold).await
}
