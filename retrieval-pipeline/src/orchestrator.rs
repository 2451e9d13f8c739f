use std::{
    sync::Arc,
    time::{Duration, Instant},
};

use common::{
    error::AppError,
    storage::{
        db::SurrealDbClient,
        types::query_log::{QueryLog, QueryMode, SourceCitation},
    },
    utils::{config::AppConfig, embedding::EmbeddingProvider, retry::RetryPolicy},
};
use tokio_retry::RetryIf;
use tracing::{info, warn};
use uuid::Uuid;

use crate::{
    answer::{self, GenerationProvider},
    retriever, ScoredChunk,
};

const MAX_QUERY_CHARS: usize = 2_000;
const MAX_SELECTION_CHARS: usize = 10_000;

#[derive(Debug, Clone)]
pub struct QueryConfig {
    pub top_k: usize,
    pub similarity_threshold: f32,
    pub retry: RetryPolicy,
    pub provider_timeout: Duration,
}

impl Default for QueryConfig {
    fn default() -> Self {
        Self {
            top_k: 5,
            similarity_threshold: 0.3,
            retry: RetryPolicy::default(),
            provider_timeout: Duration::from_secs(30),
        }
    }
}

impl QueryConfig {
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            top_k: config.top_k,
            similarity_threshold: config.similarity_threshold,
            retry: RetryPolicy::new(config.retry_max_attempts, Duration::from_millis(100)),
            provider_timeout: config.provider_timeout(),
        }
    }
}

/// The answer handed back to the caller, mirroring the row written to the
/// query log.
#[derive(Debug, Clone)]
pub struct QueryOutcome {
    pub answer: String,
    pub citations: Vec<SourceCitation>,
    pub session_id: Uuid,
    pub mode: QueryMode,
    pub response_time_ms: u64,
}

/// Coordinates one question end to end: validate, retrieve, generate, log.
/// Retries and timeouts live here; the retriever and the generation provider
/// fail fast and leave resilience to this layer.
pub struct QueryService {
    db: Arc<SurrealDbClient>,
    embedding: Arc<EmbeddingProvider>,
    generation: Arc<dyn GenerationProvider>,
    config: QueryConfig,
}

impl QueryService {
    pub fn new(
        db: Arc<SurrealDbClient>,
        embedding: Arc<EmbeddingProvider>,
        generation: Arc<dyn GenerationProvider>,
        config: QueryConfig,
    ) -> Self {
        Self {
            db,
            embedding,
            generation,
            config,
        }
    }

    /// Full-book question answering. Retrieves the closest chunks above the
    /// similarity threshold, generates a grounded answer, and writes exactly
    /// one query-log row once the answer is complete.
    pub async fn query_full_book(
        &self,
        question: &str,
        session_id: Option<Uuid>,
    ) -> Result<QueryOutcome, AppError> {
        let started = Instant::now();
        let question = validate_text(question, "question", MAX_QUERY_CHARS)?;
        let session_id = session_id.unwrap_or_else(Uuid::new_v4);

        let chunks = self
            .resilient("retrieval", || {
                retriever::retrieve(
                    &self.db,
                    &self.embedding,
                    &question,
                    self.config.top_k,
                    self.config.similarity_threshold,
                )
            })
            .await?;

        let generated = self
            .resilient("generation", || {
                answer::generate_grounded(self.generation.as_ref(), &chunks, &question)
            })
            .await?;

        let citations = cited_chunks(&chunks, &generated.cited_chunk_ids);
        let response_time_ms = started.elapsed().as_millis() as u64;

        let log = QueryLog::new(
            session_id,
            question.clone(),
            QueryMode::FullBook,
            None,
            generated.answer.clone(),
            citations.clone(),
            response_time_ms,
        );
        self.db.store_item(log).await?;

        info!(
            %session_id,
            retrieved = chunks.len(),
            cited = citations.len(),
            response_time_ms,
            "answered full-book query"
        );

        Ok(QueryOutcome {
            answer: generated.answer,
            citations,
            session_id,
            mode: QueryMode::FullBook,
            response_time_ms,
        })
    }

    /// Selected-text question answering. No retrieval happens; the reader's
    /// selection is the only context and the outcome carries no citations.
    pub async fn query_selected_text(
        &self,
        question: &str,
        selected_text: &str,
        session_id: Option<Uuid>,
    ) -> Result<QueryOutcome, AppError> {
        let started = Instant::now();
        let question = validate_text(question, "question", MAX_QUERY_CHARS)?;
        let selected_text = validate_text(selected_text, "selected text", MAX_SELECTION_CHARS)?;
        let session_id = session_id.unwrap_or_else(Uuid::new_v4);

        let generated = self
            .resilient("generation", || {
                answer::generate_from_selection(
                    self.generation.as_ref(),
                    &selected_text,
                    &question,
                )
            })
            .await?;

        let response_time_ms = started.elapsed().as_millis() as u64;

        let log = QueryLog::new(
            session_id,
            question.clone(),
            QueryMode::SelectedText,
            Some(selected_text),
            generated.answer.clone(),
            Vec::new(),
            response_time_ms,
        );
        self.db.store_item(log).await?;

        info!(%session_id, response_time_ms, "answered selected-text query");

        Ok(QueryOutcome {
            answer: generated.answer,
            citations: Vec::new(),
            session_id,
            mode: QueryMode::SelectedText,
            response_time_ms,
        })
    }

    /// Wraps a provider-facing call in the configured timeout, retrying
    /// transient failures on the policy's backoff schedule.
    async fn resilient<T, Fut, F>(
        &self,
        operation: &'static str,
        mut action: F,
    ) -> Result<T, AppError>
    where
        F: FnMut() -> Fut,
        Fut: std::future::Future<Output = Result<T, AppError>>,
    {
        let waited = self.config.provider_timeout;
        RetryIf::spawn(
            self.config.retry.backoff(),
            || {
                let fut = action();
                async move {
                    match tokio::time::timeout(waited, fut).await {
                        Ok(result) => result,
                        Err(_) => {
                            warn!(operation, timeout_secs = waited.as_secs(), "provider call timed out");
                            Err(AppError::ProviderTimeout { operation, waited })
                        }
                    }
                }
            },
            AppError::is_transient,
        )
        .await
    }
}

/// Strips control characters (newlines and tabs survive), trims, and bounds
/// the length. Empty-after-trim input is rejected before any provider call,
/// so nothing is logged for it.
fn validate_text(raw: &str, label: &str, max_chars: usize) -> Result<String, AppError> {
    let cleaned: String = raw
        .chars()
        .filter(|c| !c.is_control() || matches!(c, '\n' | '\t' | '\r'))
        .collect();
    let trimmed = cleaned.trim();

    if trimmed.is_empty() {
        return Err(AppError::Validation(format!("{label} must not be empty")));
    }
    if trimmed.chars().count() > max_chars {
        return Err(AppError::Validation(format!(
            "{label} exceeds {max_chars} characters"
        )));
    }

    Ok(trimmed.to_string())
}

/// Citations in the model's citation order, restricted to chunks it was shown.
fn cited_chunks(chunks: &[ScoredChunk], cited_ids: &[String]) -> Vec<SourceCitation> {
    cited_ids
        .iter()
        .filter_map(|id| chunks.iter().find(|scored| &scored.chunk.id == id))
        .map(|scored| SourceCitation::from_chunk(&scored.chunk, scored.similarity))
        .collect()
}
