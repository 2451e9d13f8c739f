use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

/// Singleton record pinning the embedding model and dimension the chunk
/// collection was built with. Ingestion and retrieval both validate against
/// it before touching the index.
pub const CURRENT_SETTINGS_ID: &str = "current";

stored_object!(CorpusSettings, "corpus_settings", {
    embedding_model: String,
    embedding_dimensions: usize
});

impl CorpusSettings {
    pub fn new(embedding_model: String, embedding_dimensions: usize) -> Self {
        let now = Utc::now();
        Self {
            id: CURRENT_SETTINGS_ID.to_string(),
            created_at: now,
            updated_at: now,
            embedding_model,
            embedding_dimensions,
        }
    }

    pub async fn get_current(db: &SurrealDbClient) -> Result<Option<Self>, AppError> {
        Ok(db.get_item::<Self>(CURRENT_SETTINGS_ID).await?)
    }
}
