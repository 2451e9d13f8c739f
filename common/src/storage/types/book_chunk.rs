use uuid::Uuid;

use crate::{error::AppError, storage::db::SurrealDbClient, stored_object};

stored_object!(BookChunk, "book_chunk", {
    source_file: String,
    chapter: String,
    section: Option<String>,
    heading_path: Vec<String>,
    chunk_index: usize,
    text: String,
    embedding: Vec<f32>
});

impl BookChunk {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source_file: String,
        chapter: String,
        section: Option<String>,
        heading_path: Vec<String>,
        chunk_index: usize,
        text: String,
        embedding: Vec<f32>,
    ) -> Self {
        let now = Utc::now();
        Self {
            id: Uuid::new_v4().to_string(),
            created_at: now,
            updated_at: now,
            source_file,
            chapter,
            section,
            heading_path,
            chunk_index,
            text,
            embedding,
        }
    }

    /// Removes every chunk ingested from one source file. Used both for
    /// re-ingestion (replace rather than mutate) and to roll back a
    /// document whose upsert failed partway.
    pub async fn delete_by_source_file(
        source_file: &str,
        db: &SurrealDbClient,
    ) -> Result<(), AppError> {
        db.client
            .query(format!(
                "DELETE {} WHERE source_file = $source_file",
                Self::table_name()
            ))
            .bind(("source_file", source_file.to_owned()))
            .await?;

        Ok(())
    }

    pub async fn count(db: &SurrealDbClient) -> Result<usize, AppError> {
        let mut response = db
            .client
            .query(format!(
                "SELECT count() AS total FROM {} GROUP ALL",
                Self::table_name()
            ))
            .await?;
        let total: Option<usize> = response.take((0, "total"))?;
        Ok(total.unwrap_or(0))
    }
}
