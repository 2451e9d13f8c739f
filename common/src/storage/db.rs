use std::ops::Deref;

use surrealdb::{
    engine::any::{connect, Any},
    opt::auth::Root,
    Error, Surreal,
};
use tracing::{info, warn};

use crate::error::AppError;

use super::types::{
    corpus_settings::CorpusSettings,
    StoredObject,
};

pub const CHUNK_INDEX_NAME: &str = "idx_embedding_book_chunk";
pub const CHUNK_TABLE: &str = "book_chunk";

#[derive(Clone)]
pub struct SurrealDbClient {
    pub client: Surreal<Any>,
}

impl SurrealDbClient {
    pub async fn new(
        address: &str,
        username: &str,
        password: &str,
        namespace: &str,
        database: &str,
    ) -> Result<Self, Error> {
        let db = connect(address).await?;

        db.signin(Root { username, password }).await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }

    /// Validates the chunk collection against the provider's embedding
    /// dimension and (re)defines the HNSW cosine index. A pre-existing
    /// collection built with a different dimension is a fatal mismatch; the
    /// caller has to reset the collection explicitly before re-ingesting.
    pub async fn ensure_collection(
        &self,
        embedding_model: &str,
        dimension: usize,
    ) -> Result<(), AppError> {
        if let Some(existing) = CorpusSettings::get_current(self).await? {
            if existing.embedding_dimensions != dimension {
                return Err(AppError::DimensionMismatch {
                    expected: existing.embedding_dimensions,
                    actual: dimension,
                });
            }
            if existing.embedding_model != embedding_model {
                warn!(
                    stored_model = %existing.embedding_model,
                    configured_model = %embedding_model,
                    "Embedding model changed without a dimension change; \
                     stored vectors may not be comparable to new queries"
                );
            }
        } else {
            self.store_item(CorpusSettings::new(embedding_model.to_owned(), dimension))
                .await?;
        }

        self.client
            .query(format!(
                "DEFINE INDEX IF NOT EXISTS {CHUNK_INDEX_NAME} ON TABLE {CHUNK_TABLE} \
                 FIELDS embedding HNSW DIMENSION {dimension} DIST COSINE TYPE F32 EFC 100 M 8;"
            ))
            .await?;

        Ok(())
    }

    /// Drops every chunk, the vector index, and the pinned settings record.
    pub async fn delete_collection(&self) -> Result<(), AppError> {
        self.client
            .query(format!(
                "REMOVE INDEX IF EXISTS {CHUNK_INDEX_NAME} ON TABLE {CHUNK_TABLE}; \
                 DELETE {CHUNK_TABLE};"
            ))
            .await?;
        self.delete_item::<CorpusSettings>(super::types::corpus_settings::CURRENT_SETTINGS_ID)
            .await?;

        info!("Chunk collection deleted");
        Ok(())
    }

    /// Cheap liveness check used by the health endpoint.
    pub async fn ping(&self) -> Result<(), Error> {
        self.client.query("RETURN true").await?;
        Ok(())
    }

    /// Stores a new object. Fails if the id already exists.
    pub async fn store_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .create((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    /// Creates or replaces an object by id. Re-upserting a chunk id
    /// replaces its vector and metadata.
    pub async fn upsert_item<T>(&self, item: T) -> Result<Option<T>, Error>
    where
        T: StoredObject + Send + Sync + 'static,
    {
        self.client
            .upsert((T::table_name(), item.get_id()))
            .content(item)
            .await
    }

    pub async fn get_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select((T::table_name(), id)).await
    }

    pub async fn get_all_stored_items<T>(&self) -> Result<Vec<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.select(T::table_name()).await
    }

    pub async fn delete_item<T>(&self, id: &str) -> Result<Option<T>, Error>
    where
        T: for<'de> StoredObject,
    {
        self.client.delete((T::table_name(), id)).await
    }
}

impl Deref for SurrealDbClient {
    type Target = Surreal<Any>;

    fn deref(&self) -> &Self::Target {
        &self.client
    }
}

#[cfg(any(test, feature = "test-utils"))]
impl SurrealDbClient {
    /// Create an in-memory SurrealDB client for testing.
    pub async fn memory(namespace: &str, database: &str) -> Result<Self, Error> {
        let db = connect("mem://").await?;

        db.use_ns(namespace).use_db(database).await?;

        Ok(SurrealDbClient { client: db })
    }
}

#[cfg(test)]
mod tests {
    use crate::stored_object;

    use super::*;
    use uuid::Uuid;

    stored_object!(Dummy, "dummy", {
        name: String
    });

    async fn memory_db() -> SurrealDbClient {
        SurrealDbClient::memory("test_ns", &Uuid::new_v4().to_string())
            .await
            .expect("failed to start in-memory surrealdb")
    }

    #[tokio::test]
    async fn test_crud_roundtrip() {
        let db = memory_db().await;

        let dummy = Dummy {
            id: "abc".to_string(),
            name: "first".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };

        let stored = db.store_item(dummy.clone()).await.expect("store failed");
        assert!(stored.is_some());

        let fetched = db.get_item::<Dummy>(&dummy.id).await.expect("fetch failed");
        assert_eq!(fetched, Some(dummy.clone()));

        let all = db
            .get_all_stored_items::<Dummy>()
            .await
            .expect("fetch all failed");
        assert!(all.contains(&dummy));

        let deleted = db
            .delete_item::<Dummy>(&dummy.id)
            .await
            .expect("delete failed");
        assert_eq!(deleted, Some(dummy));

        let fetch_post = db
            .get_item::<Dummy>("abc")
            .await
            .expect("fetch after delete failed");
        assert!(fetch_post.is_none());
    }

    #[tokio::test]
    async fn test_upsert_replaces_by_id() {
        let db = memory_db().await;

        let first = Dummy {
            id: "same".to_string(),
            name: "original".to_string(),
            created_at: Utc::now(),
            updated_at: Utc::now(),
        };
        let second = Dummy {
            name: "replacement".to_string(),
            ..first.clone()
        };

        db.upsert_item(first).await.expect("first upsert failed");
        db.upsert_item(second).await.expect("second upsert failed");

        let all = db
            .get_all_stored_items::<Dummy>()
            .await
            .expect("fetch all failed");
        assert_eq!(all.len(), 1);
        assert_eq!(all[0].name, "replacement");
    }

    #[tokio::test]
    async fn test_ensure_collection_detects_dimension_mismatch() {
        let db = memory_db().await;

        db.ensure_collection("text-embedding-3-small", 8)
            .await
            .expect("initial ensure failed");

        // Same dimension is idempotent.
        db.ensure_collection("text-embedding-3-small", 8)
            .await
            .expect("repeat ensure failed");

        let err = db
            .ensure_collection("text-embedding-3-small", 16)
            .await
            .expect_err("dimension change should fail");
        assert!(matches!(
            err,
            AppError::DimensionMismatch {
                expected: 8,
                actual: 16
            }
        ));

        // A reset clears the pinned dimension.
        db.delete_collection().await.expect("reset failed");
        db.ensure_collection("text-embedding-3-small", 16)
            .await
            .expect("ensure after reset failed");
    }
}
