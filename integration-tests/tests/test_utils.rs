use std::{path::Path, sync::Arc};

use api_router::{api_routes, api_state::ApiState};
use async_trait::async_trait;
use axum_test::TestServer;
use common::{
    error::AppError,
    storage::db::SurrealDbClient,
    utils::{config::AppConfig, embedding::EmbeddingProvider},
};
use retrieval_pipeline::{GenerationProvider, QueryConfig, QueryService};
use uuid::Uuid;

pub const EMBEDDING_DIMENSION: usize = 64;

/// Sets up an in-memory test database.
pub async fn setup_test_database() -> Arc<SurrealDbClient> {
    let namespace = "test_ns";
    let database = Uuid::new_v4().to_string();

    let db = SurrealDbClient::memory(namespace, &database)
        .await
        .expect("Failed to start in-memory surrealdb");

    Arc::new(db)
}

/// Generation stub that answers deterministically and cites every passage id
/// it finds in the prompt, so citations track whatever retrieval produced.
pub struct EchoGenerationProvider;

#[async_trait]
impl GenerationProvider for EchoGenerationProvider {
    async fn complete(
        &self,
        _system_prompt: &str,
        user_message: &str,
    ) -> Result<String, AppError> {
        let references: Vec<serde_json::Value> = user_message
            .match_indices("\"id\":\"")
            .filter_map(|(start, marker)| {
                let rest = &user_message[start + marker.len()..];
                rest.split('"')
                    .next()
                    .map(|id| serde_json::json!({ "reference": id }))
            })
            .collect();

        Ok(serde_json::json!({
            "answer": "The sky is blue because of Rayleigh scattering.",
            "references": references,
        })
        .to_string())
    }
}

pub fn test_config(rate_limit: &str) -> AppConfig {
    serde_json::from_value(serde_json::json!({
        "openai_api_key": "test-key",
        "openai_base_url": "https://example.invalid/v1",
        "embedding_backend": "hashed",
        "embedding_dimensions": EMBEDDING_DIMENSION,
        "surrealdb_address": "mem://",
        "surrealdb_username": "root",
        "surrealdb_password": "root",
        "surrealdb_namespace": "test_ns",
        "surrealdb_database": "test_db",
        "http_port": 0,
        "rate_limit": rate_limit,
    }))
    .expect("Failed to build test config")
}

/// Builds a test server over the given database with hashed embeddings and
/// the echo generation stub. Does not initialize the chunk collection.
pub fn build_test_server(db: Arc<SurrealDbClient>, rate_limit: &str) -> TestServer {
    build_test_server_with_config(db, test_config(rate_limit))
}

/// Same as [`build_test_server`], with the query endpoints locked behind the
/// given API key.
pub fn build_test_server_with_api_key(
    db: Arc<SurrealDbClient>,
    rate_limit: &str,
    api_key: &str,
) -> TestServer {
    let mut config = test_config(rate_limit);
    config.api_key = Some(api_key.to_string());
    build_test_server_with_config(db, config)
}

fn build_test_server_with_config(db: Arc<SurrealDbClient>, config: AppConfig) -> TestServer {
    let embedding = Arc::new(EmbeddingProvider::new_hashed(EMBEDDING_DIMENSION));

    let query_service = Arc::new(QueryService::new(
        db.clone(),
        embedding,
        Arc::new(EchoGenerationProvider),
        QueryConfig::from_app_config(&config),
    ));

    let api_state = ApiState::new(config, db, query_service);
    let app = axum::Router::new()
        .merge(api_routes(&api_state))
        .with_state(api_state);

    TestServer::new(app).expect("Failed to start test server")
}

/// Writes a two-chapter markdown corpus into `dir`.
pub fn write_test_corpus(dir: &Path) {
    std::fs::write(
        dir.join("chapter-1-light.md"),
        "---\ntitle: Light\n---\n\
         # Light\n\n\
         ## Why the Sky Is Blue\n\n\
         The sky is blue because of Rayleigh scattering of sunlight in the \
         atmosphere. Shorter wavelengths scatter more strongly than longer \
         ones, so blue light reaches the observer from every direction.\n",
    )
    .expect("Failed to write chapter 1");

    std::fs::write(
        dir.join("chapter-2-bread.md"),
        "# Bread\n\n\
         ## Sourdough Basics\n\n\
         Sourdough bread rises on wild yeast kept alive in a starter that \
         the baker feeds with flour and water.\n",
    )
    .expect("Failed to write chapter 2");
}
