use std::sync::Arc;

use api_router::{api_routes, api_state::ApiState};
use axum::Router;
use common::{
    storage::db::SurrealDbClient,
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use retrieval_pipeline::{OpenAiGenerationProvider, QueryConfig, QueryService};
use tower_http::trace::TraceLayer;
use tracing::info;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let config = get_config()?;

    let db = Arc::new(
        SurrealDbClient::new(
            &config.surrealdb_address,
            &config.surrealdb_username,
            &config.surrealdb_password,
            &config.surrealdb_namespace,
            &config.surrealdb_database,
        )
        .await?,
    );

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));

    let embedding_provider = Arc::new(EmbeddingProvider::from_config(&config, openai_client.clone()));
    info!(
        embedding_backend = embedding_provider.backend_label(),
        embedding_dimension = embedding_provider.dimension(),
        "Embedding provider initialized"
    );

    // Refuse to serve queries against a collection built with a different
    // embedding dimension.
    db.ensure_collection(embedding_provider.model_code(), embedding_provider.dimension())
        .await?;

    let generation_provider = Arc::new(OpenAiGenerationProvider::new(
        openai_client,
        config.chat_model.clone(),
    ));

    let query_service = Arc::new(QueryService::new(
        db.clone(),
        embedding_provider,
        generation_provider,
        QueryConfig::from_app_config(&config),
    ));

    let api_state = ApiState::new(config.clone(), db, query_service);

    let app = Router::new()
        .merge(api_routes(&api_state))
        .with_state(api_state)
        .layer(TraceLayer::new_for_http());

    let serve_address = format!("0.0.0.0:{}", config.http_port);
    info!("Starting server listening on {serve_address}");
    let listener = tokio::net::TcpListener::bind(serve_address).await?;
    axum::serve(listener, app).await?;

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::{body::Body, http::Request, http::StatusCode};
    use common::utils::config::AppConfig;
    use tower::ServiceExt;
    use uuid::Uuid;

    fn smoke_test_config(namespace: &str, database: &str) -> AppConfig {
        serde_json::from_value(serde_json::json!({
            "openai_api_key": "test-key",
            "openai_base_url": "https://example.invalid/v1",
            "embedding_backend": "hashed",
            "embedding_dimensions": 64,
            "surrealdb_address": "mem://",
            "surrealdb_username": "root",
            "surrealdb_password": "root",
            "surrealdb_namespace": namespace,
            "surrealdb_database": database,
            "http_port": 0,
        }))
        .expect("failed to build test config")
    }

    #[tokio::test]
    async fn smoke_startup_with_in_memory_surrealdb() {
        let namespace = "test_ns";
        let database = format!("test_db_{}", Uuid::new_v4());
        let config = smoke_test_config(namespace, &database);

        let db = Arc::new(
            SurrealDbClient::memory(namespace, &database)
                .await
                .expect("failed to start in-memory surrealdb"),
        );

        let openai_client = Arc::new(async_openai::Client::with_config(
            async_openai::config::OpenAIConfig::new()
                .with_api_key(&config.openai_api_key)
                .with_api_base(&config.openai_base_url),
        ));

        let embedding_provider = Arc::new(EmbeddingProvider::from_config(&config, openai_client.clone()));
        db.ensure_collection(embedding_provider.model_code(), embedding_provider.dimension())
            .await
            .expect("ensure_collection failed");

        let generation_provider = Arc::new(OpenAiGenerationProvider::new(
            openai_client,
            config.chat_model.clone(),
        ));
        let query_service = Arc::new(QueryService::new(
            db.clone(),
            embedding_provider,
            generation_provider,
            QueryConfig::from_app_config(&config),
        ));

        let api_state = ApiState::new(config, db, query_service);
        let app = Router::new()
            .merge(api_routes(&api_state))
            .with_state(api_state);

        let response = app
            .clone()
            .oneshot(
                Request::builder()
                    .uri("/")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("router response");
        assert_eq!(response.status(), StatusCode::OK);

        let health_response = app
            .oneshot(
                Request::builder()
                    .uri("/health")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("health response");
        assert_eq!(health_response.status(), StatusCode::OK);
    }
}
