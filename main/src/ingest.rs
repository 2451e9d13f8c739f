use std::{path::PathBuf, process::ExitCode, sync::Arc};

use clap::Parser;
use common::{
    storage::{db::SurrealDbClient, types::ingestion_run::RunStatus},
    utils::{config::get_config, embedding::EmbeddingProvider},
};
use ingestion_pipeline::{ChunkerConfig, IngestionPipeline};
use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Ingest a directory of markdown sources into the chunk collection.
#[derive(Parser, Debug)]
#[command(name = "ingest")]
struct Args {
    /// Directory containing the markdown corpus.
    source_dir: PathBuf,

    /// Drop existing chunks, the vector index, and the pinned embedding
    /// settings before ingesting.
    #[arg(long)]
    reset: bool,
}

#[tokio::main]
async fn main() -> ExitCode {
    tracing_subscriber::registry()
        .with(fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::from_default_env())
        .try_init()
        .ok();

    let args = Args::parse();

    match run(args).await {
        Ok(status) if status == RunStatus::Completed => ExitCode::SUCCESS,
        Ok(status) => {
            error!(status = status.as_str(), "ingestion did not complete");
            ExitCode::FAILURE
        }
        Err(err) => {
            error!(error = %err, "ingestion aborted");
            ExitCode::FAILURE
        }
    }
}

async fn run(args: Args) -> anyhow::Result<RunStatus> {
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

    if args.reset {
        info!("Resetting chunk collection before ingestion");
        db.delete_collection().await?;
    }

    let openai_client = Arc::new(async_openai::Client::with_config(
        async_openai::config::OpenAIConfig::new()
            .with_api_key(&config.openai_api_key)
            .with_api_base(&config.openai_base_url),
    ));
    let embedding_provider = Arc::new(EmbeddingProvider::from_config(&config, openai_client));

    let pipeline = IngestionPipeline::new(
        db,
        embedding_provider,
        ChunkerConfig {
            max_chars: config.chunk_max_chars,
            overlap_chars: config.chunk_overlap_chars,
        },
    );

    let run = pipeline.run(&args.source_dir).await?;
    info!(
        run_id = %run.id,
        status = run.status.as_str(),
        total_files = run.total_files,
        total_chunks = run.total_chunks,
        "Ingestion finished"
    );
    if let Some(message) = &run.error_message {
        error!(error = %message, "Ingestion run failed");
    }

    Ok(run.status)
}
