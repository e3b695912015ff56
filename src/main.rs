use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use docingest::{
    api,
    completion::OpenAiCompletionClient,
    config::{self, Config},
    documents::{DocumentExtractor, FsDocumentSource},
    embedding::OpenAiEmbeddingClient,
    logging,
    metrics::IngestMetrics,
    pinecone::PineconeService,
    processing::{IngestionOrchestrator, IngestionService, RecordCache, RetryPolicy},
    scheduler::Scheduler,
};
use std::net::Ipv4Addr;
use std::sync::Arc;
use tokio::net::TcpListener;

#[derive(Parser)]
#[command(
    name = "docingest",
    about = "Embed documents from a directory into a Pinecone index on a schedule"
)]
struct Cli {
    #[command(subcommand)]
    command: Option<Command>,
}

#[derive(Subcommand)]
enum Command {
    /// Run the scheduler (and the admin server when SERVER_PORT is set) until Ctrl-C.
    Serve,
    /// Run a single ingestion and exit.
    RunOnce,
}

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    logging::init_tracing();
    let config = config::load_config().context("Failed to load configuration")?;

    match cli.command.unwrap_or(Command::Serve) {
        Command::Serve => serve(config).await,
        Command::RunOnce => run_once(config).await,
    }
}

struct Components {
    orchestrator: Arc<IngestionOrchestrator>,
    index: Arc<PineconeService>,
}

async fn build_components(config: &Config) -> Result<Components> {
    let embedder = OpenAiEmbeddingClient::authorize(config)
        .context("Failed to authorize the embedding client")?;
    tracing::info!(model = %config.embedding_model, "Embedding client initialized");

    let index = Arc::new(
        PineconeService::authorize(config)
            .await
            .context("Failed to authorize the Pinecone client")?,
    );
    tracing::info!(index = %config.pinecone_index_name, "Pinecone client initialized");

    let orchestrator = Arc::new(IngestionOrchestrator::new(
        Arc::new(FsDocumentSource::new(config.docs_path.clone())),
        Arc::new(DocumentExtractor::new()),
        Arc::new(embedder),
        index.clone(),
        RetryPolicy::new(config.embed_max_attempts, config.embed_retry_delay),
        Arc::new(IngestMetrics::new()),
    ));

    Ok(Components {
        orchestrator,
        index,
    })
}

async fn run_once(config: Config) -> Result<()> {
    let Components { orchestrator, .. } = build_components(&config).await?;
    let report = orchestrator
        .run()
        .await
        .context("Ingestion run could not start")?;

    println!(
        "listed {} document(s), upserted {}, skipped {}",
        report.documents_listed,
        report.records_upserted.len(),
        report.skipped.len()
    );
    for skipped in &report.skipped {
        println!("  skipped {} at {}: {}", skipped.name, skipped.stage, skipped.reason);
    }
    Ok(())
}

async fn serve(config: Config) -> Result<()> {
    let Components {
        orchestrator,
        index,
    } = build_components(&config).await?;

    let cache = Arc::new(RecordCache::new());
    cache
        .seed(index.as_ref(), config.embedding_dimension, config.cache_top_k)
        .await;

    let completion = OpenAiCompletionClient::authorize(&config)
        .context("Failed to authorize the completion client")?;
    let service = Arc::new(IngestionService::new(
        orchestrator,
        cache,
        Arc::new(completion),
    ));
    let scheduler = Scheduler::new(&config.ingest_schedule, service.orchestrator())
        .context("Failed to parse the ingestion schedule")?;

    if let Some(port) = config.server_port {
        let listener = TcpListener::bind((Ipv4Addr::UNSPECIFIED, port))
            .await
            .with_context(|| format!("Failed to bind admin server on port {port}"))?;
        let app = api::create_router(service.clone());
        tracing::info!("Listening on http://0.0.0.0:{}", port);
        tokio::spawn(async move {
            if let Err(error) = axum::serve(listener, app).await {
                tracing::error!(error = %error, "Admin server stopped");
            }
        });
    }

    scheduler.run_until(shutdown_signal()).await;
    Ok(())
}

async fn shutdown_signal() {
    if let Err(error) = tokio::signal::ctrl_c().await {
        tracing::error!(error = %error, "Failed to listen for shutdown signal");
        std::future::pending::<()>().await;
    }
}
