//! singbirds-ai - Bird-call feature ingestion and embedding service
//!
//! `serve` runs the HTTP API. `ingest` and `embed` run one operation against
//! the same root folder and print the JSON outcome.

use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
use singbirds_common::config::{
    default_config_path, load_toml_config_or_default, RootFolderInitializer, RootFolderResolver,
};
use tokio::signal;
use tracing::{info, warn};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use singbirds_ai::config::resolve_settings;
use singbirds_ai::models::EmbeddingStrategy;
use singbirds_ai::services::HttpRecordingFetcher;
use singbirds_ai::workflow::{run_embedding, run_ingestion, EmbeddingRequest, IngestionRequest};
use singbirds_ai::AppState;

const MODULE_NAME: &str = "singbirds-ai";

#[derive(Parser, Debug)]
#[command(name = "singbirds-ai")]
#[command(about = "Acoustic feature ingestion and 2-D embedding of bird recordings")]
#[command(version)]
struct Args {
    /// Root folder holding the database and exports
    #[arg(short, long, global = true, env = "SINGBIRDS_ROOT_FOLDER")]
    root_folder: Option<PathBuf>,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Run the HTTP API
    Serve {
        #[arg(short, long, default_value = "5780", env = "SINGBIRDS_PORT")]
        port: u16,
    },
    /// Extract features for recordings that have none yet
    Ingest {
        /// Limit to these entity ids (repeatable)
        #[arg(long = "entity")]
        entities: Vec<String>,
        #[arg(long)]
        concurrency: Option<usize>,
        #[arg(long)]
        batch_size: Option<usize>,
    },
    /// Project stored features to 2-D and export the document
    Embed {
        /// nmds or umap
        #[arg(long)]
        strategy: EmbeddingStrategy,
        #[arg(long = "entity")]
        entities: Vec<String>,
        #[arg(long)]
        seed: Option<u64>,
    },
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let (toml_config, config_source) =
        load_toml_config_or_default(default_config_path(MODULE_NAME).as_deref());

    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(&toml_config.logging.level)),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    info!(
        "Starting {} v{} (git {}, built {}, {})",
        MODULE_NAME,
        env!("CARGO_PKG_VERSION"),
        env!("GIT_HASH"),
        env!("BUILD_TIMESTAMP"),
        env!("BUILD_PROFILE"),
    );
    config_source.log();

    let root_folder = RootFolderResolver::new(MODULE_NAME)
        .with_cli_arg(args.root_folder.clone())
        .resolve();
    let initializer = RootFolderInitializer::new(root_folder);
    initializer
        .ensure_directory_exists()
        .context("Failed to initialize root folder")?;
    info!("Root folder: {}", initializer.root_folder().display());

    let db_path = initializer.database_path();
    info!("Database: {}", db_path.display());
    let db = singbirds_common::db::init_database(&db_path)
        .await
        .context("Failed to open database")?;

    let settings = resolve_settings(&db, &toml_config)
        .await
        .context("Failed to resolve settings")?;
    info!(
        concurrency = settings.concurrency,
        batch_size = settings.batch_size,
        seed = settings.seed,
        "Settings resolved"
    );

    let fetcher = Arc::new(
        HttpRecordingFetcher::new(settings.download_timeout, settings.max_download_bytes)
            .context("Failed to build HTTP client")?,
    );
    let exports_dir = initializer.exports_path();

    match args.command {
        Command::Serve { port } => {
            let state = AppState::new(db, settings, exports_dir, fetcher);
            let app = singbirds_ai::build_router(state);

            let addr = SocketAddr::from(([127, 0, 0, 1], port));
            let listener = tokio::net::TcpListener::bind(addr)
                .await
                .context("Failed to bind to address")?;
            info!("Listening on http://{}", addr);
            info!("Health check: http://{}/health", addr);

            axum::serve(listener, app)
                .with_graceful_shutdown(shutdown_signal())
                .await
                .context("Server error")?;

            info!("Server shutdown complete");
        }
        Command::Ingest {
            entities,
            concurrency,
            batch_size,
        } => {
            let request = IngestionRequest {
                recording_ids: None,
                entity_ids: (!entities.is_empty()).then_some(entities),
                concurrency,
                batch_size,
            };
            let outcome = run_ingestion(&db, &settings, fetcher, request).await?;
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
        Command::Embed {
            strategy,
            entities,
            seed,
        } => {
            let request = EmbeddingRequest {
                strategy,
                entity_ids: (!entities.is_empty()).then_some(entities),
                seed,
            };
            let outcome = run_embedding(&db, &exports_dir, settings.seed, request).await?;
            info!("Document written to {}", outcome.document_path.display());
            println!("{}", serde_json::to_string_pretty(&outcome)?);
        }
    }

    Ok(())
}

/// Graceful shutdown signal handler
async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match signal::unix::signal(signal::unix::SignalKind::terminate()) {
            Ok(mut sigterm) => {
                sigterm.recv().await;
            }
            Err(e) => {
                warn!("Failed to install SIGTERM handler: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {
            info!("Received Ctrl+C, shutting down");
        },
        _ = terminate => {
            info!("Received terminate signal, shutting down");
        },
    }
}
