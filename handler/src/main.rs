use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::{Parser, Subcommand};
use tokio::io::AsyncReadExt;
use tracing::info;
use tracing_subscriber::EnvFilter;

use rag_handler::{HandlerConfig, InboundEvent, IndexBackend, RequestRouter, server};

/// Retrieval-augmented generation request handler.
#[derive(Debug, Parser)]
#[command(version, about)]
struct Cli {
    /// Keep documents in process memory instead of the search cluster.
    #[arg(long, global = true)]
    in_memory: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Handle a single event and print the envelope.
    Invoke {
        /// Event JSON file. Reads stdin when omitted.
        #[arg(long)]
        event: Option<PathBuf>,
    },

    /// Serve the routes over HTTP.
    Serve {
        /// Address to listen on.
        #[arg(long, env = "RAG_LISTEN", default_value = "127.0.0.1:8080")]
        listen: SocketAddr,
    },

    /// Print the effective configuration (secrets omitted).
    ShowConfig,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")),
        )
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let config = HandlerConfig::from_env().context("failed to load configuration")?;

    if let Command::ShowConfig = cli.command {
        println!("{}", serde_json::to_string_pretty(&config)?);
        return Ok(());
    }

    let backend = if cli.in_memory {
        IndexBackend::InMemory
    } else {
        IndexBackend::OpenSearch
    };
    let router = RequestRouter::from_config(&config, backend)
        .context("failed to initialize request handler")?;
    info!(
        "Handler ready: index={}, endpoint={}, region={}",
        config.store.index_name, config.generation.endpoint, config.generation.region
    );

    match cli.command {
        Command::Invoke { event } => {
            let raw = match event {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read {}", path.display()))?,
                None => {
                    let mut raw = String::new();
                    tokio::io::stdin().read_to_string(&mut raw).await?;
                    raw
                }
            };
            let event: InboundEvent =
                serde_json::from_str(&raw).context("event is not valid JSON")?;
            let envelope = router.handle(&event).await;
            println!("{}", serde_json::to_string_pretty(&envelope)?);
        }
        Command::Serve { listen } => {
            server::serve(Arc::new(router), listen).await?;
        }
        Command::ShowConfig => {}
    }

    Ok(())
}
