// src/main.rs
// =============================================================================
// Entry point of the woogle binary.
//
// What happens here:
// 1. Set up tracing (RUST_LOG, default "info,woogle=debug")
// 2. Load configuration from the environment
// 3. Start the coordinator API and, next to it, the worker pump that runs
//    one crawl cycle per queued message
// 4. Exit with 0 after an orderly shutdown (/down or /exit), 2 on any error
//
// Coordinator and workers share one in-memory queue and one in-memory page
// store, so the page limit of a crawl is enforced against the same store the
// coordinator polls. Nothing survives a restart.
// =============================================================================

mod cli;
mod config;
mod coordinator;
mod crawl;
mod error;
mod queue;
mod scanner;
mod store;

use anyhow::{Context, Result};
use clap::Parser;
use std::sync::Arc;
use tokio::sync::Notify;
use tracing::{error, info};
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cli::{Cli, Commands};
use config::Config;
use coordinator::AppState;
use crawl::{pump, CrawlWorker};
use queue::MemoryQueue;
use scanner::HttpSource;
use store::MemoryStore;

#[tokio::main]
async fn main() {
    tracing_subscriber::registry()
        .with(
            EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| EnvFilter::new("info,woogle=debug")),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    let exit_code = match run().await {
        Ok(code) => code,
        Err(e) => {
            error!("{:#}", e);
            2
        }
    };

    std::process::exit(exit_code);
}

async fn run() -> Result<i32> {
    let cli = Cli::parse();
    let config = Config::from_env().context("Failed to load configuration")?;

    match cli.command {
        Commands::Serve { port } => {
            serve(&config, port.unwrap_or(config.port)).await?;
            Ok(0)
        }
    }
}

// Coordinator and worker in one process, joined by an in-memory queue
async fn serve(config: &Config, port: u16) -> Result<()> {
    info!(
        block_size = config.block_size,
        invoke_limit = config.invoke_limit,
        worker_id = %config.worker_id,
        "starting coordinator with a local worker pump"
    );

    let source = Arc::new(HttpSource::new()?);
    let store = Arc::new(MemoryStore::new(config.page_size));
    let (queue, receiver) = MemoryQueue::new();
    let queue = Arc::new(queue);

    let worker = Arc::new(CrawlWorker::new(
        source.clone(),
        store.clone(),
        queue.clone(),
        config.worker_settings(),
    ));
    tokio::spawn(pump(worker, receiver));

    let state = AppState {
        store,
        queue,
        source,
        block_size: config.block_size,
        poll: config.poll_policy(),
        shutdown: Arc::new(Notify::new()),
    };

    coordinator::serve(port, state).await
}

// -----------------------------------------------------------------------------
// BEGINNER NOTES:
//
// 1. Why Arc everywhere?
//    - The store, queue and page source are shared by the HTTP handlers and
//      by every spawned crawl task
//    - Arc<T> is a reference-counted pointer that can cross task boundaries
//    - Arc<MemoryStore> turns into Arc<dyn PageStore> automatically where a
//      trait object is expected
//
// 2. Why tokio::spawn for the pump?
//    - The pump loops forever waiting for messages
//    - Spawning it lets the HTTP server run at the same time
//
// 3. std::process::exit
//    - Ends the process with an explicit code; 2 means "something went wrong"
// -----------------------------------------------------------------------------
