pub mod api;
pub mod chrome;
pub mod engine;
pub mod executor;
pub mod gate;
pub mod metrics;
pub mod pool;
pub mod queue;
pub mod store;
pub mod worker;

pub use chrome::ChromeEngine;
pub use engine::{BrowserEngine, EngineContext, EnginePage};

use std::net::SocketAddr;
use std::sync::Arc;

use anyhow::Result;
use authority_scout_common::ServerConfig;
use tokio::signal;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};

use crate::executor::ScrapeExecutor;
use crate::gate::SerializationGate;
use crate::metrics::Metrics;
use crate::pool::ContextPool;
use crate::queue::JobQueue;
use crate::store::JobStore;

/// Shared state behind every worker and HTTP handler.
pub struct AppState {
    pub config: ServerConfig,
    pub store: JobStore,
    pub queue: JobQueue,
    pub pool: ContextPool,
    pub executor: ScrapeExecutor,
    pub metrics: Metrics,
}

impl AppState {
    pub fn new(config: ServerConfig, engine: Arc<dyn BrowserEngine>) -> Result<Self> {
        let gate = Arc::new(SerializationGate::new());
        Ok(Self {
            store: JobStore::new(),
            queue: JobQueue::new(),
            pool: ContextPool::new(engine, gate.clone()),
            executor: ScrapeExecutor::new(gate, &config),
            metrics: Metrics::new()?,
            config,
        })
    }
}

/// Runs the HTTP server and the worker pool until shutdown.
///
/// This is the main entry point. Callers provide the engine so tests can run
/// the full stack against a mock instead of a real browser.
pub async fn run_server(config: ServerConfig, engine: Arc<dyn BrowserEngine>) -> Result<()> {
    let addr: SocketAddr = format!("{}:{}", config.bind_addr, config.port).parse()?;
    let worker_count = config.workers;

    let state = Arc::new(AppState::new(config, engine)?);
    let shutdown = CancellationToken::new();

    let worker_handles = worker::spawn_workers(state.clone(), shutdown.clone(), worker_count);
    info!(workers = worker_count, "worker pool started");

    let app = api::router(state);
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!("HTTP server listening on {}", addr);

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal(shutdown.clone()))
        .await?;

    // Workers stop once the token is cancelled; in-flight jobs run to
    // completion first.
    shutdown.cancel();
    for handle in worker_handles {
        if let Err(e) = handle.await {
            warn!("Worker supervisor ended abnormally: {}", e);
        }
    }

    info!("Shutdown complete");
    Ok(())
}

async fn shutdown_signal(shutdown: CancellationToken) {
    let ctrl_c = async {
        if let Err(e) = signal::ctrl_c().await {
            warn!("Failed to install Ctrl+C handler: {}", e);
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
            warn!("Received Ctrl+C signal");
        },
        _ = terminate => {
            warn!("Received SIGTERM signal");
        },
    }

    shutdown.cancel();
}
