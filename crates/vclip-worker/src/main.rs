//! Video processing worker binary.

use std::sync::Arc;

use tracing::{error, info};
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

use vclip_queue::{JobQueue, QueueConfig};
use vclip_session::SessionManager;
use vclip_storage::{CacheConfig, TwoTierCache, VideoStore};
use vclip_worker::{PipelineRunner, WorkerConfig};

#[tokio::main]
async fn main() {
    rustls::crypto::ring::default_provider()
        .install_default()
        .expect("Failed to install rustls crypto provider");

    dotenvy::dotenv().ok();

    tracing_subscriber::registry()
        .with(fmt::layer().json())
        .with(EnvFilter::from_default_env().add_directive("vclip=info".parse().unwrap()))
        .init();

    info!("Starting vclip-worker");

    let config = WorkerConfig::from_env();
    info!(?config, "worker config loaded");

    let sessions = match SessionManager::from_env() {
        Ok(s) => s,
        Err(e) => {
            error!("failed to start session manager: {}", e);
            std::process::exit(1);
        }
    };

    let store = match VideoStore::open_from_env() {
        Ok(s) => Arc::new(s),
        Err(e) => {
            error!("failed to open video store: {}", e);
            std::process::exit(1);
        }
    };

    let cache = match TwoTierCache::connect(CacheConfig::default()).await {
        Ok(c) => Arc::new(c),
        Err(e) => {
            error!("failed to connect cache, falling back to memory-only: {}", e);
            Arc::new(TwoTierCache::memory_only(CacheConfig::default()).await)
        }
    };

    let queue = JobQueue::new(QueueConfig::from_env());
    let runner = Arc::new(PipelineRunner::new(config, sessions, store, cache));

    queue.spawn_dispatcher(runner);
    queue.spawn_retention_sweep();

    info!("worker ready, dispatching jobs from the in-process queue");

    tokio::signal::ctrl_c().await.ok();
    info!("received shutdown signal, worker shutting down");
}
