//! # Transit Realtime Server
//!
//! Keeps an in-memory transit snapshot in sync with RabbitMQ and serves its
//! status over HTTP.
//!
//! The maintenance worker runs on its own OS thread with a single-threaded
//! runtime: it performs the initial load, then consumes tasks and realtime
//! feeds for the lifetime of the process. The main runtime only serves
//! `/health` and `/status`.

use anyhow::{Context, Result};
use std::net::SocketAddr;
use std::sync::Arc;
use std::thread;
use tokio::signal;
use tracing::{error, info};

use lib_transit::broker::AmqpBroker;
use lib_transit::{ChaosApplier, DefaultIndexBuilder, FileLoader, SnapshotStore, Supervisor, WorkerConfig};

mod transit_logic;
use transit_logic::{config, logger, status};

fn spawn_worker(store: Arc<SnapshotStore>, worker: WorkerConfig) -> Result<thread::JoinHandle<()>> {
    thread::Builder::new()
        .name("transit-worker".to_string())
        .spawn(move || {
            let runtime = match tokio::runtime::Builder::new_current_thread().enable_all().build() {
                Ok(runtime) => runtime,
                Err(e) => {
                    error!("Failed to start worker runtime: {}", e);
                    return;
                }
            };

            if let Err(e) = store.reload(&worker.sources) {
                error!("Initial load failed, serving an empty snapshot: {}", e);
            }

            let broker = AmqpBroker::new(worker.broker.clone());
            let supervisor = Supervisor::from_config(broker, store, Arc::new(ChaosApplier), &worker);
            runtime.block_on(supervisor.run());
        })
        .context("Failed to spawn worker thread")
}

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::load_config();
    let _guard = logger::setup_logging(&config.log_dir(), &config.log_level())?;

    let worker = config.worker_config()?;
    info!(
        "Instance '{}' on {} via {}, topics [{}]",
        worker.instance_name,
        worker.exchange,
        worker.broker.display_uri(),
        worker.sources.topics.join(", ")
    );

    let store = Arc::new(SnapshotStore::new(Arc::new(FileLoader), Arc::new(DefaultIndexBuilder)));
    let _worker = spawn_worker(Arc::clone(&store), worker)?;

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port()));
    let listener = tokio::net::TcpListener::bind(addr)
        .await
        .with_context(|| format!("Failed to bind {}", addr))?;
    info!("Status server listening on http://{}", addr);

    tokio::select! {
        served = axum::serve(listener, status::router(store).into_make_service()) => {
            served.context("Status server failed")?;
        }
        _ = signal::ctrl_c() => {
            info!("Ctrl-C received, exiting.");
        }
    }
    Ok(())
}
