//! HTTP status surface of the maintenance worker.

use std::sync::Arc;

use axum::extract::State;
use axum::routing::get;
use axum::{Json, Router};

use lib_transit::SnapshotStore;
use lib_transit::core::StatusReport;

pub fn router(store: Arc<SnapshotStore>) -> Router {
    Router::new()
        .route("/health", get(health))
        .route("/status", get(status))
        .with_state(store)
}

async fn health() -> &'static str {
    "OK"
}

async fn status(State(store): State<Arc<SnapshotStore>>) -> Json<StatusReport> {
    Json(store.status_report())
}

#[cfg(test)]
mod tests {
    use super::*;
    use lib_transit::core::ConnectionState;
    use lib_transit::{DefaultIndexBuilder, FileLoader};

    #[tokio::test]
    async fn status_reports_empty_store() {
        let store = Arc::new(SnapshotStore::new(Arc::new(FileLoader), Arc::new(DefaultIndexBuilder)));
        assert_eq!(health().await, "OK");

        let Json(report) = status(State(store)).await;
        assert_eq!(report.snapshot_version, 0);
        assert!(!report.loaded);
        assert_eq!(report.connection_state, ConnectionState::Disconnected);
    }
}
