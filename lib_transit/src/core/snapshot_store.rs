//! # Snapshot Store
//!
//! Single-writer, multi-reader versioned cell holding the transit data served to
//! queries. Readers get an `Arc<Snapshot>` and keep it for as long as they like;
//! the maintenance worker mutates a private clone and swaps it in with
//! [`SnapshotStore::publish`].
//!
//! The only shared state on the read path is an atomically replaceable pointer
//! to the current snapshot. Readers never take a lock and can never observe a
//! snapshot that is still being mutated.

use std::path::PathBuf;
use std::sync::Arc;

use arc_swap::ArcSwap;
use chrono::{DateTime, Utc};
use tracing::{error, info};

use crate::core::status::{StatusBoard, StatusReport};
use crate::error::LoadError;
use crate::model::{Metadata, PtData};
use crate::routing::{IndexBuilder, RoutingIndex};

/// One immutable, published version of the data.
#[derive(Debug)]
pub struct Snapshot {
    /// Strictly increasing with every publish. The empty startup snapshot is 0.
    pub version: u64,
    pub pt_data: PtData,
    pub meta: Metadata,
    pub routing: RoutingIndex,
    /// When realtime data last changed this graph. `None` after a full reload.
    pub last_rt_update: Option<DateTime<Utc>>,
    /// When the static dataset behind this snapshot was loaded.
    pub loaded_at: Option<DateTime<Utc>>,
}

impl Snapshot {
    fn empty() -> Self {
        Self {
            version: 0,
            pt_data: PtData::default(),
            meta: Metadata::default(),
            routing: RoutingIndex::default(),
            last_rt_update: None,
            loaded_at: None,
        }
    }

    /// Whether a dataset has ever been loaded into this snapshot's lineage.
    pub fn is_loaded(&self) -> bool {
        self.loaded_at.is_some()
    }
}

/// A private, mutable copy of the current data, invisible to readers until
/// published.
#[derive(Debug, Clone)]
pub struct PendingMutation {
    pub pt_data: PtData,
    pub meta: Metadata,
    base_version: u64,
    routing: Option<RoutingIndex>,
    last_rt_update: Option<DateTime<Utc>>,
    loaded_at: Option<DateTime<Utc>>,
}

impl PendingMutation {
    /// Version of the snapshot this copy was taken from.
    pub fn base_version(&self) -> u64 {
        self.base_version
    }

    /// Builds the derived index over the accumulated mutations.
    pub fn rebuild_index(&mut self, builder: &dyn IndexBuilder) {
        self.routing = Some(builder.rebuild(&self.pt_data));
    }

    /// Marks the copy as carrying realtime changes made at `at`.
    pub fn touch_realtime(&mut self, at: DateTime<Utc>) {
        self.last_rt_update = Some(at);
    }
}

/// Where a full reload reads its data from.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DataSources {
    /// Static dataset produced by the timetable importer.
    pub database_path: PathBuf,
    /// Optional store of persisted disruptions.
    pub disruptions_path: Option<PathBuf>,
    /// Contributors whose persisted disruptions are kept.
    pub topics: Vec<String>,
}

/// Output of a loader: a graph and its metadata.
#[derive(Debug, Clone, Default)]
pub struct LoadedData {
    pub pt_data: PtData,
    pub meta: Metadata,
}

/// Builds a brand-new graph from on-disk sources.
pub trait DataLoader: Send + Sync {
    fn load(&self, sources: &DataSources) -> Result<LoadedData, LoadError>;
}

/// Holder of the current snapshot.
pub struct SnapshotStore {
    current: ArcSwap<Snapshot>,
    loader: Arc<dyn DataLoader>,
    index_builder: Arc<dyn IndexBuilder>,
    status: StatusBoard,
}

impl SnapshotStore {
    /// Creates a store serving the empty version-0 snapshot.
    pub fn new(loader: Arc<dyn DataLoader>, index_builder: Arc<dyn IndexBuilder>) -> Self {
        Self {
            current: ArcSwap::from_pointee(Snapshot::empty()),
            loader,
            index_builder,
            status: StatusBoard::new(),
        }
    }

    /// The snapshot readers should use right now.
    pub fn get_current(&self) -> Arc<Snapshot> {
        self.current.load_full()
    }

    /// Deep copy of the current graph for off-to-the-side mutation.
    pub fn clone_for_mutation(&self) -> PendingMutation {
        let current = self.get_current();
        PendingMutation {
            pt_data: current.pt_data.clone(),
            meta: current.meta.clone(),
            base_version: current.version,
            routing: None,
            last_rt_update: current.last_rt_update,
            loaded_at: current.loaded_at,
        }
    }

    /// Makes `pending` the current snapshot in one step.
    ///
    /// The index is built here only if the caller did not already rebuild it.
    /// Snapshots handed out earlier stay valid until their last holder drops
    /// them. Only the maintenance worker publishes, so reading the current
    /// version and storing the next one cannot race.
    pub fn publish(&self, pending: PendingMutation) -> Arc<Snapshot> {
        let PendingMutation {
            pt_data,
            meta,
            base_version,
            routing,
            last_rt_update,
            loaded_at,
        } = pending;
        let routing = routing.unwrap_or_else(|| self.index_builder.rebuild(&pt_data));

        let current_version = self.current.load().version;
        let snapshot = Arc::new(Snapshot {
            version: current_version + 1,
            pt_data,
            meta,
            routing,
            last_rt_update,
            loaded_at,
        });
        if base_version != current_version {
            info!(
                "Publishing a copy of version {} over version {}",
                base_version, current_version
            );
        }
        self.current.store(Arc::clone(&snapshot));
        snapshot
    }

    /// Replaces the data with a fresh load from `sources`.
    ///
    /// On failure nothing changes: the last good snapshot keeps serving.
    pub fn reload(&self, sources: &DataSources) -> Result<Arc<Snapshot>, LoadError> {
        info!("Loading database from file: {}", sources.database_path.display());
        let loaded = self.loader.load(sources).map_err(|e| {
            error!("Reload failed, keeping version {}: {}", self.get_current().version, e);
            e
        })?;

        let pending = PendingMutation {
            routing: Some(self.index_builder.rebuild(&loaded.pt_data)),
            pt_data: loaded.pt_data,
            meta: loaded.meta,
            base_version: self.get_current().version,
            last_rt_update: None,
            loaded_at: Some(Utc::now()),
        };
        let snapshot = self.publish(pending);
        info!(
            "Data loaded: version {}, {} networks, {} stop points, {} disruptions",
            snapshot.version,
            snapshot.pt_data.networks.len(),
            snapshot.pt_data.stop_points.len(),
            snapshot.pt_data.disruptions.len()
        );
        Ok(snapshot)
    }

    pub fn index_builder(&self) -> &dyn IndexBuilder {
        self.index_builder.as_ref()
    }

    pub fn status(&self) -> &StatusBoard {
        &self.status
    }

    pub fn status_report(&self) -> StatusReport {
        let snapshot = self.get_current();
        StatusReport {
            connection_state: self.status.state(),
            is_connected: self.status.is_connected(),
            snapshot_version: snapshot.version,
            loaded: snapshot.is_loaded(),
            loaded_at: snapshot.loaded_at,
            last_rt_update: snapshot.last_rt_update,
            network_count: snapshot.pt_data.networks.len(),
            disruption_count: snapshot.pt_data.disruptions.len(),
        }
    }
}
