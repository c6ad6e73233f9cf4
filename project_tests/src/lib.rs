//! Shared fixtures for the end-to-end scenarios under `tests/`.

use std::io::Write;
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};

use prost::Message;
use serde_json::{Value, json};
use tempfile::NamedTempFile;

use lib_transit::core::DataSources;
use lib_transit::model::PtData;
use lib_transit::proto::chaos;
use lib_transit::proto::gtfs_realtime::{FeedEntity, FeedHeader, FeedMessage};
use lib_transit::proto::{Action, TaskMessage};
use lib_transit::routing::{DefaultIndexBuilder, IndexBuilder, RoutingIndex};
use lib_transit::{FileLoader, SnapshotStore};

/// One network, one line, one route over two stop points in one stop area.
pub fn small_dataset() -> Value {
    json!({
        "meta": {
            "publication_date": "2024-01-01T00:00:00Z",
            "start_date": "2024-01-01",
            "end_date": "2030-12-31",
            "dataset_source": "fixture"
        },
        "networks": [{ "uri": "network:N1", "name": "Metro" }],
        "lines": [{ "uri": "line:L1", "name": "Line 1", "code": "1", "network_uri": "network:N1" }],
        "routes": [{
            "uri": "route:R1",
            "name": "Line 1 northbound",
            "line_uri": "line:L1",
            "stop_point_uris": ["stop_point:SP1", "stop_point:SP2"]
        }],
        "stop_areas": [{ "uri": "stop_area:SA1", "name": "Central", "coord": { "lon": 2.35, "lat": 48.85 } }],
        "stop_points": [
            { "uri": "stop_point:SP1", "name": "Central A", "stop_area_uri": "stop_area:SA1" },
            { "uri": "stop_point:SP2", "name": "Central B", "stop_area_uri": "stop_area:SA1" }
        ]
    })
}

pub fn write_json(value: &Value) -> NamedTempFile {
    let mut file = NamedTempFile::new().expect("temp file");
    write!(file, "{}", value).expect("write fixture");
    file
}

pub fn sources(database: &NamedTempFile) -> DataSources {
    DataSources {
        database_path: database.path().to_path_buf(),
        ..Default::default()
    }
}

/// Index builder counting how many times it runs.
#[derive(Default)]
pub struct CountingIndexBuilder {
    calls: AtomicUsize,
}

impl CountingIndexBuilder {
    pub fn calls(&self) -> usize {
        self.calls.load(Ordering::SeqCst)
    }
}

impl IndexBuilder for CountingIndexBuilder {
    fn rebuild(&self, pt_data: &PtData) -> RoutingIndex {
        self.calls.fetch_add(1, Ordering::SeqCst);
        DefaultIndexBuilder.rebuild(pt_data)
    }
}

pub fn file_store() -> Arc<SnapshotStore> {
    Arc::new(SnapshotStore::new(Arc::new(FileLoader), Arc::new(DefaultIndexBuilder)))
}

pub fn counting_store() -> (Arc<SnapshotStore>, Arc<CountingIndexBuilder>) {
    let builder = Arc::new(CountingIndexBuilder::default());
    let store = Arc::new(SnapshotStore::new(Arc::new(FileLoader), builder.clone()));
    (store, builder)
}

pub fn task_body(action: Option<Action>) -> Vec<u8> {
    TaskMessage {
        action: action.map(|a| a as i32),
        load_realtime: None,
    }
    .encode_to_vec()
}

pub fn reload_body() -> Vec<u8> {
    task_body(Some(Action::Reload))
}

/// Disruption with one no-service impact on a single object.
pub fn no_service(id: &str, object_type: chaos::PtObjectType, uri: &str) -> chaos::Disruption {
    chaos::Disruption {
        id: id.to_string(),
        reference: format!("{id} reference"),
        contributor: "chaos".to_string(),
        impacts: vec![chaos::Impact {
            id: format!("{id}:impact"),
            severity: Some(chaos::Severity {
                id: "severity:closed".to_string(),
                wording: "closed".to_string(),
                effect: chaos::Effect::NoService as i32,
                ..Default::default()
            }),
            informed_entities: vec![chaos::PtObject {
                uri: uri.to_string(),
                pt_object_type: object_type as i32,
            }],
            messages: vec![chaos::ImpactMessage { text: "Service interrupted".to_string() }],
            ..Default::default()
        }],
        ..Default::default()
    }
}

pub fn upsert(disruption: chaos::Disruption) -> FeedEntity {
    FeedEntity {
        id: disruption.id.clone(),
        disruption: Some(disruption),
        ..Default::default()
    }
}

pub fn delete(id: &str) -> FeedEntity {
    FeedEntity {
        id: id.to_string(),
        is_deleted: Some(true),
        ..Default::default()
    }
}

pub fn feed_body(entity: Vec<FeedEntity>) -> Vec<u8> {
    let header = FeedHeader {
        gtfs_realtime_version: "2.0".into(),
        ..Default::default()
    };
    FeedMessage { header: Some(header), entity }.encode_to_vec()
}
