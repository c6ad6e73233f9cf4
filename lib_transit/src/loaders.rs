//! # File Loader
//!
//! Reads the static dataset written by the timetable importer and, when
//! configured, the store of persisted disruptions.
//!
//! ## Dataset
//! One JSON document `{meta, networks, lines, routes, stop_areas, stop_points}`.
//! Every reference must resolve or the whole load fails.
//!
//! ## Persisted disruptions
//! A JSON array of `{contributor, disruption}`. Only entries whose contributor
//! is one of the configured topics are kept, and an entry whose references do
//! not resolve against the freshly loaded graph is skipped. Kept entries go
//! through [`ChaosApplier::apply_upsert`], so their periods are clipped to the
//! production period exactly like a live update.

use std::collections::HashSet;
use std::fs;
use std::path::Path;

use serde::de::DeserializeOwned;
use serde::Deserialize;
use tracing::{info, warn};

use crate::core::snapshot_store::{DataLoader, DataSources, LoadedData};
use crate::disruptions::{check_references, ChaosApplier, DisruptionApplier};
use crate::error::LoadError;
use crate::model::{Disruption, Line, Metadata, Network, PtData, Route, StopArea, StopPoint};

#[derive(Debug, Deserialize)]
struct Dataset {
    meta: Metadata,
    #[serde(default)]
    networks: Vec<Network>,
    #[serde(default)]
    lines: Vec<Line>,
    #[serde(default)]
    routes: Vec<Route>,
    #[serde(default)]
    stop_areas: Vec<StopArea>,
    #[serde(default)]
    stop_points: Vec<StopPoint>,
}

#[derive(Debug, Deserialize)]
struct StoredDisruption {
    contributor: String,
    disruption: Disruption,
}

/// Loader over JSON files on the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub struct FileLoader;

impl DataLoader for FileLoader {
    fn load(&self, sources: &DataSources) -> Result<LoadedData, LoadError> {
        let path = sources.database_path.as_path();
        let dataset: Dataset = read_json(path)?;

        let mut pt_data = PtData {
            networks: dataset.networks,
            lines: dataset.lines,
            routes: dataset.routes,
            stop_areas: dataset.stop_areas,
            stop_points: dataset.stop_points,
            ..Default::default()
        };
        check_integrity(&pt_data).map_err(|reason| LoadError::Invalid {
            path: path.to_path_buf(),
            reason,
        })?;

        if let Some(store) = &sources.disruptions_path {
            load_disruptions(store, &sources.topics, &mut pt_data, &dataset.meta)?;
        }

        Ok(LoadedData {
            pt_data,
            meta: dataset.meta,
        })
    }
}

fn read_json<T: DeserializeOwned>(path: &Path) -> Result<T, LoadError> {
    let raw = fs::read_to_string(path).map_err(|source| LoadError::Io {
        path: path.to_path_buf(),
        source,
    })?;
    serde_json::from_str(&raw).map_err(|source| LoadError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

fn unique<'a>(kind: &str, uris: impl Iterator<Item = &'a str>) -> Result<HashSet<&'a str>, String> {
    let mut seen = HashSet::new();
    for uri in uris {
        if !seen.insert(uri) {
            return Err(format!("duplicate {kind} '{uri}'"));
        }
    }
    Ok(seen)
}

fn check_integrity(data: &PtData) -> Result<(), String> {
    let networks = unique("network", data.networks.iter().map(|n| n.uri.as_str()))?;
    let lines = unique("line", data.lines.iter().map(|l| l.uri.as_str()))?;
    let stop_areas = unique("stop area", data.stop_areas.iter().map(|s| s.uri.as_str()))?;
    let stop_points = unique("stop point", data.stop_points.iter().map(|s| s.uri.as_str()))?;
    unique("route", data.routes.iter().map(|r| r.uri.as_str()))?;

    if let Some(line) = data.lines.iter().find(|l| !networks.contains(l.network_uri.as_str())) {
        return Err(format!("line '{}' references unknown network '{}'", line.uri, line.network_uri));
    }
    if let Some(sp) = data
        .stop_points
        .iter()
        .find(|sp| !stop_areas.contains(sp.stop_area_uri.as_str()))
    {
        return Err(format!("stop point '{}' references unknown stop area '{}'", sp.uri, sp.stop_area_uri));
    }
    for route in &data.routes {
        if !lines.contains(route.line_uri.as_str()) {
            return Err(format!("route '{}' references unknown line '{}'", route.uri, route.line_uri));
        }
        if let Some(sp) = route
            .stop_point_uris
            .iter()
            .find(|uri| !stop_points.contains(uri.as_str()))
        {
            return Err(format!("route '{}' stops at unknown stop point '{}'", route.uri, sp));
        }
    }
    Ok(())
}

fn load_disruptions(
    path: &Path,
    topics: &[String],
    data: &mut PtData,
    meta: &Metadata,
) -> Result<(), LoadError> {
    let stored: Vec<StoredDisruption> = read_json(path)?;
    let total = stored.len();

    for entry in stored {
        if !topics.iter().any(|t| *t == entry.contributor) {
            continue;
        }
        if let Err(e) = check_references(&entry.disruption, data) {
            warn!("Persisted disruption '{}' skipped: {}", entry.disruption.uri, e);
            continue;
        }
        ChaosApplier.apply_upsert(entry.disruption, data, meta);
    }

    info!(
        "Loaded {} of {} persisted disruptions from {}",
        data.disruptions.len(),
        total,
        path.display()
    );
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn write(value: serde_json::Value) -> NamedTempFile {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "{}", value).unwrap();
        file
    }

    fn dataset() -> serde_json::Value {
        json!({
            "meta": { "start_date": "2024-01-01", "end_date": "2024-12-31" },
            "networks": [{ "uri": "N1", "name": "Metro" }],
            "lines": [{ "uri": "L1", "name": "Line 1", "network_uri": "N1" }],
            "routes": [{ "uri": "R1", "name": "R1 fwd", "line_uri": "L1", "stop_point_uris": ["SP1", "SP2"] }],
            "stop_areas": [{ "uri": "SA1", "name": "Central" }],
            "stop_points": [
                { "uri": "SP1", "name": "Central 1", "stop_area_uri": "SA1" },
                { "uri": "SP2", "name": "Central 2", "stop_area_uri": "SA1" }
            ]
        })
    }

    fn sources(db: &NamedTempFile) -> DataSources {
        DataSources {
            database_path: db.path().to_path_buf(),
            ..Default::default()
        }
    }

    #[test]
    fn loads_a_consistent_dataset() {
        let db = write(dataset());
        let loaded = FileLoader.load(&sources(&db)).unwrap();
        assert_eq!(loaded.pt_data.networks.len(), 1);
        assert_eq!(loaded.pt_data.stop_points.len(), 2);
        assert_eq!(loaded.meta.end_date.to_string(), "2024-12-31");
    }

    #[test]
    fn missing_file_is_an_io_error() {
        let sources = DataSources {
            database_path: "/nonexistent/data.nav.json".into(),
            ..Default::default()
        };
        assert!(matches!(FileLoader.load(&sources), Err(LoadError::Io { .. })));
    }

    #[test]
    fn dangling_reference_is_invalid() {
        let mut data = dataset();
        data["lines"][0]["network_uri"] = json!("N404");
        let db = write(data);
        let err = FileLoader.load(&sources(&db)).unwrap_err();
        assert!(matches!(err, LoadError::Invalid { ref reason, .. } if reason.contains("N404")));
    }

    #[test]
    fn garbage_is_a_parse_error() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, "not json").unwrap();
        assert!(matches!(FileLoader.load(&sources(&file)), Err(LoadError::Parse { .. })));
    }

    #[test]
    fn persisted_disruptions_follow_topics() {
        let db = write(dataset());
        let disruption = |uri: &str, line: &str| {
            json!({
                "uri": uri,
                "impacts": [{
                    "uri": format!("{uri}-I1"),
                    "severity": { "uri": "S1", "wording": "closed", "effect": "no_service", "priority": 1 },
                    "application_periods": [],
                    "informed_entities": [{ "kind": "line", "uri": line }]
                }]
            })
        };
        let store = write(json!([
            { "contributor": "chaos", "disruption": disruption("D1", "L1") },
            { "contributor": "other", "disruption": disruption("D2", "L1") },
            { "contributor": "chaos", "disruption": disruption("D3", "L404") }
        ]));

        let sources = DataSources {
            disruptions_path: Some(store.path().to_path_buf()),
            topics: vec!["chaos".into()],
            ..sources(&db)
        };
        let loaded = FileLoader.load(&sources).unwrap();
        let ids: Vec<_> = loaded.pt_data.disruptions.keys().cloned().collect();
        assert_eq!(ids, vec!["D1".to_string()]);
    }

    #[test]
    fn persisted_disruptions_are_clipped_to_production() {
        let db = write(dataset());
        let store = write(json!([{
            "contributor": "chaos",
            "disruption": {
                "uri": "D1",
                "impacts": [
                    {
                        "uri": "D1-I1",
                        "severity": { "uri": "S1", "wording": "closed", "effect": "no_service", "priority": 1 },
                        "application_periods": [],
                        "informed_entities": [{ "kind": "line", "uri": "L1" }]
                    },
                    {
                        "uri": "D1-I2",
                        "severity": { "uri": "S1", "wording": "closed", "effect": "no_service", "priority": 1 },
                        "application_periods": [
                            { "begin": "2025-06-01T00:00:00Z", "end": "2025-06-02T00:00:00Z" }
                        ],
                        "informed_entities": [{ "kind": "line", "uri": "L1" }]
                    }
                ]
            }
        }]));

        let sources = DataSources {
            disruptions_path: Some(store.path().to_path_buf()),
            topics: vec!["chaos".into()],
            ..sources(&db)
        };
        let loaded = FileLoader.load(&sources).unwrap();
        let stored = loaded.pt_data.disruption("D1").unwrap();
        assert_eq!(stored.impacts.len(), 1);
        assert_eq!(stored.impacts[0].uri, "D1-I1");

        let (begin, end) = loaded.meta.production_period();
        let period = stored.impacts[0].application_periods[0];
        assert_eq!((period.begin, period.end), (begin, end));
    }
}
