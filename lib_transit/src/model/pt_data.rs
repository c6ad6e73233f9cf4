//! # Public Transport Graph
//!
//! The structured part of a snapshot: networks, lines, routes and stops as
//! loaded from the static dataset, plus the table of realtime disruptions that
//! the maintenance worker keeps up to date.

use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// WGS84 position.
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
pub struct Coord {
    pub lon: f64,
    pub lat: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Network {
    pub uri: String,
    pub name: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Line {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub code: String,
    pub network_uri: String,
}

/// One direction of a line, as an ordered list of stop points.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Route {
    pub uri: String,
    pub name: String,
    pub line_uri: String,
    #[serde(default)]
    pub stop_point_uris: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopArea {
    pub uri: String,
    pub name: String,
    #[serde(default)]
    pub coord: Coord,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct StopPoint {
    pub uri: String,
    pub name: String,
    pub stop_area_uri: String,
    #[serde(default)]
    pub coord: Coord,
}

/// Kind of graph object a disruption impact can point at.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PtObjectKind {
    Network,
    Line,
    Route,
    StopArea,
    StopPoint,
}

impl fmt::Display for PtObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            PtObjectKind::Network => "network",
            PtObjectKind::Line => "line",
            PtObjectKind::Route => "route",
            PtObjectKind::StopArea => "stop_area",
            PtObjectKind::StopPoint => "stop_point",
        };
        f.write_str(name)
    }
}

/// A resolved reference to an object of the graph.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct PtObjectRef {
    pub kind: PtObjectKind,
    pub uri: String,
}

/// Closed-open validity window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Period {
    pub begin: DateTime<Utc>,
    pub end: DateTime<Utc>,
}

impl Period {
    /// Intersection with `[begin, end)`, or `None` when they do not overlap.
    pub fn clip(&self, begin: DateTime<Utc>, end: DateTime<Utc>) -> Option<Period> {
        let clipped = Period {
            begin: self.begin.max(begin),
            end: self.end.min(end),
        };
        (clipped.begin < clipped.end).then_some(clipped)
    }

    pub fn contains(&self, at: DateTime<Utc>) -> bool {
        self.begin <= at && at < self.end
    }
}

/// What a disruption does to the service of the objects it informs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Effect {
    NoService,
    ReducedService,
    SignificantDelays,
    Detour,
    AdditionalService,
    ModifiedService,
    OtherEffect,
    #[default]
    UnknownEffect,
    StopMoved,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct Severity {
    pub uri: String,
    pub wording: String,
    pub effect: Effect,
    pub priority: i32,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Impact {
    pub uri: String,
    pub severity: Severity,
    pub application_periods: Vec<Period>,
    pub informed_entities: Vec<PtObjectRef>,
    #[serde(default)]
    pub messages: Vec<String>,
}

/// A realtime disruption as stored in the graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Disruption {
    pub uri: String,
    #[serde(default)]
    pub reference: String,
    #[serde(default)]
    pub cause: String,
    #[serde(default)]
    pub contributor: String,
    #[serde(default)]
    pub publication_period: Option<Period>,
    pub impacts: Vec<Impact>,
}

/// The transit graph held by a snapshot.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct PtData {
    pub networks: Vec<Network>,
    pub lines: Vec<Line>,
    pub routes: Vec<Route>,
    pub stop_areas: Vec<StopArea>,
    pub stop_points: Vec<StopPoint>,
    /// Realtime disruptions keyed by their external id.
    #[serde(default)]
    pub disruptions: BTreeMap<String, Disruption>,
}

impl PtData {
    /// Whether an object of the given kind and uri exists in the graph.
    pub fn contains(&self, kind: PtObjectKind, uri: &str) -> bool {
        match kind {
            PtObjectKind::Network => self.networks.iter().any(|n| n.uri == uri),
            PtObjectKind::Line => self.lines.iter().any(|l| l.uri == uri),
            PtObjectKind::Route => self.routes.iter().any(|r| r.uri == uri),
            PtObjectKind::StopArea => self.stop_areas.iter().any(|s| s.uri == uri),
            PtObjectKind::StopPoint => self.stop_points.iter().any(|s| s.uri == uri),
        }
    }

    pub fn disruption(&self, uri: &str) -> Option<&Disruption> {
        self.disruptions.get(uri)
    }

    pub fn lines_of_network<'a>(&'a self, network_uri: &'a str) -> impl Iterator<Item = &'a Line> + 'a {
        self.lines.iter().filter(move |l| l.network_uri == network_uri)
    }

    pub fn routes_of_line<'a>(&'a self, line_uri: &'a str) -> impl Iterator<Item = &'a Route> + 'a {
        self.routes.iter().filter(move |r| r.line_uri == line_uri)
    }

    pub fn stop_points_of_area<'a>(
        &'a self,
        stop_area_uri: &'a str,
    ) -> impl Iterator<Item = &'a StopPoint> + 'a {
        self.stop_points
            .iter()
            .filter(move |sp| sp.stop_area_uri == stop_area_uri)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    #[test]
    fn clip_keeps_only_the_overlap() {
        let p = Period {
            begin: Utc.with_ymd_and_hms(2024, 1, 1, 0, 0, 0).unwrap(),
            end: Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
        };
        let clipped = p
            .clip(
                Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 2, 1, 0, 0, 0).unwrap(),
            )
            .unwrap();
        assert_eq!(clipped.begin, Utc.with_ymd_and_hms(2024, 1, 5, 0, 0, 0).unwrap());
        assert_eq!(clipped.end, p.end);

        assert!(p
            .clip(
                Utc.with_ymd_and_hms(2024, 1, 10, 0, 0, 0).unwrap(),
                Utc.with_ymd_and_hms(2024, 1, 11, 0, 0, 0).unwrap(),
            )
            .is_none());
    }

    #[test]
    fn contains_looks_up_by_kind() {
        let data = PtData {
            networks: vec![Network { uri: "N1".into(), name: "Metro".into() }],
            stop_areas: vec![StopArea { uri: "SA1".into(), name: "Gare".into(), coord: Coord::default() }],
            ..Default::default()
        };
        assert!(data.contains(PtObjectKind::Network, "N1"));
        assert!(!data.contains(PtObjectKind::Line, "N1"));
        assert!(data.contains(PtObjectKind::StopArea, "SA1"));
    }
}
