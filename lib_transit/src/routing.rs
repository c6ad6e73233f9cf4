//! # Derived Routing Index
//!
//! Precomputed lookups consumed by the query engine: which routes serve a stop
//! point, which routes belong to a line, and which routes and stop points are
//! currently suspended by a `NoService` disruption. The index is derived from
//! [`PtData`] and rebuilt once per published batch, never per entity.

use std::collections::{BTreeSet, HashMap};

use crate::model::{Effect, PtData, PtObjectKind};

/// Read-only lookup tables built from one version of the graph.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct RoutingIndex {
    routes_by_stop_point: HashMap<String, Vec<String>>,
    routes_by_line: HashMap<String, Vec<String>>,
    suspended_routes: BTreeSet<String>,
    suspended_stop_points: BTreeSet<String>,
    /// Number of disruptions the index was built from.
    pub disruption_count: usize,
}

impl RoutingIndex {
    pub fn routes_at(&self, stop_point_uri: &str) -> &[String] {
        self.routes_by_stop_point
            .get(stop_point_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn routes_of_line(&self, line_uri: &str) -> &[String] {
        self.routes_by_line
            .get(line_uri)
            .map(Vec::as_slice)
            .unwrap_or(&[])
    }

    pub fn is_route_suspended(&self, route_uri: &str) -> bool {
        self.suspended_routes.contains(route_uri)
    }

    pub fn is_stop_point_suspended(&self, stop_point_uri: &str) -> bool {
        self.suspended_stop_points.contains(stop_point_uri)
    }

    pub fn suspended_route_count(&self) -> usize {
        self.suspended_routes.len()
    }
}

/// Builds the derived index from a graph.
pub trait IndexBuilder: Send + Sync {
    fn rebuild(&self, graph: &PtData) -> RoutingIndex;
}

/// Index builder used by the service.
#[derive(Debug, Default, Clone, Copy)]
pub struct DefaultIndexBuilder;

impl IndexBuilder for DefaultIndexBuilder {
    fn rebuild(&self, graph: &PtData) -> RoutingIndex {
        let mut index = RoutingIndex {
            disruption_count: graph.disruptions.len(),
            ..Default::default()
        };

        for route in &graph.routes {
            index
                .routes_by_line
                .entry(route.line_uri.clone())
                .or_default()
                .push(route.uri.clone());
            for sp in &route.stop_point_uris {
                index
                    .routes_by_stop_point
                    .entry(sp.clone())
                    .or_default()
                    .push(route.uri.clone());
            }
        }

        let blocking = graph
            .disruptions
            .values()
            .flat_map(|d| d.impacts.iter())
            .filter(|impact| impact.severity.effect == Effect::NoService)
            .flat_map(|impact| impact.informed_entities.iter());

        for object in blocking {
            match object.kind {
                PtObjectKind::Network => {
                    for line in graph.lines_of_network(&object.uri) {
                        for route in graph.routes_of_line(&line.uri) {
                            index.suspended_routes.insert(route.uri.clone());
                        }
                    }
                }
                PtObjectKind::Line => {
                    for route in graph.routes_of_line(&object.uri) {
                        index.suspended_routes.insert(route.uri.clone());
                    }
                }
                PtObjectKind::Route => {
                    index.suspended_routes.insert(object.uri.clone());
                }
                PtObjectKind::StopArea => {
                    for sp in graph.stop_points_of_area(&object.uri) {
                        index.suspended_stop_points.insert(sp.uri.clone());
                    }
                }
                PtObjectKind::StopPoint => {
                    index.suspended_stop_points.insert(object.uri.clone());
                }
            }
        }

        index
    }
}
