//! # Transit Data Model
//!
//! Plain owned types for the in-memory transit graph. Everything here is
//! `Clone` so the realtime path can take a private deep copy of the graph,
//! mutate it, and hand it back to the store for publishing.

pub mod metadata;
pub mod pt_data;

pub use metadata::Metadata;
pub use pt_data::{
    Coord, Disruption, Effect, Impact, Line, Network, Period, PtData, PtObjectKind, PtObjectRef,
    Route, Severity, StopArea, StopPoint,
};
