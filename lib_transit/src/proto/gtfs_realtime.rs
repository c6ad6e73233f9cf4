//! # GTFS-realtime Feed Protobuf
//!
//! The subset of `transit_realtime.FeedMessage` the worker consumes. Trip
//! updates, vehicle positions and alerts are only recognised, not interpreted:
//! their bodies are kept opaque. Disruptions travel in the extension range of
//! `FeedEntity` at field 1000.

use prost::Message;

use super::chaos;

/// Top level container of a realtime publication.
#[derive(Clone, PartialEq, Message)]
pub struct FeedMessage {
    #[prost(message, optional, tag = "1")]
    pub header: Option<FeedHeader>,

    /// Entities, applied in order.
    #[prost(message, repeated, tag = "2")]
    pub entity: Vec<FeedEntity>,
}

#[derive(Clone, PartialEq, Message)]
pub struct FeedHeader {
    #[prost(string, tag = "1")]
    pub gtfs_realtime_version: String,

    /// Maps to the [`Incrementality`] enum.
    #[prost(enumeration = "Incrementality", optional, tag = "2")]
    pub incrementality: Option<i32>,

    /// POSIX time the feed was produced at.
    #[prost(uint64, optional, tag = "3")]
    pub timestamp: Option<u64>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Incrementality {
    FullDataset = 0,
    Differential = 1,
}

/// One unit of realtime information.
#[derive(Clone, PartialEq, Message)]
pub struct FeedEntity {
    #[prost(string, tag = "1")]
    pub id: String,

    /// When set, the entity with this id must be removed.
    #[prost(bool, optional, tag = "2")]
    pub is_deleted: Option<bool>,

    #[prost(message, optional, tag = "3")]
    pub trip_update: Option<OpaqueBody>,

    #[prost(message, optional, tag = "4")]
    pub vehicle: Option<OpaqueBody>,

    #[prost(message, optional, tag = "5")]
    pub alert: Option<OpaqueBody>,

    /// Disruption extension.
    #[prost(message, optional, tag = "1000")]
    pub disruption: Option<chaos::Disruption>,
}

/// Placeholder for GTFS-realtime payloads the worker does not interpret.
/// Unknown fields are skipped on decode.
#[derive(Clone, PartialEq, Message)]
pub struct OpaqueBody {}
