//! # Disruption Protobuf Payload
//!
//! The disruption body carried inside a GTFS-realtime entity. Timestamps are
//! Unix seconds, identifiers are the external uris used by the transit graph.

use prost::Message;

/// A disruption as published by the disruption back-office.
#[derive(Clone, PartialEq, Message)]
pub struct Disruption {
    /// Stable external identifier. Upserts and deletions are keyed on it.
    #[prost(string, tag = "1")]
    pub id: String,

    /// Human readable reference shown to operators.
    #[prost(string, tag = "2")]
    pub reference: String,

    /// Why the disruption exists.
    #[prost(message, optional, tag = "4")]
    pub cause: Option<Cause>,

    /// When travellers may be informed about the disruption.
    #[prost(message, optional, tag = "5")]
    pub publication_period: Option<TimeRange>,

    /// The concrete effects on the network.
    #[prost(message, repeated, tag = "6")]
    pub impacts: Vec<Impact>,

    /// Contributor that produced the disruption.
    #[prost(string, tag = "7")]
    pub contributor: String,
}

#[derive(Clone, PartialEq, Message)]
pub struct Cause {
    #[prost(string, tag = "1")]
    pub id: String,

    #[prost(string, tag = "2")]
    pub wording: String,
}

/// One effect of a disruption over some objects and periods.
#[derive(Clone, PartialEq, Message)]
pub struct Impact {
    #[prost(string, tag = "1")]
    pub id: String,

    #[prost(message, optional, tag = "4")]
    pub severity: Option<Severity>,

    #[prost(message, repeated, tag = "5")]
    pub application_periods: Vec<TimeRange>,

    /// Objects of the graph this impact applies to.
    #[prost(message, repeated, tag = "6")]
    pub informed_entities: Vec<PtObject>,

    #[prost(message, repeated, tag = "7")]
    pub messages: Vec<ImpactMessage>,
}

#[derive(Clone, PartialEq, Message)]
pub struct Severity {
    #[prost(string, tag = "1")]
    pub id: String,

    #[prost(string, tag = "2")]
    pub wording: String,

    #[prost(string, tag = "3")]
    pub color: String,

    #[prost(int32, tag = "4")]
    pub priority: i32,

    /// Maps to the [`Effect`] enum.
    #[prost(enumeration = "Effect", tag = "5")]
    pub effect: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct TimeRange {
    #[prost(uint64, tag = "1")]
    pub start: u64,

    #[prost(uint64, tag = "2")]
    pub end: u64,
}

/// Reference to an object of the graph by type and uri.
#[derive(Clone, PartialEq, Message)]
pub struct PtObject {
    #[prost(string, tag = "1")]
    pub uri: String,

    /// Maps to the [`PtObjectType`] enum.
    #[prost(enumeration = "PtObjectType", tag = "2")]
    pub pt_object_type: i32,
}

#[derive(Clone, PartialEq, Message)]
pub struct ImpactMessage {
    #[prost(string, tag = "1")]
    pub text: String,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum PtObjectType {
    Unknown = 0,
    Network = 1,
    StopArea = 2,
    Line = 3,
    LineSection = 4,
    Route = 5,
    StopPoint = 6,
}

/// Service effect, numbered as in the GTFS-realtime `Alert.Effect` enum.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Effect {
    UnknownEffect = 8,
    NoService = 1,
    ReducedService = 2,
    SignificantDelays = 3,
    Detour = 4,
    AdditionalService = 5,
    ModifiedService = 6,
    OtherEffect = 7,
    StopMoved = 9,
}
