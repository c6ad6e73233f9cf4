//! # Control Task Protobuf
//!
//! Messages published on `<instance>.task.*` routing keys. Only the action is
//! meaningful to the maintenance worker.

use prost::Message;

/// A control-plane command addressed to one service instance.
#[derive(Clone, PartialEq, Message)]
pub struct TaskMessage {
    /// What the instance is asked to do. Maps to the [`Action`] enum.
    /// Absent on malformed or truncated payloads.
    #[prost(enumeration = "Action", optional, tag = "1")]
    pub action: Option<i32>,

    /// Realtime reload parameters, carried by `LOAD_REALTIME` tasks.
    #[prost(message, optional, tag = "2")]
    pub load_realtime: Option<LoadRealtime>,
}

/// Parameters of a realtime reload request.
#[derive(Clone, PartialEq, Message)]
pub struct LoadRealtime {
    /// Name of the queue the answer should be published to.
    #[prost(string, tag = "1")]
    pub queue_name: String,

    /// Contributors whose disruptions should be reloaded.
    #[prost(string, repeated, tag = "2")]
    pub contributors: Vec<String>,
}

/// Known control actions.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, prost::Enumeration)]
#[repr(i32)]
pub enum Action {
    /// Rebuild the snapshot from the configured sources.
    Reload = 1,
    /// Re-read realtime data for some contributors. Not handled by this service.
    LoadRealtime = 2,
}
