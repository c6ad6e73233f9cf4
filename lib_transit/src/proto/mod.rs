//! # Wire Messages
//!
//! Rust representations of the protobuf bodies carried by the broker, written
//! directly with `prost` derives. Decoding into the worker's own tagged types
//! happens once, in [`crate::messages`].

/// Disruption payload carried in feed entities.
pub mod chaos;
/// GTFS-realtime feed container.
pub mod gtfs_realtime;
/// Control task message.
pub mod task;

pub use gtfs_realtime::{FeedEntity, FeedMessage};
pub use task::{Action, TaskMessage};
