//! # lib_transit
//!
//! Realtime maintenance of an in-memory public transport graph. Readers share
//! immutable, versioned snapshots; a single worker listens to a message broker
//! for control tasks and disruption feeds, applies them to a private copy, and
//! publishes the result atomically.

pub mod broker;
pub mod configs;
pub mod core;
pub mod disruptions;
pub mod error;
pub mod handlers;
pub mod loaders;
pub mod messages;
pub mod model;
pub mod proto;
pub mod routing;

pub use configs::{BrokerConfig, WorkerConfig};
pub use crate::core::{Snapshot, SnapshotStore, Supervisor};
pub use disruptions::ChaosApplier;
pub use loaders::FileLoader;
pub use routing::DefaultIndexBuilder;
