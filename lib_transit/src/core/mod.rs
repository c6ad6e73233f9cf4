//! # Maintenance Core
//!
//! The snapshot store and the worker that keeps it current: a supervisor owning
//! the broker session, and a dispatcher routing each envelope to its handler.

pub mod dispatcher;
pub mod snapshot_store;
pub mod status;
pub mod supervisor;

pub use dispatcher::Dispatcher;
pub use snapshot_store::{DataLoader, DataSources, LoadedData, PendingMutation, Snapshot, SnapshotStore};
pub use status::{ConnectionState, StatusBoard, StatusReport, SupervisorEvent};
pub use supervisor::Supervisor;
