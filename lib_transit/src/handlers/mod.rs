//! # Message Handlers
//!
//! One handler per inbound stream. Both run on the maintenance worker, one
//! envelope at a time, and never return an error to the supervisor: bad input
//! is logged and dropped.

pub mod realtime_handler;
pub mod task_handler;

pub use realtime_handler::{BatchReport, RealtimeHandler};
pub use task_handler::TaskHandler;
