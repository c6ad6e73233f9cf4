//! # Envelope Dispatcher
//!
//! Routes each envelope to the handler of the stream it came from. Dispatching
//! is synchronous: the supervisor does not pull the next envelope until the
//! current one has been fully applied.

use std::sync::Arc;

use tracing::debug;

use crate::core::snapshot_store::{DataSources, SnapshotStore};
use crate::disruptions::DisruptionApplier;
use crate::handlers::{RealtimeHandler, TaskHandler};
use crate::messages::{Envelope, Origin};

pub struct Dispatcher {
    tasks: TaskHandler,
    realtime: RealtimeHandler,
}

impl Dispatcher {
    pub fn new(tasks: TaskHandler, realtime: RealtimeHandler) -> Self {
        Self { tasks, realtime }
    }

    /// Wires both handlers to the same store.
    pub fn for_store(
        store: Arc<SnapshotStore>,
        sources: DataSources,
        applier: Arc<dyn DisruptionApplier>,
    ) -> Self {
        Self::new(
            TaskHandler::new(Arc::clone(&store), sources),
            RealtimeHandler::new(store, applier),
        )
    }

    pub fn dispatch(&self, envelope: &Envelope) {
        debug!(
            "Message received: {} [{}] ({} bytes)",
            envelope.origin,
            envelope.routing_key,
            envelope.body.len()
        );
        match envelope.origin {
            Origin::Task => self.tasks.handle(&envelope.body),
            Origin::Realtime => {
                self.realtime.handle(&envelope.body);
            }
        }
    }
}
