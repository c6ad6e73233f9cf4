//! # Connection Supervisor
//!
//! Owns the broker session for the lifetime of the process:
//!
//! `Disconnected --connect--> Connected --subscribe--> Listening`
//!
//! Any transport error goes back to `Disconnected`, waits the configured
//! backoff and starts over. The loop never returns.

use std::sync::Arc;
use std::time::Duration;

use tracing::{error, info};

use crate::broker::{Broker, Session, Topology};
use crate::configs::WorkerConfig;
use crate::core::dispatcher::Dispatcher;
use crate::core::snapshot_store::SnapshotStore;
use crate::core::status::SupervisorEvent;
use crate::disruptions::DisruptionApplier;
use crate::error::TransportError;

pub struct Supervisor<B: Broker> {
    broker: B,
    topology: Topology,
    dispatcher: Dispatcher,
    store: Arc<SnapshotStore>,
    backoff: Duration,
}

impl<B: Broker> Supervisor<B> {
    pub fn new(
        broker: B,
        topology: Topology,
        dispatcher: Dispatcher,
        store: Arc<SnapshotStore>,
        backoff: Duration,
    ) -> Self {
        Self {
            broker,
            topology,
            dispatcher,
            store,
            backoff,
        }
    }

    /// Builds the supervisor and its handlers from the worker settings.
    pub fn from_config(
        broker: B,
        store: Arc<SnapshotStore>,
        applier: Arc<dyn DisruptionApplier>,
        config: &WorkerConfig,
    ) -> Self {
        let dispatcher = Dispatcher::for_store(Arc::clone(&store), config.sources.clone(), applier);
        Self::new(broker, config.topology(), dispatcher, store, config.reconnect_backoff)
    }

    pub fn store(&self) -> &Arc<SnapshotStore> {
        &self.store
    }

    /// Runs the maintenance loop forever.
    pub async fn run(&self) {
        loop {
            let err = match self.session().await {
                Ok(never) => match never {},
                Err(e) => e,
            };
            self.store.status().record(SupervisorEvent::TransportFailed);
            error!(
                "Connection to broker lost: {}. Retrying in {:?}",
                err, self.backoff
            );
            tokio::time::sleep(self.backoff).await;
        }
    }

    /// One connection lifetime. Only ever returns on a transport error.
    async fn session(&self) -> Result<std::convert::Infallible, TransportError> {
        let mut session = self.broker.connect(&self.topology).await?;
        self.store.status().record(SupervisorEvent::Connected);

        session.subscribe().await?;
        self.store.status().record(SupervisorEvent::Subscribed);
        info!(
            "Listening on exchange '{}' for instance '{}'",
            self.topology.exchange, self.topology.instance_name
        );

        self.listen(session.as_mut()).await
    }

    async fn listen(&self, session: &mut dyn Session) -> Result<std::convert::Infallible, TransportError> {
        loop {
            let envelope = session.next_envelope().await?;
            self.dispatcher.dispatch(&envelope);
        }
    }
}
