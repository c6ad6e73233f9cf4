//! # Broker Transports
//!
//! The supervisor talks to the message broker through two small traits so the
//! connection lifecycle can be driven against RabbitMQ in production and
//! against an in-process broker in tests.
//!
//! ## Topology
//! One topic exchange, two exclusive auto-deleting queues. The task queue is
//! bound to `<instance>.task.*`, the realtime queue once per configured topic.
//! Everything is declared again on each connect, which the broker treats as a
//! no-op when it already exists.
//!
//! ## Delivery
//! Consumers run without acknowledgements and the queues die with the session,
//! so delivery is at-most-once: whatever is published while the service is
//! disconnected is lost.

use async_trait::async_trait;

use crate::error::TransportError;
use crate::messages::Envelope;

#[cfg(feature = "amqp")]
/// RabbitMQ transport built on lapin.
pub mod amqp;
/// In-process transport with failure injection.
pub mod memory;

#[cfg(feature = "amqp")]
pub use amqp::AmqpBroker;
pub use memory::MemoryBroker;

/// Exchange, queues and bindings the worker needs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Topology {
    pub exchange: String,
    pub instance_name: String,
    pub rt_topics: Vec<String>,
}

impl Topology {
    pub fn new(exchange: impl Into<String>, instance_name: impl Into<String>, rt_topics: Vec<String>) -> Self {
        Self {
            exchange: exchange.into(),
            instance_name: instance_name.into(),
            rt_topics,
        }
    }

    /// Routing pattern of the task queue, scoped to this instance.
    pub fn task_binding(&self) -> String {
        format!("{}.task.*", self.instance_name)
    }
}

/// Opens sessions against a broker.
#[async_trait]
pub trait Broker: Send + Sync {
    /// Establishes a session and declares the whole topology.
    async fn connect(&self, topology: &Topology) -> Result<Box<dyn Session>, TransportError>;
}

/// A live broker session.
#[async_trait]
pub trait Session: Send {
    /// Starts consuming from both queues.
    async fn subscribe(&mut self) -> Result<(), TransportError>;

    /// Waits for the next envelope from either queue.
    async fn next_envelope(&mut self) -> Result<Envelope, TransportError>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn task_binding_is_scoped_to_instance() {
        let topology = Topology::new("navitia", "fr-idf", vec!["realtime.chaos".into()]);
        assert_eq!(topology.task_binding(), "fr-idf.task.*");
    }
}
