//! # In-Process Broker
//!
//! A broker living inside the test process. It honors the same topology and
//! delivery rules as RabbitMQ (topic bindings, at-most-once, queues dying with
//! the session) and lets a test refuse connections or sever a live session.

use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use async_trait::async_trait;
use tokio::sync::mpsc;
use tracing::debug;

use super::{Broker, Session, Topology};
use crate::error::TransportError;
use crate::messages::{Envelope, Origin};

type Delivery = Result<Envelope, TransportError>;

#[derive(Default)]
struct State {
    refused_connects: usize,
    connect_count: usize,
    session_id: u64,
    task_binding: Option<String>,
    rt_bindings: Vec<String>,
    sender: Option<mpsc::UnboundedSender<Delivery>>,
    listening: bool,
}

/// Cloneable handle on one shared in-process broker.
#[derive(Clone, Default)]
pub struct MemoryBroker {
    state: Arc<Mutex<State>>,
}

impl MemoryBroker {
    pub fn new() -> Self {
        Self::default()
    }

    fn lock(&self) -> MutexGuard<'_, State> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Refuses the next `count` connection attempts.
    pub fn fail_next_connects(&self, count: usize) {
        self.lock().refused_connects = count;
    }

    /// Number of successful connections so far.
    pub fn connect_count(&self) -> usize {
        self.lock().connect_count
    }

    /// Routing patterns bound by the current session, task binding first.
    pub fn bindings(&self) -> Vec<String> {
        let state = self.lock();
        state
            .task_binding
            .iter()
            .chain(state.rt_bindings.iter())
            .cloned()
            .collect()
    }

    /// Whether a session is consuming right now.
    pub fn is_listening(&self) -> bool {
        self.lock().listening
    }

    /// Publishes on the exchange. Returns `false` when no consumer queue
    /// matched, in which case the message is lost.
    pub fn publish(&self, envelope: Envelope) -> bool {
        let state = self.lock();
        if !state.listening {
            debug!("Dropping {} message {}: nobody is listening", envelope.origin, envelope.routing_key);
            return false;
        }
        let bound = match envelope.origin {
            Origin::Task => state
                .task_binding
                .as_deref()
                .is_some_and(|pattern| topic_matches(pattern, &envelope.routing_key)),
            Origin::Realtime => state
                .rt_bindings
                .iter()
                .any(|pattern| topic_matches(pattern, &envelope.routing_key)),
        };
        if !bound {
            return false;
        }
        state
            .sender
            .as_ref()
            .is_some_and(|sender| sender.send(Ok(envelope)).is_ok())
    }

    /// Kills the current session: its consumer sees a transport error and
    /// its queues disappear.
    pub fn sever(&self) {
        let mut state = self.lock();
        if let Some(sender) = state.sender.take() {
            let _ = sender.send(Err(TransportError::Other("connection severed".to_string())));
        }
        state.listening = false;
        state.task_binding = None;
        state.rt_bindings.clear();
    }
}

#[async_trait]
impl Broker for MemoryBroker {
    async fn connect(&self, topology: &Topology) -> Result<Box<dyn Session>, TransportError> {
        let mut state = self.lock();
        if state.refused_connects > 0 {
            state.refused_connects -= 1;
            return Err(TransportError::Connect("connection refused".to_string()));
        }

        let (sender, receiver) = mpsc::unbounded_channel();
        state.connect_count += 1;
        state.session_id += 1;
        state.task_binding = Some(topology.task_binding());
        state.rt_bindings = topology.rt_topics.clone();
        state.sender = Some(sender);
        state.listening = false;

        Ok(Box::new(MemorySession {
            id: state.session_id,
            broker: self.clone(),
            receiver,
        }))
    }
}

struct MemorySession {
    id: u64,
    broker: MemoryBroker,
    receiver: mpsc::UnboundedReceiver<Delivery>,
}

#[async_trait]
impl Session for MemorySession {
    async fn subscribe(&mut self) -> Result<(), TransportError> {
        let mut state = self.broker.lock();
        if state.session_id != self.id || state.sender.is_none() {
            return Err(TransportError::Closed);
        }
        state.listening = true;
        Ok(())
    }

    async fn next_envelope(&mut self) -> Result<Envelope, TransportError> {
        match self.receiver.recv().await {
            Some(delivery) => delivery,
            None => Err(TransportError::Closed),
        }
    }
}

/// AMQP topic matching: `*` stands for one word, `#` for zero or more.
fn topic_matches(pattern: &str, key: &str) -> bool {
    fn walk(pattern: &[&str], key: &[&str]) -> bool {
        match (pattern.first(), key.first()) {
            (None, None) => true,
            (Some(&"#"), _) => {
                walk(&pattern[1..], key) || (!key.is_empty() && walk(pattern, &key[1..]))
            }
            (Some(&"*"), Some(_)) => walk(&pattern[1..], &key[1..]),
            (Some(p), Some(k)) if p == k => walk(&pattern[1..], &key[1..]),
            _ => false,
        }
    }
    let pattern: Vec<&str> = pattern.split('.').collect();
    let key: Vec<&str> = key.split('.').collect();
    walk(&pattern, &key)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn topology() -> Topology {
        Topology::new("navitia", "fr-idf", vec!["realtime.chaos".into()])
    }

    #[test]
    fn topic_patterns() {
        assert!(topic_matches("fr-idf.task.*", "fr-idf.task.reload"));
        assert!(!topic_matches("fr-idf.task.*", "fr-idf.task"));
        assert!(!topic_matches("fr-idf.task.*", "other.task.reload"));
        assert!(topic_matches("realtime.#", "realtime"));
        assert!(topic_matches("realtime.#", "realtime.chaos.lille"));
        assert!(topic_matches("realtime.chaos", "realtime.chaos"));
    }

    #[tokio::test]
    async fn delivers_only_once_subscribed() {
        let broker = MemoryBroker::new();
        let mut session = broker.connect(&topology()).await.unwrap();

        let envelope = Envelope::new(Origin::Realtime, "realtime.chaos", vec![1]);
        assert!(!broker.publish(envelope.clone()));

        session.subscribe().await.unwrap();
        assert!(broker.publish(envelope.clone()));
        assert_eq!(session.next_envelope().await.unwrap(), envelope);
    }

    #[tokio::test]
    async fn unbound_keys_are_lost() {
        let broker = MemoryBroker::new();
        let mut session = broker.connect(&topology()).await.unwrap();
        session.subscribe().await.unwrap();
        assert!(!broker.publish(Envelope::new(Origin::Realtime, "realtime.other", vec![])));
        assert!(!broker.publish(Envelope::new(Origin::Task, "fr-nw.task.reload", vec![])));
        assert!(broker.publish(Envelope::new(Origin::Task, "fr-idf.task.reload", vec![])));
    }

    #[tokio::test]
    async fn refused_then_severed() {
        let broker = MemoryBroker::new();
        broker.fail_next_connects(1);
        assert!(matches!(
            broker.connect(&topology()).await,
            Err(TransportError::Connect(_))
        ));

        let mut session = broker.connect(&topology()).await.unwrap();
        session.subscribe().await.unwrap();
        assert_eq!(broker.connect_count(), 1);
        assert_eq!(broker.bindings(), vec!["fr-idf.task.*", "realtime.chaos"]);

        broker.sever();
        assert!(session.next_envelope().await.is_err());
        assert!(session.next_envelope().await.is_err());
        assert!(broker.bindings().is_empty());
    }
}
