//! # Observable Status
//!
//! The supervisor's connection state machine and the status board that exposes
//! it, together with the snapshot's realtime freshness, to health checks.

use chrono::{DateTime, Utc};
use serde::Serialize;
use tokio::sync::watch;
use tracing::{error, info};

/// Connection lifecycle of the broker consumer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectionState {
    /// No session. Initial state and the state after any transport failure.
    Disconnected,
    /// Session open and topology declared, consumers not started yet.
    Connected,
    /// Consumers running, envelopes are being dispatched.
    Listening,
}

/// Inputs of the connection state machine.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SupervisorEvent {
    Connected,
    Subscribed,
    TransportFailed,
}

impl ConnectionState {
    /// Transition function. `None` means the event is not valid in this state.
    pub fn on(self, event: SupervisorEvent) -> Option<ConnectionState> {
        use self::ConnectionState::*;
        match (self, event) {
            (_, SupervisorEvent::TransportFailed) => Some(Disconnected),
            (Disconnected, SupervisorEvent::Connected) => Some(Connected),
            (Connected, SupervisorEvent::Subscribed) => Some(Listening),
            _ => None,
        }
    }
}

/// Shared, lock-free view of the connection state.
#[derive(Debug)]
pub struct StatusBoard {
    state: watch::Sender<ConnectionState>,
}

impl StatusBoard {
    pub fn new() -> Self {
        let (state, _) = watch::channel(ConnectionState::Disconnected);
        Self { state }
    }

    pub fn state(&self) -> ConnectionState {
        *self.state.borrow()
    }

    /// The connectivity flag: true only while consumers are running.
    pub fn is_connected(&self) -> bool {
        self.state() == ConnectionState::Listening
    }

    /// A receiver that is notified on every state change.
    pub fn subscribe(&self) -> watch::Receiver<ConnectionState> {
        self.state.subscribe()
    }

    /// Feeds an event to the state machine and publishes the new state.
    pub fn record(&self, event: SupervisorEvent) -> ConnectionState {
        let current = self.state();
        match current.on(event) {
            Some(next) => {
                if next != current {
                    info!("Connection state: {:?} -> {:?}", current, next);
                    self.state.send_replace(next);
                }
                next
            }
            None => {
                error!("Ignoring {:?} while {:?}", event, current);
                current
            }
        }
    }
}

impl Default for StatusBoard {
    fn default() -> Self {
        Self::new()
    }
}

/// Health view served to monitoring.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct StatusReport {
    pub connection_state: ConnectionState,
    pub is_connected: bool,
    pub snapshot_version: u64,
    pub loaded: bool,
    pub loaded_at: Option<DateTime<Utc>>,
    pub last_rt_update: Option<DateTime<Utc>>,
    pub network_count: usize,
    pub disruption_count: usize,
}
