//! # Message Boundary
//!
//! Inbound envelopes and the tagged variants they are decoded into. Protobuf
//! structures never travel further than this module: handlers only see
//! [`Task`] and [`Entity`].

use std::fmt;

use prost::Message;

use crate::error::DecodeError;
use crate::proto::{chaos, Action, FeedMessage, TaskMessage};

/// Which of the two subscribed streams an envelope came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Origin {
    Task,
    Realtime,
}

impl fmt::Display for Origin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Origin::Task => f.write_str("task"),
            Origin::Realtime => f.write_str("realtime"),
        }
    }
}

/// A raw inbound message.
#[derive(Debug, Clone, PartialEq)]
pub struct Envelope {
    pub origin: Origin,
    pub routing_key: String,
    pub body: Vec<u8>,
}

impl Envelope {
    pub fn new(origin: Origin, routing_key: impl Into<String>, body: Vec<u8>) -> Self {
        Self {
            origin,
            routing_key: routing_key.into(),
            body,
        }
    }
}

/// A decoded control command.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Task {
    Reload,
    /// Any action this service does not implement, with its wire code.
    Unknown(i32),
}

impl Task {
    pub fn decode(body: &[u8]) -> Result<Task, DecodeError> {
        let msg = TaskMessage::decode(body)?;
        let code = msg.action.ok_or(DecodeError::MissingAction)?;
        Ok(match Action::try_from(code) {
            Ok(Action::Reload) => Task::Reload,
            Ok(Action::LoadRealtime) | Err(_) => Task::Unknown(code),
        })
    }
}

/// Realtime payload kinds the feed may carry but this service ignores.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnsupportedKind {
    TripUpdate,
    VehiclePosition,
    Alert,
    Empty,
}

impl fmt::Display for UnsupportedKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            UnsupportedKind::TripUpdate => "trip_update",
            UnsupportedKind::VehiclePosition => "vehicle_position",
            UnsupportedKind::Alert => "alert",
            UnsupportedKind::Empty => "empty",
        };
        f.write_str(name)
    }
}

/// One decoded feed entity.
#[derive(Debug, Clone, PartialEq)]
pub enum Entity {
    Delete(String),
    Upsert(Box<chaos::Disruption>),
    Unsupported { id: String, kind: UnsupportedKind },
}

impl Entity {
    pub fn id(&self) -> &str {
        match self {
            Entity::Delete(id) => id,
            Entity::Upsert(d) => &d.id,
            Entity::Unsupported { id, .. } => id,
        }
    }
}

impl From<crate::proto::FeedEntity> for Entity {
    fn from(entity: crate::proto::FeedEntity) -> Self {
        if entity.is_deleted.unwrap_or(false) {
            return Entity::Delete(entity.id);
        }
        if let Some(disruption) = entity.disruption {
            return Entity::Upsert(Box::new(disruption));
        }
        let kind = if entity.trip_update.is_some() {
            UnsupportedKind::TripUpdate
        } else if entity.vehicle.is_some() {
            UnsupportedKind::VehiclePosition
        } else if entity.alert.is_some() {
            UnsupportedKind::Alert
        } else {
            UnsupportedKind::Empty
        };
        Entity::Unsupported {
            id: entity.id,
            kind,
        }
    }
}

/// Decodes a realtime body into its ordered entities. The header is required,
/// as the action is for tasks.
pub fn decode_feed(body: &[u8]) -> Result<Vec<Entity>, DecodeError> {
    let feed = FeedMessage::decode(body)?;
    if feed.header.is_none() {
        return Err(DecodeError::MissingHeader);
    }
    Ok(feed.entity.into_iter().map(Entity::from).collect())
}
