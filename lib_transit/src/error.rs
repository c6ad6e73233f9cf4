//! # Error Taxonomy
//!
//! Every failure the maintenance subsystem can meet is one of four kinds. None of
//! them is fatal to the process: the supervisor retries transport failures, the
//! handlers drop undecodable or unresolvable input, and a failed reload keeps the
//! last good snapshot serving.

use std::path::PathBuf;
use thiserror::Error;

/// Broker or network failure. Sends the supervisor back to `Disconnected`.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("Failed to connect to broker: {0}")]
    Connect(String),

    #[error("Failed to declare topology: {0}")]
    Topology(String),

    #[error("Failed to start consumer on queue '{queue}': {reason}")]
    Consume { queue: String, reason: String },

    #[error("Consumer stream closed by broker")]
    Closed,

    #[error("Transport error: {0}")]
    Other(String),
}

#[cfg(feature = "amqp")]
impl From<lapin::Error> for TransportError {
    fn from(e: lapin::Error) -> Self {
        TransportError::Other(e.to_string())
    }
}

/// Malformed message body on either stream.
#[derive(Debug, Error)]
pub enum DecodeError {
    #[error("Invalid protobuf payload: {0}")]
    Protobuf(#[from] prost::DecodeError),

    #[error("Task message carries no action")]
    MissingAction,

    #[error("Feed message carries no header")]
    MissingHeader,
}

/// An entity references something the current graph does not know about.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ResolutionError {
    #[error("Disruption has an empty id")]
    MissingId,

    #[error("Unknown disruption '{0}'")]
    UnknownDisruption(String),

    #[error("Impact '{impact}' references unknown {kind} '{uri}'")]
    UnknownObject {
        impact: String,
        kind: String,
        uri: String,
    },

    #[error("Impact '{impact}' references an object of unsupported type {code}")]
    UnsupportedObjectType { impact: String, code: i32 },
}

/// Building a fresh snapshot from its on-disk sources failed.
#[derive(Debug, Error)]
pub enum LoadError {
    #[error("Failed to read {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse {}: {source}", path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("Dataset {} is inconsistent: {reason}", path.display())]
    Invalid { path: PathBuf, reason: String },
}
