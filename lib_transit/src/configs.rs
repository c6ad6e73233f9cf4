//! # Worker Configuration
//!
//! Plain settings consumed by the maintenance worker. The binary builds them
//! from defaults, a JSON file, the environment and the command line.

use std::path::PathBuf;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::broker::Topology;
use crate::core::snapshot_store::DataSources;

/// Connection parameters of the broker.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BrokerConfig {
    pub host: String,
    pub port: u16,
    pub username: String,
    pub password: String,
    pub vhost: String,
}

impl Default for BrokerConfig {
    fn default() -> Self {
        Self {
            host: "localhost".to_string(),
            port: 5672,
            username: "guest".to_string(),
            password: "guest".to_string(),
            vhost: "/".to_string(),
        }
    }
}

impl BrokerConfig {
    /// Broker address for logs. Never shows the password.
    pub fn display_uri(&self) -> String {
        format!("amqp://{}@{}:{}/{}", self.username, self.host, self.port, self.vhost)
    }
}

/// Everything the maintenance worker needs to run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct WorkerConfig {
    /// Scopes the task binding to `<instance_name>.task.*`.
    pub instance_name: String,
    pub exchange: String,
    pub broker: BrokerConfig,
    pub sources: DataSources,
    /// Wait between a transport failure and the next connection attempt.
    pub reconnect_backoff: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            instance_name: "default".to_string(),
            exchange: "navitia".to_string(),
            broker: BrokerConfig::default(),
            sources: DataSources {
                database_path: PathBuf::from("data.nav.json"),
                disruptions_path: None,
                topics: Vec::new(),
            },
            reconnect_backoff: Duration::from_secs(10),
        }
    }
}

impl WorkerConfig {
    pub fn topology(&self) -> Topology {
        Topology::new(
            self.exchange.clone(),
            self.instance_name.clone(),
            self.sources.topics.clone(),
        )
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn display_uri_hides_password() {
        let config = BrokerConfig {
            password: "s3cret".into(),
            ..Default::default()
        };
        assert_eq!(config.display_uri(), "amqp://guest@localhost:5672//");
        assert!(!config.display_uri().contains("s3cret"));
    }

    #[test]
    fn topology_uses_realtime_topics() {
        let mut config = WorkerConfig::default();
        config.instance_name = "fr-nw".into();
        config.sources.topics = vec!["rt.chaos".into(), "rt.lille".into()];
        let topology = config.topology();
        assert_eq!(topology.task_binding(), "fr-nw.task.*");
        assert_eq!(topology.rt_topics.len(), 2);
    }
}
