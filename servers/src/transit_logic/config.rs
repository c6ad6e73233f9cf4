use anyhow::Result;
use clap::Parser;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};
use std::time::Duration;

use lib_transit::core::DataSources;
use lib_transit::{BrokerConfig, WorkerConfig};

#[derive(Parser, Deserialize, Serialize, Debug, Clone, Default, PartialEq)]
#[clap(about = "Transit realtime maintenance server", version)]
#[serde(rename_all = "camelCase")]
pub struct Config {
    #[clap(long, env = "TRANSIT_PORT", help = "Port of the HTTP status surface.")]
    pub port: Option<u16>,

    #[clap(long, env = "TRANSIT_CONFIG_PATH", help = "Path to the JSON configuration file.")]
    pub config_path: Option<PathBuf>,

    #[clap(long, env = "TRANSIT_LOG_DIR", help = "Directory for log files.")]
    pub log_dir: Option<PathBuf>,

    #[clap(long, env = "TRANSIT_LOG_LEVEL", help = "Logging level (trace, debug, info, warn, error).")]
    pub log_level: Option<String>,

    #[clap(long, env = "TRANSIT_INSTANCE_NAME", help = "Instance name, scopes the task routing key.")]
    pub instance_name: Option<String>,

    #[clap(long, env = "TRANSIT_EXCHANGE", help = "Topic exchange carrying tasks and realtime feeds.")]
    pub exchange: Option<String>,

    #[clap(long, env = "TRANSIT_BROKER_HOST", help = "RabbitMQ host.")]
    pub broker_host: Option<String>,

    #[clap(long, env = "TRANSIT_BROKER_PORT", help = "RabbitMQ port.")]
    pub broker_port: Option<u16>,

    #[clap(long, env = "TRANSIT_BROKER_USERNAME", help = "RabbitMQ user.")]
    pub broker_username: Option<String>,

    #[clap(long, env = "TRANSIT_BROKER_PASSWORD", help = "RabbitMQ password.")]
    pub broker_password: Option<String>,

    #[clap(long, env = "TRANSIT_BROKER_VHOST", help = "RabbitMQ virtual host.")]
    pub broker_vhost: Option<String>,

    #[clap(long, env = "TRANSIT_DATABASE", help = "Path to the static dataset.")]
    pub database_path: Option<PathBuf>,

    #[clap(long, env = "TRANSIT_DISRUPTIONS", help = "Path to the persisted disruption store.")]
    pub disruptions_path: Option<PathBuf>,

    #[clap(long, env = "TRANSIT_TOPICS", value_delimiter = ',', help = "Realtime topics, comma separated.")]
    pub topics: Option<Vec<String>>,

    #[clap(long, env = "TRANSIT_RECONNECT_BACKOFF_MS", help = "Delay in milliseconds before reconnecting to the broker.")]
    pub reconnect_backoff_ms: Option<u64>,
}

impl Config {
    // Merge two Config structs, where 'other' overrides 'self' for Some values
    fn merge(self, other: Config) -> Config {
        Config {
            port: other.port.or(self.port),
            config_path: other.config_path.or(self.config_path),
            log_dir: other.log_dir.or(self.log_dir),
            log_level: other.log_level.or(self.log_level),
            instance_name: other.instance_name.or(self.instance_name),
            exchange: other.exchange.or(self.exchange),
            broker_host: other.broker_host.or(self.broker_host),
            broker_port: other.broker_port.or(self.broker_port),
            broker_username: other.broker_username.or(self.broker_username),
            broker_password: other.broker_password.or(self.broker_password),
            broker_vhost: other.broker_vhost.or(self.broker_vhost),
            database_path: other.database_path.or(self.database_path),
            disruptions_path: other.disruptions_path.or(self.disruptions_path),
            topics: other.topics.or(self.topics),
            reconnect_backoff_ms: other.reconnect_backoff_ms.or(self.reconnect_backoff_ms),
        }
    }

    fn defaults() -> Config {
        let broker = BrokerConfig::default();
        let worker = WorkerConfig::default();
        Config {
            port: Some(9080),
            log_dir: Some(PathBuf::from("./logs")),
            log_level: Some("info".to_string()),
            instance_name: Some(worker.instance_name),
            exchange: Some(worker.exchange),
            broker_host: Some(broker.host),
            broker_port: Some(broker.port),
            broker_username: Some(broker.username),
            broker_password: Some(broker.password),
            broker_vhost: Some(broker.vhost),
            database_path: Some(worker.sources.database_path),
            topics: Some(Vec::new()),
            reconnect_backoff_ms: Some(worker.reconnect_backoff.as_millis() as u64),
            ..Default::default()
        }
    }

    pub fn port(&self) -> u16 {
        self.port.unwrap_or(9080)
    }

    pub fn log_dir(&self) -> PathBuf {
        self.log_dir.clone().unwrap_or_else(|| PathBuf::from("./logs"))
    }

    pub fn log_level(&self) -> String {
        self.log_level.clone().unwrap_or_else(|| "info".to_string())
    }

    /// Settings handed to the maintenance worker. A zero reconnect backoff is
    /// rejected, it would retry a dead broker in a tight loop.
    pub fn worker_config(&self) -> Result<WorkerConfig> {
        if self.reconnect_backoff_ms == Some(0) {
            return Err(anyhow::anyhow!("reconnectBackoffMs must be greater than 0"));
        }
        let defaults = WorkerConfig::default();
        Ok(WorkerConfig {
            instance_name: self.instance_name.clone().unwrap_or(defaults.instance_name),
            exchange: self.exchange.clone().unwrap_or(defaults.exchange),
            broker: BrokerConfig {
                host: self.broker_host.clone().unwrap_or(defaults.broker.host),
                port: self.broker_port.unwrap_or(defaults.broker.port),
                username: self.broker_username.clone().unwrap_or(defaults.broker.username),
                password: self.broker_password.clone().unwrap_or(defaults.broker.password),
                vhost: self.broker_vhost.clone().unwrap_or(defaults.broker.vhost),
            },
            sources: DataSources {
                database_path: self
                    .database_path
                    .clone()
                    .unwrap_or(defaults.sources.database_path),
                disruptions_path: self.disruptions_path.clone(),
                topics: self.topics.clone().unwrap_or_default(),
            },
            reconnect_backoff: self
                .reconnect_backoff_ms
                .map(Duration::from_millis)
                .unwrap_or(defaults.reconnect_backoff),
        })
    }
}

/// Reads the JSON config file, if any. Problems are reported and the file is
/// ignored.
fn read_config_file(path: &Path) -> Option<Config> {
    if !path.exists() {
        eprintln!("Config file not found at {}. Using defaults and environment/CLI variables.", path.display());
        return None;
    }
    match fs::read_to_string(path) {
        Ok(config_str) => match serde_json::from_str::<Config>(&config_str) {
            Ok(file_config) => Some(file_config),
            Err(e) => {
                eprintln!("Failed to parse config file {}: {}. Falling back to other sources.", path.display(), e);
                None
            }
        },
        Err(e) => {
            eprintln!("Failed to read config file {}: {}. Falling back to other sources.", path.display(), e);
            None
        }
    }
}

/// Defaults, then the config file, then environment and CLI.
pub fn resolve(cli: Config) -> Config {
    let config_file_path = cli
        .config_path
        .clone()
        .unwrap_or_else(|| PathBuf::from("server_transit.conf"));

    let mut current_config = Config::defaults();
    if let Some(file_config) = read_config_file(&config_file_path) {
        current_config = current_config.merge(file_config);
    }
    current_config.merge(cli)
}

pub fn load_config() -> Config {
    // Values from a .env file become environment variables before clap reads them.
    let _ = dotenvy::dotenv();
    resolve(Config::parse())
}
