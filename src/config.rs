//! Service configuration
//!
//! Loaded from `VEHICLE_*` environment variables, e.g. `VEHICLE_HTTP_PORT=9090`.
//! Every key has a default, so an empty environment yields a working setup.

use std::path::PathBuf;
use std::time::Duration;

use config::{Config, ConfigError, Environment};
use serde::{Deserialize, Serialize};

use crate::channel::ChannelConfig;
use crate::consumer::ConsumerConfig;

#[derive(Debug, Deserialize, Serialize, Clone)]
pub struct AppConfig {
    /// Address the HTTP server binds to
    #[serde(default = "default_http_host")]
    pub http_host: String,

    #[serde(default = "default_http_port")]
    pub http_port: u16,

    /// Root directory for the event store and channel journals
    #[serde(default = "default_data_dir")]
    pub data_dir: PathBuf,

    #[serde(default = "default_channel_partitions")]
    pub channel_partitions: usize,

    /// Buffered records per partition
    #[serde(default = "default_channel_capacity")]
    pub channel_capacity: usize,

    /// Journal published records so uncommitted ones survive a restart
    #[serde(default = "default_channel_journal")]
    pub channel_journal: bool,

    #[serde(default = "default_max_redeliveries")]
    pub max_redeliveries: u32,

    #[serde(default = "default_redelivery_backoff_ms")]
    pub redelivery_backoff_ms: u64,

    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub log_level: String,

    /// `pretty` or `json`
    #[serde(default = "default_log_format")]
    pub log_format: String,
}

fn default_http_host() -> String {
    "0.0.0.0".to_string()
}

fn default_http_port() -> u16 {
    8080
}

fn default_data_dir() -> PathBuf {
    PathBuf::from("data")
}

fn default_channel_partitions() -> usize {
    4
}

fn default_channel_capacity() -> usize {
    1024
}

fn default_channel_journal() -> bool {
    true
}

fn default_max_redeliveries() -> u32 {
    3
}

fn default_redelivery_backoff_ms() -> u64 {
    200
}

fn default_log_level() -> String {
    "info".to_string()
}

fn default_log_format() -> String {
    "pretty".to_string()
}

impl AppConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Config::builder()
            .add_source(Environment::with_prefix("VEHICLE"))
            .build()?
            .try_deserialize()
    }

    pub fn bind_addr(&self) -> String {
        format!("{}:{}", self.http_host, self.http_port)
    }

    pub fn store_path(&self) -> PathBuf {
        self.data_dir.join("events.jsonl")
    }

    pub fn journal_dir(&self) -> PathBuf {
        self.data_dir.join("channel")
    }

    pub fn channel_config(&self) -> ChannelConfig {
        ChannelConfig {
            partitions: self.channel_partitions,
            capacity: self.channel_capacity,
            journal_dir: self.channel_journal.then(|| self.journal_dir()),
        }
    }

    pub fn consumer_config(&self) -> ConsumerConfig {
        ConsumerConfig {
            max_redeliveries: self.max_redeliveries,
            redelivery_backoff: Duration::from_millis(self.redelivery_backoff_ms),
        }
    }
}
