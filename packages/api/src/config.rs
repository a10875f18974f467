//! Bridge configuration: defaults, builder setters and `BRIDGE_*` overrides.

use bridge_core::QueueConfig;
use db::DbConfig;
use serde::{Deserialize, Serialize};
use thiserror::Error;

pub const ENV_BIND_ADDR: &str = "BRIDGE_BIND_ADDR";
pub const ENV_DB_ENDPOINT: &str = "BRIDGE_DB_ENDPOINT";
pub const ENV_DB_NAMESPACE: &str = "BRIDGE_DB_NAMESPACE";
pub const ENV_DB_DATABASE: &str = "BRIDGE_DB_DATABASE";
pub const ENV_WORKERS: &str = "BRIDGE_WORKERS";
pub const ENV_JOB_TIMEOUT_SECS: &str = "BRIDGE_JOB_TIMEOUT_SECS";
pub const ENV_POLL_INTERVAL_MS: &str = "BRIDGE_POLL_INTERVAL_MS";
pub const ENV_MAX_QUEUE_SIZE: &str = "BRIDGE_MAX_QUEUE_SIZE";
pub const ENV_MAX_RETAINED_JOBS: &str = "BRIDGE_MAX_RETAINED_JOBS";

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value for {key}: {value:?}")]
    Invalid { key: &'static str, value: String },
}

/// Runtime configuration for the bridge and its HTTP surface.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BridgeConfig {
    /// Address the HTTP server binds to.
    pub bind_addr: String,
    pub db: DbConfig,
    /// Defaults for every operation's job queue.
    pub queue: QueueConfig,
}

impl Default for BridgeConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:8080".to_string(),
            db: DbConfig::memory(),
            queue: QueueConfig::default(),
        }
    }
}

/// Parse a numeric override. Zero is rejected along with non-numbers.
fn parse_positive<T>(key: &'static str, value: String) -> Result<T, ConfigError>
where
    T: std::str::FromStr + Default + PartialEq,
{
    match value.trim().parse::<T>() {
        Ok(parsed) if parsed != T::default() => Ok(parsed),
        _ => Err(ConfigError::Invalid { key, value }),
    }
}

fn ensure_positive(key: &'static str, value: u64) -> Result<(), ConfigError> {
    if value == 0 {
        return Err(ConfigError::Invalid {
            key,
            value: value.to_string(),
        });
    }
    Ok(())
}

impl BridgeConfig {
    pub fn with_bind_addr(mut self, bind_addr: impl Into<String>) -> Self {
        self.bind_addr = bind_addr.into();
        self
    }

    pub fn with_db(mut self, db: DbConfig) -> Self {
        self.db = db;
        self
    }

    pub fn with_queue(mut self, queue: QueueConfig) -> Self {
        self.queue = queue;
        self
    }

    /// Defaults overridden by process environment variables.
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Defaults overridden by whatever `lookup` returns for each `BRIDGE_*` key.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(addr) = lookup(ENV_BIND_ADDR) {
            config.bind_addr = addr;
        }
        if let Some(endpoint) = lookup(ENV_DB_ENDPOINT) {
            config.db = config.db.with_endpoint(endpoint);
        }
        if let Some(namespace) = lookup(ENV_DB_NAMESPACE) {
            config.db = config.db.with_namespace(namespace);
        }
        if let Some(database) = lookup(ENV_DB_DATABASE) {
            config.db = config.db.with_database(database);
        }
        if let Some(workers) = lookup(ENV_WORKERS) {
            config.queue.concurrency = parse_positive(ENV_WORKERS, workers)?;
        }
        if let Some(timeout) = lookup(ENV_JOB_TIMEOUT_SECS) {
            config.queue.default_timeout_secs = parse_positive(ENV_JOB_TIMEOUT_SECS, timeout)?;
        }
        if let Some(interval) = lookup(ENV_POLL_INTERVAL_MS) {
            config.queue.poll_interval_ms = parse_positive(ENV_POLL_INTERVAL_MS, interval)?;
        }
        if let Some(size) = lookup(ENV_MAX_QUEUE_SIZE) {
            config.queue.max_queue_size = Some(parse_positive(ENV_MAX_QUEUE_SIZE, size)?);
        }
        if let Some(retained) = lookup(ENV_MAX_RETAINED_JOBS) {
            config.queue.max_retained_jobs = parse_positive(ENV_MAX_RETAINED_JOBS, retained)?;
        }

        Ok(config)
    }

    /// Reject queue settings that would leave jobs stuck or spinning:
    /// no workers, a zero timeout, a zero poll interval, a zero-capacity
    /// queue or a zero retention cap.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let queue = &self.queue;
        ensure_positive(ENV_WORKERS, u64::from(queue.concurrency))?;
        ensure_positive(ENV_JOB_TIMEOUT_SECS, queue.default_timeout_secs)?;
        ensure_positive(ENV_POLL_INTERVAL_MS, queue.poll_interval_ms)?;
        if let Some(size) = queue.max_queue_size {
            ensure_positive(ENV_MAX_QUEUE_SIZE, size as u64)?;
        }
        ensure_positive(ENV_MAX_RETAINED_JOBS, queue.max_retained_jobs as u64)?;
        Ok(())
    }
}
