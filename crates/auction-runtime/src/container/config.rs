//! # Runtime Configuration
//!
//! Unified configuration for the auction services.
//!
//! Every value has a default and can be overridden from the environment
//! (`AUCTION_*` variables). Overrides that do not parse are errors rather
//! than silently ignored.

use std::path::PathBuf;
use std::time::Duration;
use thiserror::Error;

/// Complete runtime configuration.
#[derive(Debug, Clone, Default)]
pub struct RuntimeConfig {
    /// Public key store.
    pub keys: KeyStoreConfig,
    /// Arbitration workers.
    pub workers: WorkerConfig,
    /// Event bus.
    pub bus: BusConfig,
    /// Auction scheduler.
    pub scheduler: SchedulerConfig,
}

impl RuntimeConfig {
    /// Check cross-field constraints.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.workers.shards == 0 {
            return Err(ConfigError::MustBePositive("AUCTION_WORKER_SHARDS"));
        }
        if self.workers.queue_capacity == 0 {
            return Err(ConfigError::MustBePositive("AUCTION_WORKER_QUEUE"));
        }
        if self.bus.capacity == 0 {
            return Err(ConfigError::MustBePositive("AUCTION_BUS_CAPACITY"));
        }
        if self.keys.lookup_timeout_ms == 0 {
            return Err(ConfigError::MustBePositive("AUCTION_KEY_LOOKUP_TIMEOUT_MS"));
        }
        if self.scheduler.poll_interval_ms == 0 {
            return Err(ConfigError::MustBePositive("AUCTION_SCHEDULER_POLL_MS"));
        }
        Ok(())
    }

    /// Apply overrides from a variable lookup, then validate.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        if let Some(dir) = lookup("AUCTION_KEYS_DIR") {
            config.keys.dir = PathBuf::from(dir);
        }
        if let Some(ms) = parsed(&lookup, "AUCTION_KEY_LOOKUP_TIMEOUT_MS")? {
            config.keys.lookup_timeout_ms = ms;
        }
        if let Some(shards) = parsed(&lookup, "AUCTION_WORKER_SHARDS")? {
            config.workers.shards = shards;
        }
        if let Some(capacity) = parsed(&lookup, "AUCTION_WORKER_QUEUE")? {
            config.workers.queue_capacity = capacity;
        }
        if let Some(capacity) = parsed(&lookup, "AUCTION_BUS_CAPACITY")? {
            config.bus.capacity = capacity;
        }
        if let Some(max) = parsed(&lookup, "AUCTION_MAX_REDELIVERIES")? {
            config.bus.max_redeliveries = max;
        }
        if let Some(ms) = parsed(&lookup, "AUCTION_SCHEDULER_POLL_MS")? {
            config.scheduler.poll_interval_ms = ms;
        }
        if let Some(path) = lookup("AUCTION_CATALOG") {
            config.scheduler.catalog = Some(PathBuf::from(path));
        }
        if let Some(flag) = lookup("AUCTION_SCHEDULER") {
            config.scheduler.enabled = parse_switch("AUCTION_SCHEDULER", &flag)?;
        }

        config.validate()?;
        Ok(config)
    }
}

fn parsed<F, T>(lookup: &F, var: &'static str) -> Result<Option<T>, ConfigError>
where
    F: Fn(&str) -> Option<String>,
    T: std::str::FromStr,
{
    match lookup(var) {
        None => Ok(None),
        Some(raw) => raw
            .trim()
            .parse()
            .map(Some)
            .map_err(|_| ConfigError::InvalidValue { var, value: raw }),
    }
}

fn parse_switch(var: &'static str, raw: &str) -> Result<bool, ConfigError> {
    match raw.trim().to_ascii_lowercase().as_str() {
        "on" | "true" | "1" | "yes" => Ok(true),
        "off" | "false" | "0" | "no" => Ok(false),
        _ => Err(ConfigError::InvalidValue {
            var,
            value: raw.to_string(),
        }),
    }
}

/// Load configuration from the process environment.
pub fn load_config() -> Result<RuntimeConfig, ConfigError> {
    RuntimeConfig::from_lookup(|var| std::env::var(var).ok())
}

/// Configuration errors.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum ConfigError {
    /// An override could not be parsed.
    #[error("{var}: invalid value {value:?}")]
    InvalidValue { var: &'static str, value: String },

    /// A count or duration was zero.
    #[error("{0} must be greater than zero")]
    MustBePositive(&'static str),
}

/// Public key store configuration.
#[derive(Debug, Clone)]
pub struct KeyStoreConfig {
    /// Directory holding `<user_id>.pem` files.
    pub dir: PathBuf,
    /// Bound on a single key lookup.
    pub lookup_timeout_ms: u64,
}

impl KeyStoreConfig {
    /// Lookup bound as a duration.
    #[must_use]
    pub fn lookup_timeout(&self) -> Duration {
        Duration::from_millis(self.lookup_timeout_ms)
    }
}

impl Default for KeyStoreConfig {
    fn default() -> Self {
        Self {
            dir: PathBuf::from("public_keys"),
            lookup_timeout_ms: 2000,
        }
    }
}

/// Arbitration worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Number of single-writer shards.
    pub shards: usize,
    /// Bound of each shard queue.
    pub queue_capacity: usize,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            shards: num_cpus::get().max(1),
            queue_capacity: 1024,
        }
    }
}

/// Event bus configuration.
#[derive(Debug, Clone)]
pub struct BusConfig {
    /// Per-subscriber backlog above which the bus logs a warning.
    pub capacity: usize,
    /// Requeues allowed before dead-lettering.
    pub max_redeliveries: u32,
}

impl Default for BusConfig {
    fn default() -> Self {
        Self {
            capacity: shared_bus::DEFAULT_CHANNEL_CAPACITY,
            max_redeliveries: shared_bus::DEFAULT_MAX_REDELIVERIES,
        }
    }
}

/// Auction scheduler configuration.
#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    /// Run the scheduler in this process.
    pub enabled: bool,
    /// Interval between catalog checks.
    pub poll_interval_ms: u64,
    /// Catalog file; the built-in demo catalog when absent.
    pub catalog: Option<PathBuf>,
}

impl SchedulerConfig {
    /// Poll interval as a duration.
    #[must_use]
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            enabled: true,
            poll_interval_ms: 5000,
            catalog: None,
        }
    }
}
