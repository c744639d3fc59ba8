//! # Service Container
//!
//! Central container holding the shared bus, the auction registry and the
//! arbitration engine, wired together through their ports.

pub mod config;
pub mod services;

pub use config::{load_config, ConfigError, RuntimeConfig};
pub use services::{ConcreteArbitrationEngine, ServiceContainer};
