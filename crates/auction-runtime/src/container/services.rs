//! # Service Container
//!
//! Builds every long-lived service once and hands out shared references.
//!
//! ## Initialization Order
//!
//! ```text
//! 1. Event bus (no dependencies)
//! 2. Auction registry (no dependencies)
//! 3. Identity verifier ← file key registry
//! 4. Arbitration engine ← registry, verifier, bus publisher
//! ```
//!
//! ## Thread Safety
//!
//! - All services are wrapped in `Arc` for shared ownership
//! - The registry locks per auction; nothing else is shared mutable state

use std::sync::Arc;

use auction_arbiter::{
    ArbitrationEngine, AuctionRegistry, BusOutcomePublisher, FileKeyRegistry, IdentityVerifier,
};
use shared_bus::InMemoryEventBus;
use tracing::info;

use crate::container::config::RuntimeConfig;

/// Concrete engine type: file-backed keys, bus-backed outcomes.
pub type ConcreteArbitrationEngine =
    ArbitrationEngine<FileKeyRegistry, BusOutcomePublisher<InMemoryEventBus>>;

/// Central container holding all service instances.
pub struct ServiceContainer {
    /// Runtime configuration.
    pub config: RuntimeConfig,
    /// The shared event bus.
    pub bus: Arc<InMemoryEventBus>,
    /// Authoritative auction state.
    pub registry: Arc<AuctionRegistry>,
    /// The arbitration engine.
    pub engine: Arc<ConcreteArbitrationEngine>,
}

impl ServiceContainer {
    /// Build all services from configuration.
    pub fn new(config: RuntimeConfig) -> Self {
        let bus = Arc::new(InMemoryEventBus::with_limits(
            config.bus.capacity,
            config.bus.max_redeliveries,
        ));
        let registry = Arc::new(AuctionRegistry::new());

        let keys = Arc::new(FileKeyRegistry::new(config.keys.dir.clone()));
        let verifier = IdentityVerifier::with_timeout(keys, config.keys.lookup_timeout());
        let engine = Arc::new(ArbitrationEngine::new(
            Arc::clone(&registry),
            verifier,
            Arc::new(BusOutcomePublisher::new(Arc::clone(&bus))),
        ));

        info!(
            keys_dir = %config.keys.dir.display(),
            bus_capacity = config.bus.capacity,
            max_redeliveries = config.bus.max_redeliveries,
            "Services initialized"
        );

        Self {
            config,
            bus,
            registry,
            engine,
        }
    }
}
