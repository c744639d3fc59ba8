//! # Auction Runtime
//!
//! Wires the auction services to one in-process event bus.
//!
//! ## Modular Structure
//!
//! - `container/` - Configuration and the service container
//! - `handlers/` - Bus consumers for arbitration and the notification relay
//! - `scheduler` - Catalog-driven lifecycle announcements
//!
//! ## Event Flow
//!
//! ```text
//! Scheduler ──AuctionStarted/AuctionEnded──┐
//!                                          ↓
//! Bidders ──────BidSubmitted────────→ Event Bus ──→ ArbitrationConsumer ×3
//!                                          ↑                 │
//!                                          │        ShardedDispatcher (per auction)
//!                                          │                 │
//!                                          └── BidValidated / AuctionWinner
//!                                                            │
//!                                 NotificationRelay ─→ AuctionNotifications[auction_id]
//! ```
//!
//! ## Startup Sequence
//!
//! 1. Load and validate configuration
//! 2. Build services (bus, registry, verifier, engine)
//! 3. Spawn the dispatcher workers
//! 4. Subscribe and spawn consumers, relay and scheduler
//!
//! Shutdown signals every task, waits for them, then drains the dispatcher.

pub mod container;
pub mod handlers;
pub mod scheduler;

use std::future::Future;
use std::sync::Arc;

use anyhow::{bail, Context, Result};
use auction_arbiter::{ShardedDispatcher, INBOUND_TOPICS};
use chrono::Utc;
use shared_bus::{EventFilter, InMemoryEventBus};
use tokio::sync::watch;
use tokio::task::JoinHandle;
use tracing::{error, info, warn};

pub use container::{load_config, ConfigError, RuntimeConfig, ServiceContainer};
use handlers::{ArbitrationConsumer, NotificationRelay};
use scheduler::{demo_catalog, load_catalog, AuctionScheduler};

/// The runtime orchestrating all auction services.
pub struct AuctionRuntime {
    /// Service container with all initialized services.
    container: Arc<ServiceContainer>,
    /// Worker pool, present once started.
    dispatcher: Option<Arc<ShardedDispatcher>>,
    /// Spawned consumer, relay and scheduler tasks.
    tasks: Vec<JoinHandle<()>>,
    /// Shutdown signal sender.
    shutdown_tx: watch::Sender<bool>,
    /// Shutdown signal receiver.
    shutdown_rx: watch::Receiver<bool>,
}

impl AuctionRuntime {
    /// Create a runtime. Nothing runs until [`AuctionRuntime::start`].
    pub fn new(config: RuntimeConfig) -> Self {
        info!("Creating auction runtime");

        let container = Arc::new(ServiceContainer::new(config));
        let (shutdown_tx, shutdown_rx) = watch::channel(false);

        Self {
            container,
            dispatcher: None,
            tasks: Vec::new(),
            shutdown_tx,
            shutdown_rx,
        }
    }

    /// Start workers and handlers.
    ///
    /// Every subscription exists when this returns, so events published
    /// afterwards are seen.
    pub async fn start(&mut self) -> Result<()> {
        if self.dispatcher.is_some() {
            bail!("auction runtime already started");
        }

        let container = Arc::clone(&self.container);
        let config = &container.config;
        info!("===========================================");
        info!("  Auction Runtime v{}", env!("CARGO_PKG_VERSION"));
        info!("===========================================");

        let bus = Arc::clone(&container.bus);

        // Resolve the catalog first so a bad file fails start cleanly.
        let scheduler = if config.scheduler.enabled {
            let catalog = match &config.scheduler.catalog {
                Some(path) => load_catalog(path)
                    .await
                    .with_context(|| format!("Failed to load catalog {}", path.display()))?,
                None => {
                    info!("[scheduler] No catalog configured, using demo auctions");
                    demo_catalog(Utc::now())
                }
            };
            Some(AuctionScheduler::new(
                Arc::clone(&bus),
                catalog,
                config.scheduler.poll_interval(),
            ))
        } else {
            None
        };

        let dispatcher = Arc::new(ShardedDispatcher::spawn(
            Arc::clone(&container.engine),
            config.workers.shards,
            config.workers.queue_capacity,
        ));

        for topic in INBOUND_TOPICS {
            let consumer = ArbitrationConsumer::new(
                topic,
                bus.subscribe(EventFilter::topics(vec![topic])),
                Arc::clone(&dispatcher),
            );
            self.spawn_until_shutdown("[arbiter]", consumer.run());
        }

        let relay = NotificationRelay::new(
            bus.subscribe(NotificationRelay::<InMemoryEventBus>::filter()),
            Arc::clone(&bus),
        );
        self.spawn_until_shutdown("[relay]", relay.run());

        if let Some(scheduler) = scheduler {
            self.spawn_until_shutdown("[scheduler]", scheduler.run());
        } else {
            info!("[scheduler] Scheduler disabled");
        }

        info!(
            shards = dispatcher.shard_count(),
            keys_dir = %config.keys.dir.display(),
            subscribers = bus.subscriber_count(),
            "All services running"
        );
        self.dispatcher = Some(dispatcher);

        Ok(())
    }

    fn spawn_until_shutdown<F>(&mut self, tag: &'static str, task: F)
    where
        F: Future<Output = ()> + Send + 'static,
    {
        let mut shutdown = self.shutdown_rx.clone();
        self.tasks.push(tokio::spawn(async move {
            tokio::select! {
                _ = task => {}
                _ = shutdown.changed() => {
                    info!("{tag} Shutdown signal received");
                }
            }
        }));
    }

    /// Shut down gracefully.
    ///
    /// ## Shutdown Sequence
    ///
    /// 1. Signal shutdown to all handlers
    /// 2. Wait for every handler task
    /// 3. Let the dispatcher finish queued commands
    pub async fn shutdown(mut self) {
        info!("Initiating graceful shutdown...");

        if let Err(e) = self.shutdown_tx.send(true) {
            error!("Failed to send shutdown signal: {}", e);
        }

        for task in self.tasks.drain(..) {
            if let Err(e) = task.await {
                error!(error = %e, "Handler task failed");
            }
        }

        if let Some(dispatcher) = self.dispatcher.take() {
            match Arc::try_unwrap(dispatcher) {
                Ok(dispatcher) => dispatcher.shutdown().await,
                Err(_) => warn!("Dispatcher still shared, skipping drain"),
            }
        }

        info!("Shutdown complete");
    }

    /// Get a reference to the service container.
    pub fn container(&self) -> Arc<ServiceContainer> {
        Arc::clone(&self.container)
    }

    /// The shared event bus.
    pub fn bus(&self) -> Arc<InMemoryEventBus> {
        Arc::clone(&self.container.bus)
    }

    /// Whether [`AuctionRuntime::start`] has completed.
    pub fn is_running(&self) -> bool {
        self.dispatcher.is_some()
    }
}
