//! # Shared Bus - Event Bus for the Auction Services
//!
//! Every service talks to the others through this bus only.
//!
//! ## Topology
//!
//! ```text
//! ┌───────────┐  auction.started   ┌───────────┐  bid.validated   ┌───────────┐
//! │ Scheduler │  auction.ended     │  Arbiter  │  auction.winner  │   Relay   │
//! │           │ ─────────────────▶ │           │ ───────────────▶ │           │
//! └───────────┘                    └───────────┘                  └───────────┘
//!                                        ▲                              │
//!                          bid.submitted │       auction.notifications  │
//!                                  ┌───────────┐  (keyed by auction)    │
//!                                  │  Clients  │ ◀──────────────────────┘
//!                                  └───────────┘
//! ```
//!
//! ## Delivery Guarantees
//!
//! - **At-least-once:** each subscription has its own unbounded queue, so
//!   nothing is dropped for a slow consumer. Every delivery is acked or
//!   requeued, and unsettled deliveries are requeued when dropped.
//! - **Dead Letter Queue:** messages requeued more than the configured limit
//!   are moved to [`DLQ_TOPIC`].

// Nursery lints that are too strict
#![allow(clippy::missing_const_for_fn)]
// Allow in tests
#![cfg_attr(test, allow(clippy::unwrap_used))]
#![cfg_attr(test, allow(clippy::expect_used))]
#![cfg_attr(test, allow(clippy::panic))]

pub mod events;
pub mod publisher;
pub mod subscriber;

// Re-export main types
pub use events::{AuctionEvent, BusMessage, DecodeError, EventFilter, EventTopic};
pub use publisher::{EventPublisher, InMemoryEventBus};
pub use subscriber::{Delivery, DeliveryStats, EventSubscriber, Subscription, SubscriptionError};

/// Per-subscriber backlog above which the bus warns that a consumer is behind.
pub const DEFAULT_CHANNEL_CAPACITY: usize = 1000;

/// Requeues allowed per message before it is dead-lettered.
pub const DEFAULT_MAX_REDELIVERIES: u32 = 5;

/// Dead Letter Queue topic for failed messages.
pub const DLQ_TOPIC: &str = "dlq.critical";
