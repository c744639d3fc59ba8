//! # Auction Test Suite
//!
//! Unified test crate containing:
//!
//! ## Structure
//!
//! ```text
//! tests/src/
//! ├── fixtures.rs       # Cached bidder keys, engines, bus pipeline
//! ├── benchmarks/       # Criterion workloads (run from benches/)
//! └── integration/      # Cross-crate flows
//!     ├── scenarios.rs  # Acceptance scenarios through the bus
//!     ├── properties.rs # Arbitration properties on the engine
//!     └── delivery.rs   # Redelivery, malformed input, fan-out
//! ```
//!
//! ## Running Tests
//!
//! ```bash
//! # All tests
//! cargo test -p auction-tests
//!
//! # By category
//! cargo test -p auction-tests integration::scenarios::
//! cargo test -p auction-tests integration::properties::
//!
//! # Benchmarks
//! cargo bench -p auction-tests
//! ```

#![allow(dead_code)]

pub mod benchmarks;
pub mod fixtures;
pub mod integration;
