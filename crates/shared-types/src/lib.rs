//! # Shared Types Crate
//!
//! Domain entities and event payloads shared by every auction service.
//!
//! ## Design Principles
//!
//! - **Single Source of Truth**: cross-service types are defined here.
//! - **Exact money**: values are fixed-point [`Amount`]s, never floats.
//! - **Unrepresentable half-states**: a [`HighestBid`] either has both a
//!   bidder and a value, or neither.

pub mod entities;
pub mod errors;
pub mod ipc;

pub use entities::*;
pub use errors::*;
pub use ipc::*;
