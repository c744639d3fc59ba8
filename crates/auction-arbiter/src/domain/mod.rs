//! # Domain Layer
//!
//! Pure arbitration logic: auction state, bid encoding and signatures.
//! No I/O; the inner layer of the hexagonal architecture.

pub mod canonical;
pub mod entities;
pub mod errors;
pub mod registry;
pub mod signature;
