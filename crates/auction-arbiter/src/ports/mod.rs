//! # Ports Layer
//!
//! Trait definitions for the hexagonal architecture.
//! - **Inbound (Driving)**: API that the bus consumers drive
//! - **Outbound (Driven)**: Dependencies this service needs

pub mod inbound;
pub mod outbound;
