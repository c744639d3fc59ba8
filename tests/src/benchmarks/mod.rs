//! # Auction Benchmarks
//!
//! Criterion workloads for the arbitration hot path, driven from
//! `benches/arbitration_benchmarks.rs`.

pub mod arbitration;
