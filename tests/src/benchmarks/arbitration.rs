//! # Arbitration Benchmarks
//!
//! Hot path costs:
//! - registry assess/record under contention-free access
//! - canonical encoding of a bid
//! - RSA-PSS verification of a signed bid
//! - full engine path for an accepted bid (cached identity)

use std::time::Duration;

use auction_arbiter::domain::signature::verify;
use auction_arbiter::{canonical_payload, ArbitrationApi, AuctionRegistry};
use criterion::{black_box, BenchmarkId, Criterion, Throughput};
use shared_types::{Amount, Auction};

use crate::fixtures::{bidder_key, recording_engine, signed_bid, started};

fn active_registry(auctions: usize) -> AuctionRegistry {
    let registry = AuctionRegistry::new();
    let now = chrono::Utc::now();
    for i in 0..auctions {
        let id = format!("B{i}");
        assert!(registry.register(Auction::scheduled(id.clone(), "bench", now, now)));
        registry.activate(&id).unwrap();
    }
    registry
}

/// Registry operations: rising bids spread over many auctions.
pub fn bench_registry(c: &mut Criterion) {
    let mut group = c.benchmark_group("registry");

    for auctions in [1usize, 64, 1024] {
        let registry = active_registry(auctions);
        let ids: Vec<String> = (0..auctions).map(|i| format!("B{i}")).collect();
        let mut next: u64 = 0;

        group.throughput(Throughput::Elements(1));
        group.bench_with_input(
            BenchmarkId::new("assess_and_record", auctions),
            &auctions,
            |b, _| {
                b.iter(|| {
                    next += 1;
                    let id = &ids[next as usize % ids.len()];
                    let value = Amount::from_minor_units(next);
                    if registry.assess_bid(id, value).is_ok() {
                        black_box(registry.record_bid(id, "u1", value).unwrap());
                    }
                })
            },
        );
    }

    let registry = active_registry(1);
    registry.record_bid("B0", "u1", Amount::from_minor_units(u64::MAX / 2)).unwrap();
    group.bench_function("reject_not_higher", |b| {
        b.iter(|| black_box(registry.assess_bid("B0", Amount::from_minor_units(1)).is_err()))
    });

    group.finish();
}

/// Canonical encoding and signature verification of one bid.
pub fn bench_signature(c: &mut Criterion) {
    let mut group = c.benchmark_group("signature");
    group.measurement_time(Duration::from_secs(10));

    let bid = signed_bid("A1", "u1", 150);
    let public_key = bidder_key("u1").to_public_key();

    group.bench_function("canonical_payload", |b| {
        b.iter(|| black_box(canonical_payload(&bid)))
    });

    group.bench_function("rsa_pss_verify", |b| {
        let message = canonical_payload(&bid);
        b.iter(|| black_box(verify(&public_key, &message, &bid.signature)))
    });

    group.finish();
}

/// Full engine path for bids that each take the lead.
pub fn bench_engine(c: &mut Criterion) {
    let mut group = c.benchmark_group("engine");
    group.measurement_time(Duration::from_secs(10));

    let runtime = tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
        .unwrap();
    let (engine, _) = recording_engine();
    runtime.block_on(engine.on_auction_started(started("E1")));

    // Pre-signed so that only arbitration is measured.
    let bids: Vec<_> = (1..=256).map(|units| signed_bid("E1", "u2", units)).collect();

    group.bench_function("accepted_then_rejected", |b| {
        let mut i = 0usize;
        b.iter(|| {
            let bid = bids[i % bids.len()].clone();
            i += 1;
            black_box(runtime.block_on(engine.on_bid_submitted(bid)))
        })
    });

    group.finish();
}
