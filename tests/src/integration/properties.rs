//! # Arbitration Properties
//!
//! Invariants checked directly on the engine over randomized and
//! concurrent bid streams:
//!
//! - the leading value never decreases and equals the largest accepted bid
//! - a bid that is not higher is rejected whatever its signature
//! - a bid with a bad signature is rejected even when it would lead
//! - redelivery of an accepted bid changes nothing and emits nothing
//! - finalization is terminal
//! - concurrent higher bids never lose an update

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use auction_arbiter::{ArbitrationApi, ArbitrationOutcome, Rejection, RegistryError};
    use rand::rngs::StdRng;
    use rand::{Rng, SeedableRng};
    use shared_types::Amount;

    use crate::fixtures::{
        amount, ended, forged_bid, recording_engine, signed_bid, started, BIDDERS,
    };

    #[tokio::test]
    async fn test_highest_bid_tracks_maximum_accepted() {
        let (engine, recorder) = recording_engine();
        engine.on_auction_started(started("P1")).await;

        let mut rng = StdRng::seed_from_u64(0x0a11_ce5e);
        let mut leading: Option<Amount> = None;
        let mut accepted = Vec::new();

        for _ in 0..48 {
            let user = BIDDERS[rng.gen_range(0..BIDDERS.len())];
            let units = rng.gen_range(1..=500);
            let honest = rng.gen_bool(0.8);
            let payload = if honest {
                signed_bid("P1", user, units)
            } else {
                forged_bid("P1", user, "mallory", units)
            };

            let outcome = engine.on_bid_submitted(payload).await;
            let should_lead = honest && leading.map_or(true, |v| amount(units) > v);
            assert_eq!(outcome.is_accepted(), should_lead, "bid {user} {units}");

            if should_lead {
                leading = Some(amount(units));
                accepted.push(amount(units));
            }

            let highest = engine.registry().highest_bid("P1").unwrap();
            assert_eq!(highest.value(), leading);
        }

        assert!(accepted.windows(2).all(|w| w[0] < w[1]));
        assert_eq!(leading, accepted.iter().copied().max());
        assert_eq!(recorder.validated.lock().len(), accepted.len());
    }

    #[tokio::test]
    async fn test_not_higher_wins_over_bad_signature() {
        let (engine, _) = recording_engine();
        engine.on_auction_started(started("P2")).await;
        assert!(engine.on_bid_submitted(signed_bid("P2", "u1", 100)).await.is_accepted());

        for units in [1, 99, 100] {
            let outcome = engine
                .on_bid_submitted(forged_bid("P2", "u2", "mallory", units))
                .await;
            assert_eq!(outcome.rejection(), Some(Rejection::NotHigherBid));
        }
    }

    #[tokio::test]
    async fn test_bad_signature_never_leads() {
        let (engine, recorder) = recording_engine();
        engine.on_auction_started(started("P3")).await;

        let outcome = engine
            .on_bid_submitted(forged_bid("P3", "u1", "u2", 1_000))
            .await;
        assert_eq!(outcome.rejection(), Some(Rejection::BadSignature));

        let mut tampered = signed_bid("P3", "u1", 10);
        tampered.value = amount(10_000);
        let outcome = engine.on_bid_submitted(tampered).await;
        assert_eq!(outcome.rejection(), Some(Rejection::BadSignature));

        assert!(engine.registry().highest_bid("P3").unwrap().is_none());
        assert!(recorder.validated.lock().is_empty());
    }

    #[tokio::test]
    async fn test_redelivered_accepted_bid_is_inert() {
        let (engine, recorder) = recording_engine();
        engine.on_auction_started(started("P4")).await;

        let bid = signed_bid("P4", "u3", 75);
        assert!(engine.on_bid_submitted(bid.clone()).await.is_accepted());
        let before = engine.registry().highest_bid("P4").unwrap();

        for _ in 0..3 {
            let outcome = engine.on_bid_submitted(bid.clone()).await;
            assert_eq!(outcome.rejection(), Some(Rejection::NotHigherBid));
        }

        assert_eq!(engine.registry().highest_bid("P4").unwrap(), before);
        assert_eq!(recorder.validated.lock().len(), 1);
    }

    #[tokio::test]
    async fn test_finalization_is_terminal() {
        let (engine, recorder) = recording_engine();
        engine.on_auction_started(started("P5")).await;
        engine.on_bid_submitted(signed_bid("P5", "u1", 40)).await;
        assert!(matches!(
            engine.on_auction_ended(ended("P5")).await,
            ArbitrationOutcome::AuctionFinalized { .. }
        ));

        let late = engine.on_bid_submitted(signed_bid("P5", "u2", 400)).await;
        assert_eq!(late.rejection(), Some(Rejection::AuctionClosed));

        assert_eq!(
            engine.on_auction_started(started("P5")).await,
            ArbitrationOutcome::LifecycleIgnored {
                auction_id: "P5".into(),
                reason: RegistryError::AuctionClosed("P5".into()),
            }
        );
        assert!(matches!(
            engine.on_auction_ended(ended("P5")).await,
            ArbitrationOutcome::LifecycleIgnored { .. }
        ));

        assert_eq!(recorder.winners.lock().len(), 1);
        assert_eq!(
            engine.registry().highest_bid("P5").unwrap().value(),
            Some(amount(40))
        );
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 8)]
    async fn test_concurrent_higher_bids_keep_maximum() {
        let (engine, recorder) = recording_engine();
        engine.on_auction_started(started("P6")).await;

        let bids: Vec<_> = (1..=24)
            .map(|units| signed_bid("P6", BIDDERS[units as usize % BIDDERS.len()], units))
            .collect();

        let handles: Vec<_> = bids
            .into_iter()
            .map(|bid| {
                let engine = Arc::clone(&engine);
                tokio::spawn(async move { engine.on_bid_submitted(bid).await })
            })
            .collect();

        let mut accepted = 0;
        for handle in handles {
            let outcome = handle.await.unwrap();
            match outcome.rejection() {
                None => {
                    assert!(outcome.is_accepted());
                    accepted += 1;
                }
                Some(reason) => assert_eq!(reason, Rejection::NotHigherBid),
            }
        }

        assert!(accepted >= 1);
        assert_eq!(recorder.validated.lock().len(), accepted);
        assert_eq!(
            engine.registry().highest_bid("P6").unwrap().value(),
            Some(amount(24))
        );
    }
}
