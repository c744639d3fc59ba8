//! # Acceptance Scenarios
//!
//! The reference auction lifecycle, driven entirely through the event bus:
//!
//! ```text
//! auction-started A1
//!   bid u1 100  → bid-validated
//!   bid u2  90  → (rejected: not a higher bid)
//!   bid u2 150  → bid-validated
//! auction-ended A1 → auction-winner (u2, 150.00)
//! ```

#[cfg(test)]
mod tests {
    use crate::fixtures::{amount, Pipeline};
    use shared_bus::{AuctionEvent, EventFilter};
    use shared_types::ipc::{AuctionWinnerPayload, BidValidatedPayload, NotificationKind, NotificationPayload};
    use shared_types::AuctionStatus;

    fn validated(auction_id: &str, user_id: &str, units: u64) -> AuctionEvent {
        AuctionEvent::BidValidated(BidValidatedPayload {
            auction_id: auction_id.into(),
            user_id: user_id.into(),
            value: amount(units),
        })
    }

    // =========================================================================
    // SCENARIOS 1-4: FULL LIFECYCLE
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_reference_lifecycle() {
        let mut pipeline = Pipeline::start(4);

        // 1. Started, then u1 bids 100
        pipeline.open("A1").await;
        pipeline.bid("A1", "u1", 100).await;
        assert_eq!(pipeline.next_outcome().await, validated("A1", "u1", 100));

        // 2. u2 bids 90: rejected, nothing emitted
        // 3. u2 bids 150: the next outcome proves 90 produced nothing
        pipeline.bid("A1", "u2", 90).await;
        pipeline.bid("A1", "u2", 150).await;
        assert_eq!(pipeline.next_outcome().await, validated("A1", "u2", 150));

        // 4. Ended: winner is u2 at 150.00
        pipeline.close("A1").await;
        match pipeline.next_outcome().await {
            AuctionEvent::AuctionWinner(winner) => {
                assert_eq!(winner.auction_id, "A1");
                assert_eq!(winner.user_id.as_deref(), Some("u2"));
                assert_eq!(winner.value, Some(amount(150)));
                assert_eq!(winner.value.unwrap().to_string(), "150.00");
            }
            other => panic!("expected winner, got {other:?}"),
        }

        assert_eq!(
            pipeline.registry.get("A1").unwrap().status,
            AuctionStatus::Finalized
        );
        assert!(pipeline.no_pending_outcome());
    }

    // =========================================================================
    // SCENARIO 5: NO BIDS
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_auction_without_bids_has_empty_winner() {
        let mut pipeline = Pipeline::start(2);

        pipeline.open("A2").await;
        pipeline.close("A2").await;

        assert_eq!(
            pipeline.next_outcome().await,
            AuctionEvent::AuctionWinner(AuctionWinnerPayload {
                auction_id: "A2".into(),
                user_id: None,
                value: None,
            })
        );
    }

    // =========================================================================
    // SCENARIO 6: BID ON A NEVER-STARTED AUCTION
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_bid_on_unknown_auction_is_silent() {
        // One shard: commands are handled in publication order.
        let mut pipeline = Pipeline::start(1);
        pipeline.open("A1").await;

        pipeline.bid("X9", "u1", 100).await;
        pipeline.bid("A1", "u1", 5).await;

        assert_eq!(pipeline.next_outcome().await, validated("A1", "u1", 5));
        assert!(pipeline.registry.get("X9").is_none());
        assert!(pipeline.no_pending_outcome());
    }

    // =========================================================================
    // NOTIFICATION FAN-OUT
    // =========================================================================

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_clients_only_see_their_auction() {
        let pipeline = Pipeline::start(4);
        let mut a1 = pipeline.bus.subscribe(EventFilter::for_auction("A1"));
        let mut a2 = pipeline.bus.subscribe(EventFilter::for_auction("A2"));

        pipeline.open("A1").await;
        pipeline.open("A2").await;
        pipeline.bid("A1", "u1", 10).await;
        pipeline.bid("A2", "u3", 20).await;

        let on_a1 = tokio::time::timeout(crate::fixtures::WAIT, a1.recv())
            .await
            .unwrap()
            .unwrap();
        let n1: NotificationPayload = on_a1.message().decode().unwrap();
        on_a1.ack();
        assert_eq!(n1.auction_id, "A1");
        assert_eq!(n1.kind, NotificationKind::BidValidated);
        assert_eq!(n1.user_id.as_deref(), Some("u1"));

        let on_a2 = tokio::time::timeout(crate::fixtures::WAIT, a2.recv())
            .await
            .unwrap()
            .unwrap();
        let n2: NotificationPayload = on_a2.message().decode().unwrap();
        on_a2.ack();
        assert_eq!(n2.auction_id, "A2");
        assert_eq!(n2.value, Some(amount(20)));

        assert!(a1.try_recv().unwrap().is_none());
    }
}
