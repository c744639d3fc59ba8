//! # Delivery Semantics
//!
//! At-least-once behavior seen end to end:
//!
//! 1. **Duplicates**: a bid delivered twice is arbitrated once
//! 2. **Malformed input**: acknowledged and dropped, the consumer keeps going
//! 3. **Transient failures**: an unavailable key store defers the bid until
//!    a redelivery succeeds
//! 4. **Isolation**: a bid waiting on a slow key lookup does not hold back
//!    other auctions on the same shard

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;
    use std::time::Duration;

    use async_trait::async_trait;
    use auction_arbiter::{KeyRegistry, KeyRegistryError};
    use shared_bus::{AuctionEvent, BusMessage, EventPublisher, EventTopic};
    use shared_types::ipc::BidValidatedPayload;
    use shared_types::AuctionStatus;
    use tokio::sync::Semaphore;

    use crate::fixtures::{amount, key_registry, signed_bid, started, Pipeline};

    fn validated(auction_id: &str, user_id: &str, units: u64) -> AuctionEvent {
        AuctionEvent::BidValidated(BidValidatedPayload {
            auction_id: auction_id.into(),
            user_id: user_id.into(),
            value: amount(units),
        })
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_duplicate_delivery_arbitrated_once() {
        let mut pipeline = Pipeline::start(1);
        pipeline.open("D1").await;

        let message = AuctionEvent::BidSubmitted(signed_bid("D1", "u1", 100))
            .to_message()
            .unwrap();
        pipeline.bus.publish_message(message.clone()).await;
        pipeline.bus.publish_message(message).await;
        pipeline.bid("D1", "u2", 101).await;

        assert_eq!(pipeline.next_outcome().await, validated("D1", "u1", 100));
        assert_eq!(pipeline.next_outcome().await, validated("D1", "u2", 101));
        assert!(pipeline.no_pending_outcome());
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_malformed_messages_are_dropped() {
        let mut pipeline = Pipeline::start(1);
        pipeline.open("D2").await;

        let garbage = [
            &b"not json"[..],
            br#"{"auction_id":"D2"}"#,
            br#"{"auction_id":"D2","user_id":"u1","value":"-5","signature":"00"}"#,
            br#"{"auction_id":"D2","user_id":"u1","value":"5.00","signature":"xyz"}"#,
        ];
        for body in garbage {
            pipeline
                .bus
                .publish_message(BusMessage::new(EventTopic::BidSubmitted, body.to_vec()))
                .await;
        }
        pipeline
            .bus
            .publish_message(BusMessage::new(EventTopic::AuctionEnded, b"{}".to_vec()))
            .await;

        pipeline.bid("D2", "u3", 7).await;
        assert_eq!(pipeline.next_outcome().await, validated("D2", "u3", 7));
        assert!(pipeline.no_pending_outcome());
    }

    /// Fails the first `failures` lookups, then serves the fixture keys.
    struct FlakyKeys {
        failures: usize,
        calls: AtomicUsize,
    }

    #[async_trait]
    impl KeyRegistry for FlakyKeys {
        async fn resolve_public_key(
            &self,
            user_id: &str,
        ) -> Result<Option<Vec<u8>>, KeyRegistryError> {
            if self.calls.fetch_add(1, Ordering::SeqCst) < self.failures {
                return Err(KeyRegistryError::Io(std::io::Error::other("disk offline")));
            }
            key_registry().resolve_public_key(user_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_deferred_bid_accepted_on_redelivery() {
        let keys = FlakyKeys {
            failures: 2,
            calls: AtomicUsize::new(0),
        };
        let mut pipeline = Pipeline::with_keys(keys, 1);
        pipeline.open("D3").await;

        pipeline.bid("D3", "u1", 50).await;

        assert_eq!(pipeline.next_outcome().await, validated("D3", "u1", 50));
        assert_eq!(
            pipeline.registry.highest_bid("D3").unwrap().value(),
            Some(amount(50))
        );
    }

    /// Serves the fixture keys only while the gate is open.
    struct GatedKeys {
        gate: Semaphore,
    }

    #[async_trait]
    impl KeyRegistry for GatedKeys {
        async fn resolve_public_key(
            &self,
            user_id: &str,
        ) -> Result<Option<Vec<u8>>, KeyRegistryError> {
            let _pass = self.gate.acquire().await;
            key_registry().resolve_public_key(user_id).await
        }
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_slow_key_lookup_does_not_stall_other_auctions() {
        let keys = Arc::new(GatedKeys {
            gate: Semaphore::new(0),
        });
        let mut pipeline = Pipeline::with_shared_keys(Arc::clone(&keys), 1);
        pipeline.open("D4").await;

        pipeline.bid("D4", "u1", 30).await;
        pipeline
            .publish(AuctionEvent::AuctionStarted(started("D5")))
            .await;

        tokio::time::timeout(
            Duration::from_millis(500),
            pipeline.wait_for_status("D5", AuctionStatus::Active),
        )
        .await
        .expect("D5 opened while D4 waits on its key lookup");
        assert!(pipeline.registry.highest_bid("D4").unwrap().is_none());

        keys.gate.add_permits(1);
        assert_eq!(pipeline.next_outcome().await, validated("D4", "u1", 30));
    }
}
