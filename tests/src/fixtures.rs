//! # Test Fixtures
//!
//! Bidder identities, engines wired to in-memory collaborators, and a full
//! bus pipeline (consumers, dispatcher, relay) for end-to-end flows.

use std::sync::{Arc, OnceLock};
use std::time::Duration;

use async_trait::async_trait;
use auction_arbiter::domain::signature::{encode_public_key_pem, generate_keypair};
use auction_arbiter::{
    sign_bid, ArbitrationEngine, AuctionRegistry, BusOutcomePublisher, IdentityVerifier,
    InMemoryKeyRegistry, KeyRegistry, OutcomePublisher, ShardedDispatcher, INBOUND_TOPICS,
};
use auction_runtime::handlers::{ArbitrationConsumer, NotificationRelay};
use chrono::Utc;
use parking_lot::Mutex;
use rsa::RsaPrivateKey;
use shared_bus::{
    AuctionEvent, EventFilter, EventPublisher, EventTopic, InMemoryEventBus, Subscription,
};
use shared_types::ipc::{
    AuctionEndedPayload, AuctionStartedPayload, AuctionWinnerPayload, BidSubmittedPayload,
    BidValidatedPayload,
};
use shared_types::{Amount, AuctionStatus};
use tokio::task::JoinHandle;

/// Bidders with registered keys.
pub const BIDDERS: [&str; 3] = ["u1", "u2", "u3"];

/// How long flows wait for an expected event.
pub const WAIT: Duration = Duration::from_secs(5);

// Small keys keep debug-build key generation fast.
const TEST_KEY_BITS: usize = 1024;

/// The private key of a registered bidder (cached per process).
///
/// Unknown names get a key that is never registered.
pub fn bidder_key(user_id: &str) -> &'static RsaPrivateKey {
    static KEYS: OnceLock<Vec<RsaPrivateKey>> = OnceLock::new();
    let keys = KEYS.get_or_init(|| {
        (0..=BIDDERS.len())
            .map(|_| generate_keypair(TEST_KEY_BITS).unwrap().0)
            .collect()
    });
    let index = BIDDERS
        .iter()
        .position(|b| *b == user_id)
        .unwrap_or(BIDDERS.len());
    &keys[index]
}

/// Key registry holding every entry of [`BIDDERS`].
pub fn key_registry() -> InMemoryKeyRegistry {
    let registry = InMemoryKeyRegistry::new();
    for user in BIDDERS {
        let pem = encode_public_key_pem(&bidder_key(user).to_public_key()).unwrap();
        registry.insert(user, pem.into_bytes());
    }
    registry
}

/// Whole currency units as an [`Amount`].
pub fn amount(units: u64) -> Amount {
    Amount::from_whole(units).unwrap()
}

/// A bid correctly signed by `user_id`.
pub fn signed_bid(auction_id: &str, user_id: &str, units: u64) -> BidSubmittedPayload {
    sign_bid(bidder_key(user_id), auction_id, user_id, amount(units)).unwrap()
}

/// A bid claiming `user_id` but signed by `signer`.
pub fn forged_bid(auction_id: &str, user_id: &str, signer: &str, units: u64) -> BidSubmittedPayload {
    sign_bid(bidder_key(signer), auction_id, user_id, amount(units)).unwrap()
}

pub fn started(auction_id: &str) -> AuctionStartedPayload {
    let now = Utc::now();
    AuctionStartedPayload {
        auction_id: auction_id.into(),
        description: format!("lot {auction_id}"),
        scheduled_start: now,
        scheduled_end: now + chrono::Duration::minutes(10),
    }
}

pub fn ended(auction_id: &str) -> AuctionEndedPayload {
    AuctionEndedPayload {
        auction_id: auction_id.into(),
    }
}

/// Records every published outcome.
#[derive(Default)]
pub struct RecordingPublisher {
    pub validated: Mutex<Vec<BidValidatedPayload>>,
    pub winners: Mutex<Vec<AuctionWinnerPayload>>,
}

#[async_trait]
impl OutcomePublisher for RecordingPublisher {
    async fn publish_bid_validated(&self, payload: BidValidatedPayload) -> usize {
        self.validated.lock().push(payload);
        1
    }

    async fn publish_winner(&self, payload: AuctionWinnerPayload) -> usize {
        self.winners.lock().push(payload);
        1
    }
}

/// Engine over in-memory keys that records its outcomes.
pub type RecordingEngine = ArbitrationEngine<InMemoryKeyRegistry, RecordingPublisher>;

/// Build a [`RecordingEngine`] and return the recorder alongside it.
pub fn recording_engine() -> (Arc<RecordingEngine>, Arc<RecordingPublisher>) {
    let recorder = Arc::new(RecordingPublisher::default());
    let engine = ArbitrationEngine::new(
        Arc::new(AuctionRegistry::new()),
        IdentityVerifier::new(Arc::new(key_registry())),
        Arc::clone(&recorder),
    );
    (Arc::new(engine), recorder)
}

/// Consumers, dispatcher and relay running on one bus, as the runtime
/// wires them, but with in-memory keys.
pub struct Pipeline {
    pub bus: Arc<InMemoryEventBus>,
    pub registry: Arc<AuctionRegistry>,
    outcomes: Subscription,
    tasks: Vec<JoinHandle<()>>,
}

impl Pipeline {
    /// Start a pipeline. Must run inside a tokio runtime.
    pub fn start(shards: usize) -> Self {
        Self::with_keys(key_registry(), shards)
    }

    /// Start a pipeline resolving identities through `keys`.
    pub fn with_keys<K: KeyRegistry + 'static>(keys: K, shards: usize) -> Self {
        Self::with_shared_keys(Arc::new(keys), shards)
    }

    /// Like [`with_keys`](Self::with_keys), for a registry the test keeps
    /// a handle on.
    pub fn with_shared_keys<K: KeyRegistry + 'static>(keys: Arc<K>, shards: usize) -> Self {
        let bus = Arc::new(InMemoryEventBus::new());
        let registry = Arc::new(AuctionRegistry::new());
        let engine = Arc::new(ArbitrationEngine::new(
            Arc::clone(&registry),
            IdentityVerifier::new(keys),
            Arc::new(BusOutcomePublisher::new(Arc::clone(&bus))),
        ));
        let dispatcher = Arc::new(ShardedDispatcher::spawn(engine, shards, 64));

        let outcomes = bus.subscribe(EventFilter::topics(vec![
            EventTopic::BidValidated,
            EventTopic::AuctionWinner,
        ]));

        let mut tasks: Vec<JoinHandle<()>> = INBOUND_TOPICS
            .into_iter()
            .map(|topic| {
                let consumer = ArbitrationConsumer::new(
                    topic,
                    bus.subscribe(EventFilter::topics(vec![topic])),
                    Arc::clone(&dispatcher),
                );
                tokio::spawn(consumer.run())
            })
            .collect();

        let relay = NotificationRelay::new(
            bus.subscribe(NotificationRelay::<InMemoryEventBus>::filter()),
            Arc::clone(&bus),
        );
        tasks.push(tokio::spawn(relay.run()));

        Self {
            bus,
            registry,
            outcomes,
            tasks,
        }
    }

    pub async fn publish(&self, event: AuctionEvent) {
        self.bus.publish(event).await;
    }

    /// Announce an auction and wait until it accepts bids.
    pub async fn open(&self, auction_id: &str) {
        self.publish(AuctionEvent::AuctionStarted(started(auction_id)))
            .await;
        self.wait_for_status(auction_id, AuctionStatus::Active).await;
    }

    pub async fn bid(&self, auction_id: &str, user_id: &str, units: u64) {
        self.publish(AuctionEvent::BidSubmitted(signed_bid(
            auction_id, user_id, units,
        )))
        .await;
    }

    pub async fn close(&self, auction_id: &str) {
        self.publish(AuctionEvent::AuctionEnded(ended(auction_id)))
            .await;
    }

    pub async fn wait_for_status(&self, auction_id: &str, status: AuctionStatus) {
        let registry = Arc::clone(&self.registry);
        tokio::time::timeout(WAIT, async {
            while registry.get(auction_id).map(|a| a.status) != Some(status) {
                tokio::time::sleep(Duration::from_millis(5)).await;
            }
        })
        .await
        .unwrap_or_else(|_| panic!("{auction_id} never reached {status}"));
    }

    /// Next `bid-validated` or `auction-winner` event.
    pub async fn next_outcome(&mut self) -> AuctionEvent {
        let delivery = tokio::time::timeout(WAIT, self.outcomes.recv())
            .await
            .expect("outcome within timeout")
            .expect("bus open");
        let event = AuctionEvent::from_message(delivery.message()).unwrap();
        delivery.ack();
        event
    }

    /// Whether no outcome is waiting right now.
    pub fn no_pending_outcome(&mut self) -> bool {
        matches!(self.outcomes.try_recv(), Ok(None))
    }
}

impl Drop for Pipeline {
    fn drop(&mut self) {
        for task in &self.tasks {
            task.abort();
        }
    }
}
