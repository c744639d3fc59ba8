//! # Sharded Dispatcher
//!
//! Routes commands to single-writer worker tasks by a stable hash of the
//! auction id.
//!
//! ```text
//!                      ┌─ mpsc ─→ [worker 0] ─┐
//! consumer ─ hash(id) ─┼─ mpsc ─→ [worker 1] ─┼─→ ArbitrationApi
//!                      └─ mpsc ─→ [worker N] ─┘
//!        ↑                                     │
//!        └──────── oneshot(outcome) ───────────┘
//! ```
//!
//! Commands for one auction are handled strictly in arrival order; different
//! auctions proceed in parallel, including auctions that share a shard. A
//! worker keeps one lane per auction: the head command of each lane runs as
//! its own task and the rest wait behind it, so a bid stuck on a slow key
//! lookup only holds back its own auction.
//!
//! Each shard admits at most `queue_capacity` commands (queued plus in
//! flight), so a busy shard applies backpressure to the consumer feeding it.

use crate::domain::entities::{ArbitrationCommand, ArbitrationOutcome};
use crate::ports::inbound::ArbitrationApi;
use shared_types::AuctionId;
use std::collections::hash_map::DefaultHasher;
use std::collections::{HashMap, VecDeque};
use std::hash::{Hash, Hasher};
use std::sync::Arc;
use thiserror::Error;
use tokio::sync::{mpsc, oneshot};
use tokio::task::JoinHandle;
use tracing::{debug, error};

/// Default bound of each shard queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 1024;

/// Errors from dispatching.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum DispatchError {
    /// The worker for this shard has stopped.
    #[error("dispatcher worker {0} stopped")]
    Stopped(usize),
}

struct Job {
    command: ArbitrationCommand,
    reply: oneshot::Sender<ArbitrationOutcome>,
}

/// Pending result of a dispatched command.
pub type OutcomeReceiver = oneshot::Receiver<ArbitrationOutcome>;

/// Fixed pool of single-writer arbitration workers.
pub struct ShardedDispatcher {
    shards: Vec<mpsc::Sender<Job>>,
    workers: Vec<JoinHandle<()>>,
}

impl ShardedDispatcher {
    /// Spawn `shards` workers (at least one), each with a queue of
    /// `queue_capacity` commands (at least one).
    ///
    /// Must be called from within a Tokio runtime.
    pub fn spawn<A>(api: Arc<A>, shards: usize, queue_capacity: usize) -> Self
    where
        A: ArbitrationApi + ?Sized + 'static,
    {
        let shards = shards.max(1);
        let queue_capacity = queue_capacity.max(1);

        let mut senders = Vec::with_capacity(shards);
        let mut workers = Vec::with_capacity(shards);
        for shard in 0..shards {
            let (tx, rx) = mpsc::channel(queue_capacity);
            senders.push(tx);
            workers.push(tokio::spawn(run_worker(
                shard,
                Arc::clone(&api),
                rx,
                queue_capacity,
            )));
        }

        debug!(shards, queue_capacity, "[arbiter] Dispatcher started");
        Self {
            shards: senders,
            workers,
        }
    }

    /// Number of workers.
    #[must_use]
    pub fn shard_count(&self) -> usize {
        self.shards.len()
    }

    /// The shard that owns `auction_id`.
    #[must_use]
    pub fn shard_for(&self, auction_id: &str) -> usize {
        shard_index(auction_id, self.shards.len())
    }

    /// Queue a command, waiting for room in its shard.
    ///
    /// Returns a receiver that resolves once the worker has handled it.
    pub async fn dispatch(
        &self,
        command: ArbitrationCommand,
    ) -> Result<OutcomeReceiver, DispatchError> {
        let shard = self.shard_for(command.auction_id());
        let (reply, outcome) = oneshot::channel();

        self.shards[shard]
            .send(Job { command, reply })
            .await
            .map_err(|_| DispatchError::Stopped(shard))?;
        Ok(outcome)
    }

    /// Queue a command and wait for its outcome.
    pub async fn submit(
        &self,
        command: ArbitrationCommand,
    ) -> Result<ArbitrationOutcome, DispatchError> {
        let shard = self.shard_for(command.auction_id());
        self.dispatch(command)
            .await?
            .await
            .map_err(|_| DispatchError::Stopped(shard))
    }

    /// Stop accepting commands, let workers drain their queues, and wait.
    pub async fn shutdown(self) {
        let Self { shards, workers } = self;
        drop(shards);
        for (shard, worker) in workers.into_iter().enumerate() {
            if let Err(e) = worker.await {
                error!(shard, error = %e, "[arbiter] Dispatcher worker failed");
            }
        }
        debug!("[arbiter] Dispatcher stopped");
    }
}

/// Stable shard index of an auction id.
#[must_use]
pub fn shard_index(auction_id: &str, shards: usize) -> usize {
    let mut hasher = DefaultHasher::new();
    auction_id.hash(&mut hasher);
    let shards = shards.max(1) as u64;
    // The remainder is below `shards`, which came from a usize.
    (hasher.finish() % shards) as usize
}

/// Reports a finished lane head back to its worker, even if the handler
/// panicked.
struct LaneRelease {
    auction_id: Option<AuctionId>,
    done: mpsc::UnboundedSender<AuctionId>,
}

impl Drop for LaneRelease {
    fn drop(&mut self) {
        if let Some(auction_id) = self.auction_id.take() {
            // The worker outlives every lane task it starts.
            let _ = self.done.send(auction_id);
        }
    }
}

fn start_lane<A>(shard: usize, api: &Arc<A>, job: Job, done: &mpsc::UnboundedSender<AuctionId>)
where
    A: ArbitrationApi + ?Sized + 'static,
{
    let api = Arc::clone(api);
    let release = LaneRelease {
        auction_id: Some(job.command.auction_id().to_string()),
        done: done.clone(),
    };
    tokio::spawn(async move {
        let _release = release;
        let Job { command, reply } = job;
        let outcome = api.handle(command).await;
        if reply.send(outcome).is_err() {
            debug!(shard, "[arbiter] Outcome receiver dropped");
        }
    });
}

async fn run_worker<A>(
    shard: usize,
    api: Arc<A>,
    mut jobs: mpsc::Receiver<Job>,
    queue_capacity: usize,
) where
    A: ArbitrationApi + ?Sized + 'static,
{
    let (done_tx, mut done_rx) = mpsc::unbounded_channel::<AuctionId>();
    // Commands waiting behind a running one, per auction. An entry exists
    // exactly while that auction has a command in flight.
    let mut lanes: HashMap<AuctionId, VecDeque<Job>> = HashMap::new();
    let mut admitted = 0usize;
    let mut accepting = true;

    while accepting || !lanes.is_empty() {
        tokio::select! {
            job = jobs.recv(), if accepting && admitted < queue_capacity => match job {
                Some(job) => {
                    admitted += 1;
                    match lanes.get_mut(job.command.auction_id()) {
                        Some(waiting) => waiting.push_back(job),
                        None => {
                            lanes.insert(job.command.auction_id().to_string(), VecDeque::new());
                            start_lane(shard, &api, job, &done_tx);
                        }
                    }
                }
                None => accepting = false,
            },
            Some(auction_id) = done_rx.recv() => {
                admitted = admitted.saturating_sub(1);
                let next = lanes.get_mut(&auction_id).and_then(VecDeque::pop_front);
                match next {
                    Some(job) => start_lane(shard, &api, job, &done_tx),
                    None => {
                        lanes.remove(&auction_id);
                    }
                }
            }
        }
    }
}
