use std::collections::VecDeque;
use std::sync::Arc;

use oracle_engine::EngineEvent;
use oracle_types::{Address, U256};
use parking_lot::Mutex;
use serde::Serialize;
use tokio::sync::broadcast;
use tracing::warn;

/// One `RequestCreated` occurrence, kept around so a runner that polls
/// instead of holding a live subscription (spec.md §4.6: "observed via
/// polling or a finalized-event subscription") can catch up on anything
/// it missed.
#[derive(Debug, Clone, Serialize)]
pub struct RequestCreatedRecord {
    pub request_id: U256,
    pub agent_id: u64,
    pub max_cost_per_agent: U256,
    pub payload: Vec<u8>,
    pub subcommittee: Vec<Address>,
    pub threshold: usize,
}

/// Bounded in-memory event log. Not a durability mechanism — it is a
/// queryable tail of recent events, analogous to a chain's recent log
/// index; anything older than `capacity` entries is simply gone, same as
/// the ring itself (spec.md §4.2 design note on deliberate forgetting).
pub struct EventFeed {
    entries: Mutex<VecDeque<RequestCreatedRecord>>,
    capacity: usize,
}

impl EventFeed {
    pub fn new(capacity: usize) -> Arc<Self> {
        Arc::new(EventFeed { entries: Mutex::new(VecDeque::with_capacity(capacity)), capacity })
    }

    fn push(&self, record: RequestCreatedRecord) {
        let mut entries = self.entries.lock();
        if entries.len() >= self.capacity {
            entries.pop_front();
        }
        entries.push_back(record);
    }

    /// Every recorded `RequestCreated` with `request_id > since`, oldest
    /// first, capped at `limit`.
    pub fn since(&self, since: U256, limit: usize) -> Vec<RequestCreatedRecord> {
        self.entries
            .lock()
            .iter()
            .filter(|r| r.request_id > since)
            .take(limit)
            .cloned()
            .collect()
    }
}

/// Drains the engine's broadcast channel into the feed for as long as the
/// node runs. A lagging receiver (spec.md §9 "probes are stateless
/// hints") just skips the events it missed rather than blocking anyone.
pub async fn run_feed_writer(mut events: broadcast::Receiver<EngineEvent>, feed: Arc<EventFeed>) {
    loop {
        match events.recv().await {
            Ok(EngineEvent::RequestCreated {
                request_id,
                agent_id,
                max_cost_per_agent,
                payload,
                subcommittee,
                threshold,
            }) => {
                feed.push(RequestCreatedRecord {
                    request_id,
                    agent_id,
                    max_cost_per_agent,
                    payload,
                    subcommittee,
                    threshold,
                });
            }
            Ok(_) => {}
            Err(broadcast::error::RecvError::Lagged(skipped)) => {
                warn!(skipped, "event feed writer lagged, some RequestCreated events were dropped");
            }
            Err(broadcast::error::RecvError::Closed) => return,
        }
    }
}
