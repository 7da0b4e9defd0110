use std::sync::atomic::{AtomicUsize, Ordering};

use async_trait::async_trait;
use dashmap::DashSet;
use oracle_types::{Address, U256};
use serde::{Deserialize, Serialize};

/// Wire format of the `/quorum` probe (spec.md §4.6, kept deliberately
/// thin per the §9 design note: one request, one response, no state
/// carried across calls).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct QuorumRequest {
    pub request_id: U256,
    pub agent_id: u64,
    #[serde(rename = "self")]
    pub from: Address,
    pub payload: Vec<u8>,
}

#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct QuorumResponse {
    pub will_run: bool,
}

/// Client side of peer quorum gating. A probe that times out is treated
/// as a `false` by the caller — probes are stateless hints, never
/// authoritative (spec.md §9).
#[async_trait]
pub trait PeerProbe: Send + Sync {
    async fn probe(&self, peer: Address, req: &QuorumRequest) -> bool;
}

/// Polls every other subcommittee member and decides whether enough of
/// them (including self) will run to reach `threshold` (spec.md §4.6
/// QUALIFIED -> QUORUM_PROBED transition).
pub async fn probe_quorum(
    prober: &dyn PeerProbe,
    peers: &[Address],
    req: &QuorumRequest,
    threshold: usize,
) -> bool {
    let mut willing = 1; // self always counts toward its own quorum
    for peer in peers {
        if *peer == req.from {
            continue;
        }
        if prober.probe(*peer, req).await {
            willing += 1;
        }
        if willing >= threshold {
            return true;
        }
    }
    willing >= threshold
}

/// Server side: answers `/quorum` probes for requests this node has
/// already decided to run, or refuses under backpressure (spec.md §5
/// "Backpressure is signaled by refusing to answer willRun=true on
/// /quorum probes when saturated").
pub struct QuorumState {
    max_concurrent: usize,
    active: AtomicUsize,
    refused: DashSet<U256>,
}

impl QuorumState {
    pub fn new(max_concurrent: usize) -> Self {
        QuorumState { max_concurrent, active: AtomicUsize::new(0), refused: DashSet::new() }
    }

    /// `is_member` is resolved by the caller (it needs the on-chain
    /// subcommittee list, which this crate deliberately doesn't cache).
    pub fn answer(&self, request_id: U256, is_member: bool) -> QuorumResponse {
        if self.refused.contains(&request_id) {
            return QuorumResponse { will_run: false };
        }
        if !is_member {
            self.refused.insert(request_id);
            return QuorumResponse { will_run: false };
        }
        if self.active.load(Ordering::Relaxed) >= self.max_concurrent {
            return QuorumResponse { will_run: false };
        }
        QuorumResponse { will_run: true }
    }

    pub fn mark_started(&self) {
        self.active.fetch_add(1, Ordering::Relaxed);
    }

    pub fn mark_finished(&self, request_id: U256) {
        self.active.fetch_sub(1, Ordering::Relaxed);
        self.refused.remove(&request_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    struct FixedProber {
        willing: Vec<Address>,
    }

    #[async_trait]
    impl PeerProbe for FixedProber {
        async fn probe(&self, peer: Address, _req: &QuorumRequest) -> bool {
            self.willing.contains(&peer)
        }
    }

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    #[tokio::test]
    async fn quorum_reached_when_enough_peers_agree() {
        let prober = FixedProber { willing: vec![addr(2)] };
        let req = QuorumRequest { request_id: U256::ZERO, agent_id: 1, from: addr(1), payload: vec![] };
        let reached = probe_quorum(&prober, &[addr(1), addr(2), addr(3)], &req, 2).await;
        assert!(reached);
    }

    #[tokio::test]
    async fn quorum_not_reached_when_peers_refuse() {
        let prober = FixedProber { willing: vec![] };
        let req = QuorumRequest { request_id: U256::ZERO, agent_id: 1, from: addr(1), payload: vec![] };
        let reached = probe_quorum(&prober, &[addr(1), addr(2), addr(3)], &req, 2).await;
        assert!(!reached);
    }

    #[test]
    fn quorum_state_refuses_when_saturated() {
        let state = QuorumState::new(1);
        state.mark_started();
        assert!(!state.answer(U256::from(1u64), true).will_run);
    }

    #[test]
    fn quorum_state_refuses_non_members() {
        let state = QuorumState::new(4);
        assert!(!state.answer(U256::from(1u64), false).will_run);
    }
}
