use oracle_types::{Address, ConsensusType, Hash256, Status, U256};

/// Where a finalized request's callback is delivered (spec §4.5). Mirrors
/// the `(callbackAddress, callbackSelector)` pair an EVM caller would
/// supply; this workspace has no ABI to dispatch a selector against, so
/// delivery is left to whatever `FinalizationCallback` the engine is
/// wired with (see `oracle-consensus`) — the target is carried here only
/// so `getRequest` can report it back faithfully.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CallbackTarget {
    pub address: Option<Address>,
    pub selector: [u8; 4],
}

impl CallbackTarget {
    pub const NONE: CallbackTarget = CallbackTarget { address: None, selector: [0; 4] };
}

/// One validator's answer to a request (spec §3 `Response`).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Response {
    pub validator: Address,
    pub result: Vec<u8>,
    pub success: bool,
    pub receipt: Hash256,
    pub cost: U256,
    pub timestamp: u64,
}

/// The full lifecycle state of one request (spec §3 `Request`). Lives in
/// exactly one ring slot at a time; `id` is what distinguishes a live
/// occupant from a stale one left behind by an earlier request that used
/// to own this slot (I9).
#[derive(Debug, Clone)]
pub struct Request {
    pub id: U256,
    pub requester: Address,
    pub callback: CallbackTarget,
    pub subcommittee: Vec<Address>,
    pub responses: Vec<Response>,
    pub response_count: usize,
    pub failure_count: usize,
    pub threshold: usize,
    pub created_at: u64,
    pub status: Status,
    pub consensus_type: ConsensusType,
    pub agent_creator: Option<Address>,
    pub max_cost: U256,
    pub final_cost: U256,
}

impl Request {
    pub fn success_count(&self) -> usize {
        self.response_count - self.failure_count
    }

    pub fn remaining(&self) -> usize {
        self.subcommittee.len() - self.response_count
    }

    pub fn has_responded(&self, validator: Address) -> bool {
        self.responses.iter().any(|r| r.validator == validator)
    }
}
