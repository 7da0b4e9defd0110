use oracle_types::{Address, Status, U256};

/// The three on-chain events of spec.md §6, carried over a broadcast
/// channel instead of a log topic — `oracle-node`'s HTTP layer and
/// `oracle-runner`'s event subscription both read from this.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum EngineEvent {
    RequestCreated {
        request_id: U256,
        agent_id: u64,
        max_cost_per_agent: U256,
        payload: Vec<u8>,
        subcommittee: Vec<Address>,
        threshold: usize,
    },
    RequestFinalized {
        request_id: U256,
        status: Status,
    },
    NewEpoch {
        epoch: u64,
        members: Vec<Address>,
    },
}

/// Default capacity for the broadcast channel backing `Engine::events()`.
/// A slow subscriber that falls this far behind starts missing events —
/// acceptable for the event bus (peers also have getRequest as a source
/// of truth), matching the "probes are stateless hints" design note.
pub const EVENT_CHANNEL_CAPACITY: usize = 1024;
