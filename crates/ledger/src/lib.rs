//! §3/§4.2 Request Ledger: the fixed-capacity ring of request slots.
//!
//! This crate only knows how to allocate a slot, look one up by id, and
//! hand out mutable access to a live one. It has no opinion on who may
//! submit a response or when a request should finalize — that is
//! `oracle-consensus`'s job, layered on top.

mod error;
mod request;
mod store;

pub use error::LedgerError;
pub use request::{CallbackTarget, Request, Response};
pub use store::{InMemoryStore, Store};

use oracle_types::{Address, ConsensusType, Status, U256};
use tracing::debug;

/// Everything the caller of `createRequest`/`createAdvancedRequest` has
/// already resolved (threshold validated, deposit collected, agent
/// looked up, subcommittee elected) by the time the ledger is asked to
/// allocate a slot (spec.md §4.2 step 5).
pub struct AllocateParams {
    pub requester: Address,
    pub callback: CallbackTarget,
    pub subcommittee: Vec<Address>,
    pub threshold: usize,
    pub consensus_type: ConsensusType,
    pub agent_creator: Option<Address>,
    pub max_cost: U256,
    pub created_at: u64,
}

/// The ring itself: `capacity` slots, `requestId mod capacity` addressing,
/// overwrite-in-place reuse (spec.md §9 "arena+index" design note).
pub struct RequestLedger<S: Store = InMemoryStore> {
    store: S,
}

impl<S: Store> RequestLedger<S> {
    pub fn new(store: S) -> Self {
        RequestLedger { store }
    }

    pub fn capacity(&self) -> usize {
        self.store.capacity()
    }

    pub fn next_request_id(&self) -> U256 {
        self.store.next_request_id()
    }

    pub fn oldest_pending_id(&self) -> U256 {
        self.store.oldest_pending_id()
    }

    pub fn set_oldest_pending_id(&self, id: U256) {
        self.store.set_oldest_pending_id(id);
    }

    /// Allocates `requestId = nextRequestId++`, overwrites
    /// `ring[requestId mod capacity]` and returns the new id.
    pub fn allocate(&self, params: AllocateParams) -> U256 {
        let id = self.store.allocate_id();
        let slot = self.slot_index(id);
        let subcommittee_len = params.subcommittee.len();
        let request = Request {
            id,
            requester: params.requester,
            callback: params.callback,
            subcommittee: params.subcommittee,
            responses: Vec::with_capacity(subcommittee_len),
            response_count: 0,
            failure_count: 0,
            threshold: params.threshold,
            created_at: params.created_at,
            status: Status::Pending,
            consensus_type: params.consensus_type,
            agent_creator: params.agent_creator,
            max_cost: params.max_cost,
            final_cost: U256::ZERO,
        };
        self.store.with_slot(slot, |occupant| *occupant = Some(request));
        debug!(request_id = %id, slot, subcommittee_len, "request allocated");
        id
    }

    /// A full snapshot of a live request (spec.md §6 `getRequest`).
    /// Rejects with `RequestNotFound` unless `ring[id mod C].id == id`
    /// (I9) — the lookup contract every other read/mutate API shares.
    pub fn get(&self, id: U256) -> Result<Request, LedgerError> {
        let slot = self.slot_index(id);
        self.store.with_slot(slot, |occupant| match occupant {
            Some(request) if request.id == id => Ok(request.clone()),
            _ => Err(LedgerError::RequestNotFound(id)),
        })
    }

    /// Exclusive, in-place access to a live request, for callers (the
    /// Consensus Engine) that need to record a response or finalize.
    pub fn try_mutate<R>(
        &self,
        id: U256,
        f: impl FnOnce(&mut Request) -> R,
    ) -> Result<R, LedgerError> {
        let slot = self.slot_index(id);
        self.store.with_slot(slot, |occupant| match occupant {
            Some(request) if request.id == id => Ok(f(request)),
            _ => Err(LedgerError::RequestNotFound(id)),
        })
    }

    fn slot_index(&self, id: U256) -> usize {
        let capacity = U256::from(self.capacity() as u64);
        (id % capacity).as_u64() as usize
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use oracle_types::ConsensusType;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    fn params(sub: Vec<Address>) -> AllocateParams {
        AllocateParams {
            requester: addr(99),
            callback: CallbackTarget::NONE,
            subcommittee: sub,
            threshold: 2,
            consensus_type: ConsensusType::Majority,
            agent_creator: None,
            max_cost: U256::from(3000u64),
            created_at: 0,
        }
    }

    #[test]
    fn allocate_then_get_round_trips() {
        let ledger = RequestLedger::new(InMemoryStore::new(4));
        let id = ledger.allocate(params(vec![addr(1), addr(2), addr(3)]));
        assert_eq!(id, U256::ZERO);
        let request = ledger.get(id).unwrap();
        assert_eq!(request.subcommittee.len(), 3);
        assert_eq!(request.status, Status::Pending);
    }

    #[test]
    fn ring_wraparound_invalidates_overwritten_slot() {
        // S5: capacity 2, create ids 0, 1, 2 -> lookup of 0 fails.
        let ledger = RequestLedger::new(InMemoryStore::new(2));
        let a = ledger.allocate(params(vec![addr(1)]));
        let _b = ledger.allocate(params(vec![addr(1)]));
        let c = ledger.allocate(params(vec![addr(1)]));
        assert_eq!(a, U256::ZERO);
        assert_eq!(c, U256::from(2u64));
        assert_eq!(ledger.get(a).unwrap_err(), LedgerError::RequestNotFound(a));
        assert!(ledger.get(c).is_ok());
    }

    #[test]
    fn try_mutate_rejects_unknown_id() {
        let ledger = RequestLedger::new(InMemoryStore::new(4));
        let err = ledger.try_mutate(U256::from(7u64), |_| ()).unwrap_err();
        assert_eq!(err, LedgerError::RequestNotFound(U256::from(7u64)));
    }
}
