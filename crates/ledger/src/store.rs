use oracle_types::U256;
use parking_lot::Mutex;

use crate::request::Request;

/// Storage abstraction for the ring (design note in spec.md §9: "abstract
/// the storage behind a `Store` trait ... the default in-memory store
/// suffices for tests"). A real deployment could back this with
/// persistent storage without touching `RequestLedger` or any crate above
/// it.
pub trait Store: Send + Sync {
    fn capacity(&self) -> usize;

    /// The id the *next* allocation will use.
    fn next_request_id(&self) -> U256;

    /// Atomically returns the next id and advances the counter.
    fn allocate_id(&self) -> U256;

    fn oldest_pending_id(&self) -> U256;

    fn set_oldest_pending_id(&self, id: U256);

    /// Exclusive access to one ring slot for the duration of `f`.
    fn with_slot<R>(&self, slot: usize, f: impl FnOnce(&mut Option<Request>) -> R) -> R;
}

struct Inner {
    ring: Vec<Option<Request>>,
    next_id: U256,
    oldest_pending: U256,
}

/// Plain in-memory ring, one mutex guarding the whole thing. Matches the
/// single-threaded-transaction semantics the rest of the on-chain layer
/// assumes (spec.md §5) — no operation here ever observes another one
/// partway through.
pub struct InMemoryStore {
    inner: Mutex<Inner>,
    capacity: usize,
}

impl InMemoryStore {
    pub fn new(capacity: usize) -> Self {
        assert!(capacity > 0, "ring capacity must be non-zero");
        InMemoryStore {
            capacity,
            inner: Mutex::new(Inner {
                ring: (0..capacity).map(|_| None).collect(),
                next_id: U256::ZERO,
                oldest_pending: U256::ZERO,
            }),
        }
    }
}

impl Store for InMemoryStore {
    fn capacity(&self) -> usize {
        self.capacity
    }

    fn next_request_id(&self) -> U256 {
        self.inner.lock().next_id
    }

    fn allocate_id(&self) -> U256 {
        let mut inner = self.inner.lock();
        let id = inner.next_id;
        inner.next_id += U256::ONE;
        id
    }

    fn oldest_pending_id(&self) -> U256 {
        self.inner.lock().oldest_pending
    }

    fn set_oldest_pending_id(&self, id: U256) {
        self.inner.lock().oldest_pending = id;
    }

    fn with_slot<R>(&self, slot: usize, f: impl FnOnce(&mut Option<Request>) -> R) -> R {
        let mut inner = self.inner.lock();
        f(&mut inner.ring[slot])
    }
}
