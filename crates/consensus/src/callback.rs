use oracle_types::{Status, U256};
use tracing::warn;

/// §4.5 callback contract, modeled as a trait rather than an ABI call —
/// this workspace has no EVM to dispatch `callback(requestId, results[],
/// status, finalCost)` into. Implementations must not assume they run on
/// every request: `oracle-ledger::CallbackTarget::address == None` means
/// no call is made at all.
///
/// Delivery is always best-effort: a panic here is caught by the caller
/// and logged, never propagated, matching "revert is silently absorbed."
pub trait FinalizationCallback: Send + Sync {
    fn handle_response(&self, request_id: U256, results: &[Vec<u8>], status: Status, final_cost: U256);
}

/// Used when a request carries no callback target; kept so callers don't
/// need an `Option<Arc<dyn FinalizationCallback>>` at every call site.
pub struct NullCallback;

impl FinalizationCallback for NullCallback {
    fn handle_response(&self, _request_id: U256, _results: &[Vec<u8>], _status: Status, _final_cost: U256) {}
}

/// Reference implementation: logs the delivery instead of calling into
/// anything. Useful for the `oracle-node` binary's development mode and
/// for tests that only care the call happened with the right payload.
pub struct LoggingCallback;

impl FinalizationCallback for LoggingCallback {
    fn handle_response(&self, request_id: U256, results: &[Vec<u8>], status: Status, final_cost: U256) {
        warn!(
            %request_id,
            result_count = results.len(),
            ?status,
            %final_cost,
            "callback delivered (logging stand-in, no real call made)"
        );
    }
}
