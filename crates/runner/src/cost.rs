use oracle_types::U256;

/// How a runner derives the `cost` it submits is intentionally
/// unspecified (spec.md §9 open question) — the ledger's median
/// mechanism dampens bad actors but does not prevent collusion. Kept
/// pluggable so a deployment can swap in its own pricing model.
pub trait CostQuoter: Send + Sync {
    fn quote(&self, agent_id: u64, payload_len: usize, host_reported_cost: U256) -> U256;
}

/// Reference quoter: pass the Host API's own reported cost straight
/// through, plus a small fixed per-invocation markup for the runner's
/// overhead (RPC submission, probing).
pub struct PassthroughQuoter {
    pub markup: U256,
}

impl Default for PassthroughQuoter {
    fn default() -> Self {
        PassthroughQuoter { markup: U256::from(1u64) }
    }
}

impl CostQuoter for PassthroughQuoter {
    fn quote(&self, _agent_id: u64, _payload_len: usize, host_reported_cost: U256) -> U256 {
        host_reported_cost + self.markup
    }
}
