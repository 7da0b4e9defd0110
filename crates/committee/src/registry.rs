use std::collections::HashMap;

use oracle_types::{Address, Hash256, U256};
use parking_lot::Mutex;
use tracing::{debug, info};

use crate::election::elect_subcommittee;
use crate::error::CommitteeError;
use crate::validator::Validator;

/// Tuning knobs from spec §8 / §4.1.
#[derive(Debug, Clone, Copy)]
pub struct CommitteeConfig {
    pub heartbeat_interval_secs: u64,
    pub upkeep_interval_secs: u64,
}

impl Default for CommitteeConfig {
    fn default() -> Self {
        CommitteeConfig { heartbeat_interval_secs: 120, upkeep_interval_secs: 60 }
    }
}

/// What happened during an `upkeep()` call (spec §4.1, I10).
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum UpkeepOutcome {
    /// Ran, but the active set didn't change (or the rate limit skipped it).
    NoChange,
    /// The active set changed: epoch bumped, `NewEpoch` should be emitted.
    NewEpoch { epoch: u64, members: Vec<Address> },
}

struct State {
    validators: HashMap<Address, Validator>,
    active: HashMap<Address, bool>,
    epoch: u64,
    last_upkeep: Option<u64>,
    pending_balances: HashMap<Address, U256>,
}

/// The §4.1 Committee Registry: validator liveness, seeded subcommittee
/// election, and the pull-payment escrow (`PendingBalance`).
///
/// All mutable state lives behind one mutex, matching the single-threaded
/// serialized transaction model of spec §5 — no operation here ever
/// observes another one partway through.
pub struct CommitteeRegistry {
    config: CommitteeConfig,
    state: Mutex<State>,
}

impl CommitteeRegistry {
    pub fn new(config: CommitteeConfig) -> Self {
        CommitteeRegistry {
            config,
            state: Mutex::new(State {
                validators: HashMap::new(),
                active: HashMap::new(),
                epoch: 0,
                last_upkeep: None,
                pending_balances: HashMap::new(),
            }),
        }
    }

    /// Declares the caller live. No-op-safe for already-active callers;
    /// also the mechanism for rejoining after a purge.
    pub fn heartbeat(&self, who: Address, now: u64) {
        let mut state = self.state.lock();
        state
            .validators
            .entry(who)
            .and_modify(|v| v.last_heartbeat = now)
            .or_insert_with(|| Validator::new(now));
        debug!(validator = %who, "heartbeat accepted");
    }

    /// Idempotent, rate-limited maintenance sweep (spec §4.1).
    pub fn upkeep(&self, now: u64) -> UpkeepOutcome {
        let mut state = self.state.lock();
        if let Some(last) = state.last_upkeep {
            if now < last.saturating_add(self.config.upkeep_interval_secs) {
                return UpkeepOutcome::NoChange;
            }
        }
        state.last_upkeep = Some(now);

        let heartbeat_interval = self.config.heartbeat_interval_secs;
        let mut changed = false;
        let mut purged = Vec::new();
        for (addr, v) in state.validators.iter() {
            let now_active = v.is_active(now, heartbeat_interval);
            let was_active = state.active.get(addr).copied().unwrap_or(false);
            if now_active != was_active {
                changed = true;
            }
            if !now_active {
                purged.push(*addr);
            }
        }
        for addr in &purged {
            state.validators.remove(addr);
            state.active.remove(addr);
        }
        if changed {
            state.active = state
                .validators
                .iter()
                .map(|(addr, v)| (*addr, v.is_active(now, heartbeat_interval)))
                .collect();
            state.epoch += 1;
            let epoch = state.epoch;
            let members: Vec<Address> =
                state.active.iter().filter(|(_, a)| **a).map(|(addr, _)| *addr).collect();
            info!(epoch, members = members.len(), "committee epoch advanced");
            return UpkeepOutcome::NewEpoch { epoch, members };
        }
        UpkeepOutcome::NoChange
    }

    pub fn get_active_members(&self, now: u64) -> Vec<Address> {
        let state = self.state.lock();
        let interval = self.config.heartbeat_interval_secs;
        state
            .validators
            .iter()
            .filter(|(_, v)| v.is_active(now, interval))
            .map(|(addr, _)| *addr)
            .collect()
    }

    pub fn is_active(&self, who: Address, now: u64) -> bool {
        let state = self.state.lock();
        state
            .validators
            .get(&who)
            .map(|v| v.is_active(now, self.config.heartbeat_interval_secs))
            .unwrap_or(false)
    }

    pub fn current_epoch(&self) -> u64 {
        self.state.lock().epoch
    }

    /// Seeded sampling without replacement over the *current* active set
    /// (spec §4.1). The order handed to `elect_subcommittee` is a stable
    /// sort of the active set so repeated calls within one epoch, with
    /// the same membership, agree.
    pub fn elect_subcommittee(
        &self,
        n: usize,
        seed: Hash256,
        now: u64,
    ) -> Result<Vec<Address>, CommitteeError> {
        let mut active = self.get_active_members(now);
        active.sort();
        elect_subcommittee(&active, n, seed)
    }

    /// Credits each recipient's pending balance. `value` is the amount
    /// actually transferred in; the sum of `amounts` must match it.
    pub fn deposit(
        &self,
        recipients: &[Address],
        amounts: &[U256],
        value: U256,
    ) -> Result<(), CommitteeError> {
        let sum = amounts.iter().fold(U256::ZERO, |acc, a| acc + *a);
        if sum != value {
            return Err(CommitteeError::AmountMismatch {
                sum: sum.to_string(),
                value: value.to_string(),
            });
        }
        let mut state = self.state.lock();
        for (addr, amount) in recipients.iter().zip(amounts.iter()) {
            if *amount == U256::ZERO {
                continue;
            }
            *state.pending_balances.entry(*addr).or_insert(U256::ZERO) += *amount;
        }
        Ok(())
    }

    /// Withdraws and zeroes the caller's pending balance.
    pub fn claim(&self, who: Address) -> Result<U256, CommitteeError> {
        let mut state = self.state.lock();
        match state.pending_balances.remove(&who) {
            Some(balance) if balance != U256::ZERO => Ok(balance),
            _ => Err(CommitteeError::NoBalance),
        }
    }

    pub fn pending_balance(&self, who: Address) -> U256 {
        self.state.lock().pending_balances.get(&who).copied().unwrap_or(U256::ZERO)
    }
}
