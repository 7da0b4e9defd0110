use std::panic::{catch_unwind, AssertUnwindSafe};
use std::sync::Arc;

use oracle_committee::CommitteeRegistry;
use oracle_ledger::{Request, RequestLedger, Response, Store};
use oracle_types::{Address, ConsensusType, Hash256, Status, U256};
use tracing::{info, warn};

use crate::config::ConsensusConfig;
use crate::error::ConsensusError;
use crate::FinalizationCallback;

/// What happened to a `submitResponse` call (spec §4.3). Distinguishes a
/// genuine write from the silent "already finalized" race-loser no-op so
/// callers can tell the two apart without mistaking the no-op for failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SubmitOutcome {
    /// Recorded; `finalized` is the new status if this call finalized it.
    Recorded { finalized: Option<Status> },
    /// `status` was already non-Pending when this call arrived.
    Ignored,
}

enum SweepAction {
    Advance,
    Finalized,
    Stop,
}

/// §4.3/§4.4/§4.5 Consensus Engine: response intake, finalization
/// decision, median-cost settlement, payout split, rebate, callback
/// delivery. Layered directly on top of `oracle-ledger`'s ring and
/// `oracle-committee`'s escrow — this crate owns no storage of its own.
pub struct ConsensusEngine<S: Store> {
    ledger: Arc<RequestLedger<S>>,
    committee: Arc<CommitteeRegistry>,
    callback: Arc<dyn FinalizationCallback>,
    config: ConsensusConfig,
}

impl<S: Store> ConsensusEngine<S> {
    pub fn new(
        ledger: Arc<RequestLedger<S>>,
        committee: Arc<CommitteeRegistry>,
        callback: Arc<dyn FinalizationCallback>,
        config: ConsensusConfig,
    ) -> Self {
        ConsensusEngine { ledger, committee, callback, config }
    }

    /// §4.3 `submitResponse`. Runs an opportunistic `upkeepRequests` first,
    /// then validates and records atomically under the ledger's slot lock
    /// so this call never interleaves with another mutation of the same
    /// request.
    pub fn submit_response(
        &self,
        request_id: U256,
        validator: Address,
        result: Vec<u8>,
        receipt: Hash256,
        cost: U256,
        success: bool,
        now: u64,
    ) -> Result<SubmitOutcome, ConsensusError> {
        self.upkeep_requests(now);

        let outcome = self.ledger.try_mutate(request_id, |req| -> Result<SubmitOutcome, ConsensusError> {
            if !req.subcommittee.contains(&validator) {
                return Err(ConsensusError::NotSubcommitteeMember);
            }
            if now > req.created_at + self.config.request_timeout_secs {
                return Err(ConsensusError::RequestTimedOut);
            }
            if req.has_responded(validator) {
                return Err(ConsensusError::AlreadyResponded);
            }
            if req.status != Status::Pending {
                return Ok(SubmitOutcome::Ignored);
            }

            req.responses.push(Response { validator, result, success, receipt, cost, timestamp: now });
            req.response_count += 1;
            if !success {
                req.failure_count += 1;
            }

            match self.decide_finalization(req) {
                Some(status) => {
                    self.finalize_locked(req, status, now);
                    Ok(SubmitOutcome::Recorded { finalized: Some(status) })
                }
                None => Ok(SubmitOutcome::Recorded { finalized: None }),
            }
        })??;

        Ok(outcome)
    }

    /// §4.3 `timeoutRequest`. Callable by anyone once a request outlives
    /// its deadline while still `Pending`.
    pub fn timeout_request(&self, request_id: U256, now: u64) -> Result<(), ConsensusError> {
        self.ledger.try_mutate(request_id, |req| -> Result<(), ConsensusError> {
            if req.status != Status::Pending {
                return Err(ConsensusError::AlreadyFinalized);
            }
            if now <= req.created_at + self.config.request_timeout_secs {
                return Err(ConsensusError::NotYetTimedOut);
            }
            self.finalize_locked(req, Status::TimedOut, now);
            Ok(())
        })??;
        Ok(())
    }

    /// §4.3 `upkeepRequests`. Walks ids from `oldestPendingId` forward,
    /// timing out anything stale, and stops at the first id that is
    /// either still within its deadline or not yet allocated — later ids
    /// are strictly newer and cannot be stale either. Returns the ids
    /// this call actually timed out, in sweep order, so callers can emit
    /// `RequestFinalized` for each.
    pub fn upkeep_requests(&self, now: u64) -> Vec<U256> {
        let next_id = self.ledger.next_request_id();
        let mut id = self.ledger.oldest_pending_id();
        let mut timed_out = Vec::new();

        while id < next_id {
            let action = match self.ledger.try_mutate(id, |req| {
                if req.status != Status::Pending {
                    return SweepAction::Advance;
                }
                if now <= req.created_at + self.config.request_timeout_secs {
                    return SweepAction::Stop;
                }
                self.finalize_locked(req, Status::TimedOut, now);
                SweepAction::Finalized
            }) {
                Ok(action) => action,
                // Slot was overwritten by a newer request; nothing to do here.
                Err(_) => SweepAction::Advance,
            };

            match action {
                SweepAction::Advance => id += U256::ONE,
                SweepAction::Finalized => {
                    timed_out.push(id);
                    id += U256::ONE;
                }
                SweepAction::Stop => break,
            }
        }

        self.ledger.set_oldest_pending_id(id);
        timed_out
    }

    /// The finalization decision, run after every recorded response
    /// (spec §4.3, in order): success-impossible guard first, then the
    /// mode-specific success check. `None` means the request stays
    /// `Pending`.
    fn decide_finalization(&self, req: &Request) -> Option<Status> {
        let success_count = req.success_count();
        let remaining = req.remaining();
        if success_count + remaining < req.threshold {
            return Some(Status::Failed);
        }

        match req.consensus_type {
            ConsensusType::Majority => {
                majority_winner(&req.responses, req.threshold).map(|_| Status::Success)
            }
            ConsensusType::Threshold => {
                if success_count >= req.threshold {
                    Some(Status::Success)
                } else {
                    None
                }
            }
        }
    }

    /// §4.3 `_finalizeWithStatus`. Computes median cost, invokes the
    /// callback, splits and deposits payouts, and rebates the unused
    /// deposit. Must be called with the request's slot already locked.
    fn finalize_locked(&self, req: &mut Request, status: Status, now: u64) {
        let median_cost = median(&req.responses);
        let subcommittee_len = U256::from(req.subcommittee.len() as u64);
        let validator_costs = median_cost * subcommittee_len;

        // The gas cost charged is always the ceiling (callbackGasLimit x
        // gasPrice), never the callback's actual execution cost, so it — and
        // therefore finalCost — is known before the call is made (§9 open
        // question on callback gas accounting).
        let callback_gas_cost = if req.callback.address.is_some() {
            U256::from(self.config.callback_gas_limit) * self.config.gas_price
        } else {
            U256::ZERO
        };
        let final_cost = validator_costs + callback_gas_cost;

        let results = aggregate_results(req, status);
        if req.callback.address.is_some() {
            let callback = Arc::clone(&self.callback);
            let outcome = catch_unwind(AssertUnwindSafe(|| {
                callback.handle_response(req.id, &results, status, final_cost)
            }));
            if outcome.is_err() {
                warn!(request_id = %req.id, "finalization callback panicked, swallowing");
            }
        }

        self.settle_payouts(req, validator_costs);

        if final_cost < req.max_cost {
            let rebate = req.max_cost - final_cost;
            if rebate != U256::ZERO {
                if let Err(err) = self.committee.deposit(&[req.requester], &[rebate], rebate) {
                    warn!(request_id = %req.id, %err, "rebate credit failed, swallowing (best-effort send)");
                }
            }
        }

        req.status = status;
        req.final_cost = final_cost;
        info!(request_id = %req.id, ?status, %final_cost, "request finalized");
    }

    /// §4.3.e payout split: runner/creator/protocol shares of
    /// `validatorCosts`, with remainders and an absent creator folding
    /// into the protocol share.
    fn settle_payouts(&self, req: &Request, validator_costs: U256) {
        let shares = split_validator_costs(
            validator_costs,
            req.subcommittee.len(),
            self.config.runner_bps,
            self.config.creator_bps,
            req.agent_creator.is_some(),
        );
        let per_runner = shares.per_runner;

        let mut recipients: Vec<Address> = req.subcommittee.clone();
        let mut amounts: Vec<U256> = vec![per_runner; req.subcommittee.len()];

        if let Some(creator) = req.agent_creator {
            recipients.push(creator);
            amounts.push(shares.creator_credit);
        }

        recipients.push(self.config.treasury_or_zero());
        amounts.push(shares.protocol_total);

        if let Err(err) = self.committee.deposit(&recipients, &amounts, validator_costs) {
            warn!(request_id = %req.id, %err, "payout deposit failed, swallowing");
        }
    }
}

/// Output of `split_validator_costs`; always sums back to the
/// `validatorCosts` it was given (I8).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
struct PayoutShares {
    per_runner: U256,
    creator_credit: U256,
    protocol_total: U256,
}

/// Pure §4.3.e split. Kept free of `Request`/`ConsensusEngine` so the
/// sum-equals-`validatorCosts` invariant can be property-tested directly
/// over arbitrary bps/subcommittee-size/creator-presence combinations.
fn split_validator_costs(
    validator_costs: U256,
    subcommittee_len: usize,
    runner_bps: u64,
    creator_bps: u64,
    has_creator: bool,
) -> PayoutShares {
    let bps = U256::from(oracle_types::BPS_DENOMINATOR);
    let len = U256::from(subcommittee_len as u64);

    let runner_total = validator_costs * U256::from(runner_bps) / bps;
    let per_runner = runner_total / len;

    let creator_total = validator_costs * U256::from(creator_bps) / bps;
    let creator_credit = if has_creator { creator_total } else { U256::ZERO };

    let protocol_total = validator_costs - per_runner * len - creator_credit;

    PayoutShares { per_runner, creator_credit, protocol_total }
}

/// §4.3.a: median of all response costs, even counts averaged with
/// integer division, zero responses defined as a median of zero.
fn median(responses: &[Response]) -> U256 {
    if responses.is_empty() {
        return U256::ZERO;
    }
    let mut costs: Vec<U256> = responses.iter().map(|r| r.cost).collect();
    costs.sort();
    let n = costs.len();
    if n % 2 == 1 {
        costs[n / 2]
    } else {
        (costs[n / 2 - 1] + costs[n / 2]) / U256::from(2u64)
    }
}

/// §4.3.2 Majority check / §9 tie-break open question: the first response
/// (in submission order) whose result value is shared by at least
/// `threshold` successful responses. Shared with `aggregate_results` so
/// the finalization check and the callback payload always agree.
fn majority_winner(responses: &[Response], threshold: usize) -> Option<Vec<u8>> {
    responses.iter().filter(|r| r.success).find_map(|candidate| {
        let count = responses
            .iter()
            .filter(|r| r.success && r.result == candidate.result)
            .count();
        (count >= threshold).then(|| candidate.result.clone())
    })
}

/// §4.4: what the callback is told happened.
fn aggregate_results(req: &Request, status: Status) -> Vec<Vec<u8>> {
    match (status, req.consensus_type) {
        (Status::Success, ConsensusType::Majority) => {
            majority_winner(&req.responses, req.threshold).into_iter().collect()
        }
        (Status::Success, ConsensusType::Threshold) => {
            req.responses.iter().filter(|r| r.success).map(|r| r.result.clone()).collect()
        }
        _ => req.responses.iter().filter(|r| r.success).map(|r| r.result.clone()).collect(),
    }
}

#[cfg(test)]
mod payout_tests {
    use super::*;

    proptest::proptest! {
        #[test]
        fn payout_shares_always_sum_to_validator_costs(
            validator_costs in 0u64..1_000_000,
            subcommittee_len in 1usize..50,
            runner_bps in 0u64..=10_000,
            creator_bps_raw in 0u64..=10_000,
            has_creator: bool,
        ) {
            // runnerBps + creatorBps + protocolBps = 10_000 is a config-time
            // invariant (§6); clamp so the property reflects only valid configs.
            let creator_bps = creator_bps_raw.min(10_000 - runner_bps);
            let shares = split_validator_costs(
                U256::from(validator_costs),
                subcommittee_len,
                runner_bps,
                creator_bps,
                has_creator,
            );
            let total = shares.per_runner * U256::from(subcommittee_len as u64)
                + shares.creator_credit
                + shares.protocol_total;
            proptest::prop_assert_eq!(total, U256::from(validator_costs));
        }
    }
}
