use std::sync::Arc;
use std::time::Duration;

use oracle_types::{Address, Hash256, Status, U256};
use tokio_util::sync::CancellationToken;
use tracing::{debug, info, warn};

use crate::chain_client::ChainClient;
use crate::cost::CostQuoter;
use crate::host_api::{HostApi, InvokeOutcome};
use crate::quorum::{probe_quorum, PeerProbe, QuorumRequest, QuorumState};
use crate::RunnerConfig;

/// Per-in-flight-request state machine (spec.md §4.6). Tasks never share
/// mutable state with each other beyond the `QuorumState` capacity gate
/// and the Host API client, both already internally synchronized.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DropReason {
    NotInSubcommittee,
    QuorumNotReached,
    ExecutionFailed,
    FinalizedByPeers,
    /// Cooperative cancellation fired, or the per-request time budget
    /// (strictly shorter than `requestTimeout`) ran out first.
    Cancelled,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerOutcome {
    Responded,
    Dropped(DropReason),
}

/// The collaborators one runner task needs, bundled so the state-machine
/// function doesn't take five separate generic parameters at every call
/// site.
pub struct RunnerContext<C, H, P, Q> {
    pub chain: Arc<C>,
    pub host: Arc<H>,
    pub prober: Arc<P>,
    pub quoter: Arc<Q>,
    pub quorum: Arc<QuorumState>,
    pub config: RunnerConfig,
}

/// Drives one request through NEW -> QUALIFIED -> QUORUM_PROBED ->
/// EXECUTING -> RESPONDED, or a DROPPED branch at any stage (spec.md
/// §4.6 state diagram). `budget` bounds the whole sequence; it must be
/// strictly less than the chain's `requestTimeout` so a submission
/// attempt still fits inside the deadline.
pub async fn run_request<C, H, P, Q>(
    ctx: &RunnerContext<C, H, P, Q>,
    request_id: U256,
    agent_id: u64,
    image_uri: &str,
    payload: Vec<u8>,
    threshold: usize,
    self_addr: Address,
    cancel: CancellationToken,
    budget: Duration,
) -> RunnerOutcome
where
    C: ChainClient,
    H: HostApi,
    P: PeerProbe,
    Q: CostQuoter,
{
    match tokio::time::timeout(budget, drive(ctx, request_id, agent_id, image_uri, payload, threshold, self_addr, cancel.clone())).await {
        Ok(outcome) => outcome,
        Err(_) => {
            debug!(%request_id, "runner task exceeded its time budget");
            RunnerOutcome::Dropped(DropReason::Cancelled)
        }
    }
}

async fn drive<C, H, P, Q>(
    ctx: &RunnerContext<C, H, P, Q>,
    request_id: U256,
    agent_id: u64,
    image_uri: &str,
    payload: Vec<u8>,
    threshold: usize,
    self_addr: Address,
    cancel: CancellationToken,
) -> RunnerOutcome
where
    C: ChainClient,
    H: HostApi,
    P: PeerProbe,
    Q: CostQuoter,
{
    // NEW -> QUALIFIED
    let subcommittee = match ctx.chain.get_subcommittee(request_id).await {
        Ok(s) => s,
        Err(err) => {
            warn!(%request_id, %err, "could not read subcommittee, dropping");
            return RunnerOutcome::Dropped(DropReason::ExecutionFailed);
        }
    };
    if !subcommittee.contains(&self_addr) {
        return RunnerOutcome::Dropped(DropReason::NotInSubcommittee);
    }

    // QUALIFIED -> QUORUM_PROBED, exponential backoff capped by `cancel`
    // (the caller ties `cancel` to the same time budget / finalization
    // watch, so this loop always terminates).
    let quorum_req = QuorumRequest { request_id, agent_id, from: self_addr, payload: payload.clone() };
    let mut attempt = 0u32;
    loop {
        if cancel.is_cancelled() {
            return RunnerOutcome::Dropped(DropReason::Cancelled);
        }
        if probe_quorum(ctx.prober.as_ref(), &subcommittee, &quorum_req, threshold).await {
            break;
        }
        attempt += 1;
        if attempt >= ctx.config.probe_max_attempts {
            return RunnerOutcome::Dropped(DropReason::QuorumNotReached);
        }
        let backoff = ctx.config.probe_backoff_base_ms.saturating_mul(1u64 << attempt.min(10));
        let jitter = rand::random::<u64>() % (ctx.config.probe_backoff_base_ms.max(1));
        let backoff = backoff.saturating_add(jitter);
        tokio::select! {
            _ = tokio::time::sleep(Duration::from_millis(backoff)) => {}
            _ = cancel.cancelled() => return RunnerOutcome::Dropped(DropReason::Cancelled),
        }
    }

    // A peer may have already driven this request to finalization while
    // we were probing; check before paying the container-pull cost.
    match ctx.chain.get_status(request_id).await {
        Ok(Status::Pending) => {}
        Ok(_) => return RunnerOutcome::Dropped(DropReason::FinalizedByPeers),
        Err(err) => warn!(%request_id, %err, "status check failed, proceeding optimistically"),
    }

    ctx.quorum.mark_started();
    let outcome = execute(ctx, agent_id, image_uri, &payload, cancel.clone()).await;
    ctx.quorum.mark_finished(request_id);

    if cancel.is_cancelled() {
        return RunnerOutcome::Dropped(DropReason::Cancelled);
    }

    let cost = ctx.quoter.quote(agent_id, payload.len(), outcome.cost);
    let final_outcome = InvokeOutcome { cost, ..outcome };

    // EXECUTING -> RESPONDED. A revert because the request already
    // finalized or this validator already responded is treated as
    // success by the `ChainClient` implementation (spec.md §4.6).
    match ctx
        .chain
        .submit_response(
            request_id,
            self_addr,
            final_outcome.result,
            final_outcome.receipt,
            final_outcome.cost,
            final_outcome.success,
        )
        .await
    {
        Ok(()) => {
            info!(%request_id, success = final_outcome.success, "response submitted");
            RunnerOutcome::Responded
        }
        Err(err) => {
            warn!(%request_id, %err, "submission failed");
            RunnerOutcome::Dropped(DropReason::ExecutionFailed)
        }
    }
}

/// QUORUM_PROBED -> EXECUTING: fetch and start the container, invoke it,
/// retrying container-side failures a bounded number of times on the
/// same image. Repeated failure yields `success = false, result = []`
/// rather than propagating an error, so the caller always has a response
/// to submit.
async fn execute<C, H, P, Q>(
    ctx: &RunnerContext<C, H, P, Q>,
    agent_id: u64,
    image_uri: &str,
    payload: &[u8],
    cancel: CancellationToken,
) -> InvokeOutcome
where
    H: HostApi,
{
    let handle = match ctx.host.start_container(agent_id, image_uri).await {
        Ok(h) => h,
        Err(err) => {
            warn!(agent_id, %err, "container start failed");
            return InvokeOutcome { result: vec![], receipt: Hash256::ZERO, cost: U256::ZERO, success: false };
        }
    };

    let mut last_err = None;
    for attempt in 0..ctx.config.invoke_retry_count.max(1) {
        if cancel.is_cancelled() {
            break;
        }
        match ctx.host.invoke(&handle, payload).await {
            Ok(outcome) => {
                let _ = ctx.host.stop_container(&handle).await;
                return outcome;
            }
            Err(err) => {
                debug!(agent_id, attempt, %err, "invoke attempt failed, retrying");
                last_err = Some(err);
            }
        }
    }

    let _ = ctx.host.stop_container(&handle).await;
    warn!(agent_id, ?last_err, "agent invocation failed after retries");
    InvokeOutcome { result: vec![], receipt: Hash256::ZERO, cost: U256::ZERO, success: false }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cost::PassthroughQuoter;
    use crate::host_api::ContainerHandle;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicU32, Ordering};
    use tokio::sync::Mutex as AsyncMutex;

    fn addr(n: u8) -> Address {
        let mut bytes = [0u8; 20];
        bytes[19] = n;
        Address::from(bytes)
    }

    struct FakeChain {
        subcommittee: Vec<Address>,
        status: Status,
        submitted: AsyncMutex<Vec<(U256, Address, bool)>>,
    }

    #[async_trait]
    impl ChainClient for FakeChain {
        async fn get_subcommittee(&self, _request_id: U256) -> Result<Vec<Address>, crate::RunnerError> {
            Ok(self.subcommittee.clone())
        }
        async fn get_status(&self, _request_id: U256) -> Result<Status, crate::RunnerError> {
            Ok(self.status)
        }
        async fn submit_response(
            &self,
            request_id: U256,
            validator: Address,
            _result: Vec<u8>,
            _receipt: Hash256,
            _cost: U256,
            success: bool,
        ) -> Result<(), crate::RunnerError> {
            self.submitted.lock().await.push((request_id, validator, success));
            Ok(())
        }
        async fn heartbeat(&self, _validator: Address) -> Result<(), crate::RunnerError> {
            Ok(())
        }
    }

    struct AlwaysWillingProber;
    #[async_trait]
    impl PeerProbe for AlwaysWillingProber {
        async fn probe(&self, _peer: Address, _req: &QuorumRequest) -> bool {
            true
        }
    }

    struct NeverWillingProber;
    #[async_trait]
    impl PeerProbe for NeverWillingProber {
        async fn probe(&self, _peer: Address, _req: &QuorumRequest) -> bool {
            false
        }
    }

    struct FlakyHost {
        failures_before_success: AtomicU32,
    }
    #[async_trait]
    impl HostApi for FlakyHost {
        async fn start_container(&self, _agent_id: u64, _image_uri: &str) -> Result<ContainerHandle, crate::RunnerError> {
            Ok(ContainerHandle("h1".into()))
        }
        async fn invoke(&self, _handle: &ContainerHandle, _payload: &[u8]) -> Result<InvokeOutcome, crate::RunnerError> {
            if self.failures_before_success.fetch_sub(1, Ordering::Relaxed) > 0 {
                return Err(crate::RunnerError::ContainerError("transient".into()));
            }
            Ok(InvokeOutcome { result: b"ok".to_vec(), receipt: Hash256::ZERO, cost: U256::from(5u64), success: true })
        }
        async fn stop_container(&self, _handle: &ContainerHandle) -> Result<(), crate::RunnerError> {
            Ok(())
        }
    }

    fn config() -> RunnerConfig {
        RunnerConfig {
            heartbeat_interval_secs: 60,
            max_concurrent_requests: 4,
            probe_backoff_base_ms: 1,
            probe_max_attempts: 3,
            invoke_retry_count: 3,
        }
    }

    #[tokio::test]
    async fn non_member_is_dropped_immediately() {
        let ctx = RunnerContext {
            chain: Arc::new(FakeChain { subcommittee: vec![addr(2)], status: Status::Pending, submitted: AsyncMutex::new(vec![]) }),
            host: Arc::new(FlakyHost { failures_before_success: AtomicU32::new(0) }),
            prober: Arc::new(AlwaysWillingProber),
            quoter: Arc::new(PassthroughQuoter::default()),
            quorum: Arc::new(QuorumState::new(4)),
            config: config(),
        };
        let outcome = run_request(
            &ctx,
            U256::ZERO,
            1,
            "oci://agent",
            vec![],
            1,
            addr(1),
            CancellationToken::new(),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome, RunnerOutcome::Dropped(DropReason::NotInSubcommittee));
    }

    #[tokio::test]
    async fn quorum_not_reached_drops() {
        let ctx = RunnerContext {
            chain: Arc::new(FakeChain {
                subcommittee: vec![addr(1), addr(2), addr(3)],
                status: Status::Pending,
                submitted: AsyncMutex::new(vec![]),
            }),
            host: Arc::new(FlakyHost { failures_before_success: AtomicU32::new(0) }),
            prober: Arc::new(NeverWillingProber),
            quoter: Arc::new(PassthroughQuoter::default()),
            quorum: Arc::new(QuorumState::new(4)),
            config: config(),
        };
        let outcome = run_request(
            &ctx,
            U256::ZERO,
            1,
            "oci://agent",
            vec![],
            2,
            addr(1),
            CancellationToken::new(),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome, RunnerOutcome::Dropped(DropReason::QuorumNotReached));
    }

    #[tokio::test]
    async fn happy_path_submits_response_after_transient_failures() {
        let ctx = RunnerContext {
            chain: Arc::new(FakeChain {
                subcommittee: vec![addr(1), addr(2)],
                status: Status::Pending,
                submitted: AsyncMutex::new(vec![]),
            }),
            host: Arc::new(FlakyHost { failures_before_success: AtomicU32::new(2) }),
            prober: Arc::new(AlwaysWillingProber),
            quoter: Arc::new(PassthroughQuoter::default()),
            quorum: Arc::new(QuorumState::new(4)),
            config: config(),
        };
        let outcome = run_request(
            &ctx,
            U256::ZERO,
            1,
            "oci://agent",
            vec![],
            2,
            addr(1),
            CancellationToken::new(),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome, RunnerOutcome::Responded);
        let submitted = ctx.chain.submitted.lock().await;
        assert_eq!(submitted[0], (U256::ZERO, addr(1), true));
    }

    #[tokio::test]
    async fn already_finalized_by_peers_is_dropped_before_execution() {
        let ctx = RunnerContext {
            chain: Arc::new(FakeChain {
                subcommittee: vec![addr(1), addr(2)],
                status: Status::Success,
                submitted: AsyncMutex::new(vec![]),
            }),
            host: Arc::new(FlakyHost { failures_before_success: AtomicU32::new(0) }),
            prober: Arc::new(AlwaysWillingProber),
            quoter: Arc::new(PassthroughQuoter::default()),
            quorum: Arc::new(QuorumState::new(4)),
            config: config(),
        };
        let outcome = run_request(
            &ctx,
            U256::ZERO,
            1,
            "oci://agent",
            vec![],
            2,
            addr(1),
            CancellationToken::new(),
            Duration::from_secs(5),
        )
        .await;
        assert_eq!(outcome, RunnerOutcome::Dropped(DropReason::FinalizedByPeers));
    }
}
