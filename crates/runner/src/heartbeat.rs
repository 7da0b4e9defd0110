use std::time::Duration;

use tokio_util::sync::CancellationToken;
use tracing::{debug, warn};

use crate::chain_client::ChainClient;
use oracle_types::Address;

/// Keeps a validator's `lastHeartbeat` fresh so the committee doesn't
/// silently age it out (spec.md §4.6: "never give up", heartbeat failures
/// are retried with backoff rather than treated as fatal).
pub async fn run_heartbeat_loop<C: ChainClient>(
    chain: &C,
    validator: Address,
    interval: Duration,
    cancel: CancellationToken,
) {
    let mut backoff = interval;
    loop {
        tokio::select! {
            _ = cancel.cancelled() => return,
            _ = tokio::time::sleep(backoff) => {}
        }

        match chain.heartbeat(validator).await {
            Ok(()) => {
                debug!(%validator, "heartbeat sent");
                backoff = interval;
            }
            Err(err) => {
                warn!(%validator, %err, "heartbeat failed, backing off");
                backoff = (backoff * 2).min(Duration::from_secs(300));
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use oracle_types::{Hash256, Status, U256};
    use std::sync::atomic::{AtomicU32, Ordering};
    use std::sync::Arc;

    struct CountingChain {
        calls: AtomicU32,
    }

    #[async_trait]
    impl ChainClient for CountingChain {
        async fn get_subcommittee(&self, _request_id: U256) -> Result<Vec<Address>, crate::RunnerError> {
            Ok(vec![])
        }
        async fn get_status(&self, _request_id: U256) -> Result<Status, crate::RunnerError> {
            Ok(Status::Pending)
        }
        async fn submit_response(
            &self,
            _request_id: U256,
            _validator: Address,
            _result: Vec<u8>,
            _receipt: Hash256,
            _cost: U256,
            _success: bool,
        ) -> Result<(), crate::RunnerError> {
            Ok(())
        }
        async fn heartbeat(&self, _validator: Address) -> Result<(), crate::RunnerError> {
            self.calls.fetch_add(1, Ordering::Relaxed);
            Ok(())
        }
    }

    #[tokio::test(start_paused = true)]
    async fn heartbeat_fires_on_interval_until_cancelled() {
        let chain = Arc::new(CountingChain { calls: AtomicU32::new(0) });
        let cancel = CancellationToken::new();
        let cancel_clone = cancel.clone();
        let chain_clone = chain.clone();
        let handle = tokio::spawn(async move {
            run_heartbeat_loop(chain_clone.as_ref(), Address::ZERO, Duration::from_secs(10), cancel_clone).await;
        });

        tokio::time::advance(Duration::from_secs(35)).await;
        cancel.cancel();
        handle.await.unwrap();

        assert!(chain.calls.load(Ordering::Relaxed) >= 3);
    }
}
