use async_trait::async_trait;
use oracle_types::{Address, Hash256, Status, U256};

use crate::error::RunnerError;

/// The runner's view of the on-chain API (spec.md §6), narrowed to what
/// the state machine needs: enough to check membership, watch for early
/// finalization, and submit its own response.
#[async_trait]
pub trait ChainClient: Send + Sync {
    async fn get_subcommittee(&self, request_id: U256) -> Result<Vec<Address>, RunnerError>;

    async fn get_status(&self, request_id: U256) -> Result<Status, RunnerError>;

    async fn submit_response(
        &self,
        request_id: U256,
        validator: Address,
        result: Vec<u8>,
        receipt: Hash256,
        cost: U256,
        success: bool,
    ) -> Result<(), RunnerError>;

    async fn heartbeat(&self, validator: Address) -> Result<(), RunnerError>;
}
