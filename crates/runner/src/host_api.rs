use async_trait::async_trait;
use oracle_types::{Hash256, U256};
use serde::{Deserialize, Serialize};

use crate::error::RunnerError;

/// Opaque handle to a running container, scoped to one Host API instance.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ContainerHandle(pub String);

/// What an agent invocation returned (spec.md §4.7).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InvokeOutcome {
    pub result: Vec<u8>,
    pub receipt: Hash256,
    pub cost: U256,
    pub success: bool,
}

/// The runner's local Host API collaborator (spec.md §4.7, §6). A thin
/// trait boundary so `oracle-host-sim`'s HTTP implementation and any
/// test double share one contract.
#[async_trait]
pub trait HostApi: Send + Sync {
    /// `POST /containers`. Idempotent: an already-local image returns its
    /// existing handle.
    async fn start_container(
        &self,
        agent_id: u64,
        image_uri: &str,
    ) -> Result<ContainerHandle, RunnerError>;

    /// `POST /containers/{handle}/invoke`.
    async fn invoke(
        &self,
        handle: &ContainerHandle,
        payload: &[u8],
    ) -> Result<InvokeOutcome, RunnerError>;

    /// `DELETE /containers/{handle}`.
    async fn stop_container(&self, handle: &ContainerHandle) -> Result<(), RunnerError>;
}
