//! The Agent Registry (spec §2, §6): an external collaborator this
//! workspace only queries. Maps an agent id to the metadata needed to run
//! it — a container image URI, an off-chain metadata URI, and the
//! creator address the Consensus Engine later pays a share to.

use std::collections::HashMap;

use oracle_types::Address;
use parking_lot::RwLock;
use thiserror::Error;

pub type AgentId = u64;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AgentMeta {
    pub metadata_uri: String,
    pub container_image_uri: String,
    pub owner: Address,
}

#[derive(Debug, Error, PartialEq, Eq)]
pub enum AgentRegistryError {
    #[error("agent {0} not found")]
    AgentNotFound(AgentId),
}

/// Narrow trait the Request Ledger queries at `createRequest` time
/// (spec §4.2 step 3). Kept separate from any concrete storage so the
/// real agent-registry contract can be swapped in without touching the
/// ledger or consensus crates.
pub trait AgentRegistry: Send + Sync {
    fn get_agent(&self, id: AgentId) -> Result<AgentMeta, AgentRegistryError>;
}

/// Reference implementation used by tests and the `oracle-node` binary's
/// development mode.
#[derive(Default)]
pub struct InMemoryAgentRegistry {
    agents: RwLock<HashMap<AgentId, AgentMeta>>,
}

impl InMemoryAgentRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, id: AgentId, meta: AgentMeta) {
        self.agents.write().insert(id, meta);
    }
}

impl AgentRegistry for InMemoryAgentRegistry {
    fn get_agent(&self, id: AgentId) -> Result<AgentMeta, AgentRegistryError> {
        self.agents.read().get(&id).cloned().ok_or(AgentRegistryError::AgentNotFound(id))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn unknown_agent_errors() {
        let registry = InMemoryAgentRegistry::new();
        assert_eq!(registry.get_agent(1).unwrap_err(), AgentRegistryError::AgentNotFound(1));
    }

    #[test]
    fn registered_agent_is_found() {
        let registry = InMemoryAgentRegistry::new();
        let owner = Address::repeat_byte(0x11);
        registry.register(
            7,
            AgentMeta {
                metadata_uri: "ipfs://meta".into(),
                container_image_uri: "oci://agent:latest".into(),
                owner,
            },
        );
        let meta = registry.get_agent(7).unwrap();
        assert_eq!(meta.owner, owner);
    }
}
