use oracle_agent_registry::AgentRegistryError;
use oracle_committee::CommitteeError;
use oracle_consensus::ConsensusError;
use oracle_types::U256;
use thiserror::Error;

/// The full §7 taxonomy as seen at the `Engine` facade: every collaborator's
/// error folds into this one type so `bin/node`'s HTTP layer has a single
/// thing to map to a response.
#[derive(Debug, Error)]
pub enum EngineError {
    #[error("threshold must be in (0, subcommitteeSize], got threshold={threshold} size={subcommittee_size}")]
    InvalidThreshold { threshold: usize, subcommittee_size: usize },

    #[error("deposit must equal maxPerAgentFee x subcommitteeSize ({expected}), got {actual}")]
    IncorrectDeposit { expected: U256, actual: U256 },

    #[error(transparent)]
    Committee(#[from] CommitteeError),

    #[error(transparent)]
    AgentRegistry(#[from] AgentRegistryError),

    #[error(transparent)]
    Consensus(#[from] ConsensusError),
}
