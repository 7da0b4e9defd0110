use oracle_types::U256;

/// §6 "Configuration (owner-only, tuning knobs)" not already owned by the
/// Committee Registry or Consensus Engine: the request-creation defaults
/// and per-agent fee ceiling.
#[derive(Debug, Clone)]
pub struct EngineConfig {
    pub default_subcommittee_size: usize,
    pub default_threshold: usize,
    pub max_per_agent_fee: U256,
}

impl Default for EngineConfig {
    fn default() -> Self {
        EngineConfig {
            default_subcommittee_size: 3,
            default_threshold: 2,
            max_per_agent_fee: U256::from(1_000u64),
        }
    }
}

impl EngineConfig {
    /// §6 `getRequestDeposit`: `maxPerAgentFee x defaultSubcommitteeSize`.
    pub fn default_deposit(&self) -> U256 {
        self.max_per_agent_fee * U256::from(self.default_subcommittee_size as u64)
    }
}
