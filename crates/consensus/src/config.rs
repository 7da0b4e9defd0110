use oracle_types::{Address, U256, BPS_DENOMINATOR};

use crate::error::ConsensusError;

/// Owner-tunable settlement knobs (spec §6 "Configuration").
#[derive(Debug, Clone)]
pub struct ConsensusConfig {
    pub request_timeout_secs: u64,
    pub callback_gas_limit: u64,
    pub gas_price: U256,
    pub runner_bps: u64,
    pub creator_bps: u64,
    pub protocol_bps: u64,
    /// `None` means the protocol share accrues to `Address::ZERO` as an
    /// unclaimed dust sink rather than a configured treasury account.
    pub treasury: Option<Address>,
}

impl ConsensusConfig {
    pub fn treasury_or_zero(&self) -> Address {
        self.treasury.unwrap_or(Address::ZERO)
    }

    /// Invariant I8 requires the three payout shares to sum back to
    /// `validatorCosts` exactly; a config whose bps fields don't sum to
    /// `BPS_DENOMINATOR` would silently break that at settlement time, so
    /// construction sites check it up front instead.
    pub fn validate(&self) -> Result<(), ConsensusError> {
        let sum = self.runner_bps + self.creator_bps + self.protocol_bps;
        if sum != BPS_DENOMINATOR {
            return Err(ConsensusError::InvalidBpsSplit {
                runner_bps: self.runner_bps,
                creator_bps: self.creator_bps,
                protocol_bps: self.protocol_bps,
            });
        }
        Ok(())
    }
}

impl Default for ConsensusConfig {
    fn default() -> Self {
        ConsensusConfig {
            request_timeout_secs: 3600,
            callback_gas_limit: 100_000,
            gas_price: U256::ZERO,
            runner_bps: 7_000,
            creator_bps: 2_000,
            protocol_bps: 1_000,
            treasury: None,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_shares_sum_to_denominator() {
        let cfg = ConsensusConfig::default();
        assert_eq!(cfg.runner_bps + cfg.creator_bps + cfg.protocol_bps, BPS_DENOMINATOR);
        assert!(cfg.validate().is_ok());
    }

    #[test]
    fn rejects_mismatched_bps_split() {
        let cfg = ConsensusConfig { runner_bps: 5_000, ..ConsensusConfig::default() };
        assert!(cfg.validate().is_err());
    }
}
