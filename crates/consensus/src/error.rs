use oracle_ledger::LedgerError;
use oracle_types::U256;
use thiserror::Error;

/// §7 taxonomy for the operations this crate exposes. `RequestNotFound`
/// is re-exported from the ledger's own error so callers only ever see
/// one error type per crate boundary.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConsensusError {
    #[error("request {0} not found")]
    RequestNotFound(U256),

    #[error("caller is not a member of the request's subcommittee")]
    NotSubcommitteeMember,

    #[error("request has already timed out")]
    RequestTimedOut,

    #[error("caller has already submitted a response for this request")]
    AlreadyResponded,

    #[error("request has already finalized")]
    AlreadyFinalized,

    #[error("request has not yet reached its timeout")]
    NotYetTimedOut,

    #[error(
        "payout bps split does not sum to 10000: runner={runner_bps} creator={creator_bps} protocol={protocol_bps}"
    )]
    InvalidBpsSplit { runner_bps: u64, creator_bps: u64, protocol_bps: u64 },
}

impl From<LedgerError> for ConsensusError {
    fn from(err: LedgerError) -> Self {
        match err {
            LedgerError::RequestNotFound(id) => ConsensusError::RequestNotFound(id),
        }
    }
}
