use oracle_types::U256;
use thiserror::Error;

/// The one failure mode the ring itself can produce (spec §4.2 lookup
/// contract, I9). Everything else — membership, timing, duplicate
/// responses — is a Consensus Engine concern layered on top of a
/// successful lookup.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum LedgerError {
    #[error("request {0} not found")]
    RequestNotFound(U256),
}
