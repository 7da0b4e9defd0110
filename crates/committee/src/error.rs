use thiserror::Error;

/// The taxonomy of §7: validation and resource errors the Committee
/// Registry can revert with. Every other operation is total.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum CommitteeError {
    #[error("active set has {active} members, need {requested}")]
    InsufficientMembers { active: usize, requested: usize },

    #[error("no pending balance for caller")]
    NoBalance,

    #[error("sum of amounts ({sum}) does not match deposited value ({value})")]
    AmountMismatch { sum: String, value: String },
}
