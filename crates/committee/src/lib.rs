//! §4.1 Committee Registry: validator liveness tracking, seeded
//! subcommittee election, and the pull-payment escrow.

mod election;
mod error;
mod registry;
mod validator;

pub use election::elect_subcommittee;
pub use error::CommitteeError;
pub use registry::{CommitteeConfig, CommitteeRegistry, UpkeepOutcome};
pub use validator::Validator;
