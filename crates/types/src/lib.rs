//! Primitives shared by every crate in the workspace: account identity,
//! 256-bit integers, content hashes, and the small enums that show up in
//! every on-chain-facing API.

use serde::{Deserialize, Serialize};
use sha3::{Digest, Keccak256};

/// 20-byte account identifier (validator, requester, creator, treasury, ...).
pub use alloy_primitives::Address;

/// 256-bit unsigned integer used for request ids, quoted costs and deposits.
pub use ethnum::U256;

/// A 32-byte content address (an execution receipt manifest, an election
/// seed, ...). Distinct from `Address` so the two can never be confused at
/// a call site.
#[derive(Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Hash256(pub [u8; 32]);

impl Hash256 {
    pub const ZERO: Hash256 = Hash256([0u8; 32]);

    pub fn from_slice(bytes: &[u8]) -> Self {
        let mut out = [0u8; 32];
        let n = bytes.len().min(32);
        out[..n].copy_from_slice(&bytes[..n]);
        Hash256(out)
    }
}

impl std::fmt::Debug for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

impl std::fmt::Display for Hash256 {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "0x{}", hex::encode(self.0))
    }
}

/// Keccak-256, used by subcommittee election (spec §4.1) and anywhere else
/// a deterministic content address is needed.
pub fn keccak256(data: &[u8]) -> Hash256 {
    let mut hasher = Keccak256::new();
    hasher.update(data);
    Hash256(hasher.finalize().into())
}

/// The lifecycle status of a request (spec §3, §6 callback contract).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[repr(u8)]
pub enum Status {
    Pending = 0,
    Success = 1,
    Failed = 2,
    TimedOut = 3,
}

impl Status {
    pub fn is_finalized(self) -> bool {
        !matches!(self, Status::Pending)
    }
}

/// How a request decides Success (spec §4.3).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ConsensusType {
    /// Some result value must be reported identically by `threshold` peers.
    Majority,
    /// Any `threshold` successful responses, regardless of agreement.
    Threshold,
}

/// Basis points, used for the runner/creator/protocol payout split
/// (spec §4.3.e). Always sums to 10_000 across the three shares in a
/// given `PayoutSplit`.
pub const BPS_DENOMINATOR: u64 = 10_000;
