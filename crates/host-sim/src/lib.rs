//! Reference implementation of the local Host API collaborator (spec.md
//! §4.7/§6): the container-management HTTP service a runner drives to
//! load, invoke, and tear down an agent container.
//!
//! This is a development stand-in, not a real sandbox: invocation doesn't
//! actually run a container image, it deterministically derives a result
//! from the payload so the rest of the system (quorum gating, median
//! settlement, payout) can be exercised end-to-end without a container
//! runtime. A production deployment swaps this crate for a real one
//! behind the same `oracle_runner::HostApi` trait.

pub mod client;
pub mod server;

pub use client::HttpHostApi;
pub use server::{router, HostSimState};
