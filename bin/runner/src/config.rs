use std::path::Path;

use anyhow::{Context, Result};
use oracle_types::Address;
use serde::Deserialize;

#[derive(Debug, Clone, Deserialize)]
pub struct PeerConfig {
    pub address: String,
    /// Base URL of that peer's own `/quorum` server.
    pub url: String,
}

/// TOML configuration for `oracle-runner`: validator identity, peer
/// list, and the two external collaborator endpoints (spec.md §4.6-§4.7):
/// the chain node's HTTP API and the local Host API.
#[derive(Debug, Clone, Deserialize)]
pub struct RunnerDaemonConfig {
    pub validator_address: String,
    #[serde(default = "default_node_url")]
    pub node_url: String,
    #[serde(default = "default_host_api_url")]
    pub host_api_url: String,
    #[serde(default)]
    pub peers: Vec<PeerConfig>,

    #[serde(default = "default_quorum_listen_addr")]
    pub quorum_listen_addr: String,

    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_max_concurrent_requests")]
    pub max_concurrent_requests: usize,
    #[serde(default = "default_probe_backoff_base_ms")]
    pub probe_backoff_base_ms: u64,
    #[serde(default = "default_probe_max_attempts")]
    pub probe_max_attempts: u32,
    #[serde(default = "default_invoke_retry_count")]
    pub invoke_retry_count: u32,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,
    /// Per-request time budget, strictly shorter than the chain's
    /// `requestTimeout` so a submission attempt always still fits inside
    /// the deadline (spec.md §4.6).
    #[serde(default = "default_request_budget_secs")]
    pub request_budget_secs: u64,
}

fn default_node_url() -> String {
    "http://127.0.0.1:8080".to_string()
}
fn default_host_api_url() -> String {
    "http://127.0.0.1:9090".to_string()
}
fn default_quorum_listen_addr() -> String {
    "127.0.0.1:9190".to_string()
}
fn default_heartbeat_interval_secs() -> u64 {
    60
}
fn default_max_concurrent_requests() -> usize {
    8
}
fn default_probe_backoff_base_ms() -> u64 {
    200
}
fn default_probe_max_attempts() -> u32 {
    5
}
fn default_invoke_retry_count() -> u32 {
    3
}
fn default_poll_interval_ms() -> u64 {
    2_000
}
fn default_request_budget_secs() -> u64 {
    300
}

impl RunnerDaemonConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading runner config at {}", path.display()))?;
        let config: RunnerDaemonConfig = toml::from_str(&content)
            .with_context(|| format!("parsing runner config at {}", path.display()))?;
        Ok(config)
    }

    pub fn validator(&self) -> Result<Address> {
        parse_address(&self.validator_address)
    }

    pub fn runner_config(&self) -> oracle_runner::RunnerConfig {
        oracle_runner::RunnerConfig {
            heartbeat_interval_secs: self.heartbeat_interval_secs,
            max_concurrent_requests: self.max_concurrent_requests,
            probe_backoff_base_ms: self.probe_backoff_base_ms,
            probe_max_attempts: self.probe_max_attempts,
            invoke_retry_count: self.invoke_retry_count,
        }
    }
}

pub fn parse_address(s: &str) -> Result<Address> {
    let s = s.strip_prefix("0x").unwrap_or(s);
    let bytes = hex::decode(s).with_context(|| format!("invalid address hex: {s}"))?;
    if bytes.len() != 20 {
        anyhow::bail!("address must be 20 bytes, got {}", bytes.len());
    }
    Ok(Address::from_slice(&bytes))
}
