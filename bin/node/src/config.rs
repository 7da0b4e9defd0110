use std::path::Path;

use anyhow::{Context, Result};
use oracle_types::Address;
use serde::Deserialize;

/// TOML configuration for `oracle-node`, mirroring the owner-only tuning
/// knobs of spec.md §6 plus the process-level bits (listen address,
/// upkeep cadence, ring size) a real deployment needs around them.
#[derive(Debug, Clone, Deserialize)]
pub struct NodeConfig {
    #[serde(default = "default_listen_addr")]
    pub listen_addr: String,
    #[serde(default = "default_ring_capacity")]
    pub ring_capacity: usize,

    #[serde(default = "default_subcommittee_size")]
    pub default_subcommittee_size: usize,
    #[serde(default = "default_threshold")]
    pub default_threshold: usize,
    #[serde(default = "default_max_per_agent_fee")]
    pub max_per_agent_fee: u128,

    #[serde(default = "default_request_timeout_secs")]
    pub request_timeout_secs: u64,
    #[serde(default = "default_callback_gas_limit")]
    pub callback_gas_limit: u64,
    #[serde(default)]
    pub gas_price: u128,
    #[serde(default = "default_runner_bps")]
    pub runner_bps: u64,
    #[serde(default = "default_creator_bps")]
    pub creator_bps: u64,
    #[serde(default = "default_protocol_bps")]
    pub protocol_bps: u64,
    pub treasury: Option<String>,

    #[serde(default = "default_heartbeat_interval_secs")]
    pub heartbeat_interval_secs: u64,
    #[serde(default = "default_upkeep_interval_secs")]
    pub upkeep_interval_secs: u64,
    #[serde(default = "default_upkeep_tick_ms")]
    pub upkeep_tick_ms: u64,

    /// Agents seeded into the in-memory Agent Registry at startup. A real
    /// deployment would point at the on-chain Agent Registry contract
    /// instead (spec.md §6 "Agent Registry API (consumed)").
    #[serde(default)]
    pub agents: Vec<AgentSeed>,

    /// How many past `RequestCreated` events the node keeps queryable via
    /// `GET /requests/feed` for runners that poll instead of subscribing
    /// live. Should comfortably exceed `ring_capacity` so a slow poller
    /// doesn't miss events the ring itself hasn't even overwritten yet.
    #[serde(default = "default_feed_capacity")]
    pub feed_capacity: usize,
}

#[derive(Debug, Clone, Deserialize)]
pub struct AgentSeed {
    pub id: u64,
    pub metadata_uri: String,
    pub container_image_uri: String,
    pub owner: String,
}

fn default_listen_addr() -> String {
    "127.0.0.1:8080".to_string()
}
fn default_ring_capacity() -> usize {
    4096
}
fn default_subcommittee_size() -> usize {
    3
}
fn default_threshold() -> usize {
    2
}
fn default_max_per_agent_fee() -> u128 {
    1_000
}
fn default_request_timeout_secs() -> u64 {
    3600
}
fn default_callback_gas_limit() -> u64 {
    100_000
}
fn default_runner_bps() -> u64 {
    7_000
}
fn default_creator_bps() -> u64 {
    2_000
}
fn default_protocol_bps() -> u64 {
    1_000
}
fn default_heartbeat_interval_secs() -> u64 {
    120
}
fn default_upkeep_interval_secs() -> u64 {
    60
}
fn default_upkeep_tick_ms() -> u64 {
    5_000
}
fn default_feed_capacity() -> usize {
    16_384
}

impl NodeConfig {
    pub fn load(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path)
            .with_context(|| format!("reading node config at {}", path.display()))?;
        let config: NodeConfig = toml::from_str(&content)
            .with_context(|| format!("parsing node config at {}", path.display()))?;
        Ok(config)
    }

    pub fn treasury_address(&self) -> Result<Option<Address>> {
        self.treasury.as_deref().map(parse_address).transpose()
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
