mod config;
mod events_log;
mod http;

use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use oracle_agent_registry::{AgentMeta, InMemoryAgentRegistry};
use oracle_committee::CommitteeConfig;
use oracle_consensus::{ConsensusConfig, LoggingCallback};
use oracle_engine::EngineConfig;
use oracle_ledger::InMemoryStore;
use oracle_types::U256;
use tracing::info;
use tracing_subscriber::EnvFilter;

use crate::config::NodeConfig;
use crate::events_log::EventFeed;
use crate::http::{AppState, NodeEngine};

/// `oracle-node`: hosts one `Engine` behind the on-chain HTTP surface of
/// spec.md §6 and a periodic committee/request upkeep ticker.
#[derive(Debug, Parser)]
#[command(name = "oracle-node", about = "Committee/ledger/consensus node")]
struct Cli {
    /// Path to a TOML config file (see `NodeConfig`).
    #[arg(long, default_value = "node.toml")]
    config: String,

    /// Overrides `listen_addr` from the config file.
    #[arg(long)]
    listen_addr: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let mut config = NodeConfig::load(&cli.config).context("loading node config")?;
    if let Some(addr) = cli.listen_addr {
        config.listen_addr = addr;
    }

    let engine = Arc::new(build_engine(&config)?);
    let feed = EventFeed::new(config.feed_capacity);
    tokio::spawn(events_log::run_feed_writer(engine.subscribe(), Arc::clone(&feed)));

    let upkeep_engine = Arc::clone(&engine);
    let upkeep_tick = Duration::from_millis(config.upkeep_tick_ms);
    tokio::spawn(async move {
        let mut interval = tokio::time::interval(upkeep_tick);
        loop {
            interval.tick().await;
            let now = std::time::SystemTime::now()
                .duration_since(std::time::UNIX_EPOCH)
                .expect("system clock before epoch")
                .as_secs();
            upkeep_engine.committee_upkeep(now);
            upkeep_engine.upkeep_requests(now);
        }
    });

    let state = Arc::new(AppState { engine, feed });
    let app = http::router(state);

    let listener = tokio::net::TcpListener::bind(&config.listen_addr)
        .await
        .with_context(|| format!("binding {}", config.listen_addr))?;
    info!(addr = %config.listen_addr, "oracle-node listening");
    axum::serve(listener, app).await.context("serving HTTP API")?;
    Ok(())
}

fn build_engine(config: &NodeConfig) -> Result<NodeEngine> {
    let agents = InMemoryAgentRegistry::new();
    for seed in &config.agents {
        let owner = crate::config::parse_address(&seed.owner)
            .with_context(|| format!("agent {} owner address", seed.id))?;
        agents.register(
            seed.id,
            AgentMeta {
                metadata_uri: seed.metadata_uri.clone(),
                container_image_uri: seed.container_image_uri.clone(),
                owner,
            },
        );
    }

    let treasury = config.treasury_address().context("parsing treasury address")?;

    let engine_config = EngineConfig {
        default_subcommittee_size: config.default_subcommittee_size,
        default_threshold: config.default_threshold,
        max_per_agent_fee: U256::from(config.max_per_agent_fee),
    };
    let committee_config = CommitteeConfig {
        heartbeat_interval_secs: config.heartbeat_interval_secs,
        upkeep_interval_secs: config.upkeep_interval_secs,
    };
    let consensus_config = ConsensusConfig {
        request_timeout_secs: config.request_timeout_secs,
        callback_gas_limit: config.callback_gas_limit,
        gas_price: U256::from(config.gas_price),
        runner_bps: config.runner_bps,
        creator_bps: config.creator_bps,
        protocol_bps: config.protocol_bps,
        treasury,
    };
    consensus_config.validate().context("invalid consensus config")?;

    Ok(NodeEngine::new(
        engine_config,
        committee_config,
        consensus_config,
        InMemoryStore::new(config.ring_capacity),
        agents,
        Arc::new(LoggingCallback),
    ))
}
