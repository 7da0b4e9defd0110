mod chain_client;
mod config;
mod peer_probe;
mod server;

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::Parser;
use dashmap::DashMap;
use oracle_host_sim::HttpHostApi;
use oracle_runner::{run_request, PassthroughQuoter, QuorumState, RunnerContext};
use oracle_types::{Address, U256};
use serde::Deserialize;
use tokio::sync::Semaphore;
use tokio_util::sync::CancellationToken;
use tracing::{info, warn};
use tracing_subscriber::EnvFilter;

use crate::chain_client::HttpChainClient;
use crate::config::RunnerDaemonConfig;
use crate::peer_probe::HttpPeerProbe;
use crate::server::QuorumServerState;

/// `oracle-runner`: one validator's off-chain daemon (spec.md §4.6-§4.7).
/// Polls the node for new requests, gates execution behind a peer quorum
/// probe, runs the agent through the Host API, and submits its response.
#[derive(Debug, Parser)]
#[command(name = "oracle-runner", about = "Validator off-chain runner daemon")]
struct Cli {
    /// Path to a TOML config file (see `RunnerDaemonConfig`).
    #[arg(long, default_value = "runner.toml")]
    config: String,
}

#[derive(Debug, Deserialize)]
struct AgentView {
    container_image_uri: String,
}

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let cli = Cli::parse();
    let config = RunnerDaemonConfig::load(&cli.config).context("loading runner config")?;
    let self_addr = config.validator().context("parsing validator_address")?;

    let chain = Arc::new(HttpChainClient::new(config.node_url.clone()));
    let host = Arc::new(HttpHostApi::new(config.host_api_url.clone()));
    let quoter = Arc::new(PassthroughQuoter::default());
    let quorum = Arc::new(QuorumState::new(config.max_concurrent_requests));

    let mut peer_urls = HashMap::new();
    for peer in &config.peers {
        let addr = crate::config::parse_address(&peer.address)
            .with_context(|| format!("peer address {}", peer.address))?;
        peer_urls.insert(addr, peer.url.clone());
    }
    let prober = Arc::new(HttpPeerProbe::new(peer_urls));

    let quorum_state = Arc::new(QuorumServerState {
        quorum: Arc::clone(&quorum),
        chain: Arc::clone(&chain),
        self_addr,
    });
    let quorum_listener = tokio::net::TcpListener::bind(&config.quorum_listen_addr)
        .await
        .with_context(|| format!("binding {}", config.quorum_listen_addr))?;
    info!(addr = %config.quorum_listen_addr, "quorum server listening");
    tokio::spawn(async move {
        let app = server::router(quorum_state);
        if let Err(err) = axum::serve(quorum_listener, app).await {
            warn!(%err, "quorum server exited");
        }
    });

    let shutdown = CancellationToken::new();
    let heartbeat_chain = Arc::clone(&chain);
    let heartbeat_cancel = shutdown.clone();
    let heartbeat_interval = Duration::from_secs(config.heartbeat_interval_secs);
    tokio::spawn(async move {
        oracle_runner::run_heartbeat_loop(
            heartbeat_chain.as_ref(),
            self_addr,
            heartbeat_interval,
            heartbeat_cancel,
        )
        .await;
    });

    let runner_config = config.runner_config();
    let concurrency = Arc::new(Semaphore::new(config.max_concurrent_requests));
    let http_client = reqwest::Client::new();
    let image_cache: Arc<DashMap<u64, String>> = Arc::new(DashMap::new());
    let in_flight: Arc<DashMap<U256, ()>> = Arc::new(DashMap::new());

    let mut since = U256::ZERO;
    let poll_interval = Duration::from_millis(config.poll_interval_ms);
    let budget = Duration::from_secs(config.request_budget_secs);

    info!(%self_addr, node = %config.node_url, "oracle-runner polling for requests");
    loop {
        tokio::select! {
            _ = tokio::signal::ctrl_c() => {
                info!("shutdown requested");
                shutdown.cancel();
                break;
            }
            _ = tokio::time::sleep(poll_interval) => {}
        }

        let url = format!("{}/requests/feed?since={}&limit=100", config.node_url, since);
        let records: Vec<FeedRecord> = match http_client.get(&url).send().await {
            Ok(resp) => match resp.json().await {
                Ok(records) => records,
                Err(err) => {
                    warn!(%err, "failed to decode feed response");
                    continue;
                }
            },
            Err(err) => {
                warn!(%err, "failed to poll request feed");
                continue;
            }
        };

        for record in records {
            since = since.max(record.request_id);
            if !record.subcommittee.contains(&self_addr) {
                continue;
            }
            if in_flight.contains_key(&record.request_id) {
                continue;
            }
            if record.max_cost_per_agent == U256::ZERO {
                warn!(request_id = %record.request_id, "request has zero max cost per agent, skipping");
                continue;
            }

            let image_uri = match image_uri_for(&http_client, &config.node_url, &image_cache, record.agent_id).await {
                Ok(uri) => uri,
                Err(err) => {
                    warn!(agent_id = record.agent_id, %err, "could not resolve agent image, skipping request");
                    continue;
                }
            };

            in_flight.insert(record.request_id, ());
            let permit = Arc::clone(&concurrency);
            let ctx = RunnerContext {
                chain: Arc::clone(&chain),
                host: Arc::clone(&host),
                prober: Arc::clone(&prober),
                quoter: Arc::clone(&quoter),
                quorum: Arc::clone(&quorum),
                config: runner_config.clone(),
            };
            let in_flight = Arc::clone(&in_flight);
            let cancel = shutdown.clone();
            let request_id = record.request_id;
            let agent_id = record.agent_id;
            let payload = record.payload;
            let threshold = record.threshold;

            tokio::spawn(async move {
                let _permit = permit.acquire_owned().await;
                let outcome = run_request(
                    &ctx,
                    request_id,
                    agent_id,
                    &image_uri,
                    payload,
                    threshold,
                    self_addr,
                    cancel,
                    budget,
                )
                .await;
                info!(%request_id, ?outcome, "runner task finished");
                in_flight.remove(&request_id);
            });
        }
    }

    Ok(())
}

#[derive(Debug, Clone, Deserialize)]
struct FeedRecord {
    request_id: U256,
    agent_id: u64,
    #[serde(default)]
    max_cost_per_agent: U256,
    #[serde(default)]
    payload: Vec<u8>,
    subcommittee: Vec<Address>,
    threshold: usize,
}

async fn image_uri_for(
    client: &reqwest::Client,
    node_url: &str,
    cache: &DashMap<u64, String>,
    agent_id: u64,
) -> Result<String> {
    if let Some(uri) = cache.get(&agent_id) {
        return Ok(uri.clone());
    }
    let resp = client
        .get(format!("{node_url}/agents/{agent_id}"))
        .send()
        .await
        .with_context(|| format!("fetching agent {agent_id}"))?;
    if !resp.status().is_success() {
        anyhow::bail!("agent {agent_id} lookup returned status {}", resp.status());
    }
    let view: AgentView = resp.json().await.context("decoding agent view")?;
    cache.insert(agent_id, view.container_image_uri.clone());
    Ok(view.container_image_uri)
}
