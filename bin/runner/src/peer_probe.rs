use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use oracle_runner::{PeerProbe, QuorumRequest, QuorumResponse};
use oracle_types::Address;
use tracing::debug;

/// HTTP implementation of `oracle_runner::PeerProbe`: POSTs the probe to
/// whichever peer's `/quorum` server this validator knows the URL of. A
/// peer it has no address for, or can't reach, is treated as unwilling
/// (spec.md §9: "probes are stateless hints, never authoritative").
pub struct HttpPeerProbe {
    peer_urls: HashMap<Address, String>,
    client: reqwest::Client,
}

impl HttpPeerProbe {
    pub fn new(peer_urls: HashMap<Address, String>) -> Self {
        let client = reqwest::Client::builder()
            .timeout(Duration::from_millis(1_500))
            .build()
            .expect("building reqwest client");
        HttpPeerProbe { peer_urls, client }
    }
}

#[async_trait]
impl PeerProbe for HttpPeerProbe {
    async fn probe(&self, peer: Address, req: &QuorumRequest) -> bool {
        let Some(url) = self.peer_urls.get(&peer) else {
            debug!(%peer, "no known quorum URL for peer, treating as unwilling");
            return false;
        };
        let resp = self.client.post(format!("{url}/quorum")).json(req).send().await;
        match resp {
            Ok(resp) if resp.status().is_success() => {
                resp.json::<QuorumResponse>().await.map(|r| r.will_run).unwrap_or(false)
            }
            Ok(resp) => {
                debug!(%peer, status = %resp.status(), "quorum probe refused");
                false
            }
            Err(err) => {
                debug!(%peer, %err, "quorum probe failed");
                false
            }
        }
    }
}
