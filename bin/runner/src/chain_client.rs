use async_trait::async_trait;
use oracle_runner::{ChainClient, RunnerError};
use oracle_types::{Address, Hash256, Status, U256};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// HTTP implementation of `oracle_runner::ChainClient` against an
/// `oracle-node` instance's HTTP API (spec.md §6).
pub struct HttpChainClient {
    base_url: String,
    client: reqwest::Client,
}

impl HttpChainClient {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpChainClient { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[derive(Debug, Deserialize)]
struct RequestView {
    subcommittee: Vec<Address>,
    status: Status,
}

#[derive(Debug, Serialize)]
struct HeartbeatRequest {
    validator: Address,
}

#[derive(Debug, Serialize)]
struct SubmitResponseBody {
    validator: Address,
    result: Vec<u8>,
    receipt: Hash256,
    cost: U256,
    success: bool,
}

#[async_trait]
impl ChainClient for HttpChainClient {
    async fn get_subcommittee(&self, request_id: U256) -> Result<Vec<Address>, RunnerError> {
        let view = self.get_request(request_id).await?;
        Ok(view.subcommittee)
    }

    async fn get_status(&self, request_id: U256) -> Result<Status, RunnerError> {
        let view = self.get_request(request_id).await?;
        Ok(view.status)
    }

    async fn submit_response(
        &self,
        request_id: U256,
        validator: Address,
        result: Vec<u8>,
        receipt: Hash256,
        cost: U256,
        success: bool,
    ) -> Result<(), RunnerError> {
        let resp = self
            .client
            .post(format!("{}/requests/{}/responses", self.base_url, request_id))
            .json(&SubmitResponseBody { validator, result, receipt, cost, success })
            .send()
            .await
            .map_err(|err| RunnerError::Chain(err.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            // The node treats a duplicate/already-finalized submission as a
            // client error, not a reason to keep retrying (spec.md §4.6).
            let status = resp.status();
            let body = resp.text().await.unwrap_or_default();
            warn!(%request_id, %status, %body, "submit_response rejected");
            Ok(())
        }
    }

    async fn heartbeat(&self, validator: Address) -> Result<(), RunnerError> {
        let resp = self
            .client
            .post(format!("{}/committee/heartbeat", self.base_url))
            .json(&HeartbeatRequest { validator })
            .send()
            .await
            .map_err(|err| RunnerError::Chain(err.to_string()))?;
        if resp.status().is_success() {
            Ok(())
        } else {
            Err(RunnerError::Chain(format!("status {}", resp.status())))
        }
    }
}

impl HttpChainClient {
    async fn get_request(&self, request_id: U256) -> Result<RequestView, RunnerError> {
        let resp = self
            .client
            .get(format!("{}/requests/{}", self.base_url, request_id))
            .send()
            .await
            .map_err(|err| RunnerError::Chain(err.to_string()))?;
        if !resp.status().is_success() {
            return Err(RunnerError::Chain(format!("status {}", resp.status())));
        }
        resp.json().await.map_err(|err| RunnerError::Chain(err.to_string()))
    }
}
