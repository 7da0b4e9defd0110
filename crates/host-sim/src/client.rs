use async_trait::async_trait;
use oracle_runner::host_api::{ContainerHandle, HostApi, InvokeOutcome};
use oracle_runner::RunnerError;
use tracing::warn;

use crate::server::{CreateContainerRequest, CreateContainerResponse, InvokeResponse};

/// Runner-side client for the simulated Host API: implements
/// `oracle_runner::HostApi` over plain HTTP against `oracle-host-sim`'s
/// router (or any service speaking the same wire contract).
pub struct HttpHostApi {
    base_url: String,
    client: reqwest::Client,
}

impl HttpHostApi {
    pub fn new(base_url: impl Into<String>) -> Self {
        HttpHostApi { base_url: base_url.into(), client: reqwest::Client::new() }
    }
}

#[async_trait]
impl HostApi for HttpHostApi {
    async fn start_container(
        &self,
        agent_id: u64,
        image_uri: &str,
    ) -> Result<ContainerHandle, RunnerError> {
        let resp = self
            .client
            .post(format!("{}/containers", self.base_url))
            .json(&CreateContainerRequest { agent_id, image_uri: image_uri.to_string() })
            .send()
            .await
            .map_err(|err| {
                warn!(agent_id, %err, "host-sim start_container request failed");
                RunnerError::ImageUnavailable
            })?;
        if !resp.status().is_success() {
            return Err(RunnerError::ImageUnavailable);
        }
        let body: CreateContainerResponse =
            resp.json().await.map_err(|_| RunnerError::Malformed)?;
        Ok(ContainerHandle(body.handle))
    }

    async fn invoke(
        &self,
        handle: &ContainerHandle,
        payload: &[u8],
    ) -> Result<InvokeOutcome, RunnerError> {
        let resp = self
            .client
            .post(format!("{}/containers/{}/invoke", self.base_url, handle.0))
            .body(payload.to_vec())
            .send()
            .await
            .map_err(|err| {
                if err.is_timeout() {
                    RunnerError::InvokeTimeout
                } else {
                    RunnerError::ContainerError(err.to_string())
                }
            })?;
        if !resp.status().is_success() {
            return Err(RunnerError::ContainerError(format!("status {}", resp.status())));
        }
        let body: InvokeResponse = resp.json().await.map_err(|_| RunnerError::Malformed)?;
        Ok(InvokeOutcome {
            result: body.result,
            receipt: body.receipt,
            cost: body.cost,
            success: body.success,
        })
    }

    async fn stop_container(&self, handle: &ContainerHandle) -> Result<(), RunnerError> {
        let resp = self
            .client
            .delete(format!("{}/containers/{}", self.base_url, handle.0))
            .send()
            .await
            .map_err(|err| RunnerError::ContainerError(err.to_string()))?;
        if resp.status().is_success() || resp.status() == reqwest::StatusCode::NOT_FOUND {
            Ok(())
        } else {
            Err(RunnerError::ContainerError(format!("status {}", resp.status())))
        }
    }
}
