use clap::Parser;
use serde::Serialize;

use crate::command::Executable;

/// `oraclectl request create`: submits a `createRequest` call using the
/// node's default subcommittee size, threshold and Majority consensus
/// (spec.md §4.2).
#[derive(Debug, Parser)]
pub struct CreateCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub agent_id: u64,
    #[clap(long)]
    pub requester: String,
    #[clap(long)]
    pub callback_address: Option<String>,
    /// Hex-encoded payload bytes, e.g. "deadbeef".
    #[clap(long, default_value = "")]
    pub payload_hex: String,
    #[clap(long)]
    pub deposit_value: String,
}

#[derive(Debug, Serialize)]
struct CreateRequestBody {
    agent_id: u64,
    requester: String,
    callback_address: Option<String>,
    payload: Vec<u8>,
    deposit_value: String,
}

impl Executable for CreateCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl CreateCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let payload = hex::decode(self.payload_hex.trim_start_matches("0x"))?;
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/requests", self.node_url))
            .json(&CreateRequestBody {
                agent_id: self.agent_id,
                requester: self.requester,
                callback_address: self.callback_address,
                payload,
                deposit_value: self.deposit_value,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("create failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        let body: serde_json::Value = resp.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }
}
