use clap::Parser;
use serde::Serialize;

use crate::command::Executable;

/// `oraclectl request submit-response`: manually submits a validator
/// response (spec.md §4.3 `submitResponse`), mainly useful for poking a
/// node during development without running a full `oracle-runner`.
#[derive(Debug, Parser)]
pub struct SubmitResponseCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub request_id: String,
    #[clap(long)]
    pub validator: String,
    /// Hex-encoded result bytes, e.g. "deadbeef".
    #[clap(long, default_value = "")]
    pub result_hex: String,
    /// Hex-encoded 32-byte execution receipt; defaults to all zero.
    #[clap(long, default_value = "0000000000000000000000000000000000000000000000000000000000000000")]
    pub receipt_hex: String,
    #[clap(long)]
    pub cost: String,
    #[clap(long, default_value_t = true)]
    pub success: bool,
}

#[derive(Debug, Serialize)]
struct SubmitResponseBody {
    validator: String,
    result: Vec<u8>,
    /// 32 raw bytes, matching `Hash256`'s derived array serialization.
    receipt: Vec<u8>,
    cost: String,
    success: bool,
}

impl Executable for SubmitResponseCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl SubmitResponseCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let result = hex::decode(self.result_hex.trim_start_matches("0x"))?;
        let receipt = hex::decode(self.receipt_hex.trim_start_matches("0x"))?;
        if receipt.len() != 32 {
            anyhow::bail!("receipt must be exactly 32 bytes, got {}", receipt.len());
        }
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/requests/{}/responses", self.node_url, self.request_id))
            .json(&SubmitResponseBody {
                validator: self.validator,
                result,
                receipt,
                cost: self.cost,
                success: self.success,
            })
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("submit failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        let body: serde_json::Value = resp.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }
}
