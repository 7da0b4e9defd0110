use clap::Parser;
use serde::Serialize;

use crate::command::Executable;

/// `oraclectl committee claim`: pulls a validator's pending balance
/// (spec.md §4.1 `claim`).
#[derive(Debug, Parser)]
pub struct ClaimCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub who: String,
}

#[derive(Debug, Serialize)]
struct ClaimBody {
    who: String,
}

impl Executable for ClaimCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl ClaimCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/committee/claim", self.node_url))
            .json(&ClaimBody { who: self.who })
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("claim failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        let claimed: serde_json::Value = resp.json().await?;
        println!("claimed {claimed}");
        Ok(())
    }
}
