use clap::Parser;
use serde::Serialize;

use crate::command::Executable;

/// `oraclectl committee heartbeat`: refreshes a validator's liveness
/// timestamp (spec.md §4.1 `heartbeat`).
#[derive(Debug, Parser)]
pub struct HeartbeatCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub validator: String,
}

#[derive(Debug, Serialize)]
struct HeartbeatBody {
    validator: String,
}

impl Executable for HeartbeatCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl HeartbeatCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp = client
            .post(format!("{}/committee/heartbeat", self.node_url))
            .json(&HeartbeatBody { validator: self.validator })
            .send()
            .await?;
        if !resp.status().is_success() {
            anyhow::bail!("heartbeat failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        println!("heartbeat accepted");
        Ok(())
    }
}
