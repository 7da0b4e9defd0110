use clap::Parser;

use crate::command::Executable;

/// `oraclectl committee upkeep`: forces an epoch transition if the active
/// set has gone stale (spec.md §4.1 `upkeep`). Normally the node's own
/// ticker calls this; exposed for operators driving it manually.
#[derive(Debug, Parser)]
pub struct UpkeepCommand {
    #[clap(long)]
    pub node_url: String,
}

impl Executable for UpkeepCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl UpkeepCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp = client.post(format!("{}/committee/upkeep", self.node_url)).send().await?;
        let body: serde_json::Value = resp.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);
        Ok(())
    }
}
