use clap::Parser;

use crate::command::Executable;

/// `oraclectl committee active`: lists the current active validator set
/// (spec.md §6 `getActiveMembers`).
#[derive(Debug, Parser)]
pub struct ActiveCommand {
    #[clap(long)]
    pub node_url: String,
}

impl Executable for ActiveCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl ActiveCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp = client.get(format!("{}/committee/active", self.node_url)).send().await?;
        let members: serde_json::Value = resp.json().await?;
        println!("{}", serde_json::to_string_pretty(&members)?);
        Ok(())
    }
}
