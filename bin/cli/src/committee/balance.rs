use clap::Parser;

use crate::command::Executable;

/// `oraclectl committee balance`: reads a validator's pending pull-payment
/// balance (spec.md §4.1 `pendingBalance`).
#[derive(Debug, Parser)]
pub struct BalanceCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub who: String,
}

impl Executable for BalanceCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl BalanceCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp = client.get(format!("{}/committee/balance/{}", self.node_url, self.who)).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("balance lookup failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        let balance: serde_json::Value = resp.json().await?;
        println!("{balance}");
        Ok(())
    }
}
