use clap::Parser;

use crate::command::Executable;

/// `oraclectl request timeout`: manually forces a request past its
/// deadline into `TimedOut` (spec.md §4.3 `timeoutRequest`).
#[derive(Debug, Parser)]
pub struct TimeoutCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub request_id: String,
}

impl Executable for TimeoutCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl TimeoutCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp =
            client.post(format!("{}/requests/{}/timeout", self.node_url, self.request_id)).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("timeout failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        println!("request timed out");
        Ok(())
    }
}
