use clap::Parser;

use crate::command::Executable;

/// `oraclectl request get`: reads a request's current ledger slot
/// (spec.md §6 `getRequest`).
#[derive(Debug, Parser)]
pub struct GetCommand {
    #[clap(long)]
    pub node_url: String,
    #[clap(long)]
    pub request_id: String,
    /// Also print the recorded responses for this request.
    #[clap(long, default_value_t = false)]
    pub with_responses: bool,
}

impl Executable for GetCommand {
    fn execute(self) -> Result<(), anyhow::Error> {
        let rt = tokio::runtime::Runtime::new()?;
        rt.block_on(self.execute_async())
    }
}

impl GetCommand {
    async fn execute_async(self) -> Result<(), anyhow::Error> {
        let client = reqwest::Client::new();
        let resp = client.get(format!("{}/requests/{}", self.node_url, self.request_id)).send().await?;
        if !resp.status().is_success() {
            anyhow::bail!("get failed: {} {}", resp.status(), resp.text().await.unwrap_or_default());
        }
        let body: serde_json::Value = resp.json().await?;
        println!("{}", serde_json::to_string_pretty(&body)?);

        if self.with_responses {
            let resp = client
                .get(format!("{}/requests/{}/responses", self.node_url, self.request_id))
                .send()
                .await?;
            let responses: serde_json::Value = resp.json().await?;
            println!("{}", serde_json::to_string_pretty(&responses)?);
        }
        Ok(())
    }
}
