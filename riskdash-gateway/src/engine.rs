use crate::config::Config;
use anyhow::Context;
use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::debug;

#[derive(Deserialize)]
struct JobRef {
    job_id: String,
}

#[derive(Deserialize)]
struct JobStatus {
    state: String,
    #[serde(default)]
    error: Option<String>,
}

/// Client for the external query engine. The engine exposes the usual
/// analytical job lifecycle over REST: submit a query, poll the job until it
/// settles, then fetch the result rows as an ordered sequence of objects.
pub struct EngineClient {
    client: Client,
    base: String,
    token: Option<String>,
    poll_interval: Duration,
}

impl EngineClient {
    pub fn from_config(cfg: &Config) -> anyhow::Result<Self> {
        let mut builder = Client::builder();
        // No gateway-side timeout unless configured; the engine's own job
        // limits are the only clock.
        if let Some(secs) = cfg.timeout_secs {
            builder = builder.timeout(Duration::from_secs(secs));
        }
        let client = builder.build()?;

        // Credentials are ambient to the engine client, not gateway config.
        let token = std::env::var("WAREHOUSE_TOKEN").ok();

        let poll_interval = Duration::from_millis(cfg.poll_interval_ms.unwrap_or(250));
        debug!(
            "Engine client created for {} (poll interval {:?})",
            cfg.engine_url, poll_interval
        );

        Ok(EngineClient {
            client,
            base: cfg.engine_url.trim_end_matches('/').to_string(),
            token,
            poll_interval,
        })
    }

    /// Runs one query end to end: submit, await completion, fetch rows.
    /// Exactly one engine job is billed per call; there is no caching and no
    /// retrying at this layer.
    pub async fn run_query(&self, sql: &str) -> anyhow::Result<Vec<Value>> {
        let job_id = self.submit(sql).await?;
        self.await_completion(&job_id).await?;
        self.fetch_rows(&job_id).await
    }

    fn authed(&self, builder: reqwest::RequestBuilder) -> reqwest::RequestBuilder {
        match &self.token {
            Some(t) => builder.header("Authorization", format!("Bearer {}", t)),
            None => builder,
        }
    }

    async fn submit(&self, sql: &str) -> anyhow::Result<String> {
        let url = format!("{}/v1/jobs", self.base);
        let resp = self
            .authed(self.client.post(&url))
            .json(&serde_json::json!({ "query": sql }))
            .send()
            .await
            .context("submitting query job")?
            .error_for_status()
            .context("query job submission rejected")?;
        let job: JobRef = resp.json().await.context("decoding job reference")?;
        debug!("Submitted query job {}", job.job_id);
        Ok(job.job_id)
    }

    async fn await_completion(&self, job_id: &str) -> anyhow::Result<()> {
        let url = format!("{}/v1/jobs/{}", self.base, job_id);
        loop {
            let status: JobStatus = self
                .authed(self.client.get(&url))
                .send()
                .await
                .context("polling job status")?
                .error_for_status()
                .context("job status request rejected")?
                .json()
                .await
                .context("decoding job status")?;
            match status.state.as_str() {
                "DONE" => return Ok(()),
                "ERROR" => anyhow::bail!(
                    "query job {} failed: {}",
                    job_id,
                    status.error.unwrap_or_else(|| "unknown engine error".into())
                ),
                "PENDING" | "RUNNING" => tokio::time::sleep(self.poll_interval).await,
                other => anyhow::bail!("query job {} reported unknown state '{}'", job_id, other),
            }
        }
    }

    async fn fetch_rows(&self, job_id: &str) -> anyhow::Result<Vec<Value>> {
        let url = format!("{}/v1/jobs/{}/rows", self.base, job_id);
        let rows: Vec<Value> = self
            .authed(self.client.get(&url))
            .send()
            .await
            .context("fetching result rows")?
            .error_for_status()
            .context("result row request rejected")?
            .json()
            .await
            .context("decoding result rows")?;
        debug!("Fetched {} row(s) for job {}", rows.len(), job_id);
        Ok(rows)
    }
}
