// src/ingest/fetch.rs
use std::time::Duration;

use async_trait::async_trait;
use serde::Serialize;

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(tag = "status", rename_all = "snake_case")]
pub enum FetchOutcome {
    Page { url: String, markup: String },
    Failed { url: String, error: String },
}

/// Retrieves one page. Failures are reported in the outcome, never as `Err`.
#[async_trait]
pub trait Fetcher: Send + Sync {
    async fn fetch(&self, url: &str) -> FetchOutcome;
    fn name(&self) -> &'static str;
}

/// Plain GET with a whole-request timeout. No retries.
pub struct HttpFetcher {
    client: reqwest::Client,
}

impl HttpFetcher {
    pub fn new(timeout: Duration) -> anyhow::Result<Self> {
        let client = reqwest::Client::builder()
            .user_agent("Mozilla/5.0 (compatible; aura-intel/0.1)")
            .connect_timeout(Duration::from_secs(10))
            .timeout(timeout)
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl Fetcher for HttpFetcher {
    async fn fetch(&self, url: &str) -> FetchOutcome {
        let failed = |error: String| FetchOutcome::Failed {
            url: url.to_string(),
            error,
        };

        let resp = match self.client.get(url).send().await {
            Ok(r) => r,
            Err(e) => {
                tracing::warn!(target: "ingest", error = ?e, %url, "fetch error");
                return failed(e.to_string());
            }
        };
        if let Err(e) = resp.error_for_status_ref() {
            return failed(e.to_string());
        }
        match resp.text().await {
            Ok(markup) => FetchOutcome::Page {
                url: url.to_string(),
                markup,
            },
            Err(e) => failed(format!("reading body: {e}")),
        }
    }

    fn name(&self) -> &'static str {
        "http"
    }
}
