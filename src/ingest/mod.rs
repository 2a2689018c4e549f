// src/ingest/mod.rs
//! Per-URL orchestration: fetch → extract → complete → parse, one record per target.
//! Page-level failures are recorded inline and never abort the run.

pub mod fetch;

use std::sync::Arc;

use metrics::{counter, describe_counter, describe_gauge, gauge};
use once_cell::sync::OnceCell;
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{info, warn};

use crate::analyze::prompt::build_prompt;
use crate::analyze::{parse, AnalysisRecord, CompletionService, DynCompletion};
use crate::extract::extract;
use crate::profile::UserProfile;

pub use crate::ingest::fetch::{FetchOutcome, Fetcher, HttpFetcher};

pub type DynFetcher = Arc<dyn Fetcher>;

pub const ENV_PIPELINE_DEV_LOG: &str = "PIPELINE_DEV_LOG";

/// One-time metrics registration (so series show up on /metrics).
fn ensure_metrics_described() {
    static ONCE: OnceCell<()> = OnceCell::new();
    ONCE.get_or_init(|| {
        describe_counter!("pipeline_pages_total", "Target URLs processed.");
        describe_counter!(
            "pipeline_fetch_failures_total",
            "Target URLs that could not be fetched."
        );
        describe_counter!(
            "pipeline_completion_failures_total",
            "Completion calls that failed."
        );
        describe_counter!(
            "pipeline_parse_fallbacks_total",
            "Model answers degraded to the empty analysis."
        );
        describe_gauge!(
            "pipeline_last_run_ts",
            "Unix ts when the analysis pipeline last ran."
        );
    });
}

// Dev logging gate: PIPELINE_DEV_LOG=1 AND dev env (debug or SHUTTLE_ENV in {local,development,dev})
pub(crate) fn dev_logging_enabled() -> bool {
    let on = std::env::var(ENV_PIPELINE_DEV_LOG).ok().as_deref() == Some("1");
    on && is_dev_env()
}

pub(crate) fn is_dev_env() -> bool {
    cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        )
}

/// 12 hex chars of SHA-256; page text is never logged raw.
pub(crate) fn anon_hash(text: &str) -> String {
    use sha2::{Digest, Sha256};
    let digest = Sha256::digest(text.as_bytes());
    digest.iter().take(6).map(|b| format!("{b:02x}")).collect()
}

/// Analyze one fetched page. Completion failures become an error record;
/// unparseable answers become empty categories.
pub async fn analyze_page(
    completion: &dyn CompletionService,
    profile: &UserProfile,
    url: &str,
    markup: &str,
) -> AnalysisRecord {
    let content = extract(markup);
    if dev_logging_enabled() {
        info!(
            target: "analyze",
            %url,
            id = %anon_hash(&content.text),
            chars = content.text.len(),
            "page extracted"
        );
    }

    let prompt = build_prompt(profile, &content.text);
    let raw = match completion.complete(&prompt).await {
        Ok(raw) => raw,
        Err(e) => {
            warn!(target: "analyze", error = %e, %url, provider = completion.provider_name(), "completion failed");
            counter!("pipeline_completion_failures_total").increment(1);
            return AnalysisRecord::failed(url, e.to_string());
        }
    };

    let parsed = parse(&raw);
    if parsed.is_fallback() {
        warn!(target: "analyze", %url, chars = raw.len(), "model answer not parseable, using empty analysis");
        counter!("pipeline_parse_fallbacks_total").increment(1);
    }
    AnalysisRecord::from_payload(url, content.title, parsed.into_payload())
}

async fn process_url(
    fetcher: &dyn Fetcher,
    completion: &dyn CompletionService,
    profile: &UserProfile,
    url: &str,
) -> AnalysisRecord {
    counter!("pipeline_pages_total").increment(1);
    match fetcher.fetch(url).await {
        FetchOutcome::Page { url, markup } => analyze_page(completion, profile, &url, &markup).await,
        FetchOutcome::Failed { url, error } => {
            warn!(target: "ingest", %url, %error, fetcher = fetcher.name(), "failed to fetch target");
            counter!("pipeline_fetch_failures_total").increment(1);
            AnalysisRecord::failed(url, error)
        }
    }
}

/// Run the pipeline over `urls`, returning one record per URL in URL order.
///
/// `concurrency <= 1` is strictly sequential: each URL's fetch and completion finish
/// before the next URL starts. Larger values run at most `concurrency` URL pipelines
/// at once.
pub async fn run_analysis(
    fetcher: DynFetcher,
    completion: DynCompletion,
    profile: &UserProfile,
    urls: &[String],
    concurrency: usize,
) -> Vec<AnalysisRecord> {
    ensure_metrics_described();

    let records = if concurrency <= 1 || urls.len() <= 1 {
        let mut out = Vec::with_capacity(urls.len());
        for url in urls {
            out.push(process_url(fetcher.as_ref(), completion.as_ref(), profile, url).await);
        }
        out
    } else {
        run_bounded(fetcher, completion, profile, urls, concurrency).await
    };

    gauge!("pipeline_last_run_ts").set(chrono::Utc::now().timestamp().max(0) as f64);
    info!(
        target: "ingest",
        urls = urls.len(),
        failed = records.iter().filter(|r| r.error.is_some()).count(),
        items = records.iter().map(|r| r.items.len()).sum::<usize>(),
        "analysis run finished"
    );
    records
}

async fn run_bounded(
    fetcher: DynFetcher,
    completion: DynCompletion,
    profile: &UserProfile,
    urls: &[String],
    concurrency: usize,
) -> Vec<AnalysisRecord> {
    let permits = Arc::new(Semaphore::new(concurrency));
    let profile = Arc::new(profile.clone());

    let mut set = JoinSet::new();
    for (idx, url) in urls.iter().cloned().enumerate() {
        let permits = permits.clone();
        let fetcher = fetcher.clone();
        let completion = completion.clone();
        let profile = profile.clone();
        set.spawn(async move {
            let _permit = permits.acquire_owned().await.ok();
            let rec = process_url(fetcher.as_ref(), completion.as_ref(), &profile, &url).await;
            (idx, rec)
        });
    }

    let mut slots: Vec<Option<AnalysisRecord>> = vec![None; urls.len()];
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((idx, rec)) => slots[idx] = Some(rec),
            Err(e) => warn!(target: "ingest", error = ?e, "url pipeline task failed"),
        }
    }

    slots
        .into_iter()
        .zip(urls)
        .map(|(slot, url)| {
            slot.unwrap_or_else(|| AnalysisRecord::failed(url.clone(), "analysis task aborted"))
        })
        .collect()
}
