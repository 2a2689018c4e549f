// src/lib.rs
// Public library surface for integration tests (and potential reuse).

pub mod analyze;
pub mod api;
pub mod config;
pub mod errors;
pub mod extract;
pub mod ingest;
pub mod metrics;
pub mod profile;
pub mod scoring;
pub mod store;
pub mod targets;

// ---- Re-exports for stable public API ----
pub use crate::analyze::{AnalysisRecord, Category, Item};
pub use crate::api::{router, AppState};
pub use crate::extract::{extract, ExtractedContent};
pub use crate::profile::UserProfile;
pub use crate::scoring::{aggregate, filter_results, score_item, FilteredResult};
pub use crate::targets::{resolve, KeywordTaxonomy, Targets};

use tracing::info;

/// One-off smoke test of the configured completion service. Never panics; logs the outcome.
///
/// ```ignore
/// if let Err(e) = aura_intel::run_completion_probe().await {
///     tracing::warn!(error = ?e, "completion probe didn't run");
/// }
/// ```
pub async fn run_completion_probe() -> anyhow::Result<()> {
    let cfg = config::ai::AiConfig::load_default()?;
    let Some(client) = analyze::completion::build_completion_client(&cfg) else {
        tracing::warn!("completion probe skipped: service not configured");
        return Ok(());
    };
    let raw = client
        .complete("Reply with ```json {\"news\": [], \"opportunities\": [], \"threats\": []} ```")
        .await?;
    let parsed = analyze::parse(&raw);
    info!(
        provider = client.provider_name(),
        fallback = parsed.is_fallback(),
        "completion probe finished"
    );
    Ok(())
}
