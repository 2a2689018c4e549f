//! AURA financial intelligence service binary entrypoint.
//! Boots the Axum HTTP server, wiring config, shared state, and the metrics endpoint.

use anyhow::Context;
use aura_intel::config::ai::AiConfig;
use aura_intel::config::AppConfig;
use aura_intel::metrics::Metrics;
use aura_intel::{router, AppState};
use shuttle_axum::ShuttleAxum;
use tracing_subscriber::{fmt, prelude::*, EnvFilter};

/// Enable compact tracing logs in development only.
/// Activation requires BOTH:
///   - dev environment (debug build OR SHUTTLE_ENV in {local, development, dev})
///   - PIPELINE_DEV_LOG=1
fn enable_dev_tracing() {
    let dev_flag = std::env::var("PIPELINE_DEV_LOG")
        .ok()
        .is_some_and(|v| v == "1");

    let is_dev_env = cfg!(debug_assertions)
        || matches!(
            std::env::var("SHUTTLE_ENV")
                .unwrap_or_default()
                .to_ascii_lowercase()
                .as_str(),
            "local" | "development" | "dev"
        );

    if !(dev_flag && is_dev_env) {
        return;
    }

    let filter = EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| EnvFilter::new("ingest=info,analyze=info,aura_intel=info,warn"));

    // Shuttle may already have installed a subscriber; keep whichever came first.
    let _ = tracing_subscriber::registry()
        .with(filter)
        .with(fmt::layer().compact())
        .try_init();
}

#[shuttle_runtime::main]
async fn axum() -> ShuttleAxum {
    // Load .env in local/dev; no-op in prod environments.
    let _ = dotenvy::dotenv();

    enable_dev_tracing();

    let app_cfg = AppConfig::load_default().context("loading app config")?;
    let ai_cfg = AiConfig::load_default().context("loading ai config")?;
    let state = AppState::from_config(&app_cfg, &ai_cfg)?;

    let metrics = Metrics::init().context("installing prometheus recorder")?;
    let app = router(state).merge(metrics.router());

    Ok(app.into())
}
