// src/api.rs
//! HTTP surface: thin mapping from REST endpoints onto the pipeline and the snapshot store.

use std::sync::Arc;
use std::time::Duration;

use axum::{
    body::Bytes,
    extract::State,
    routing::{get, post},
    Json, Router,
};
use serde::{Deserialize, Deserializer};
use serde_json::{json, Number, Value};
use tower_http::cors::CorsLayer;
use tracing::info;

use crate::analyze::completion::build_completion_client;
use crate::analyze::{AnalysisRecord, Category, DynCompletion};
use crate::config::ai::AiConfig;
use crate::config::AppConfig;
use crate::errors::{ApiError, ApiResult};
use crate::ingest::{run_analysis, DynFetcher, HttpFetcher};
use crate::profile::UserProfile;
use crate::scoring::{aggregate, filter_results, FilteredResult, DEFAULT_THRESHOLD};
use crate::store::{
    load_json, save_json, DynStore, FileStore, ANALYSIS_SNAPSHOT, FILTERED_SNAPSHOT,
    PROFILE_SNAPSHOT,
};
use crate::targets::{self, Targets};

#[derive(Clone)]
pub struct AppState {
    pub store: DynStore,
    pub fetcher: DynFetcher,
    /// `None` when no credentials are configured; analysis endpoints answer 503.
    pub completion: Option<DynCompletion>,
    pub default_threshold: i64,
    pub concurrency: usize,
}

impl AppState {
    pub fn new(store: DynStore, fetcher: DynFetcher, completion: Option<DynCompletion>) -> Self {
        Self {
            store,
            fetcher,
            completion,
            default_threshold: DEFAULT_THRESHOLD,
            concurrency: 1,
        }
    }

    pub fn from_config(app: &AppConfig, ai: &AiConfig) -> anyhow::Result<Self> {
        let fetcher = HttpFetcher::new(Duration::from_secs(app.fetch_timeout_secs))?;
        let completion = build_completion_client(ai);
        info!(
            store_dir = %app.store_dir.display(),
            concurrency = app.concurrency,
            completion = completion.as_ref().map(|c| c.provider_name()).unwrap_or("none"),
            "app state ready"
        );
        Ok(Self {
            store: Arc::new(FileStore::new(app.store_dir.clone())),
            fetcher: Arc::new(fetcher),
            completion,
            default_threshold: app.default_threshold,
            concurrency: app.concurrency.max(1),
        })
    }
}

pub fn router(state: AppState) -> Router {
    Router::new()
        .route("/api/health", get(health))
        .route("/api/user/profile", get(get_profile).post(update_profile))
        .route("/api/intelligence/analyze", post(analyze))
        .route("/api/intelligence/results", get(intelligence_results))
        .route("/api/intelligence/full-analysis", post(full_analysis))
        .route("/api/scoring/filter", post(scoring_filter))
        .route("/api/scoring/results", get(scoring_results))
        .route("/api/news/personalized", get(personalized_news))
        .route("/api/opportunities/personalized", get(personalized_opportunities))
        .route("/api/threats/personalized", get(personalized_threats))
        .layer(CorsLayer::very_permissive())
        .with_state(state)
}

/// Optional body shared by the pipeline-triggering endpoints.
#[derive(Debug, Default, Deserialize)]
struct RunRequest {
    #[serde(default)]
    user_profile: Option<Value>,
    #[serde(default, deserialize_with = "integral_threshold")]
    threshold: Option<i64>,
}

/// Any JSON number with an integral value (`2`, `2.0`); `2.5` is rejected.
fn integral_threshold<'de, D: Deserializer<'de>>(d: D) -> Result<Option<i64>, D::Error> {
    let Some(n) = Option::<Number>::deserialize(d)? else {
        return Ok(None);
    };
    if let Some(i) = n.as_i64() {
        return Ok(Some(i));
    }
    match n.as_f64() {
        Some(f) if f.fract() == 0.0 && f >= i64::MIN as f64 && f <= i64::MAX as f64 => {
            Ok(Some(f as i64))
        }
        _ => Err(serde::de::Error::custom(format!(
            "threshold must be an integer, got {n}"
        ))),
    }
}

fn parse_run_request(body: &Bytes) -> ApiResult<RunRequest> {
    if body.iter().all(u8::is_ascii_whitespace) {
        return Ok(RunRequest::default());
    }
    let v: Value =
        serde_json::from_slice(body).map_err(|e| ApiError::BadRequest(e.to_string()))?;
    if v.is_null() {
        return Ok(RunRequest::default());
    }
    serde_json::from_value(v).map_err(|e| ApiError::BadRequest(e.to_string()))
}

/// Request profile if given and non-empty, else the stored one.
async fn resolve_profile(state: &AppState, supplied: Option<Value>) -> ApiResult<UserProfile> {
    match supplied {
        Some(Value::Object(m)) if !m.is_empty() => return Ok(UserProfile::new(m)),
        None | Some(Value::Null) | Some(Value::Object(_)) => {}
        Some(_) => {
            return Err(ApiError::BadRequest(
                "user_profile must be a JSON object".to_string(),
            ))
        }
    }
    load_json::<UserProfile>(state.store.as_ref(), PROFILE_SNAPSHOT)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No user profile found. POST /api/user/profile first.".to_string())
        })
}

fn require_completion(state: &AppState) -> ApiResult<DynCompletion> {
    state.completion.clone().ok_or_else(|| {
        ApiError::ServiceUnavailable("completion service not configured (GEMINI_API_KEY)".to_string())
    })
}

async fn analyze_step(
    state: &AppState,
    completion: DynCompletion,
    profile: &UserProfile,
) -> ApiResult<(Targets, Vec<AnalysisRecord>)> {
    let targets = targets::resolve(profile);
    info!(target: "ingest", urls = ?targets.urls, "analysis run started");
    let records = run_analysis(
        state.fetcher.clone(),
        completion,
        profile,
        &targets.urls,
        state.concurrency,
    )
    .await;
    Ok((targets, records))
}

async fn filter_step(
    state: &AppState,
    records: &mut [AnalysisRecord],
    profile: &UserProfile,
    threshold: i64,
) -> ApiResult<Vec<FilteredResult>> {
    let filtered = filter_results(records, profile, threshold);
    save_json(state.store.as_ref(), FILTERED_SNAPSHOT, &filtered).await?;
    Ok(filtered)
}

async fn health(State(state): State<AppState>) -> Json<Value> {
    Json(json!({
        "status": "healthy",
        "message": "AURA financial intelligence API is running",
        "completion_configured": state.completion.is_some(),
    }))
}

async fn get_profile(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let profile = resolve_profile(&state, None).await?;
    Ok(Json(json!({ "success": true, "data": profile })))
}

async fn update_profile(
    State(state): State<AppState>,
    Json(body): Json<Value>,
) -> ApiResult<Json<Value>> {
    let Value::Object(fields) = body else {
        return Err(ApiError::BadRequest(
            "profile must be a JSON object".to_string(),
        ));
    };
    save_json(state.store.as_ref(), PROFILE_SNAPSHOT, &UserProfile::new(fields)).await?;
    Ok(Json(json!({
        "success": true,
        "message": "Profile updated successfully",
    })))
}

async fn analyze(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let completion = require_completion(&state)?;
    let req = parse_run_request(&body)?;
    let profile = resolve_profile(&state, req.user_profile).await?;

    let (targets, records) = analyze_step(&state, completion, &profile).await?;
    save_json(state.store.as_ref(), ANALYSIS_SNAPSHOT, &records).await?;
    Ok(Json(json!({
        "success": true,
        "data": records,
        "target_urls": targets.urls,
        "keywords": targets.taxonomy,
        "timestamp": chrono::Utc::now().to_rfc3339(),
    })))
}

async fn intelligence_results(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = load_json::<Value>(state.store.as_ref(), ANALYSIS_SNAPSHOT)
        .await?
        .ok_or_else(no_analysis)?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn scoring_filter(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let req = parse_run_request(&body)?;
    let profile = resolve_profile(&state, req.user_profile).await?;
    let threshold = req.threshold.unwrap_or(state.default_threshold);

    let mut records = load_json::<Vec<AnalysisRecord>>(state.store.as_ref(), ANALYSIS_SNAPSHOT)
        .await?
        .ok_or_else(no_analysis)?;
    let filtered = filter_step(&state, &mut records, &profile, threshold).await?;
    Ok(Json(json!({
        "success": true,
        "data": filtered,
        "threshold": threshold,
    })))
}

async fn scoring_results(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    let data = load_json::<Value>(state.store.as_ref(), FILTERED_SNAPSHOT)
        .await?
        .ok_or_else(|| {
            ApiError::NotFound("No scoring results found. Run /api/scoring/filter first.".to_string())
        })?;
    Ok(Json(json!({ "success": true, "data": data })))
}

async fn full_analysis(State(state): State<AppState>, body: Bytes) -> ApiResult<Json<Value>> {
    let completion = require_completion(&state)?;
    let req = parse_run_request(&body)?;
    let profile = resolve_profile(&state, req.user_profile).await?;
    let threshold = req.threshold.unwrap_or(state.default_threshold);

    let (targets, mut records) = analyze_step(&state, completion, &profile).await?;
    let filtered = filter_step(&state, &mut records, &profile, threshold).await?;
    // raw records now carry the scores of their kept items
    save_json(state.store.as_ref(), ANALYSIS_SNAPSHOT, &records).await?;
    Ok(Json(json!({
        "success": true,
        "data": {
            "raw_analysis": records,
            "filtered_results": filtered,
        },
        "metadata": {
            "target_urls": targets.urls,
            "keywords": targets.taxonomy,
            "threshold": threshold,
        },
    })))
}

async fn personalized(state: &AppState, category: Category) -> ApiResult<Json<Value>> {
    let results = load_json::<Vec<FilteredResult>>(state.store.as_ref(), FILTERED_SNAPSHOT)
        .await?
        .ok_or_else(|| ApiError::NotFound("No results found. Run analysis first.".to_string()))?;
    let items = aggregate(&results, category);
    Ok(Json(json!({
        "success": true,
        "count": items.len(),
        "data": items,
    })))
}

async fn personalized_news(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    personalized(&state, Category::News).await
}

async fn personalized_opportunities(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    personalized(&state, Category::Opportunities).await
}

async fn personalized_threats(State(state): State<AppState>) -> ApiResult<Json<Value>> {
    personalized(&state, Category::Threats).await
}

fn no_analysis() -> ApiError {
    ApiError::NotFound("No analysis results found. Run /api/intelligence/analyze first.".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_or_null_body_is_default_request() {
        let r = parse_run_request(&Bytes::from_static(b"  ")).unwrap();
        assert!(r.user_profile.is_none() && r.threshold.is_none());
        let r = parse_run_request(&Bytes::from_static(b"null")).unwrap();
        assert!(r.threshold.is_none());
    }

    #[test]
    fn threshold_is_read_from_body() {
        let r = parse_run_request(&Bytes::from_static(br#"{"threshold": 3}"#)).unwrap();
        assert_eq!(r.threshold, Some(3));
        assert!(parse_run_request(&Bytes::from_static(b"{oops")).is_err());
    }

    #[test]
    fn integral_float_threshold_is_accepted() {
        let r = parse_run_request(&Bytes::from_static(br#"{"threshold": 2.0}"#)).unwrap();
        assert_eq!(r.threshold, Some(2));
        let r = parse_run_request(&Bytes::from_static(br#"{"threshold": null}"#)).unwrap();
        assert!(r.threshold.is_none());
        let err = parse_run_request(&Bytes::from_static(br#"{"threshold": 1.5}"#));
        assert!(matches!(err, Err(ApiError::BadRequest(_))));
        assert!(parse_run_request(&Bytes::from_static(br#"{"threshold": "1"}"#)).is_err());
    }
}
