//! Completion-service abstraction: Gemini provider, mock, and a file cache + daily limit
//! wrapper. The pipeline only sees `DynCompletion`.

use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};
use std::time::Duration;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use sha2::{Digest, Sha256};
use thiserror::Error;
use tracing::{debug, warn};

use crate::config::ai::AiConfig;

pub const ENV_AI_TEST_MODE: &str = "AI_TEST_MODE";

const GEMINI_BASE: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[derive(Debug, Error)]
pub enum CompletionError {
    #[error("completion service request failed: {0}")]
    Http(String),
    #[error("completion service returned HTTP {0}")]
    Status(u16),
    #[error("completion service returned an unusable response: {0}")]
    BadResponse(String),
    #[error("daily completion limit of {0} calls reached")]
    DailyLimit(u32),
}

/// Opaque text-completion capability: prompt in, raw model text out.
#[async_trait]
pub trait CompletionService: Send + Sync {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError>;
    /// Provider name for diagnostics.
    fn provider_name(&self) -> &'static str;
}

pub type DynCompletion = Arc<dyn CompletionService>;

/// Build the client described by `config`.
///
/// * `AI_TEST_MODE=mock` → deterministic mock (no network, no cache).
/// * disabled, unknown provider, or no API key → `None` (analysis is unavailable).
/// * otherwise Gemini wrapped with the file cache and daily limit.
pub fn build_completion_client(config: &AiConfig) -> Option<DynCompletion> {
    if std::env::var(ENV_AI_TEST_MODE)
        .map(|v| v == "mock")
        .unwrap_or(false)
    {
        return Some(Arc::new(MockProvider::empty_analysis()));
    }

    if !config.enabled {
        return None;
    }

    match (config.provider.as_str(), config.api_key()) {
        ("gemini", Some(key)) => match GeminiProvider::new(key, &config.model) {
            Ok(provider) => Some(Arc::new(CachingClient::new(
                provider,
                config.cache_dir.clone(),
                config.daily_limit,
            ))),
            Err(e) => {
                warn!(error = ?e, "failed to build Gemini client");
                None
            }
        },
        _ => None,
    }
}

// ------------------------------------------------------------
// Providers
// ------------------------------------------------------------

/// Gemini `generateContent` REST call.
pub struct GeminiProvider {
    http: reqwest::Client,
    api_key: String,
    model: String,
}

impl GeminiProvider {
    pub fn new(api_key: &str, model: &str) -> anyhow::Result<Self> {
        let http = reqwest::Client::builder()
            .user_agent("aura-intel/0.1")
            .connect_timeout(Duration::from_secs(5))
            .timeout(Duration::from_secs(60))
            .build()?;
        Ok(Self {
            http,
            api_key: api_key.to_string(),
            model: model.to_string(),
        })
    }
}

#[async_trait]
impl CompletionService for GeminiProvider {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        #[derive(Serialize)]
        struct Part<'a> {
            text: &'a str,
        }
        #[derive(Serialize)]
        struct Content<'a> {
            parts: Vec<Part<'a>>,
        }
        #[derive(Serialize)]
        struct Req<'a> {
            contents: Vec<Content<'a>>,
        }
        #[derive(Deserialize)]
        struct Resp {
            #[serde(default)]
            candidates: Vec<Candidate>,
        }
        #[derive(Deserialize)]
        struct Candidate {
            content: Option<RespContent>,
        }
        #[derive(Deserialize)]
        struct RespContent {
            #[serde(default)]
            parts: Vec<RespPart>,
        }
        #[derive(Deserialize)]
        struct RespPart {
            #[serde(default)]
            text: String,
        }

        let req = Req {
            contents: vec![Content {
                parts: vec![Part { text: prompt }],
            }],
        };

        let resp = self
            .http
            .post(format!("{GEMINI_BASE}/{}:generateContent", self.model))
            .header("x-goog-api-key", &self.api_key)
            .json(&req)
            .send()
            .await
            .map_err(|e| CompletionError::Http(e.to_string()))?;

        let status = resp.status();
        if !status.is_success() {
            return Err(CompletionError::Status(status.as_u16()));
        }

        let body: Resp = resp
            .json()
            .await
            .map_err(|e| CompletionError::BadResponse(e.to_string()))?;
        let text: String = body
            .candidates
            .into_iter()
            .next()
            .and_then(|c| c.content)
            .map(|c| c.parts.into_iter().map(|p| p.text).collect())
            .unwrap_or_default();

        if text.trim().is_empty() {
            return Err(CompletionError::BadResponse("empty candidate".to_string()));
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        "gemini"
    }
}

/// Returns the same text for every prompt.
#[derive(Clone)]
pub struct MockProvider {
    pub fixed: String,
}

impl MockProvider {
    pub fn new(fixed: impl Into<String>) -> Self {
        Self {
            fixed: fixed.into(),
        }
    }

    /// A fenced, all-empty analysis answer.
    pub fn empty_analysis() -> Self {
        Self::new("```json\n{\"news\": [], \"opportunities\": [], \"threats\": []}\n```")
    }
}

#[async_trait]
impl CompletionService for MockProvider {
    async fn complete(&self, _prompt: &str) -> Result<String, CompletionError> {
        Ok(self.fixed.clone())
    }

    fn provider_name(&self) -> &'static str {
        "mock"
    }
}

// ------------------------------------------------------------
// Caching client wrapper (file cache + daily limit)
// ------------------------------------------------------------

/// Cache hits never count against the daily limit.
pub struct CachingClient<P: CompletionService> {
    inner: P,
    cache_dir: PathBuf,
    daily_limit_max: u32,
    counter: Mutex<DailyCounter>,
}

impl<P: CompletionService> CachingClient<P> {
    pub fn new(inner: P, cache_dir: PathBuf, daily_limit_max: u32) -> Self {
        let _ = fs::create_dir_all(&cache_dir); // best-effort
        let counter = Mutex::new(load_daily_counter(&cache_dir).unwrap_or_default());
        Self {
            inner,
            cache_dir,
            daily_limit_max,
            counter,
        }
    }

    /// Check the limit and take a slot under one lock, so parallel callers
    /// cannot overshoot it.
    fn try_reserve(&self) -> bool {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        if g.is_expired() {
            g.reset_to_today();
        }
        if g.count >= self.daily_limit_max {
            return false;
        }
        g.count = g.count.saturating_add(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
        true
    }

    /// Give a reserved slot back after a failed call.
    fn release(&self) {
        let mut g = self.counter.lock().unwrap_or_else(|p| p.into_inner());
        g.count = g.count.saturating_sub(1);
        let _ = save_daily_counter(&self.cache_dir, &g);
    }
}

#[async_trait]
impl<P: CompletionService> CompletionService for CachingClient<P> {
    async fn complete(&self, prompt: &str) -> Result<String, CompletionError> {
        let key = cache_key(prompt);
        if let Some(hit) = read_cache_file(&self.cache_dir, &key) {
            debug!(target: "analyze", %key, "completion cache hit");
            return Ok(hit.text);
        }

        if !self.try_reserve() {
            return Err(CompletionError::DailyLimit(self.daily_limit_max));
        }

        let text = match self.inner.complete(prompt).await {
            Ok(text) => text,
            Err(e) => {
                self.release();
                return Err(e);
            }
        };
        if let Err(e) = write_cache_file(&self.cache_dir, &key, &CachedCompletion { text: text.clone() }) {
            warn!(target: "analyze", error = ?e, "failed to write completion cache");
        }
        Ok(text)
    }

    fn provider_name(&self) -> &'static str {
        self.inner.provider_name()
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct CachedCompletion {
    text: String,
}

fn cache_key(prompt: &str) -> String {
    let digest = Sha256::digest(prompt.as_bytes());
    digest.iter().take(16).map(|b| format!("{b:02x}")).collect()
}

fn cache_path(dir: &Path, key: &str) -> PathBuf {
    dir.join(format!("{key}.json"))
}

fn read_cache_file(dir: &Path, key: &str) -> Option<CachedCompletion> {
    let s = fs::read_to_string(cache_path(dir, key)).ok()?;
    serde_json::from_str(&s).ok()
}

fn write_cache_file(dir: &Path, key: &str, value: &CachedCompletion) -> io::Result<()> {
    let path = cache_path(dir, key);
    let json = serde_json::to_string(value).map_err(io::Error::other)?;
    write_atomic(&path, json.as_bytes())
}

fn write_atomic(path: &Path, bytes: &[u8]) -> io::Result<()> {
    let tmp = path.with_extension("json.tmp");
    let mut f = fs::File::create(&tmp)?;
    f.write_all(bytes)?;
    fs::rename(tmp, path)
}

// ------------------------------------------------------------
// Daily counter helpers
// ------------------------------------------------------------

#[derive(Debug, Clone, Serialize, Deserialize)]
struct DailyCounter {
    date: String,
    count: u32,
}

impl Default for DailyCounter {
    fn default() -> Self {
        Self {
            date: today(),
            count: 0,
        }
    }
}

impl DailyCounter {
    fn is_expired(&self) -> bool {
        self.date != today()
    }
    fn reset_to_today(&mut self) {
        self.date = today();
        self.count = 0;
    }
}

fn today() -> String {
    chrono::Utc::now().date_naive().to_string()
}

fn counter_path(dir: &Path) -> PathBuf {
    dir.join("daily_count.json")
}

fn load_daily_counter(dir: &Path) -> io::Result<DailyCounter> {
    let s = fs::read_to_string(counter_path(dir))?;
    serde_json::from_str(&s).map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))
}

fn save_daily_counter(dir: &Path, dc: &DailyCounter) -> io::Result<()> {
    let s = serde_json::to_string(dc).map_err(io::Error::other)?;
    write_atomic(&counter_path(dir), s.as_bytes())
}
