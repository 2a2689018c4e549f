// src/config/ai.rs
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use std::{env, fs};

pub const ENV_AI_CONFIG_PATH: &str = "AI_CONFIG_PATH";
pub const DEFAULT_AI_CONFIG_PATH: &str = "config/ai.json";
pub const ENV_GEMINI_API_KEY: &str = "GEMINI_API_KEY";

fn default_enabled() -> bool {
    true
}
fn default_provider() -> String {
    "gemini".to_string()
}
fn default_model() -> String {
    "gemini-pro-latest".to_string()
}
fn default_api_key() -> String {
    "ENV".to_string()
}
fn default_daily_limit() -> u32 {
    200
}
fn default_cache_dir() -> PathBuf {
    PathBuf::from("cache/completions")
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AiConfig {
    #[serde(default = "default_enabled")]
    pub enabled: bool,
    /// "gemini" (case-insensitive)
    #[serde(default = "default_provider")]
    pub provider: String,
    #[serde(default = "default_model")]
    pub model: String,
    /// "ENV" means: read from GEMINI_API_KEY. Empty after resolution = not configured.
    #[serde(default = "default_api_key")]
    pub api_key: String,
    /// Real (non-cached) completion calls allowed per UTC day.
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,
    #[serde(default = "default_cache_dir")]
    pub cache_dir: PathBuf,
}

impl Default for AiConfig {
    fn default() -> Self {
        Self {
            enabled: default_enabled(),
            provider: default_provider(),
            model: default_model(),
            api_key: default_api_key(),
            daily_limit: default_daily_limit(),
            cache_dir: default_cache_dir(),
        }
    }
}

impl AiConfig {
    pub fn load_from_file<P: AsRef<Path>>(path: P) -> anyhow::Result<Self> {
        let path = path.as_ref();
        let data = fs::read_to_string(path)
            .with_context(|| format!("reading ai config from {}", path.display()))?;
        let cfg: AiConfig = serde_json::from_str(&data)
            .with_context(|| format!("parsing ai config {}", path.display()))?;
        cfg.resolved()
    }

    /// 1) $AI_CONFIG_PATH (must exist)
    /// 2) config/ai.json
    /// 3) built-in defaults (key from GEMINI_API_KEY)
    pub fn load_default() -> anyhow::Result<Self> {
        if let Ok(p) = env::var(ENV_AI_CONFIG_PATH) {
            return Self::load_from_file(PathBuf::from(p));
        }
        let p = PathBuf::from(DEFAULT_AI_CONFIG_PATH);
        if p.exists() {
            return Self::load_from_file(&p);
        }
        Self::default().resolved()
    }

    /// Normalize provider and resolve an "ENV" key. A missing env var is not an error here;
    /// it leaves the key empty so callers can report the service as unconfigured.
    pub fn resolved(mut self) -> anyhow::Result<Self> {
        self.provider = self.provider.trim().to_lowercase();
        if self.api_key.trim().eq_ignore_ascii_case("env") {
            self.api_key = match self.provider.as_str() {
                "gemini" => env::var(ENV_GEMINI_API_KEY).unwrap_or_default(),
                other => anyhow::bail!("Unsupported provider in config: {other}"),
            };
        }
        self.api_key = self.api_key.trim().to_string();
        Ok(self)
    }

    pub fn api_key(&self) -> Option<&str> {
        if self.api_key.is_empty() {
            None
        } else {
            Some(&self.api_key)
        }
    }
}
