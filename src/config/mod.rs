// src/config/mod.rs
//! Service configuration: `config/app.toml` (or $APP_CONFIG_PATH) with env overrides.

pub mod ai;

use anyhow::{Context, Result};
use serde::Deserialize;
use std::fs;
use std::path::{Path, PathBuf};

use crate::scoring::DEFAULT_THRESHOLD;

pub const ENV_APP_CONFIG_PATH: &str = "APP_CONFIG_PATH";
pub const DEFAULT_APP_CONFIG_PATH: &str = "config/app.toml";

pub const ENV_SNAPSHOT_DIR: &str = "SNAPSHOT_DIR";
pub const ENV_SCORE_THRESHOLD: &str = "SCORE_THRESHOLD";
pub const ENV_PIPELINE_CONCURRENCY: &str = "PIPELINE_CONCURRENCY";

fn default_store_dir() -> PathBuf {
    PathBuf::from("data")
}
fn default_threshold() -> i64 {
    DEFAULT_THRESHOLD
}
fn default_concurrency() -> usize {
    1
}
fn default_fetch_timeout_secs() -> u64 {
    30
}

#[derive(Debug, Clone, Deserialize)]
pub struct AppConfig {
    #[serde(default = "default_store_dir")]
    pub store_dir: PathBuf,
    /// Used when a filter request carries no threshold.
    #[serde(default = "default_threshold")]
    pub default_threshold: i64,
    /// URL pipelines in flight at once; 1 = sequential.
    #[serde(default = "default_concurrency")]
    pub concurrency: usize,
    #[serde(default = "default_fetch_timeout_secs")]
    pub fetch_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            store_dir: default_store_dir(),
            default_threshold: default_threshold(),
            concurrency: default_concurrency(),
            fetch_timeout_secs: default_fetch_timeout_secs(),
        }
    }
}

impl AppConfig {
    pub fn from_toml_str(s: &str) -> Result<Self> {
        Ok(toml::from_str(s)?)
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        let content = fs::read_to_string(path)
            .with_context(|| format!("reading app config from {}", path.display()))?;
        Self::from_toml_str(&content)
            .with_context(|| format!("parsing app config {}", path.display()))
    }

    /// 1) $APP_CONFIG_PATH (must exist)
    /// 2) config/app.toml
    /// 3) defaults
    ///
    /// Then env overrides: SNAPSHOT_DIR, SCORE_THRESHOLD, PIPELINE_CONCURRENCY.
    pub fn load_default() -> Result<Self> {
        let mut cfg = if let Ok(p) = std::env::var(ENV_APP_CONFIG_PATH) {
            Self::load_from(&PathBuf::from(p))?
        } else {
            let p = PathBuf::from(DEFAULT_APP_CONFIG_PATH);
            if p.exists() {
                Self::load_from(&p)?
            } else {
                Self::default()
            }
        };
        cfg.apply_env();
        Ok(cfg)
    }

    fn apply_env(&mut self) {
        if let Ok(dir) = std::env::var(ENV_SNAPSHOT_DIR) {
            if !dir.trim().is_empty() {
                self.store_dir = PathBuf::from(dir.trim());
            }
        }
        if let Some(t) = parse_env::<i64>(ENV_SCORE_THRESHOLD) {
            self.default_threshold = t;
        }
        if let Some(n) = parse_env::<usize>(ENV_PIPELINE_CONCURRENCY) {
            self.concurrency = n.max(1);
        }
        self.concurrency = self.concurrency.max(1);
    }
}

fn parse_env<T: std::str::FromStr>(name: &str) -> Option<T> {
    std::env::var(name).ok().and_then(|s| s.trim().parse().ok())
}
