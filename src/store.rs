// src/store.rs
//! Snapshot store: whole-value blobs under fixed logical names. A missing name means
//! "not computed yet". No locking; concurrent writers race and the last write wins.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use anyhow::{Context, Result};
use async_trait::async_trait;
use serde::{de::DeserializeOwned, Serialize};

pub const PROFILE_SNAPSHOT: &str = "user_profile";
pub const ANALYSIS_SNAPSHOT: &str = "analysis_results";
pub const FILTERED_SNAPSHOT: &str = "final_results";

#[async_trait]
pub trait SnapshotStore: Send + Sync {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>>;
    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<()>;
}

pub type DynStore = Arc<dyn SnapshotStore>;

pub async fn load_json<T: DeserializeOwned>(store: &dyn SnapshotStore, name: &str) -> Result<Option<T>> {
    match store.read(name).await? {
        Some(bytes) => {
            let v = serde_json::from_slice(&bytes)
                .with_context(|| format!("decoding snapshot `{name}`"))?;
            Ok(Some(v))
        }
        None => Ok(None),
    }
}

pub async fn save_json<T: Serialize + ?Sized>(store: &dyn SnapshotStore, name: &str, value: &T) -> Result<()> {
    let bytes = serde_json::to_vec_pretty(value)
        .with_context(|| format!("encoding snapshot `{name}`"))?;
    store.write(name, bytes).await
}

/// `<dir>/<name>.json`, written via tmp file + rename.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }

    fn path_for(&self, name: &str) -> PathBuf {
        self.dir.join(format!("{name}.json"))
    }
}

#[async_trait]
impl SnapshotStore for FileStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let path = self.path_for(name);
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(e) => Err(e).with_context(|| format!("reading snapshot {}", path.display())),
        }
    }

    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        tokio::fs::create_dir_all(&self.dir)
            .await
            .with_context(|| format!("creating snapshot dir {}", self.dir.display()))?;
        let path = self.path_for(name);
        let tmp = path.with_extension("json.tmp");
        tokio::fs::write(&tmp, &bytes)
            .await
            .with_context(|| format!("writing {}", tmp.display()))?;
        tokio::fs::rename(&tmp, &path)
            .await
            .with_context(|| format!("replacing snapshot {}", path.display()))?;
        Ok(())
    }
}

#[derive(Default)]
pub struct MemoryStore {
    inner: Mutex<HashMap<String, Vec<u8>>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl SnapshotStore for MemoryStore {
    async fn read(&self, name: &str) -> Result<Option<Vec<u8>>> {
        let g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        Ok(g.get(name).cloned())
    }

    async fn write(&self, name: &str, bytes: Vec<u8>) -> Result<()> {
        let mut g = self.inner.lock().unwrap_or_else(|p| p.into_inner());
        g.insert(name.to_string(), bytes);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn memory_store_round_trips_json() {
        let store = MemoryStore::new();
        assert!(load_json::<serde_json::Value>(&store, "x").await.unwrap().is_none());
        save_json(&store, "x", &json!({ "a": 1 })).await.unwrap();
        let v: serde_json::Value = load_json(&store, "x").await.unwrap().unwrap();
        assert_eq!(v, json!({ "a": 1 }));
    }
}
