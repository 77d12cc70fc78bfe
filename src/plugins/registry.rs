//! Persisted registry of enabled plugins
//!
//! The registry file is the single source of truth for which plugins are
//! *enabled* for a build, separate from which packages are *installed* on
//! disk. Every mutation rewrites the whole file; there are no partial
//! updates. All read-modify-write cycles are serialized through one
//! mutex, so concurrent installs cannot lose each other's additions.

use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tokio::sync::Mutex;
use tracing::debug;

use crate::core::errors::{ForgeError, Result};

/// Plugins every build gets out of the box; seeds the registry file on
/// first run.
pub const BUILTIN_PLUGINS: &[&str] = &[
    "forge.combiner",
    "forge.concat",
    "forge.headers",
    "forge.identify",
    "forge.output",
    "forge.plugin",
    "forge.token",
    "forge.transform",
    "forge.workset",
];

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
struct RegistryFile {
    list: Vec<String>,
}

/// In-process owner of the registry file.
pub struct PluginRegistry {
    path: PathBuf,
    lock: Mutex<()>,
}

impl PluginRegistry {
    /// Open the registry at `path`, creating and seeding it with the
    /// built-in plugin list if it does not exist yet.
    pub async fn open(path: impl Into<PathBuf>) -> Result<Self> {
        let path = path.into();
        if let Some(parent) = path.parent() {
            tokio::fs::create_dir_all(parent)
                .await
                .map_err(|err| ForgeError::io("create registry directory", err))?;
        }
        if tokio::fs::metadata(&path).await.is_err() {
            let seed = RegistryFile {
                list: BUILTIN_PLUGINS.iter().map(|name| name.to_string()).collect(),
            };
            // Seed is written compact; mutations rewrite pretty-printed.
            let json = serde_json::to_string(&seed)
                .map_err(|err| ForgeError::serialization("registry seed", err))?;
            tokio::fs::write(&path, json)
                .await
                .map_err(|err| ForgeError::io("seed registry file", err))?;
            debug!("seeded plugin registry at {}", path.display());
        }
        Ok(Self {
            path,
            lock: Mutex::new(()),
        })
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Names currently enabled. A missing or unreadable file reads as an
    /// empty list.
    pub async fn enabled(&self) -> Result<Vec<String>> {
        let _guard = self.lock.lock().await;
        Ok(self.read_list().await)
    }

    pub async fn contains(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        Ok(self.read_list().await.iter().any(|entry| entry == name))
    }

    /// Add `name` to the enabled set. Idempotent: adding a present name
    /// leaves the file untouched.
    pub async fn add(&self, name: &str) -> Result<()> {
        let _guard = self.lock.lock().await;
        let mut list = self.read_list().await;
        if list.iter().any(|entry| entry == name) {
            return Ok(());
        }
        list.push(name.to_string());
        self.write_list(list).await
    }

    /// Remove `name` from the enabled set. Returns whether a removal
    /// actually happened.
    pub async fn remove(&self, name: &str) -> Result<bool> {
        let _guard = self.lock.lock().await;
        let mut list = self.read_list().await;
        let before = list.len();
        list.retain(|entry| entry != name);
        if list.len() == before {
            return Ok(false);
        }
        self.write_list(list).await?;
        Ok(true)
    }

    async fn read_list(&self) -> Vec<String> {
        match tokio::fs::read_to_string(&self.path).await {
            Ok(json) => serde_json::from_str::<RegistryFile>(&json)
                .map(|file| file.list)
                .unwrap_or_default(),
            Err(_) => Vec::new(),
        }
    }

    async fn write_list(&self, list: Vec<String>) -> Result<()> {
        let json = serde_json::to_string_pretty(&RegistryFile { list })
            .map_err(|err| ForgeError::serialization("registry file", err))?;
        tokio::fs::write(&self.path, json)
            .await
            .map_err(|err| ForgeError::io("write registry file", err))
    }
}
