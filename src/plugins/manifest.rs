//! Package installer contract and plugin manifests

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::core::errors::{ForgeError, Result};

/// Manifest of an installed plugin package.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
pub struct PluginManifest {
    pub name: String,
    /// Transitive plugin dependencies declared by the package
    #[serde(default, rename = "requiredPlugins")]
    pub required_plugins: Vec<String>,
}

impl PluginManifest {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            required_plugins: Vec::new(),
        }
    }

    /// Read a manifest from a plugin package directory.
    pub async fn from_dir(dir: &Path) -> Result<Self> {
        let manifest_path = dir.join("package.json");
        let json = tokio::fs::read_to_string(&manifest_path)
            .await
            .map_err(|err| ForgeError::io("read package manifest", err))?;
        serde_json::from_str(&json).map_err(|err| ForgeError::serialization("package manifest", err))
    }
}

/// What the caller asked to install: a registry identifier, or a local
/// package directory.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InstallSpec {
    Registry(String),
    LocalPath(PathBuf),
}

impl InstallSpec {
    /// Classify a raw specifier. Anything that resolves to an existing
    /// path on disk is treated as a local package.
    pub async fn parse(raw: &str) -> Self {
        match tokio::fs::canonicalize(raw).await {
            Ok(path) => Self::LocalPath(path),
            Err(_) => Self::Registry(raw.to_string()),
        }
    }

    /// The canonical plugin name this spec installs: the registry
    /// identifier itself, or the name declared in a local package's
    /// manifest.
    pub async fn canonical_name(&self) -> Result<String> {
        match self {
            Self::Registry(name) => Ok(name.clone()),
            Self::LocalPath(path) => Ok(PluginManifest::from_dir(path).await?.name),
        }
    }
}

impl std::fmt::Display for InstallSpec {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Registry(name) => write!(f, "{}", name),
            Self::LocalPath(path) => write!(f, "{}", path.display()),
        }
    }
}

/// External package installer collaborator.
///
/// The install root is an explicit parameter on every call; the installer
/// must not depend on or mutate the process working directory.
#[async_trait]
pub trait PackageInstaller: Send + Sync {
    /// Install the package into `install_root` and return its manifest.
    async fn install(&self, spec: &InstallSpec, install_root: &Path) -> Result<PluginManifest>;

    /// Remove the named package from `install_root`.
    async fn uninstall(&self, name: &str, install_root: &Path) -> Result<()>;
}
