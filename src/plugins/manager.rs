//! Plugin dependency resolution and installation
//!
//! `check_dependencies` guarantees that every required plugin, and every
//! plugin those require transitively, is installed before a build runs.
//! Top-level requirements install strictly in order (a failure halts the
//! installs queued behind it deterministically); transitive dependencies
//! of a single package fan out in parallel, mirroring the crawler's use
//! of the same primitive over a dependency graph instead of a directory
//! tree.

use futures::future::BoxFuture;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use tracing::{error, info};

use crate::core::errors::{ForgeError, Result};
use crate::core::events::{EventSink, ForgeEvent};
use crate::core::scheduler::{noop_stage, parallel, pipeline, Stage};
use crate::crawler::FsCrawler;
use crate::plugins::manifest::{InstallSpec, PackageInstaller, PluginManifest};
use crate::plugins::registry::PluginRegistry;

/// Owns the install root, the enabled-plugin registry, and the installer
/// collaborator.
pub struct PluginManager {
    install_root: PathBuf,
    registry: Arc<PluginRegistry>,
    installer: Arc<dyn PackageInstaller>,
    events: Arc<dyn EventSink>,
    crawler: FsCrawler,
    stopped: AtomicBool,
}

impl PluginManager {
    /// Create a manager rooted at `install_root`, creating the directory
    /// and seeding the registry file on first run.
    pub async fn new(
        install_root: impl Into<PathBuf>,
        installer: Arc<dyn PackageInstaller>,
        events: Arc<dyn EventSink>,
    ) -> Result<Arc<Self>> {
        let install_root = install_root.into();
        tokio::fs::create_dir_all(&install_root)
            .await
            .map_err(|err| ForgeError::io("create plugin install root", err))?;
        let registry = Arc::new(PluginRegistry::open(install_root.join("plugins.json")).await?);
        Ok(Arc::new(Self {
            install_root,
            registry,
            installer,
            events,
            crawler: FsCrawler::new(),
            stopped: AtomicBool::new(false),
        }))
    }

    pub fn registry(&self) -> &Arc<PluginRegistry> {
        &self.registry
    }

    pub fn events(&self) -> &Arc<dyn EventSink> {
        &self.events
    }

    pub fn install_root(&self) -> &Path {
        &self.install_root
    }

    /// Directory a named plugin package lives in once installed.
    pub fn plugin_dir(&self, name: &str) -> PathBuf {
        self.install_root.join(name)
    }

    /// Names installed on disk: the immediate subdirectories of the
    /// install root.
    pub async fn installed(&self) -> Vec<String> {
        let result = self.crawler.crawl(&self.install_root, &[]).await;
        result
            .directories
            .iter()
            .filter_map(|dir| dir.file_name().and_then(|name| name.to_str()))
            .map(String::from)
            .collect()
    }

    /// Ensure every name in `required` is installed, transitively, before
    /// returning. Already-installed names become no-op stages; missing
    /// ones install strictly in the order given. The first failure emits
    /// a single fatal `AllStop(-1)` and aborts the remaining stages.
    pub async fn check_dependencies(self: Arc<Self>, required: &[String]) -> Result<()> {
        info!("checking for {} build dependencies", required.len());
        let installed = self.installed().await;
        let mut stages: Vec<Stage<()>> = Vec::with_capacity(required.len());
        for dependency in required {
            if installed.iter().any(|name| name == dependency) {
                stages.push(noop_stage());
                continue;
            }
            let manager = Arc::clone(&self);
            let dependency = dependency.clone();
            stages.push(Box::new(move |_| {
                Box::pin(async move {
                    match Arc::clone(&manager).install(dependency.clone()).await {
                        Ok(_) => Ok(()),
                        Err(err) => {
                            error!(
                                "Fatal: could not install missing build dependency {}: {}",
                                dependency, err
                            );
                            manager.emit_stop(-1);
                            Err(err)
                        }
                    }
                })
            }));
        }
        pipeline((), stages).await?;
        Ok(())
    }

    /// Install one plugin and, in parallel, every missing plugin it
    /// transitively requires. The registry gains the canonical name only
    /// after the installer reports success; a failed install leaves the
    /// registry untouched and is reported upward unretried.
    pub fn install(self: Arc<Self>, raw: String) -> BoxFuture<'static, Result<PluginManifest>> {
        Box::pin(async move {
            let spec = InstallSpec::parse(&raw).await;
            let real_name = spec.canonical_name().await?;
            info!("Installing plugin: {}", real_name);

            let manifest = self
                .installer
                .install(&spec, &self.install_root)
                .await
                .map_err(|err| {
                    error!("Installation of '{}' has failed: {}", real_name, err);
                    err
                })?;
            info!(
                "Installation of '{}' completed successfully.",
                manifest.name
            );
            self.registry.add(&manifest.name).await?;

            if !manifest.required_plugins.is_empty() {
                let installed = self.installed().await;
                let missing: Vec<String> = manifest
                    .required_plugins
                    .iter()
                    .filter(|dep| !installed.iter().any(|name| name == *dep))
                    .cloned()
                    .collect();
                if !missing.is_empty() {
                    let results = parallel(missing, {
                        let manager = Arc::clone(&self);
                        move |dep| Arc::clone(&manager).install(dep)
                    })
                    .await;
                    for result in results {
                        result?;
                    }
                }
            }

            Ok(manifest)
        })
    }

    /// Remove an installed plugin and its registry entry.
    pub async fn uninstall(&self, name: &str) -> Result<()> {
        info!("Uninstalling plugin: {}", name);
        self.installer
            .uninstall(name, &self.install_root)
            .await
            .map_err(|err| {
                error!("Uninstallation of '{}' has failed: {}", name, err);
                err
            })?;
        self.registry.remove(name).await?;
        info!("Uninstallation of '{}' completed successfully.", name);
        Ok(())
    }

    /// Enable an installed plugin for the build. Fails without touching
    /// the registry when the package is not installed on disk.
    pub async fn enable(&self, name: &str) -> Result<()> {
        let installed = self.installed().await;
        if !installed.iter().any(|entry| entry == name) {
            error!("Can't enable plugin '{}'. It is not installed.", name);
            return Err(ForgeError::not_installed(name));
        }
        self.registry.add(name).await?;
        info!("Plugin '{}' is enabled", name);
        Ok(())
    }

    /// Disable an enabled plugin. Returns whether a registry entry was
    /// actually removed.
    pub async fn disable(&self, name: &str) -> Result<bool> {
        let removed = self.registry.remove(name).await?;
        if removed {
            info!("Plugin '{}' is disabled", name);
        } else {
            error!("Disabling plugin '{}' failed", name);
        }
        Ok(removed)
    }

    /// Log and return the installed plugin list.
    pub async fn list(&self) -> Vec<String> {
        info!("Plugin list:");
        let plugins = self.installed().await;
        for plugin in &plugins {
            info!("  {}", plugin);
        }
        plugins
    }

    /// Broadcast the fatal stop signal. Latched: fires at most once per
    /// manager even when parallel branches race to report failure.
    pub fn emit_stop(&self, exit_code: i32) {
        if !self.stopped.swap(true, Ordering::SeqCst) {
            self.events.emit(&ForgeEvent::AllStop { exit_code });
        }
    }
}
