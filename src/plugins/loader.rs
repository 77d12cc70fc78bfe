//! Capability-checked plugin instantiation
//!
//! Discovery hands over names; instantiation goes through a registered
//! [`PluginFactory`], so a loaded unit must satisfy the declared contract
//! at load time instead of being assumed to at runtime. An enabled name
//! that cannot be instantiated is self-healing: it is removed from the
//! registry for future runs, and the current run is stopped.

use async_trait::async_trait;
use dashmap::DashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, error, info, warn};

use crate::core::errors::Result;
use crate::core::events::ForgeEvent;
use crate::core::scheduler::{pipeline, Stage};
use crate::crawler::FsCrawler;
use crate::plugins::manager::PluginManager;

/// Minimal runtime contract a plugin must satisfy.
#[async_trait]
pub trait Plugin: Send + Sync {
    fn name(&self) -> String;

    /// Apply build configuration before the run. Default is a no-op.
    async fn configure(&mut self, _config: serde_json::Value) -> Result<()> {
        Ok(())
    }

    async fn run(&mut self) -> Result<()>;
}

/// Builds plugin instances for one named plugin.
#[async_trait]
pub trait PluginFactory: Send + Sync {
    fn name(&self) -> String;

    /// Instantiate the plugin from its installed package directory.
    async fn build(&self, install_dir: &Path) -> Result<Box<dyn Plugin>>;
}

/// Name-keyed registry of plugin factories.
#[derive(Clone, Default)]
pub struct FactoryRegistry {
    factories: Arc<DashMap<String, Arc<dyn PluginFactory>>>,
}

impl FactoryRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&self, factory: Arc<dyn PluginFactory>) {
        self.factories.insert(factory.name(), factory);
    }

    pub fn get(&self, name: &str) -> Option<Arc<dyn PluginFactory>> {
        self.factories.get(name).map(|entry| entry.value().clone())
    }

    pub fn contains(&self, name: &str) -> bool {
        self.factories.contains_key(name)
    }

    pub fn list(&self) -> Vec<String> {
        self.factories.iter().map(|entry| entry.key().clone()).collect()
    }
}

/// A successfully instantiated plugin.
pub struct LoadedPlugin {
    pub name: String,
    pub instance: Box<dyn Plugin>,
}

/// Turns enabled registry entries and discovered task directories into
/// running plugin instances.
pub struct PluginLoader {
    manager: Arc<PluginManager>,
    factories: FactoryRegistry,
    crawler: FsCrawler,
}

impl PluginLoader {
    pub fn new(manager: Arc<PluginManager>, factories: FactoryRegistry) -> Self {
        Self {
            manager,
            factories,
            crawler: FsCrawler::new(),
        }
    }

    pub fn factories(&self) -> &FactoryRegistry {
        &self.factories
    }

    /// Instantiate every enabled plugin. Each success emits
    /// `plugin.loaded`; each failure queues a registry removal. If any
    /// removals were queued they run as an ordered pipeline, after which
    /// the fatal stop fires - load failures are unrecoverable for the
    /// current run but corrected for future ones.
    pub async fn load_plugins(&self) -> Result<Vec<LoadedPlugin>> {
        info!("loading plugins");
        let enabled = self.manager.registry().enabled().await?;
        let mut loaded = Vec::new();
        let mut removals: Vec<Stage<()>> = Vec::new();

        for name in enabled {
            let install_dir = self.manager.plugin_dir(&name);
            match self.instantiate(&name, &install_dir).await {
                Ok(instance) => {
                    self.manager
                        .events()
                        .emit(&ForgeEvent::PluginLoaded { name: name.clone() });
                    debug!("loaded plugin {}", name);
                    loaded.push(LoadedPlugin { name, instance });
                }
                Err(err) => {
                    error!("Error loading plugin '{}': {}", name, err);
                    let registry = Arc::clone(self.manager.registry());
                    removals.push(Box::new(move |_| {
                        Box::pin(async move {
                            registry.remove(&name).await?;
                            info!("Plugin '{}' cannot be loaded and has been disabled", name);
                            Ok(())
                        })
                    }));
                }
            }
        }

        if !removals.is_empty() {
            pipeline((), removals).await?;
            self.manager.emit_stop(-1);
        }
        Ok(loaded)
    }

    /// Instantiate every task discovered under `task_root`. Tasks are not
    /// registry-managed; a task directory with no registered factory is
    /// skipped with a warning.
    pub async fn load_tasks(&self, task_root: impl Into<PathBuf>) -> Result<Vec<LoadedPlugin>> {
        let task_root = task_root.into();
        info!("loading tasks from {}", task_root.display());
        let discovered = self.crawler.crawl(&task_root, &[]).await;
        let mut loaded = Vec::new();
        for dir in discovered.directories {
            let Some(name) = dir.file_name().and_then(|name| name.to_str()) else {
                continue;
            };
            if !self.factories.contains(name) {
                warn!("task '{}' has no registered capability; skipped", name);
                continue;
            }
            match self.instantiate(name, &dir).await {
                Ok(instance) => {
                    debug!("loaded task {}", name);
                    loaded.push(LoadedPlugin {
                        name: name.to_string(),
                        instance,
                    });
                }
                Err(err) => {
                    warn!("task '{}' failed to load; skipped: {}", name, err);
                }
            }
        }
        Ok(loaded)
    }

    async fn instantiate(&self, name: &str, install_dir: &Path) -> Result<Box<dyn Plugin>> {
        match self.factories.get(name) {
            Some(factory) => factory.build(install_dir).await,
            None => Err(crate::core::errors::ForgeError::plugin_load(
                name,
                "no registered capability",
            )),
        }
    }
}
