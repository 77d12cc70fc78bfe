//! Tests for capability-checked plugin loading

use async_trait::async_trait;
use forgekit::{
    BufferingEventSink, FactoryRegistry, ForgeError, ForgeEvent, InstallSpec,
    PackageInstaller, Plugin, PluginFactory, PluginLoader, PluginManager, PluginManifest,
    BUILTIN_PLUGINS,
};
use pretty_assertions::assert_eq;
use std::path::Path;
use std::sync::Arc;

/// Installer stand-in for tests that never reach the install path.
struct UnusedInstaller;

#[async_trait]
impl PackageInstaller for UnusedInstaller {
    async fn install(&self, spec: &InstallSpec, _: &Path) -> forgekit::Result<PluginManifest> {
        Err(ForgeError::install(
            spec.to_string().as_str(),
            "installer should not be reached",
        ))
    }

    async fn uninstall(&self, name: &str, _: &Path) -> forgekit::Result<()> {
        Err(ForgeError::install(name, "installer should not be reached"))
    }
}

struct EchoPlugin {
    name: String,
}

#[async_trait]
impl Plugin for EchoPlugin {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn run(&mut self) -> forgekit::Result<()> {
        Ok(())
    }
}

struct EchoFactory {
    name: String,
}

#[async_trait]
impl PluginFactory for EchoFactory {
    fn name(&self) -> String {
        self.name.clone()
    }

    async fn build(&self, _install_dir: &Path) -> forgekit::Result<Box<dyn Plugin>> {
        Ok(Box::new(EchoPlugin {
            name: self.name.clone(),
        }))
    }
}

async fn bare_manager(root: &Path, events: Arc<BufferingEventSink>) -> Arc<PluginManager> {
    let manager = PluginManager::new(root, Arc::new(UnusedInstaller), events)
        .await
        .unwrap();
    // Start from an empty enabled set instead of the seeded builtins.
    for name in BUILTIN_PLUGINS {
        manager.registry().remove(name).await.unwrap();
    }
    manager
}

#[tokio::test]
async fn load_plugins_instantiates_enabled_names_and_emits_events() {
    let tmp = tempfile::tempdir().unwrap();
    let events = Arc::new(BufferingEventSink::new());
    let manager = bare_manager(tmp.path(), events.clone()).await;
    manager.registry().add("alpha").await.unwrap();

    let factories = FactoryRegistry::new();
    factories.register(Arc::new(EchoFactory {
        name: "alpha".to_string(),
    }));
    let loader = PluginLoader::new(manager.clone(), factories);

    let loaded = loader.load_plugins().await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "alpha");
    assert_eq!(
        events.get_events(),
        vec![ForgeEvent::PluginLoaded {
            name: "alpha".to_string()
        }]
    );
}

#[tokio::test]
async fn unloadable_plugin_is_disabled_and_stops_the_run() {
    let tmp = tempfile::tempdir().unwrap();
    let events = Arc::new(BufferingEventSink::new());
    let manager = bare_manager(tmp.path(), events.clone()).await;
    manager.registry().add("alpha").await.unwrap();
    manager.registry().add("ghost").await.unwrap();

    let factories = FactoryRegistry::new();
    factories.register(Arc::new(EchoFactory {
        name: "alpha".to_string(),
    }));
    let loader = PluginLoader::new(manager.clone(), factories);

    let loaded = loader.load_plugins().await.unwrap();
    assert_eq!(loaded.len(), 1);

    // ghost healed out of the registry; alpha survives.
    assert!(!manager.registry().contains("ghost").await.unwrap());
    assert!(manager.registry().contains("alpha").await.unwrap());

    let emitted = events.get_events();
    assert_eq!(
        emitted
            .iter()
            .filter(|event| matches!(event, ForgeEvent::AllStop { exit_code: -1 }))
            .count(),
        1
    );
}

#[tokio::test]
async fn load_tasks_skips_directories_without_a_factory() {
    let tmp = tempfile::tempdir().unwrap();
    let events = Arc::new(BufferingEventSink::new());
    let manager = bare_manager(&tmp.path().join("plugins"), events).await;

    let task_root = tmp.path().join("tasks");
    std::fs::create_dir_all(task_root.join("lint")).unwrap();
    std::fs::create_dir_all(task_root.join("mystery")).unwrap();

    let factories = FactoryRegistry::new();
    factories.register(Arc::new(EchoFactory {
        name: "lint".to_string(),
    }));
    let loader = PluginLoader::new(manager, factories);

    let loaded = loader.load_tasks(&task_root).await.unwrap();
    assert_eq!(loaded.len(), 1);
    assert_eq!(loaded[0].name, "lint");
}

#[tokio::test]
async fn loaded_plugins_run_through_the_contract() {
    let tmp = tempfile::tempdir().unwrap();
    let events = Arc::new(BufferingEventSink::new());
    let manager = bare_manager(tmp.path(), events).await;
    manager.registry().add("alpha").await.unwrap();

    let factories = FactoryRegistry::new();
    factories.register(Arc::new(EchoFactory {
        name: "alpha".to_string(),
    }));
    let loader = PluginLoader::new(manager, factories);

    let mut loaded = loader.load_plugins().await.unwrap();
    let plugin = &mut loaded[0].instance;
    plugin
        .configure(serde_json::json!({ "verbose": true }))
        .await
        .unwrap();
    plugin.run().await.unwrap();
    assert_eq!(plugin.name(), "alpha");
}
