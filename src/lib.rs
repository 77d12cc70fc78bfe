// Core infrastructure modules
pub mod core {
    pub mod errors;
    pub mod events;
    pub mod scheduler;
}

// Discovery and dependency resolution
pub mod crawler;
pub mod plugins;

// Re-exports for convenience
pub use crate::core::errors::{ForgeError, Result};
pub use crate::core::events::{BufferingEventSink, EventSink, ForgeEvent, LoggingEventSink};
pub use crate::core::scheduler::{noop_stage, parallel, pipeline, Stage};
pub use crawler::{CrawlResult, EntryKind, FileSystemEntry, FsCrawler};
pub use plugins::{
    FactoryRegistry, InstallSpec, LoadedPlugin, PackageInstaller, Plugin, PluginFactory,
    PluginLoader, PluginManager, PluginManifest, PluginRegistry, BUILTIN_PLUGINS,
};

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn registry_seeds_builtins_on_first_open() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.json");
        let registry = PluginRegistry::open(&path).await.unwrap();

        let enabled = registry.enabled().await.unwrap();
        assert_eq!(enabled.len(), BUILTIN_PLUGINS.len());
        assert!(enabled.iter().any(|name| name == "forge.output"));

        // The seed is written compact; no pretty-printing indentation.
        let raw = std::fs::read_to_string(&path).unwrap();
        assert!(!raw.contains('\n'));
    }

    #[tokio::test]
    async fn registry_add_is_idempotent() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("plugins.json");
        let registry = PluginRegistry::open(&path).await.unwrap();

        registry.add("forge.extra").await.unwrap();
        let after_first = std::fs::read_to_string(&path).unwrap();
        registry.add("forge.extra").await.unwrap();
        let after_second = std::fs::read_to_string(&path).unwrap();

        assert_eq!(after_first, after_second);
        assert!(registry.contains("forge.extra").await.unwrap());
    }

    #[tokio::test]
    async fn registry_remove_reports_membership() {
        let dir = tempfile::tempdir().unwrap();
        let registry = PluginRegistry::open(dir.path().join("plugins.json"))
            .await
            .unwrap();

        assert!(registry.remove("forge.concat").await.unwrap());
        assert!(!registry.remove("forge.concat").await.unwrap());
        assert!(!registry.contains("forge.concat").await.unwrap());
    }

    #[test]
    fn events_round_trip_as_tagged_json() {
        let event = ForgeEvent::AllStop { exit_code: -1 };
        let json = serde_json::to_string(&event).unwrap();
        assert!(json.contains("\"type\":\"AllStop\""));
        let back: ForgeEvent = serde_json::from_str(&json).unwrap();
        assert_eq!(back, event);
    }
}
