pub mod loader;
pub mod manager;
pub mod manifest;
pub mod registry;

pub use loader::{FactoryRegistry, LoadedPlugin, Plugin, PluginFactory, PluginLoader};
pub use manager::PluginManager;
pub use manifest::{InstallSpec, PackageInstaller, PluginManifest};
pub use registry::{PluginRegistry, BUILTIN_PLUGINS};
