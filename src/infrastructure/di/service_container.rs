//! Service container for dependency injection
//!
//! Wires up all services with their dependencies.

use std::sync::Arc;
use std::time::Duration;

use tracing::debug;

use crate::application::services::OrgChartService;
use crate::config::Settings;
use crate::domain::{IdGenerator, SequentialIds, UuidGenerator};
use crate::infrastructure::traits::{
    ChildLoader, DirectoryChildLoader, EmptyChildLoader, FileSnapshotStore, FileSystem,
    RealFileSystem, SnapshotStore,
};

/// Container holding all application services.
pub struct ServiceContainer {
    /// Application settings
    pub settings: Arc<Settings>,

    /// Filesystem abstraction
    pub fs: Arc<dyn FileSystem>,

    /// Chart record storage
    pub store: Arc<dyn SnapshotStore>,

    /// The tree store
    pub org_chart: OrgChartService,
}

impl ServiceContainer {
    /// Create a new service container with real implementations.
    pub fn new(settings: Settings) -> Self {
        let fs: Arc<dyn FileSystem> = Arc::new(RealFileSystem);
        let store: Arc<dyn SnapshotStore> = Arc::new(FileSnapshotStore::new(
            Arc::clone(&fs),
            settings.record_path(),
        ));
        Self::with_deps(settings, fs, store)
    }

    /// Create a service container with custom dependencies (for testing).
    ///
    /// The child loader and id generator are still derived from `settings`.
    pub fn with_deps(
        settings: Settings,
        fs: Arc<dyn FileSystem>,
        store: Arc<dyn SnapshotStore>,
    ) -> Self {
        let settings = Arc::new(settings);
        let loader = child_loader(&settings, &fs);
        let ids = id_generator(&settings);
        let org_chart = OrgChartService::new(
            Arc::clone(&store),
            loader,
            ids,
            Arc::clone(&settings),
        );

        Self {
            settings,
            fs,
            store,
            org_chart,
        }
    }
}

fn child_loader(settings: &Settings, fs: &Arc<dyn FileSystem>) -> Arc<dyn ChildLoader> {
    match &settings.loader.directory {
        Some(path) => {
            debug!("lazy children from {}", path.display());
            Arc::new(DirectoryChildLoader::new(
                Arc::clone(fs),
                path.clone(),
                Duration::from_millis(settings.loader.latency_ms),
            ))
        }
        None => Arc::new(EmptyChildLoader),
    }
}

fn id_generator(settings: &Settings) -> Arc<dyn IdGenerator> {
    match &settings.id_prefix {
        Some(prefix) => Arc::new(SequentialIds::new(prefix.clone())),
        None => Arc::new(UuidGenerator),
    }
}
