use std::path::Path;
use std::sync::{Arc, Mutex, RwLock};

use crate::error::CatalogError;
use crate::load::{load_catalog, LoadOptions};
use crate::model::RuleCatalog;

/// Serves immutable catalog snapshots with atomic reload.
///
/// Readers take an `Arc` clone of the published snapshot and keep it for the
/// whole request; a reload publishes a fully validated replacement or leaves
/// the live snapshot untouched. At most one reload runs at a time.
pub struct CatalogStore {
    current: RwLock<Arc<RuleCatalog>>,
    reload_lock: Mutex<()>,
    options: LoadOptions,
}

impl CatalogStore {
    /// Load the catalog at `path` and publish it as the initial snapshot.
    pub fn open(path: impl AsRef<Path>) -> Result<Self, CatalogError> {
        Self::open_with_options(path, LoadOptions::default())
    }

    pub fn open_with_options(
        path: impl AsRef<Path>,
        options: LoadOptions,
    ) -> Result<Self, CatalogError> {
        let catalog = load_catalog(path.as_ref(), &options)?;
        Ok(Self {
            current: RwLock::new(Arc::new(catalog)),
            reload_lock: Mutex::new(()),
            options,
        })
    }

    /// The currently published snapshot. Never blocks on a reload: the lock
    /// is held only long enough to clone the pointer.
    pub fn current(&self) -> Arc<RuleCatalog> {
        self.current
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    /// Parse, validate, and atomically publish the catalog at `path`.
    ///
    /// Returns the new version label. On any violation the previous snapshot
    /// stays live and the full violation list is returned. Concurrent reload
    /// calls serialize; readers are never blocked while the replacement is
    /// being built.
    pub fn reload(&self, path: impl AsRef<Path>) -> Result<String, CatalogError> {
        let _serialized = self
            .reload_lock
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner());

        let catalog = load_catalog(path.as_ref(), &self.options)?;
        let version = catalog.version().to_string();

        let mut slot = self
            .current
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner());
        let previous = slot.version().to_string();
        *slot = Arc::new(catalog);
        drop(slot);

        tracing::info!(%previous, %version, "catalog snapshot replaced");
        Ok(version)
    }

    /// Validate the catalog at `path` without publishing it.
    pub fn dry_run(&self, path: impl AsRef<Path>) -> Result<String, CatalogError> {
        let catalog = load_catalog(path.as_ref(), &self.options)?;
        Ok(catalog.version().to_string())
    }
}
