//! Process-lifetime bundle cache.
//!
//! One cell per [`BundleKey`]; construction is single-flight per key, so
//! concurrent first requests for the same checkpoint fetch it once. A
//! failed build leaves the cell empty, which lets the next call retry
//! instead of pinning the failure.

use std::collections::HashMap;
use std::sync::{Arc, Mutex};

use once_cell::sync::OnceCell;

use crate::error::EegError;
use crate::model::bundle::{BundleKey, ModelBundle};

#[derive(Default)]
pub struct EngineCache {
    cells: Mutex<HashMap<BundleKey, Arc<OnceCell<Arc<ModelBundle>>>>>,
}

impl EngineCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached bundle for `key`, building it with `build` when
    /// absent. Readers of an existing bundle never block on the map lock
    /// longer than the cell lookup.
    pub fn get_or_build<F>(&self, key: BundleKey, build: F) -> Result<Arc<ModelBundle>, EegError>
    where
        F: FnOnce() -> Result<ModelBundle, EegError>,
    {
        let cell = {
            let mut cells = self
                .cells
                .lock()
                .map_err(|_| EegError::runtime("engine cache", "cache mutex poisoned"))?;
            Arc::clone(cells.entry(key).or_default())
        };
        cell.get_or_try_init(|| build().map(Arc::new))
            .map(Arc::clone)
    }

    pub fn resident_bundles(&self) -> usize {
        self.cells
            .lock()
            .map(|cells| cells.values().filter(|cell| cell.get().is_some()).count())
            .unwrap_or(0)
    }
}

impl std::fmt::Debug for EngineCache {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EngineCache")
            .field("resident_bundles", &self.resident_bundles())
            .finish()
    }
}
