// src/exports/mod.rs

//! Named values shared between scripts and surviving reloads.
//!
//! Scripts are torn down and rebuilt constantly; anything that must outlive
//! one instance (a connection, a counter, a cache) is parked in an
//! [`Export`]. A [`Pointer`] lets a script hold on to "whatever `x` is right
//! now" without re-fetching.

pub mod export;

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

use tracing::debug;

pub use export::{Export, ExportValue, Pointer};

#[derive(Debug, Default)]
pub struct ExportRegistry {
    exports: RwLock<HashMap<String, Arc<Export>>>,
}

impl ExportRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// The export called `name`, created empty if absent. Repeated calls
    /// return the same cell until it is [`remove`](Self::remove)d.
    pub fn get(&self, name: &str) -> Arc<Export> {
        if let Some(export) = self
            .exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .get(name)
        {
            return Arc::clone(export);
        }

        let mut exports = self.exports.write().unwrap_or_else(PoisonError::into_inner);
        Arc::clone(exports.entry(name.to_string()).or_insert_with(|| {
            debug!(export = %name, "creating export");
            Arc::new(Export::new(name))
        }))
    }

    pub fn pointer(&self, name: &str) -> Pointer {
        self.get(name).pointer()
    }

    /// Drop the export from the registry. Pointers obtained earlier keep
    /// reading the detached cell.
    pub fn remove(&self, name: &str) -> Option<Arc<Export>> {
        self.exports
            .write()
            .unwrap_or_else(PoisonError::into_inner)
            .remove(name)
    }

    pub fn all(&self) -> Vec<Arc<Export>> {
        self.exports
            .read()
            .unwrap_or_else(PoisonError::into_inner)
            .values()
            .cloned()
            .collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn get_returns_the_same_cell() {
        let registry = ExportRegistry::new();
        let a = registry.get("x");
        let b = registry.get("x");
        assert!(Arc::ptr_eq(&a, &b));
        assert_eq!(registry.all().len(), 1);
    }

    #[test]
    fn pointer_observes_later_puts() {
        let registry = ExportRegistry::new();
        let pointer = registry.pointer("x");
        assert!(pointer.get().is_none());

        registry.get("x").put(1u8);
        assert_eq!(pointer.get_as::<u8>().as_deref(), Some(&1));

        registry.get("x").put(2u8);
        assert_eq!(pointer.get_as::<u8>().as_deref(), Some(&2));
    }

    #[test]
    fn remove_detaches_the_cell() {
        let registry = ExportRegistry::new();
        let old = registry.get("x");
        registry.remove("x");
        let fresh = registry.get("x");
        assert!(!Arc::ptr_eq(&old, &fresh));
    }
}
