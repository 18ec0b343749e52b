// src/script/registry.rs

use std::collections::HashMap;
use std::sync::Arc;

use tracing::debug;

use crate::script::closer::{CompositeCloseError, CompositeCloser};
use crate::script::unit::{script_closer, Script};
use crate::types::ScriptPath;

/// Live scripts keyed by path. At most one entry per path.
///
/// Owned by the loader and only mutated inside a reload cycle.
#[derive(Debug, Default)]
pub struct ScriptRegistry {
    scripts: HashMap<ScriptPath, Arc<Script>>,
}

impl ScriptRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register `script` under its path, returning the instance it displaced.
    pub fn register(&mut self, script: Arc<Script>) -> Option<Arc<Script>> {
        let displaced = self.scripts.insert(script.path().clone(), script);
        if let Some(old) = &displaced {
            debug!(path = %old.path(), old_id = old.id(), "registry entry replaced");
        }
        displaced
    }

    pub fn unregister(&mut self, path: &ScriptPath) -> Option<Arc<Script>> {
        self.scripts.remove(path)
    }

    pub fn get(&self, path: &ScriptPath) -> Option<&Arc<Script>> {
        self.scripts.get(path)
    }

    pub fn contains(&self, path: &ScriptPath) -> bool {
        self.scripts.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.scripts.len()
    }

    pub fn is_empty(&self) -> bool {
        self.scripts.is_empty()
    }

    pub fn paths(&self) -> impl Iterator<Item = &ScriptPath> {
        self.scripts.keys()
    }

    pub fn scripts(&self) -> impl Iterator<Item = &Arc<Script>> {
        self.scripts.values()
    }

    /// Paths of every live script, other than `path` itself, that declared a
    /// dependency on `path`. Sorted, so traversal order is reproducible.
    ///
    /// Linear in the number of live scripts; there is no reverse index.
    pub fn dependents_of(&self, path: &ScriptPath) -> Vec<ScriptPath> {
        let mut out: Vec<ScriptPath> = self
            .scripts
            .values()
            .filter(|s| s.path() != path && s.depends_on(path))
            .map(|s| s.path().clone())
            .collect();
        out.sort();
        out
    }

    /// Unregister and close every script, attempting all of them before
    /// reporting failures.
    pub fn close_all(&mut self) -> Result<(), CompositeCloseError> {
        let closer = CompositeCloser::new();
        closer.bind_all(self.scripts.drain().map(|(_, script)| script_closer(script)));
        closer.close()
    }
}
