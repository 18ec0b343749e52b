// src/watch/set.rs

//! The set of script paths an environment keeps loaded.
//!
//! [`WatchSet`] is the shared, reference-counted collection. Nobody mutates
//! it directly: every owner goes through a [`WatchScope`], which remembers the
//! paths *it* added. Closing a scope gives back exactly those references, so
//! a script that watched `lib.js` can be torn down without unwatching
//! `lib.js` for the init script that also asked for it.

use std::collections::{HashMap, HashSet};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{debug, warn};

use crate::types::ScriptPath;

#[derive(Debug, Clone, Default)]
pub struct WatchSet {
    refs: Arc<Mutex<HashMap<ScriptPath, usize>>>,
}

impl WatchSet {
    pub fn new() -> Self {
        Self::default()
    }

    fn refs(&self) -> MutexGuard<'_, HashMap<ScriptPath, usize>> {
        self.refs.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn acquire(&self, path: &ScriptPath) {
        let mut refs = self.refs();
        let count = refs.entry(path.clone()).or_insert(0);
        *count += 1;
        if *count == 1 {
            debug!(path = %path, "path added to watch set");
        }
    }

    fn release(&self, path: &ScriptPath) {
        let mut refs = self.refs();
        if let Some(count) = refs.get_mut(path) {
            *count -= 1;
            if *count == 0 {
                refs.remove(path);
                debug!(path = %path, "path removed from watch set");
            }
        }
    }

    pub fn contains(&self, path: &ScriptPath) -> bool {
        self.refs().contains_key(path)
    }

    /// Number of distinct watched paths.
    pub fn len(&self) -> usize {
        self.refs().len()
    }

    pub fn is_empty(&self) -> bool {
        self.refs().is_empty()
    }

    /// Copy of the currently watched paths. No ordering guarantee.
    pub fn snapshot(&self) -> HashSet<ScriptPath> {
        self.refs().keys().cloned().collect()
    }

    /// Open a new owner view onto this set.
    pub fn scope(&self) -> WatchScope {
        WatchScope {
            set: self.clone(),
            state: Mutex::new(ScopeState::default()),
        }
    }
}

#[derive(Debug, Default)]
struct ScopeState {
    owned: HashSet<ScriptPath>,
    closed: bool,
}

/// One owner's view of a [`WatchSet`].
///
/// Closing is final: later `watch` calls are refused, so nothing can be
/// added that would never be given back.
#[derive(Debug)]
pub struct WatchScope {
    set: WatchSet,
    state: Mutex<ScopeState>,
}

impl WatchScope {
    fn state(&self) -> MutexGuard<'_, ScopeState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Watch `path`. Returns false if this scope already watched it, the
    /// scope is closed, or the path lies outside the script root.
    pub fn watch(&self, path: impl Into<ScriptPath>) -> bool {
        let path = path.into();
        if path.escapes_root() {
            warn!(path = %path, "refusing to watch a path outside the script root");
            return false;
        }

        let mut state = self.state();
        if state.closed {
            warn!(path = %path, "refusing to watch through a closed scope");
            return false;
        }
        if !state.owned.insert(path.clone()) {
            return false;
        }
        self.set.acquire(&path);
        true
    }

    /// Stop watching `path`. Only paths added through this scope are released.
    pub fn unwatch(&self, path: impl Into<ScriptPath>) -> bool {
        let path = path.into();
        let mut state = self.state();
        if !state.owned.remove(&path) {
            return false;
        }
        self.set.release(&path);
        true
    }

    pub fn watch_all<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<ScriptPath>,
    {
        for path in paths {
            self.watch(path);
        }
    }

    pub fn unwatch_all<I, P>(&self, paths: I)
    where
        I: IntoIterator<Item = P>,
        P: Into<ScriptPath>,
    {
        for path in paths {
            self.unwatch(path);
        }
    }

    /// Whether this scope itself watches `path`.
    pub fn is_watching(&self, path: &ScriptPath) -> bool {
        self.state().owned.contains(path)
    }

    /// Paths this scope added.
    pub fn paths(&self) -> Vec<ScriptPath> {
        self.state().owned.iter().cloned().collect()
    }

    /// A sibling scope on the same underlying set.
    pub fn child(&self) -> WatchScope {
        self.set.scope()
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.set
    }

    pub fn is_closed(&self) -> bool {
        self.state().closed
    }

    /// Release every path this scope added and refuse further watches.
    /// Later calls do nothing.
    pub fn close(&self) {
        let mut state = self.state();
        state.closed = true;
        for path in state.owned.drain() {
            self.set.release(&path);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn watch_is_idempotent_per_scope() {
        let set = WatchSet::new();
        let scope = set.scope();

        assert!(scope.watch("a.js"));
        assert!(!scope.watch("./a.js"));
        assert_eq!(set.len(), 1);

        assert!(scope.unwatch("a.js"));
        assert!(!scope.unwatch("a.js"));
        assert!(set.is_empty());
    }

    #[test]
    fn closing_a_scope_keeps_paths_held_by_other_owners() {
        let set = WatchSet::new();
        let root = set.scope();
        let script = root.child();

        root.watch("init.js");
        root.watch("lib.js");
        script.watch("lib.js");
        script.watch("extra.js");
        assert_eq!(set.len(), 3);

        script.close();

        assert!(set.contains(&ScriptPath::new("lib.js")));
        assert!(set.contains(&ScriptPath::new("init.js")));
        assert!(!set.contains(&ScriptPath::new("extra.js")));
        assert!(script.paths().is_empty());
    }

    #[test]
    fn closed_scope_refuses_new_watches() {
        let set = WatchSet::new();
        let scope = set.scope();
        scope.watch("a.js");

        scope.close();
        assert!(scope.is_closed());
        assert!(!scope.watch("late.js"));
        assert!(set.is_empty());

        // Closing again releases nothing twice.
        scope.close();
        assert!(set.is_empty());
    }

    #[test]
    fn paths_outside_the_root_are_not_watched() {
        let set = WatchSet::new();
        let scope = set.scope();
        assert!(!scope.watch("../shared.js"));
        assert!(!scope.watch("/etc/passwd"));
        assert!(set.is_empty());
    }

    #[test]
    fn unwatch_ignores_paths_added_by_someone_else() {
        let set = WatchSet::new();
        let a = set.scope();
        let b = set.scope();

        a.watch("x.js");
        assert!(!b.unwatch("x.js"));
        assert!(set.contains(&ScriptPath::new("x.js")));
    }
}
