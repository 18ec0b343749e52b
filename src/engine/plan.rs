// src/engine/plan.rs

//! Per-cycle decisions, computed without side effects on scripts.
//!
//! A [`CyclePlan`] is filled in three passes against a read-only
//! [`CycleView`]: watched paths vs. registry, orphans, then drained
//! filesystem events. Provisional deletes are resolved against the live
//! filesystem once every event has been seen.

use std::collections::HashSet;
use std::path::Path;

use tracing::{debug, trace};

use crate::fs::FileSystem;
use crate::script::ScriptRegistry;
use crate::types::ScriptPath;
use crate::watch::{ExcludeFilter, FileCache, FsEvent, FsEventKind};

/// Insertion-ordered set of paths.
///
/// Cycle outputs must be reproducible, so plan sets remember the order in
/// which paths were first added.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct OrderedPaths {
    order: Vec<ScriptPath>,
    seen: HashSet<ScriptPath>,
}

impl OrderedPaths {
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns false if the path was already present (order unchanged).
    pub fn insert(&mut self, path: ScriptPath) -> bool {
        if !self.seen.insert(path.clone()) {
            return false;
        }
        self.order.push(path);
        true
    }

    pub fn remove(&mut self, path: &ScriptPath) -> bool {
        if !self.seen.remove(path) {
            return false;
        }
        self.order.retain(|p| p != path);
        true
    }

    pub fn contains(&self, path: &ScriptPath) -> bool {
        self.seen.contains(path)
    }

    pub fn len(&self) -> usize {
        self.order.len()
    }

    pub fn is_empty(&self) -> bool {
        self.order.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = &ScriptPath> {
        self.order.iter()
    }

    pub fn into_vec(self) -> Vec<ScriptPath> {
        self.order
    }
}

impl FromIterator<ScriptPath> for OrderedPaths {
    fn from_iter<I: IntoIterator<Item = ScriptPath>>(iter: I) -> Self {
        let mut out = Self::new();
        for path in iter {
            out.insert(path);
        }
        out
    }
}

impl<'a> IntoIterator for &'a OrderedPaths {
    type Item = &'a ScriptPath;
    type IntoIter = std::slice::Iter<'a, ScriptPath>;

    fn into_iter(self) -> Self::IntoIter {
        self.order.iter()
    }
}

/// Everything a plan may look at. Nothing here is mutated while planning.
#[derive(Clone, Copy)]
pub struct CycleView<'a> {
    pub root: &'a Path,
    pub fs: &'a dyn FileSystem,
    pub registry: &'a ScriptRegistry,
    pub watched: &'a HashSet<ScriptPath>,
    pub exclude: &'a ExcludeFilter,
}

impl CycleView<'_> {
    pub fn exists(&self, path: &ScriptPath) -> bool {
        self.fs.is_file(&path.to_path(self.root))
    }

    fn is_registered(&self, path: &ScriptPath) -> bool {
        self.registry.contains(path)
    }

    fn is_watched(&self, path: &ScriptPath) -> bool {
        self.watched.contains(path)
    }
}

/// Load/reload/unload decisions for one cycle.
#[derive(Debug, Default)]
pub struct CyclePlan {
    pub to_load: OrderedPaths,
    /// Changed paths whose dependents must reload. Includes registered
    /// scripts (which reload themselves) and plain files some script
    /// depends on.
    pub to_reload: OrderedPaths,
    pub to_unload: OrderedPaths,
    try_unload: OrderedPaths,
}

impl CyclePlan {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.to_load.is_empty() && self.to_reload.is_empty() && self.to_unload.is_empty()
    }

    /// Watched paths against the registry: existing and unregistered ->
    /// load; gone and registered -> unload.
    ///
    /// `watched` should be sorted so load order is reproducible.
    pub fn reconcile(&mut self, view: &CycleView<'_>, watched: &[ScriptPath]) {
        for path in watched {
            let exists = view.exists(path);
            let registered = view.is_registered(path);

            if exists && !registered {
                trace!(path = %path, "watched file not loaded yet");
                self.to_load.insert(path.clone());
            } else if !exists && registered {
                trace!(path = %path, "watched file disappeared");
                self.to_unload.insert(path.clone());
            }
        }
    }

    /// Registered scripts nobody watches any more are unloaded.
    pub fn detect_orphans(&mut self, view: &CycleView<'_>) {
        let mut orphans: Vec<&ScriptPath> = view
            .registry
            .paths()
            .filter(|p| !view.is_watched(p))
            .collect();
        orphans.sort();

        for path in orphans {
            debug!(path = %path, "script no longer watched");
            self.to_unload.insert(path.clone());
        }
    }

    /// Classify drained events in arrival order, then settle provisional
    /// deletes.
    ///
    /// `cache` is only passed when content hashing is enabled; a registered
    /// script whose bytes did not change is then left alone.
    pub fn classify(
        &mut self,
        view: &CycleView<'_>,
        events: Vec<FsEvent>,
        mut cache: Option<&mut FileCache>,
    ) {
        for event in events {
            let Some(path) = ScriptPath::from_absolute(view.root, &event.path) else {
                trace!(path = ?event.path, "event outside script root");
                continue;
            };
            if path.as_str().is_empty() || view.fs.is_dir(&event.path) {
                continue;
            }
            if view.exclude.is_excluded(&path) {
                trace!(path = %path, "event path excluded");
                continue;
            }
            if self.to_unload.contains(&path) {
                continue;
            }

            match event.kind {
                FsEventKind::Remove => {
                    self.try_unload.insert(path);
                }
                FsEventKind::Create | FsEventKind::Modify => {
                    if self.to_load.contains(&path) {
                        continue;
                    }
                    if view.is_registered(&path) {
                        if let Some(cache) = cache.as_deref_mut() {
                            if !cache.refresh(view.fs, &path, &event.path) {
                                continue;
                            }
                        }
                    }
                    self.classify_change(view, path);
                }
            }
        }

        self.resolve_pending_unloads(view);
    }

    fn classify_change(&mut self, view: &CycleView<'_>, path: ScriptPath) {
        if view.is_registered(&path) {
            self.to_reload.insert(path);
        } else if view.is_watched(&path) {
            self.to_load.insert(path);
        } else {
            self.to_reload.insert(path);
        }
    }

    /// A delete seen during the drain is checked against the filesystem as
    /// it is now: if the file came back, the delete is moot; if it is gone,
    /// it wins over any queued (re)load.
    fn resolve_pending_unloads(&mut self, view: &CycleView<'_>) {
        let pending = std::mem::take(&mut self.try_unload);

        for path in pending.into_vec() {
            if view.exists(&path) {
                let queued = self.to_load.contains(&path) || self.to_reload.contains(&path);
                if !queued {
                    debug!(path = %path, "file recreated after delete");
                    self.classify_change(view, path);
                }
                continue;
            }

            self.to_load.remove(&path);
            if view.is_registered(&path) {
                self.to_reload.remove(&path);
                debug!(path = %path, "script file deleted");
                self.to_unload.insert(path);
            } else {
                self.to_reload.insert(path);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;

    use super::*;
    use crate::exec::Interpreter;
    use crate::exports::ExportRegistry;
    use crate::fs::mock::MockFileSystem;
    use crate::script::{Bindings, Script, ScriptContext};
    use crate::watch::WatchSet;

    const ROOT: &str = "/scripts";

    struct Fixture {
        fs: MockFileSystem,
        ctx: Arc<ScriptContext>,
        registry: ScriptRegistry,
        watched: HashSet<ScriptPath>,
        exclude: ExcludeFilter,
        set: WatchSet,
    }

    impl Fixture {
        fn new() -> Self {
            let fs = MockFileSystem::new();
            fs.add_dir(ROOT);
            let noop: Arc<dyn Interpreter> =
                Arc::new(|_: &Script, _: &Bindings| -> anyhow::Result<()> { Ok(()) });
            let ctx = Arc::new(ScriptContext::new(
                ROOT,
                noop,
                Vec::new(),
                Arc::new(ExportRegistry::new()),
                Arc::new(fs.clone()),
            ));
            Self {
                fs,
                ctx,
                registry: ScriptRegistry::new(),
                watched: HashSet::new(),
                exclude: ExcludeFilter::default(),
                set: WatchSet::new(),
            }
        }

        fn file(&self, rel: &str) {
            self.fs.add_file(format!("{ROOT}/{rel}"), "x");
        }

        fn register(&mut self, rel: &str) {
            let script = Script::new(self.ctx.clone(), rel.into(), self.set.scope());
            self.registry.register(Arc::new(script));
        }

        fn view(&self) -> CycleView<'_> {
            CycleView {
                root: Path::new(ROOT),
                fs: &self.fs,
                registry: &self.registry,
                watched: &self.watched,
                exclude: &self.exclude,
            }
        }
    }

    fn paths(set: &OrderedPaths) -> Vec<&str> {
        set.iter().map(|p| p.as_str()).collect()
    }

    fn event(kind: FsEventKind, rel: &str) -> FsEvent {
        FsEvent::new(kind, format!("{ROOT}/{rel}"))
    }

    #[test]
    fn ordered_paths_keep_first_insertion_order() {
        let mut set = OrderedPaths::new();
        assert!(set.insert("b".into()));
        assert!(set.insert("a".into()));
        assert!(!set.insert("b".into()));
        assert_eq!(paths(&set), vec!["b", "a"]);

        assert!(set.remove(&"b".into()));
        assert!(set.insert("b".into()));
        assert_eq!(paths(&set), vec!["a", "b"]);
    }

    #[test]
    fn reconcile_loads_present_files_and_unloads_missing_ones() {
        let mut fx = Fixture::new();
        fx.file("init.js");
        fx.register("gone.js");
        let watched: Vec<ScriptPath> = vec!["gone.js".into(), "init.js".into(), "missing.js".into()];
        fx.watched = watched.iter().cloned().collect();

        let mut plan = CyclePlan::new();
        plan.reconcile(&fx.view(), &watched);

        assert_eq!(paths(&plan.to_load), vec!["init.js"]);
        assert_eq!(paths(&plan.to_unload), vec!["gone.js"]);
    }

    #[test]
    fn registered_but_unwatched_scripts_are_orphans() {
        let mut fx = Fixture::new();
        fx.file("a.js");
        fx.file("b.js");
        fx.register("b.js");
        fx.register("a.js");
        fx.watched.insert("a.js".into());

        let mut plan = CyclePlan::new();
        plan.detect_orphans(&fx.view());

        assert_eq!(paths(&plan.to_unload), vec!["b.js"]);
    }

    #[test]
    fn classifies_changes_by_registration_and_watch_state() {
        let mut fx = Fixture::new();
        for f in ["live.js", "pending.js", "data.txt"] {
            fx.file(f);
        }
        fx.register("live.js");
        fx.watched.insert("live.js".into());
        fx.watched.insert("pending.js".into());

        let mut plan = CyclePlan::new();
        plan.classify(
            &fx.view(),
            vec![
                event(FsEventKind::Modify, "live.js"),
                event(FsEventKind::Create, "pending.js"),
                event(FsEventKind::Modify, "data.txt"),
                FsEvent::new(FsEventKind::Modify, "/elsewhere/x.js"),
            ],
            None,
        );

        assert_eq!(paths(&plan.to_load), vec!["pending.js"]);
        assert_eq!(paths(&plan.to_reload), vec!["live.js", "data.txt"]);
        assert!(plan.to_unload.is_empty());
    }

    #[test]
    fn excluded_paths_and_directories_are_ignored() {
        let mut fx = Fixture::new();
        fx.fs.add_dir(format!("{ROOT}/lib"));
        fx.file("a.js.swp");
        fx.exclude = ExcludeFilter::new(&["**/*.swp".to_string()]).unwrap();

        let mut plan = CyclePlan::new();
        plan.classify(
            &fx.view(),
            vec![
                event(FsEventKind::Modify, "a.js.swp"),
                event(FsEventKind::Create, "lib"),
            ],
            None,
        );

        assert!(plan.is_empty());
    }

    #[test]
    fn events_for_paths_already_unloading_are_skipped() {
        let mut fx = Fixture::new();
        fx.register("a.js");
        fx.watched.insert("a.js".into());
        let watched = vec![ScriptPath::new("a.js")];

        let mut plan = CyclePlan::new();
        plan.reconcile(&fx.view(), &watched);
        plan.classify(&fx.view(), vec![event(FsEventKind::Remove, "a.js")], None);

        assert_eq!(paths(&plan.to_unload), vec!["a.js"]);
        assert!(plan.to_reload.is_empty());
    }

    #[test]
    fn delete_then_create_of_a_live_script_reloads_it() {
        let mut fx = Fixture::new();
        fx.file("a.js");
        fx.register("a.js");
        fx.watched.insert("a.js".into());

        let mut plan = CyclePlan::new();
        plan.classify(
            &fx.view(),
            vec![
                event(FsEventKind::Remove, "a.js"),
                event(FsEventKind::Create, "a.js"),
            ],
            None,
        );

        assert_eq!(paths(&plan.to_reload), vec!["a.js"]);
        assert!(plan.to_unload.is_empty());
    }

    #[test]
    fn create_then_delete_of_a_live_script_unloads_it() {
        let mut fx = Fixture::new();
        fx.register("a.js");
        fx.watched.insert("a.js".into());

        let mut plan = CyclePlan::new();
        plan.classify(
            &fx.view(),
            vec![
                event(FsEventKind::Modify, "a.js"),
                event(FsEventKind::Remove, "a.js"),
            ],
            None,
        );

        assert!(plan.to_reload.is_empty());
        assert_eq!(paths(&plan.to_unload), vec!["a.js"]);
    }

    #[test]
    fn deleting_a_plain_file_still_notifies_dependents() {
        let fx = Fixture::new();

        let mut plan = CyclePlan::new();
        plan.classify(&fx.view(), vec![event(FsEventKind::Remove, "config.env")], None);

        assert_eq!(paths(&plan.to_reload), vec!["config.env"]);
        assert!(plan.to_unload.is_empty());
    }

    #[test]
    fn unchanged_content_is_skipped_when_hashing() {
        let mut fx = Fixture::new();
        fx.file("a.js");
        fx.register("a.js");
        fx.watched.insert("a.js".into());

        let mut cache = FileCache::new();
        cache.refresh(&fx.fs, &"a.js".into(), Path::new("/scripts/a.js"));

        let mut plan = CyclePlan::new();
        plan.classify(&fx.view(), vec![event(FsEventKind::Modify, "a.js")], Some(&mut cache));
        assert!(plan.is_empty());

        fx.fs.add_file("/scripts/a.js", "changed");
        let mut plan = CyclePlan::new();
        plan.classify(&fx.view(), vec![event(FsEventKind::Modify, "a.js")], Some(&mut cache));
        assert_eq!(paths(&plan.to_reload), vec!["a.js"]);
    }
}
