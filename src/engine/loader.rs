// src/engine/loader.rs

use std::fmt;
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, TryLockError};

use tracing::{debug, info, warn};

use crate::engine::closure::dependency_closure;
use crate::engine::plan::{CyclePlan, CycleView};
use crate::engine::{CycleMode, CycleReport, PreloadReport};
use crate::errors::Result;
use crate::exec::{LoadBatch, ScriptExecutor};
use crate::script::{CompositeCloseError, Script, ScriptContext, ScriptRegistry};
use crate::types::ScriptPath;
use crate::watch::{EventSource, ExcludeFilter, FileCache, WatchSet};

/// State only touched while holding the cycle lock.
struct CycleState {
    registry: ScriptRegistry,
    events: Option<Box<dyn EventSource>>,
    cache: FileCache,
    cycles: u64,
}

/// Runs reload cycles for one environment.
///
/// A cycle plans under the lock (reconcile, orphans, events, closure),
/// applies the plan to the registry, then releases the lock before the
/// resulting [`LoadBatch`] runs. Scripts may therefore call back into the
/// environment while they run without deadlocking.
pub struct ScriptLoader {
    ctx: Arc<ScriptContext>,
    watch_set: WatchSet,
    exclude: ExcludeFilter,
    use_hash: bool,
    executor: Arc<dyn ScriptExecutor>,
    state: Mutex<CycleState>,
}

impl fmt::Debug for ScriptLoader {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptLoader")
            .field("root", &self.ctx.root())
            .field("watched", &self.watch_set.len())
            .field("exclude", &self.exclude)
            .field("use_hash", &self.use_hash)
            .finish_non_exhaustive()
    }
}

impl ScriptLoader {
    pub fn new(
        ctx: Arc<ScriptContext>,
        watch_set: WatchSet,
        exclude: &[String],
        use_hash: bool,
        executor: Arc<dyn ScriptExecutor>,
        events: Box<dyn EventSource>,
    ) -> Result<Self> {
        Ok(Self {
            ctx,
            watch_set,
            exclude: ExcludeFilter::new(exclude)?,
            use_hash,
            executor,
            state: Mutex::new(CycleState {
                registry: ScriptRegistry::new(),
                events: Some(events),
                cache: FileCache::new(),
                cycles: 0,
            }),
        })
    }

    fn state(&self) -> MutexGuard<'_, CycleState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn watch_set(&self) -> &WatchSet {
        &self.watch_set
    }

    /// Run one cycle, waiting for a cycle already in progress.
    pub fn reload(&self) -> CycleReport {
        self.cycle(CycleMode::Scheduled)
    }

    /// Run one cycle unless another is in progress, in which case nothing
    /// happens and `None` is returned.
    pub fn try_reload(&self) -> Option<CycleReport> {
        let state = match self.state.try_lock() {
            Ok(guard) => guard,
            Err(TryLockError::Poisoned(poisoned)) => poisoned.into_inner(),
            Err(TryLockError::WouldBlock) => {
                debug!(root = ?self.ctx.root(), "reload cycle in progress; skipping tick");
                return None;
            }
        };
        Some(self.run_cycle(state, CycleMode::Scheduled))
    }

    pub fn cycle(&self, mode: CycleMode) -> CycleReport {
        let state = self.state();
        self.run_cycle(state, mode)
    }

    /// Cycle with inline execution until the watch set stops growing and a
    /// cycle finds nothing to do, or `max_iterations` is reached.
    pub fn preload(&self, max_iterations: usize) -> PreloadReport {
        let mut iterations = 0;
        loop {
            let before = self.watch_set.len();
            let report = self.cycle(CycleMode::Preload);
            iterations += 1;
            let after = self.watch_set.len();

            debug!(iteration = iterations, before, after, changed = report.len(), "preload iteration");

            if before == after && report.is_empty() {
                info!(root = ?self.ctx.root(), iterations, watched = after, "preload complete");
                return PreloadReport {
                    iterations,
                    watched: after,
                    settled: true,
                };
            }
            if iterations >= max_iterations {
                warn!(
                    root = ?self.ctx.root(),
                    iterations,
                    watched = after,
                    "preload did not settle within the iteration limit"
                );
                return PreloadReport {
                    iterations,
                    watched: after,
                    settled: false,
                };
            }
        }
    }

    fn run_cycle(&self, mut guard: MutexGuard<'_, CycleState>, mode: CycleMode) -> CycleReport {
        let state = &mut *guard;
        state.cycles += 1;
        let cycle = state.cycles;

        let watched = self.watch_set.snapshot();
        let mut watched_sorted: Vec<ScriptPath> = watched.iter().cloned().collect();
        watched_sorted.sort();

        let events = match state.events.as_mut() {
            Some(source) => source.drain(),
            None => Vec::new(),
        };

        let mut plan = CyclePlan::new();
        let reload_queue = {
            let view = CycleView {
                root: self.ctx.root(),
                fs: self.ctx.fs(),
                registry: &state.registry,
                watched: &watched,
                exclude: &self.exclude,
            };

            plan.reconcile(&view, &watched_sorted);
            plan.detect_orphans(&view);
            let cache = if self.use_hash {
                Some(&mut state.cache)
            } else {
                None
            };
            plan.classify(&view, events, cache);

            dependency_closure(
                &state.registry,
                plan.to_reload.iter().chain(plan.to_unload.iter()),
            )
        };

        let mut report = CycleReport::default();
        let mut batch = LoadBatch::default();

        for path in &reload_queue {
            if plan.to_unload.contains(path) {
                continue;
            }
            let Some(old) = state.registry.get(path).cloned() else {
                continue;
            };
            let script = self.instantiate(path);
            state.registry.register(Arc::clone(&script));
            batch.terminate.push(old);
            batch.run.push(script);
            report.reloaded.push(path.clone());
        }

        for path in &plan.to_load {
            if state.registry.contains(path) {
                continue;
            }
            if self.use_hash {
                state
                    .cache
                    .refresh(self.ctx.fs(), path, &path.to_path(self.ctx.root()));
            }
            let script = self.instantiate(path);
            state.registry.register(Arc::clone(&script));
            batch.run.push(script);
            report.loaded.push(path.clone());
        }

        for path in &plan.to_unload {
            if let Some(old) = state.registry.unregister(path) {
                batch.terminate.push(old);
                report.unloaded.push(path.clone());
            }
            state.cache.invalidate(path);
        }

        drop(guard);

        if !report.is_empty() {
            info!(
                cycle,
                loaded = ?report.loaded,
                reloaded = ?report.reloaded,
                unloaded = ?report.unloaded,
                "reload cycle applied"
            );
        }

        if !batch.is_empty() {
            match mode {
                CycleMode::Preload => batch.execute(),
                CycleMode::Scheduled => self.executor.execute(batch),
            }
        }

        report
    }

    fn instantiate(&self, path: &ScriptPath) -> Arc<Script> {
        let script = Script::new(Arc::clone(&self.ctx), path.clone(), self.watch_set.scope());
        debug!(path = %path, id = script.id(), "script instance created");
        Arc::new(script)
    }

    pub fn script(&self, path: &ScriptPath) -> Option<Arc<Script>> {
        self.state().registry.get(path).cloned()
    }

    /// Live scripts sorted by path.
    pub fn scripts(&self) -> Vec<Arc<Script>> {
        let mut scripts: Vec<Arc<Script>> = self.state().registry.scripts().cloned().collect();
        scripts.sort_by(|a, b| a.path().cmp(b.path()));
        scripts
    }

    pub fn is_loaded(&self, path: &ScriptPath) -> bool {
        self.state().registry.contains(path)
    }

    /// Number of cycles run so far.
    pub fn cycles(&self) -> u64 {
        self.state().cycles
    }

    /// Stop consuming filesystem events; dropping the source stops the OS
    /// watch.
    pub fn detach_events(&self) {
        if self.state().events.take().is_some() {
            debug!(root = ?self.ctx.root(), "event source detached");
        }
    }

    /// Unregister and terminate every live script.
    pub fn close_all(&self) -> std::result::Result<(), CompositeCloseError> {
        let mut registry = std::mem::take(&mut self.state().registry);
        let closed = registry.len();
        let result = registry.close_all();
        debug!(root = ?self.ctx.root(), scripts = closed, "all scripts closed");
        result
    }
}
