// src/engine/environment.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex, PoisonError};
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tracing::{debug, info, warn};

use crate::config::EnvironmentSettings;
use crate::engine::graph::DependencyGraph;
use crate::engine::loader::ScriptLoader;
use crate::engine::{CycleReport, PreloadReport};
use crate::errors::{Result, ScriptwatchError};
use crate::exec::Interpreter;
use crate::exports::ExportRegistry;
use crate::fs::{FileSystem, RealFileSystem};
use crate::script::{CompositeCloseError, Script, ScriptContext};
use crate::types::ScriptPath;
use crate::watch::{EventSource, NotifyEventSource, WatchScope, WatchSet};

/// Where an environment reads files and change notifications from.
pub struct EnvironmentSources {
    pub fs: Arc<dyn FileSystem>,
    pub events: Box<dyn EventSource>,
}

impl fmt::Debug for EnvironmentSources {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSources")
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl EnvironmentSources {
    /// Disk plus a recursive `notify` watch on `root`.
    pub fn real(root: &Path) -> Result<Self> {
        Ok(Self {
            fs: Arc::new(RealFileSystem),
            events: Box::new(NotifyEventSource::new(root)?),
        })
    }
}

/// A running set of scripts rooted at one directory.
///
/// Starting an environment watches the init script and preloads until the
/// watch set settles. Afterwards cycles run on the configured timer and on
/// [`reload`](Self::reload).
pub struct ScriptEnvironment {
    root: PathBuf,
    settings: EnvironmentSettings,
    exports: Arc<ExportRegistry>,
    loader: Arc<ScriptLoader>,
    root_scope: WatchScope,
    poller: Mutex<Option<JoinHandle<()>>>,
    preload: PreloadReport,
    closed: AtomicBool,
}

impl fmt::Debug for ScriptEnvironment {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptEnvironment")
            .field("root", &self.root)
            .field("settings", &self.settings)
            .field("loader", &self.loader)
            .field("closed", &self.is_closed())
            .finish_non_exhaustive()
    }
}

impl ScriptEnvironment {
    pub fn start(
        root: impl Into<PathBuf>,
        settings: EnvironmentSettings,
        interpreter: Arc<dyn Interpreter>,
        sources: EnvironmentSources,
    ) -> Result<Self> {
        let root = root.into();
        if !sources.fs.is_dir(&root) {
            return Err(ScriptwatchError::MissingRoot(root));
        }

        if settings.poll_interval == Some(Duration::ZERO) {
            return Err(ScriptwatchError::ConfigError(
                "poll interval must be greater than zero".to_string(),
            ));
        }

        // Timed polling needs a runtime; fail before any script runs.
        let runtime = match settings.poll_interval {
            Some(_) => Some(Handle::try_current().map_err(|_| ScriptwatchError::NoRuntime)?),
            None => None,
        };

        let exports = Arc::new(ExportRegistry::new());
        let ctx = Arc::new(ScriptContext::new(
            root.clone(),
            interpreter,
            settings.bindings.clone(),
            Arc::clone(&exports),
            sources.fs,
        ));

        let watch_set = WatchSet::new();
        let loader = Arc::new(ScriptLoader::new(
            ctx,
            watch_set.clone(),
            &settings.exclude,
            settings.use_hash,
            Arc::clone(&settings.executor),
            sources.events,
        )?);

        let root_scope = watch_set.scope();
        root_scope.watch(settings.init_script.as_str());
        info!(root = ?root, init = %settings.init_script, "starting script environment");

        let preload = loader.preload(settings.preload_max_iterations);

        let poller = match (runtime, settings.poll_interval) {
            (Some(handle), Some(every)) => Some(spawn_poller(&handle, Arc::clone(&loader), every)),
            _ => None,
        };

        Ok(Self {
            root,
            settings,
            exports,
            loader,
            root_scope,
            poller: Mutex::new(poller),
            preload,
            closed: AtomicBool::new(false),
        })
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn settings(&self) -> &EnvironmentSettings {
        &self.settings
    }

    pub fn exports(&self) -> &Arc<ExportRegistry> {
        &self.exports
    }

    pub fn watch_set(&self) -> &WatchSet {
        self.loader.watch_set()
    }

    /// The environment's own watch scope (holds the init script).
    pub fn root_scope(&self) -> &WatchScope {
        &self.root_scope
    }

    /// Result of the preload run at startup.
    pub fn preload_report(&self) -> PreloadReport {
        self.preload
    }

    /// Run the preload loop again, e.g. after the host watched new paths.
    pub fn preload(&self) -> PreloadReport {
        self.loader.preload(self.settings.preload_max_iterations)
    }

    /// Run one cycle now. Waits for a cycle already in progress.
    pub fn reload(&self) -> CycleReport {
        if self.is_closed() {
            debug!(root = ?self.root, "reload on closed environment ignored");
            return CycleReport::default();
        }
        self.loader.reload()
    }

    pub fn script(&self, path: impl Into<ScriptPath>) -> Option<Arc<Script>> {
        self.loader.script(&path.into())
    }

    pub fn scripts(&self) -> Vec<Arc<Script>> {
        self.loader.scripts()
    }

    pub fn is_loaded(&self, path: impl Into<ScriptPath>) -> bool {
        self.loader.is_loaded(&path.into())
    }

    /// Watched paths, sorted.
    pub fn watched(&self) -> Vec<ScriptPath> {
        let mut paths: Vec<ScriptPath> = self.watch_set().snapshot().into_iter().collect();
        paths.sort();
        paths
    }

    pub fn dependency_graph(&self) -> DependencyGraph {
        DependencyGraph::from_scripts(&self.scripts())
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Stop the timer and the file watch, then terminate every script.
    /// Later calls do nothing.
    pub fn close(&self) -> std::result::Result<(), CompositeCloseError> {
        if self.closed.swap(true, Ordering::SeqCst) {
            return Ok(());
        }

        self.abort_poller();
        self.loader.detach_events();
        self.root_scope.close();
        let result = self.loader.close_all();
        info!(root = ?self.root, "script environment closed");
        result
    }

    fn abort_poller(&self) {
        let poller = self
            .poller
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .take();
        if let Some(handle) = poller {
            handle.abort();
            debug!(root = ?self.root, "reload timer stopped");
        }
    }
}

impl Drop for ScriptEnvironment {
    fn drop(&mut self) {
        self.abort_poller();
    }
}

/// Timer task: one cycle per tick on the blocking pool. Ticks that find a
/// cycle still running are dropped.
fn spawn_poller(handle: &Handle, loader: Arc<ScriptLoader>, every: Duration) -> JoinHandle<()> {
    handle.spawn(async move {
        let mut ticker = tokio::time::interval(every);
        ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
        // The first tick completes immediately; preload already covered it.
        ticker.tick().await;

        loop {
            ticker.tick().await;
            let loader = Arc::clone(&loader);
            match tokio::task::spawn_blocking(move || loader.try_reload()).await {
                Ok(Some(report)) if !report.is_empty() => {
                    debug!(changed = report.len(), "timed reload cycle finished");
                }
                Ok(_) => {}
                Err(err) => warn!(error = %err, "reload cycle task failed"),
            }
        }
    })
}
