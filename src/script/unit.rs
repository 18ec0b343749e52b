// src/script/unit.rs

use std::collections::BTreeSet;
use std::fmt;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use anyhow::Result;
use tracing::debug;

use crate::exports::ExportRegistry;
use crate::script::bindings::Bindings;
use crate::script::closer::{Closer, CompositeCloseError, CompositeCloser};
use crate::script::context::ScriptContext;
use crate::script::logger::ScriptLogger;
use crate::types::ScriptPath;
use crate::watch::WatchScope;

static NEXT_ID: AtomicU64 = AtomicU64::new(1);

/// Lifecycle of one script instance.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptState {
    /// Registered, interpreter not yet invoked.
    Constructed,
    /// `run()` has been called.
    Running,
    /// Resources released. Terminal.
    Terminated,
}

/// One loaded instance of a script file.
///
/// A reload never re-runs an instance: the engine builds a fresh `Script`
/// for the same path and terminates the old one.
pub struct Script {
    id: u64,
    name: String,
    path: ScriptPath,
    file: PathBuf,
    ctx: Arc<ScriptContext>,
    dependencies: Mutex<BTreeSet<ScriptPath>>,
    scope: WatchScope,
    closers: CompositeCloser,
    logger: ScriptLogger,
    state: Mutex<ScriptState>,
}

impl fmt::Debug for Script {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Script")
            .field("id", &self.id)
            .field("name", &self.name)
            .field("path", &self.path)
            .field("state", &self.state())
            .finish_non_exhaustive()
    }
}

impl Script {
    pub fn new(ctx: Arc<ScriptContext>, path: ScriptPath, scope: WatchScope) -> Self {
        let name = path.stem().to_string();
        let file = path.to_path(ctx.root());
        let logger = ScriptLogger::new(name.clone(), path.clone());

        let mut dependencies = BTreeSet::new();
        dependencies.insert(path.clone());

        Self {
            id: NEXT_ID.fetch_add(1, Ordering::Relaxed),
            name,
            path,
            file,
            ctx,
            dependencies: Mutex::new(dependencies),
            scope,
            closers: CompositeCloser::new(),
            logger,
            state: Mutex::new(ScriptState::Constructed),
        }
    }

    /// Unique per instance; a reloaded script gets a new id.
    pub fn id(&self) -> u64 {
        self.id
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn path(&self) -> &ScriptPath {
        &self.path
    }

    /// Absolute location of the script file.
    pub fn file(&self) -> &Path {
        &self.file
    }

    pub fn root(&self) -> &Path {
        self.ctx.root()
    }

    pub fn logger(&self) -> &ScriptLogger {
        &self.logger
    }

    pub fn exports(&self) -> &Arc<ExportRegistry> {
        self.ctx.exports()
    }

    /// Resources released when this instance terminates.
    pub fn closers(&self) -> &CompositeCloser {
        &self.closers
    }

    /// This script's view of the environment watch set.
    pub fn watcher(&self) -> &WatchScope {
        &self.scope
    }

    pub fn state(&self) -> ScriptState {
        *lock(&self.state)
    }

    pub fn read_source(&self) -> Result<String> {
        self.ctx.fs().read_to_string(&self.file)
    }

    /// Declare that this script must reload whenever `path` changes.
    ///
    /// Self-references and paths outside the root are ignored. Returns true
    /// if the dependency is new.
    pub fn depend(&self, path: impl Into<ScriptPath>) -> bool {
        let path = path.into();
        if path == self.path {
            return false;
        }
        if path.escapes_root() {
            self.logger
                .warn(format!("ignoring dependency outside the script root: {path}"));
            return false;
        }
        lock(&self.dependencies).insert(path)
    }

    pub fn depends_on(&self, path: &ScriptPath) -> bool {
        lock(&self.dependencies).contains(path)
    }

    /// Declared dependencies, always including this script's own path.
    pub fn dependencies(&self) -> Vec<ScriptPath> {
        lock(&self.dependencies).iter().cloned().collect()
    }

    pub fn watch(&self, path: impl Into<ScriptPath>) -> bool {
        self.scope.watch(path)
    }

    pub fn unwatch(&self, path: impl Into<ScriptPath>) -> bool {
        self.scope.unwatch(path)
    }

    /// Watch another script and depend on it, so it is loaded alongside this
    /// one and changes to it reload this script.
    pub fn load(&self, path: impl Into<ScriptPath>) {
        let path = path.into();
        self.scope.watch(path.clone());
        self.depend(path);
    }

    /// Evaluate the script once.
    ///
    /// Interpreter errors and panics are logged against this script and never
    /// propagate. A second call is refused.
    pub fn run(&self) {
        {
            let mut state = lock(&self.state);
            if *state != ScriptState::Constructed {
                self.logger
                    .warn(format!("refusing to run script in state {:?}", *state));
                return;
            }
            *state = ScriptState::Running;
        }

        let bindings = self.build_bindings();
        debug!(script = %self.name, bindings = bindings.len(), "evaluating script");

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.ctx.interpreter().eval(self, &bindings)
        }));

        match outcome {
            Ok(Ok(())) => {}
            Ok(Err(err)) => self.logger.error(format!(
                "exception occurred whilst loading script ({}): {err:#}",
                self.path
            )),
            Err(_) => self.logger.error(format!(
                "interpreter panicked whilst loading script ({})",
                self.path
            )),
        }
    }

    fn build_bindings(&self) -> Bindings {
        let mut bindings = Bindings::new();
        let root = format!("{}/", self.ctx.root().to_string_lossy().replace('\\', "/"));

        bindings
            .put("script.name", self.name.as_str())
            .put("script.path", self.path.as_str())
            .put("script.file", self.file.to_string_lossy().replace('\\', "/"))
            .put("root", root);

        for supplier in self.ctx.bindings() {
            supplier.supply(self, &mut bindings);
        }
        bindings
    }

    /// Release everything this instance accumulated: its watch additions
    /// and every bound closer. Later calls do nothing.
    pub fn close(&self) -> Result<(), CompositeCloseError> {
        {
            let mut state = lock(&self.state);
            if *state == ScriptState::Terminated {
                return Ok(());
            }
            *state = ScriptState::Terminated;
        }

        debug!(script = %self.name, id = self.id, "terminating script");
        self.scope.close();
        self.closers.terminate()
    }
}

/// Wrap a shared script as a release action for a [`CompositeCloser`].
pub fn script_closer(script: Arc<Script>) -> impl Closer {
    move || -> Result<()> {
        script.close().map_err(|err| {
            anyhow::Error::new(err).context(format!("closing script {}", script.path))
        })
    }
}

fn lock<T>(m: &Mutex<T>) -> MutexGuard<'_, T> {
    m.lock().unwrap_or_else(PoisonError::into_inner)
}
