// src/config/settings.rs

//! Per-environment settings handed to [`ScriptEnvironment`](crate::engine::ScriptEnvironment).

use std::fmt;
use std::sync::Arc;
use std::time::Duration;

use crate::exec::{InlineExecutor, ScriptExecutor};
use crate::script::BindingsSupplier;

pub const DEFAULT_INIT_SCRIPT: &str = "init.js";
pub const DEFAULT_POLL_INTERVAL: Duration = Duration::from_secs(1);
pub const DEFAULT_PRELOAD_MAX_ITERATIONS: usize = 64;

#[derive(Clone)]
pub struct EnvironmentSettings {
    /// Root-relative path of the script watched first.
    pub init_script: String,
    /// Timer period for reload cycles. `None` leaves cycles to the host
    /// (`ScriptEnvironment::reload`).
    pub poll_interval: Option<Duration>,
    /// Applied in order before every run; later suppliers overwrite names.
    pub bindings: Vec<Arc<dyn BindingsSupplier>>,
    pub executor: Arc<dyn ScriptExecutor>,
    /// Globs (root-relative) whose filesystem events are ignored.
    pub exclude: Vec<String>,
    /// Skip reloads of scripts whose content hash did not change.
    pub use_hash: bool,
    pub preload_max_iterations: usize,
}

impl fmt::Debug for EnvironmentSettings {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnvironmentSettings")
            .field("init_script", &self.init_script)
            .field("poll_interval", &self.poll_interval)
            .field("bindings", &self.bindings.len())
            .field("exclude", &self.exclude)
            .field("use_hash", &self.use_hash)
            .field("preload_max_iterations", &self.preload_max_iterations)
            .finish_non_exhaustive()
    }
}

impl Default for EnvironmentSettings {
    fn default() -> Self {
        Self {
            init_script: DEFAULT_INIT_SCRIPT.to_string(),
            poll_interval: Some(DEFAULT_POLL_INTERVAL),
            bindings: Vec::new(),
            executor: Arc::new(InlineExecutor),
            exclude: Vec::new(),
            use_hash: false,
            preload_max_iterations: DEFAULT_PRELOAD_MAX_ITERATIONS,
        }
    }
}

impl EnvironmentSettings {
    pub fn builder() -> EnvironmentSettingsBuilder {
        EnvironmentSettingsBuilder::default()
    }

    /// Builder seeded with these settings, for per-environment overrides of
    /// controller defaults.
    pub fn to_builder(&self) -> EnvironmentSettingsBuilder {
        EnvironmentSettingsBuilder {
            settings: self.clone(),
        }
    }
}

#[derive(Debug, Default)]
pub struct EnvironmentSettingsBuilder {
    settings: EnvironmentSettings,
}

impl EnvironmentSettingsBuilder {
    pub fn init_script(mut self, path: impl Into<String>) -> Self {
        self.settings.init_script = path.into();
        self
    }

    pub fn poll_interval(mut self, every: Duration) -> Self {
        self.settings.poll_interval = Some(every);
        self
    }

    /// Disable the timer; cycles only run on `reload()`.
    pub fn manual_reload(mut self) -> Self {
        self.settings.poll_interval = None;
        self
    }

    pub fn binding(mut self, supplier: Arc<dyn BindingsSupplier>) -> Self {
        self.settings.bindings.push(supplier);
        self
    }

    pub fn executor(mut self, executor: Arc<dyn ScriptExecutor>) -> Self {
        self.settings.executor = executor;
        self
    }

    pub fn exclude(mut self, pattern: impl Into<String>) -> Self {
        self.settings.exclude.push(pattern.into());
        self
    }

    pub fn use_hash(mut self, enabled: bool) -> Self {
        self.settings.use_hash = enabled;
        self
    }

    pub fn preload_max_iterations(mut self, limit: usize) -> Self {
        self.settings.preload_max_iterations = limit;
        self
    }

    pub fn build(self) -> EnvironmentSettings {
        self.settings
    }
}
