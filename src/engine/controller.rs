// src/engine/controller.rs

use std::collections::HashMap;
use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};

use tracing::{info, warn};

use crate::config::EnvironmentSettings;
use crate::engine::environment::{EnvironmentSources, ScriptEnvironment};
use crate::errors::{Result, ScriptwatchError};
use crate::exec::Interpreter;
use crate::script::CompositeCloseError;

/// Owns every script environment of a host, at most one per root directory.
pub struct ScriptController {
    interpreter: Arc<dyn Interpreter>,
    defaults: EnvironmentSettings,
    environments: Mutex<HashMap<PathBuf, Arc<ScriptEnvironment>>>,
}

impl fmt::Debug for ScriptController {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptController")
            .field("defaults", &self.defaults)
            .field("environments", &self.environments().len())
            .finish_non_exhaustive()
    }
}

impl ScriptController {
    pub fn builder() -> ScriptControllerBuilder {
        ScriptControllerBuilder::default()
    }

    fn lock(&self) -> MutexGuard<'_, HashMap<PathBuf, Arc<ScriptEnvironment>>> {
        self.environments
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
    }

    pub fn defaults(&self) -> &EnvironmentSettings {
        &self.defaults
    }

    /// Start an environment on `root` with the default settings, reading the
    /// real filesystem.
    pub fn setup_environment(&self, root: impl AsRef<Path>) -> Result<Arc<ScriptEnvironment>> {
        let root = root.as_ref();
        if !root.is_dir() {
            return Err(ScriptwatchError::MissingRoot(root.to_path_buf()));
        }
        let sources = EnvironmentSources::real(root)?;
        self.setup_environment_with(root, self.defaults.clone(), sources)
    }

    /// Start an environment with explicit settings and sources.
    ///
    /// Fails with [`ScriptwatchError::DuplicateEnvironment`] if `root`
    /// already has a live environment.
    pub fn setup_environment_with(
        &self,
        root: impl AsRef<Path>,
        settings: EnvironmentSettings,
        sources: EnvironmentSources,
    ) -> Result<Arc<ScriptEnvironment>> {
        let root = root.as_ref();
        let key = environment_key(root);

        let mut environments = self.lock();
        if environments.contains_key(&key) {
            return Err(ScriptwatchError::DuplicateEnvironment(key));
        }

        let environment = Arc::new(ScriptEnvironment::start(
            root,
            settings,
            Arc::clone(&self.interpreter),
            sources,
        )?);
        environments.insert(key, Arc::clone(&environment));
        info!(root = ?root, "environment registered");
        Ok(environment)
    }

    pub fn environment(&self, root: impl AsRef<Path>) -> Option<Arc<ScriptEnvironment>> {
        self.lock().get(&environment_key(root.as_ref())).cloned()
    }

    /// Live environments, sorted by root.
    pub fn environments(&self) -> Vec<Arc<ScriptEnvironment>> {
        let mut out: Vec<Arc<ScriptEnvironment>> = self.lock().values().cloned().collect();
        out.sort_by(|a, b| a.root().cmp(b.root()));
        out
    }

    /// Close and forget the environment on `root`. Returns false if there
    /// was none.
    pub fn remove_environment(
        &self,
        root: impl AsRef<Path>,
    ) -> std::result::Result<bool, CompositeCloseError> {
        let removed = self.lock().remove(&environment_key(root.as_ref()));
        match removed {
            Some(environment) => environment.close().map(|()| true),
            None => Ok(false),
        }
    }

    /// Close every environment, attempting all of them before reporting.
    pub fn shutdown(&self) -> std::result::Result<(), CompositeCloseError> {
        let environments: Vec<Arc<ScriptEnvironment>> =
            self.lock().drain().map(|(_, env)| env).collect();

        let mut errors = Vec::new();
        for environment in environments {
            if let Err(err) = environment.close() {
                warn!(root = ?environment.root(), failures = err.errors.len(), "environment closed with errors");
                errors.extend(err.errors);
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(CompositeCloseError { errors })
        }
    }
}

/// Identity of a root: canonical when it exists, as given otherwise.
fn environment_key(root: &Path) -> PathBuf {
    root.canonicalize().unwrap_or_else(|_| root.to_path_buf())
}

#[derive(Default)]
pub struct ScriptControllerBuilder {
    interpreter: Option<Arc<dyn Interpreter>>,
    defaults: EnvironmentSettings,
    directories: Vec<PathBuf>,
}

impl fmt::Debug for ScriptControllerBuilder {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptControllerBuilder")
            .field("interpreter", &self.interpreter.is_some())
            .field("defaults", &self.defaults)
            .field("directories", &self.directories)
            .finish()
    }
}

impl ScriptControllerBuilder {
    pub fn interpreter(mut self, interpreter: Arc<dyn Interpreter>) -> Self {
        self.interpreter = Some(interpreter);
        self
    }

    /// Settings used by [`ScriptController::setup_environment`].
    pub fn defaults(mut self, settings: EnvironmentSettings) -> Self {
        self.defaults = settings;
        self
    }

    /// Directory to set up as soon as the controller is built.
    pub fn directory(mut self, root: impl Into<PathBuf>) -> Self {
        self.directories.push(root.into());
        self
    }

    pub fn build(self) -> Result<ScriptController> {
        let interpreter = self.interpreter.ok_or_else(|| {
            ScriptwatchError::ConfigError("a script controller needs an interpreter".to_string())
        })?;

        let controller = ScriptController {
            interpreter,
            defaults: self.defaults,
            environments: Mutex::new(HashMap::new()),
        };

        for root in &self.directories {
            if let Err(err) = controller.setup_environment(root) {
                if let Err(close_err) = controller.shutdown() {
                    warn!(failures = close_err.errors.len(), "cleanup after failed setup reported errors");
                }
                return Err(err);
            }
        }
        Ok(controller)
    }
}
