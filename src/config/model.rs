// src/config/model.rs

use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::time::Duration;

use serde::Deserialize;

use crate::config::settings::{
    DEFAULT_INIT_SCRIPT, DEFAULT_PRELOAD_MAX_ITERATIONS, EnvironmentSettings,
};
use crate::script::from_map;

/// Top-level configuration as read from `Scriptwatch.toml`.
///
/// ```toml
/// [environment]
/// root = "scripts"
/// init_script = "init.sh"
/// poll_interval_ms = 500
/// exclude = ["**/*.swp", ".git/**"]
/// use_hash = true
///
/// [bindings]
/// stage = "dev"
/// ```
///
/// All sections are optional and have reasonable defaults.
#[derive(Debug, Clone, Deserialize, Default)]
pub struct RawConfigFile {
    #[serde(default)]
    pub environment: EnvironmentSection,

    /// Text bindings handed to every script run.
    #[serde(default)]
    pub bindings: BTreeMap<String, String>,
}

/// `[environment]` section.
#[derive(Debug, Clone, Deserialize)]
pub struct EnvironmentSection {
    /// Script root. Relative paths are resolved against the directory that
    /// holds the config file.
    #[serde(default = "default_root")]
    pub root: PathBuf,

    #[serde(default = "default_init_script")]
    pub init_script: String,

    #[serde(default = "default_poll_interval_ms")]
    pub poll_interval_ms: u64,

    /// Disable the reload timer entirely.
    #[serde(default)]
    pub manual_reload: bool,

    #[serde(default)]
    pub exclude: Vec<String>,

    #[serde(default)]
    pub use_hash: bool,

    #[serde(default = "default_preload_max_iterations")]
    pub preload_max_iterations: usize,
}

fn default_root() -> PathBuf {
    PathBuf::from(".")
}

fn default_init_script() -> String {
    DEFAULT_INIT_SCRIPT.to_string()
}

fn default_poll_interval_ms() -> u64 {
    1000
}

fn default_preload_max_iterations() -> usize {
    DEFAULT_PRELOAD_MAX_ITERATIONS
}

impl Default for EnvironmentSection {
    fn default() -> Self {
        Self {
            root: default_root(),
            init_script: default_init_script(),
            poll_interval_ms: default_poll_interval_ms(),
            manual_reload: false,
            exclude: Vec::new(),
            use_hash: false,
            preload_max_iterations: default_preload_max_iterations(),
        }
    }
}

/// Validated configuration. Only produced through `TryFrom<RawConfigFile>`.
#[derive(Debug, Clone)]
pub struct ConfigFile {
    pub environment: EnvironmentSection,
    pub bindings: BTreeMap<String, String>,
}

impl ConfigFile {
    pub(crate) fn new_unchecked(
        environment: EnvironmentSection,
        bindings: BTreeMap<String, String>,
    ) -> Self {
        Self {
            environment,
            bindings,
        }
    }

    /// Script root, resolved against `config_dir` when relative.
    pub fn root(&self, config_dir: &Path) -> PathBuf {
        if self.environment.root.is_absolute() {
            self.environment.root.clone()
        } else {
            config_dir.join(&self.environment.root)
        }
    }

    pub fn poll_interval(&self) -> Option<Duration> {
        if self.environment.manual_reload {
            None
        } else {
            Some(Duration::from_millis(self.environment.poll_interval_ms))
        }
    }

    /// Settings for the configured environment. The executor is left at its
    /// default; hosts pick their own.
    pub fn to_settings(&self) -> EnvironmentSettings {
        let env = &self.environment;
        let mut builder = EnvironmentSettings::builder()
            .init_script(env.init_script.clone())
            .use_hash(env.use_hash)
            .preload_max_iterations(env.preload_max_iterations);

        builder = match self.poll_interval() {
            Some(every) => builder.poll_interval(every),
            None => builder.manual_reload(),
        };
        for pattern in &env.exclude {
            builder = builder.exclude(pattern.clone());
        }
        if !self.bindings.is_empty() {
            builder = builder.binding(from_map(self.bindings.clone()));
        }
        builder.build()
    }
}
