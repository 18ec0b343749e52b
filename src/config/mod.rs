// src/config/mod.rs

//! Configuration for script environments.
//!
//! Responsibilities:
//! - Programmatic per-environment settings (`settings.rs`).
//! - The TOML-backed data model used by the binary (`model.rs`).
//! - Loading a config file from disk (`loader.rs`).
//! - Validating it (`validate.rs`).

pub mod loader;
pub mod model;
pub mod settings;
pub mod validate;

pub use loader::{default_config_path, load_and_validate, load_from_path};
pub use model::{ConfigFile, EnvironmentSection, RawConfigFile};
pub use settings::{EnvironmentSettings, EnvironmentSettingsBuilder};
