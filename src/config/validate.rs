// src/config/validate.rs

use std::path::Path;

use crate::config::model::{ConfigFile, RawConfigFile};
use crate::errors::{Result, ScriptwatchError};
use crate::watch::ExcludeFilter;

impl TryFrom<RawConfigFile> for ConfigFile {
    type Error = ScriptwatchError;

    fn try_from(raw: RawConfigFile) -> std::result::Result<Self, Self::Error> {
        validate_raw_config(&raw)?;
        Ok(ConfigFile::new_unchecked(raw.environment, raw.bindings))
    }
}

fn validate_raw_config(cfg: &RawConfigFile) -> Result<()> {
    validate_environment(cfg)?;
    validate_bindings(cfg)?;
    Ok(())
}

fn validate_environment(cfg: &RawConfigFile) -> Result<()> {
    let env = &cfg.environment;

    if env.init_script.trim().is_empty() {
        return Err(ScriptwatchError::ConfigError(
            "[environment].init_script must not be empty".to_string(),
        ));
    }
    if Path::new(&env.init_script).is_absolute() {
        return Err(ScriptwatchError::ConfigError(format!(
            "[environment].init_script must be relative to the root (got {:?})",
            env.init_script
        )));
    }

    if env.poll_interval_ms == 0 {
        return Err(ScriptwatchError::ConfigError(
            "[environment].poll_interval_ms must be >= 1 (got 0)".to_string(),
        ));
    }

    if env.preload_max_iterations == 0 {
        return Err(ScriptwatchError::ConfigError(
            "[environment].preload_max_iterations must be >= 1 (got 0)".to_string(),
        ));
    }

    ExcludeFilter::new(&env.exclude)?;
    Ok(())
}

fn validate_bindings(cfg: &RawConfigFile) -> Result<()> {
    for name in cfg.bindings.keys() {
        if name.trim().is_empty() {
            return Err(ScriptwatchError::ConfigError(
                "[bindings] keys must not be empty".to_string(),
            ));
        }
    }
    Ok(())
}
