// src/errors.rs

//! Crate-wide error type and result alias.

use std::path::PathBuf;

use thiserror::Error;

#[derive(Error, Debug)]
pub enum ScriptwatchError {
    #[error("Configuration error: {0}")]
    ConfigError(String),

    #[error("An environment is already set up at {0:?}")]
    DuplicateEnvironment(PathBuf),

    #[error("Script root {0:?} is not a directory")]
    MissingRoot(PathBuf),

    #[error("Timed polling requires a running tokio runtime")]
    NoRuntime,

    #[error("Invalid glob pattern: {0}")]
    InvalidPattern(#[from] globset::Error),

    #[error("File watch error: {0}")]
    WatchError(#[from] notify::Error),

    #[error("IO error: {0}")]
    IoError(#[from] std::io::Error),

    #[error("TOML parsing error: {0}")]
    TomlError(#[from] toml::de::Error),

    #[error(transparent)]
    Other(#[from] anyhow::Error),
}

pub use anyhow::Error;
pub type Result<T> = std::result::Result<T, ScriptwatchError>;
