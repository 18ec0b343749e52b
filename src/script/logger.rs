// src/script/logger.rs

use std::fmt::Display;

use tracing::{error, info, warn};

use crate::types::ScriptPath;

/// Logger handle given to each script.
///
/// Every event carries the script's name and path, so output from many
/// scripts sharing one subscriber stays attributable.
#[derive(Debug, Clone)]
pub struct ScriptLogger {
    name: String,
    path: ScriptPath,
}

impl ScriptLogger {
    pub fn new(name: impl Into<String>, path: ScriptPath) -> Self {
        Self {
            name: name.into(),
            path,
        }
    }

    pub fn info(&self, message: impl Display) {
        info!(target: "scriptwatch::script", script = %self.name, path = %self.path, "{message}");
    }

    pub fn warn(&self, message: impl Display) {
        warn!(target: "scriptwatch::script", script = %self.name, path = %self.path, "{message}");
    }

    pub fn error(&self, message: impl Display) {
        error!(target: "scriptwatch::script", script = %self.name, path = %self.path, "{message}");
    }
}
