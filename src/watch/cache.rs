// src/watch/cache.rs

use std::collections::HashMap;
use std::path::Path;

use tracing::debug;

use crate::fs::FileSystem;
use crate::types::ScriptPath;
use crate::watch::hash::compute_file_hash;

/// Last observed content hash per script path.
///
/// Used when content hashing is enabled: a modify event for a file whose
/// bytes did not change (touch, editor save-without-change) is dropped
/// instead of reloading the script and everything that depends on it.
#[derive(Debug, Default)]
pub struct FileCache {
    hashes: HashMap<ScriptPath, String>,
}

impl FileCache {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record the current hash of `file` for `path`.
    ///
    /// Returns true if the content changed since the last observation (or was
    /// never observed). Unreadable files count as changed so the caller falls
    /// back to reloading.
    pub fn refresh(&mut self, fs: &dyn FileSystem, path: &ScriptPath, file: &Path) -> bool {
        let hash = match compute_file_hash(fs, file) {
            Ok(hash) => hash,
            Err(err) => {
                debug!(path = %path, error = %err, "could not hash file; treating as changed");
                self.hashes.remove(path);
                return true;
            }
        };

        match self.hashes.insert(path.clone(), hash.clone()) {
            Some(previous) if previous == hash => {
                debug!(path = %path, "content unchanged");
                false
            }
            _ => true,
        }
    }

    /// Forget the cached hash for a path (e.g. on unload).
    pub fn invalidate(&mut self, path: &ScriptPath) {
        if self.hashes.remove(path).is_some() {
            debug!(path = %path, "invalidated cached hash");
        }
    }
}
