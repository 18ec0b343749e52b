// src/watch/path_utils.rs

//! Path helpers shared by the event drain and [`ScriptPath`](crate::types::ScriptPath).

use std::path::Path;

/// Express `path` relative to `root` with forward slashes.
///
/// Tries a plain `strip_prefix` first. Event paths reported by the OS may use
/// a different absolute prefix for the same directory (symlinked temp dirs,
/// `/private/var` on macOS), so on failure both sides are canonicalized and
/// the strip is retried. A deleted file cannot be canonicalized; in that case
/// only its parent directory is, and the file name is re-attached.
///
/// Returns `None` if the path does not live under `root`.
pub fn relative_str(root: &Path, path: &Path) -> Option<String> {
    if let Ok(rel) = path.strip_prefix(root) {
        return Some(to_slash(rel));
    }

    let root_canon = root.canonicalize().ok()?;

    let path_canon = match path.canonicalize() {
        Ok(p) => p,
        Err(_) => {
            let parent = path.parent()?.canonicalize().ok()?;
            parent.join(path.file_name()?)
        }
    };

    path_canon
        .strip_prefix(&root_canon)
        .ok()
        .map(to_slash)
}

fn to_slash(rel: &Path) -> String {
    rel.to_string_lossy().replace('\\', "/")
}
