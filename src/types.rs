// src/types.rs

use std::fmt;
use std::path::{Component, Path, PathBuf};

use crate::watch::path_utils::relative_str;

/// Identity key for a trackable script file.
///
/// Relative to the environment root, forward-slash separated, with `.`
/// components dropped and `..` resolved lexically. Two paths naming the
/// same file through different spellings (`./lib/a.js`, `lib//a.js`,
/// `lib/x/../a.js`) compare equal.
///
/// A `..` that climbs above the root is kept (`../shared.js`) and an
/// absolute input keeps its leading `/`, so such paths never alias a file
/// inside the root. See [`escapes_root`](Self::escapes_root).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ScriptPath(String);

impl ScriptPath {
    pub fn new(path: impl AsRef<Path>) -> Self {
        let mut parts: Vec<String> = Vec::new();
        let mut absolute = false;
        for component in path.as_ref().components() {
            match component {
                Component::Normal(part) => {
                    parts.push(part.to_string_lossy().replace('\\', "/"));
                }
                Component::ParentDir => match parts.last() {
                    Some(last) if last != ".." => {
                        parts.pop();
                    }
                    // `/..` is `/`.
                    _ if absolute => {}
                    _ => parts.push("..".to_string()),
                },
                Component::RootDir | Component::Prefix(_) => absolute = true,
                Component::CurDir => {}
            }
        }

        let joined = parts.join("/");
        if absolute {
            Self(format!("/{joined}"))
        } else {
            Self(joined)
        }
    }

    /// True for absolute paths and paths that climb above the root. Such
    /// paths are never watched or tracked as dependencies.
    pub fn escapes_root(&self) -> bool {
        self.0.starts_with('/') || self.0 == ".." || self.0.starts_with("../")
    }

    /// Relativize an absolute path (e.g. from a filesystem event) against
    /// `root`. Returns `None` for paths outside the root.
    pub fn from_absolute(root: &Path, path: &Path) -> Option<Self> {
        relative_str(root, path).map(Self::new)
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Resolve against the environment root.
    pub fn to_path(&self, root: &Path) -> PathBuf {
        if self.0.starts_with('/') {
            return PathBuf::from(&self.0);
        }
        let mut out = root.to_path_buf();
        for part in self.0.split('/').filter(|p| !p.is_empty()) {
            out.push(part);
        }
        out
    }

    /// Last path segment, e.g. `a.js` for `lib/a.js`.
    pub fn file_name(&self) -> &str {
        self.0.rsplit('/').next().unwrap_or(&self.0)
    }

    /// File name without its extension; used as the script's display name.
    pub fn stem(&self) -> &str {
        let name = self.file_name();
        match name.rfind('.') {
            Some(0) | None => name,
            Some(idx) => &name[..idx],
        }
    }
}

impl fmt::Display for ScriptPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ScriptPath {
    fn from(s: &str) -> Self {
        Self::new(s)
    }
}

impl From<String> for ScriptPath {
    fn from(s: String) -> Self {
        Self::new(s)
    }
}

impl From<&ScriptPath> for ScriptPath {
    fn from(p: &ScriptPath) -> Self {
        p.clone()
    }
}

impl From<&Path> for ScriptPath {
    fn from(p: &Path) -> Self {
        Self::new(p)
    }
}
