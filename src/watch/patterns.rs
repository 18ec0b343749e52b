// src/watch/patterns.rs

use std::fmt;

use globset::{Glob, GlobSet, GlobSetBuilder};

use crate::errors::Result;
use crate::types::ScriptPath;

/// Compiled `exclude` globs for an environment.
///
/// Patterns are matched against root-relative [`ScriptPath`]s, e.g.
/// `"**/*.swp"` or `".git/**"`. Matching events are dropped during the
/// filesystem drain before classification, so editor swap files and VCS
/// metadata never trigger reloads.
#[derive(Clone, Default)]
pub struct ExcludeFilter {
    patterns: Vec<String>,
    set: Option<GlobSet>,
}

impl fmt::Debug for ExcludeFilter {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ExcludeFilter")
            .field("patterns", &self.patterns)
            .finish_non_exhaustive()
    }
}

impl ExcludeFilter {
    pub fn new(patterns: &[String]) -> Result<Self> {
        if patterns.is_empty() {
            return Ok(Self::default());
        }
        Ok(Self {
            patterns: patterns.to_vec(),
            set: Some(build_globset(patterns)?),
        })
    }

    pub fn patterns(&self) -> &[String] {
        &self.patterns
    }

    pub fn is_excluded(&self, path: &ScriptPath) -> bool {
        match &self.set {
            Some(set) => set.is_match(path.as_str()),
            None => false,
        }
    }
}

/// Build a GlobSet from simple string patterns.
fn build_globset(patterns: &[String]) -> Result<GlobSet> {
    let mut builder = GlobSetBuilder::new();
    for pat in patterns {
        builder.add(Glob::new(pat)?);
    }
    Ok(builder.build()?)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_filter_excludes_nothing() {
        let filter = ExcludeFilter::new(&[]).unwrap();
        assert!(!filter.is_excluded(&ScriptPath::new("init.js")));
    }

    #[test]
    fn matches_relative_paths() {
        let filter =
            ExcludeFilter::new(&["**/*.swp".to_string(), ".git/**".to_string()]).unwrap();

        assert!(filter.is_excluded(&ScriptPath::new("lib/.init.js.swp")));
        assert!(filter.is_excluded(&ScriptPath::new(".git/HEAD")));
        assert!(!filter.is_excluded(&ScriptPath::new("lib/init.js")));
    }

    #[test]
    fn invalid_pattern_is_an_error() {
        assert!(ExcludeFilter::new(&["a[".to_string()]).is_err());
    }
}
