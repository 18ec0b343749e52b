// src/engine/closure.rs

use std::collections::VecDeque;

use crate::engine::plan::OrderedPaths;
use crate::script::ScriptRegistry;
use crate::types::ScriptPath;

/// Every path reachable from `seeds` through `dependents_of`, seeds first,
/// then in breadth-first discovery order.
///
/// Each path is expanded at most once, so dependency cycles terminate.
pub fn resolve_reload_queue<I, F>(seeds: I, mut dependents_of: F) -> OrderedPaths
where
    I: IntoIterator<Item = ScriptPath>,
    F: FnMut(&ScriptPath) -> Vec<ScriptPath>,
{
    let mut visited = OrderedPaths::new();
    let mut worklist: VecDeque<ScriptPath> = seeds.into_iter().collect();

    while let Some(path) = worklist.pop_front() {
        if !visited.insert(path.clone()) {
            continue;
        }
        for dependent in dependents_of(&path) {
            if !visited.contains(&dependent) {
                worklist.push_back(dependent);
            }
        }
    }

    visited
}

/// [`resolve_reload_queue`] over the live scripts of `registry`.
pub fn dependency_closure<'a, I>(registry: &ScriptRegistry, seeds: I) -> OrderedPaths
where
    I: IntoIterator<Item = &'a ScriptPath>,
{
    resolve_reload_queue(seeds.into_iter().cloned(), |path| {
        registry.dependents_of(path)
    })
}
