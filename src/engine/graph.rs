// src/engine/graph.rs

use std::collections::HashMap;
use std::sync::Arc;

use petgraph::algo::tarjan_scc;
use petgraph::graph::{DiGraph, NodeIndex};
use petgraph::visit::EdgeRef;

use crate::script::Script;
use crate::types::ScriptPath;

/// Snapshot of declared dependencies between live scripts, for diagnostics.
///
/// Edge direction: script -> dependency. Dependencies that are plain files
/// (not loaded scripts) appear as nodes too.
#[derive(Debug, Clone, Default)]
pub struct DependencyGraph {
    graph: DiGraph<ScriptPath, ()>,
    index: HashMap<ScriptPath, NodeIndex>,
}

impl DependencyGraph {
    pub fn from_scripts(scripts: &[Arc<Script>]) -> Self {
        let mut out = Self::default();

        let mut sorted: Vec<&Arc<Script>> = scripts.iter().collect();
        sorted.sort_by(|a, b| a.path().cmp(b.path()));

        for script in &sorted {
            out.node(script.path());
        }
        for script in sorted {
            let from = out.node(script.path());
            for dep in script.dependencies() {
                if &dep == script.path() {
                    continue;
                }
                let to = out.node(&dep);
                out.graph.update_edge(from, to, ());
            }
        }
        out
    }

    fn node(&mut self, path: &ScriptPath) -> NodeIndex {
        if let Some(idx) = self.index.get(path) {
            return *idx;
        }
        let idx = self.graph.add_node(path.clone());
        self.index.insert(path.clone(), idx);
        idx
    }

    pub fn node_count(&self) -> usize {
        self.graph.node_count()
    }

    pub fn edge_count(&self) -> usize {
        self.graph.edge_count()
    }

    /// Direct dependencies of `path`, sorted.
    pub fn dependencies_of(&self, path: &ScriptPath) -> Vec<ScriptPath> {
        let Some(idx) = self.index.get(path) else {
            return Vec::new();
        };
        let mut deps: Vec<ScriptPath> = self
            .graph
            .edges(*idx)
            .map(|e| self.graph[e.target()].clone())
            .collect();
        deps.sort();
        deps
    }

    /// Groups of scripts that (transitively) depend on each other. Each group
    /// and the list of groups are sorted.
    pub fn cycles(&self) -> Vec<Vec<ScriptPath>> {
        let mut cycles: Vec<Vec<ScriptPath>> = tarjan_scc(&self.graph)
            .into_iter()
            .filter(|scc| scc.len() > 1)
            .map(|scc| {
                let mut paths: Vec<ScriptPath> =
                    scc.into_iter().map(|idx| self.graph[idx].clone()).collect();
                paths.sort();
                paths
            })
            .collect();
        cycles.sort();
        cycles
    }

    /// One `a -> b` line per edge, sorted; scripts without dependencies get
    /// a bare line.
    pub fn render(&self) -> Vec<String> {
        let mut nodes: Vec<&ScriptPath> = self.index.keys().collect();
        nodes.sort();

        let mut lines = Vec::new();
        for path in nodes {
            let deps = self.dependencies_of(path);
            if deps.is_empty() {
                lines.push(path.to_string());
            }
            for dep in deps {
                lines.push(format!("{path} -> {dep}"));
            }
        }
        lines
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::exec::Interpreter;
    use crate::exports::ExportRegistry;
    use crate::fs::mock::MockFileSystem;
    use crate::script::{Bindings, ScriptContext};
    use crate::watch::WatchSet;

    fn scripts(decls: &[(&str, Vec<&str>)]) -> Vec<Arc<Script>> {
        let noop: Arc<dyn Interpreter> =
            Arc::new(|_: &Script, _: &Bindings| -> anyhow::Result<()> { Ok(()) });
        let ctx = Arc::new(ScriptContext::new(
            "/scripts",
            noop,
            Vec::new(),
            Arc::new(ExportRegistry::new()),
            Arc::new(MockFileSystem::new()),
        ));
        let set = WatchSet::new();

        decls
            .iter()
            .map(|(path, deps)| {
                let script = Script::new(ctx.clone(), (*path).into(), set.scope());
                for dep in deps {
                    script.depend(*dep);
                }
                Arc::new(script)
            })
            .collect()
    }

    #[test]
    fn renders_sorted_edges() {
        let graph = DependencyGraph::from_scripts(&scripts(&[
            ("init.sh", vec!["lib.sh", "config.env"]),
            ("lib.sh", vec![]),
        ]));

        assert_eq!(
            graph.render(),
            vec!["config.env", "init.sh -> config.env", "init.sh -> lib.sh", "lib.sh"]
        );
        assert!(graph.cycles().is_empty());
    }

    #[test]
    fn reports_mutual_dependencies_as_cycles() {
        let graph = DependencyGraph::from_scripts(&scripts(&[
            ("a.sh", vec!["b.sh"]),
            ("b.sh", vec!["a.sh"]),
            ("c.sh", vec!["a.sh"]),
        ]));

        assert_eq!(
            graph.cycles(),
            vec![vec![ScriptPath::new("a.sh"), ScriptPath::new("b.sh")]]
        );
        assert_eq!(graph.edge_count(), 3);
    }
}
