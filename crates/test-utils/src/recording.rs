use std::collections::{BTreeMap, HashMap};
use std::sync::{Arc, Mutex};

use scriptwatch::exec::Interpreter;
use scriptwatch::script::{Binding, Bindings, Script};
use scriptwatch::types::ScriptPath;

type Behaviour = Arc<dyn Fn(&Script) -> anyhow::Result<()> + Send + Sync>;

/// One interpreter call (or the matching termination).
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Invocation {
    pub path: ScriptPath,
    pub id: u64,
}

#[derive(Default)]
struct Inner {
    runs: Mutex<Vec<Invocation>>,
    terminations: Mutex<Vec<Invocation>>,
    bindings: Mutex<HashMap<ScriptPath, BTreeMap<String, String>>>,
    behaviours: Mutex<HashMap<ScriptPath, Behaviour>>,
}

/// Interpreter for tests that:
/// - records every run (path + instance id) and the text bindings it saw
/// - binds a closer to each instance that records its termination
/// - optionally runs per-path behaviour (e.g. `script.load("lib.js")`).
///
/// Clones share the same records.
#[derive(Clone, Default)]
pub struct RecordingInterpreter {
    inner: Arc<Inner>,
}

impl RecordingInterpreter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Run `f` whenever the script at `path` is evaluated.
    pub fn on<F>(self, path: &str, f: F) -> Self
    where
        F: Fn(&Script) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.inner
            .behaviours
            .lock()
            .unwrap()
            .insert(ScriptPath::new(path), Arc::new(f));
        self
    }

    /// The script at `path` loads (watches and depends on) each of `deps`.
    pub fn loads(self, path: &str, deps: &[&str]) -> Self {
        let deps: Vec<ScriptPath> = deps.iter().map(|d| ScriptPath::new(d)).collect();
        self.on(path, move |script| {
            for dep in &deps {
                script.load(dep);
            }
            Ok(())
        })
    }

    /// The script at `path` depends on each of `deps` without watching them.
    pub fn depends(self, path: &str, deps: &[&str]) -> Self {
        let deps: Vec<ScriptPath> = deps.iter().map(|d| ScriptPath::new(d)).collect();
        self.on(path, move |script| {
            for dep in &deps {
                script.depend(dep);
            }
            Ok(())
        })
    }

    pub fn runs(&self) -> Vec<Invocation> {
        self.inner.runs.lock().unwrap().clone()
    }

    pub fn run_paths(&self) -> Vec<String> {
        self.runs().into_iter().map(|i| i.path.to_string()).collect()
    }

    pub fn runs_of(&self, path: &str) -> usize {
        let path = ScriptPath::new(path);
        self.runs().iter().filter(|i| i.path == path).count()
    }

    pub fn terminations(&self) -> Vec<Invocation> {
        self.inner.terminations.lock().unwrap().clone()
    }

    pub fn terminated_paths(&self) -> Vec<String> {
        self.terminations()
            .into_iter()
            .map(|i| i.path.to_string())
            .collect()
    }

    pub fn terminations_of(&self, path: &str) -> usize {
        let path = ScriptPath::new(path);
        self.terminations().iter().filter(|i| i.path == path).count()
    }

    /// Text bindings seen by the latest run of `path`.
    pub fn bindings_of(&self, path: &str) -> Option<BTreeMap<String, String>> {
        self.inner
            .bindings
            .lock()
            .unwrap()
            .get(&ScriptPath::new(path))
            .cloned()
    }

    /// Forget recorded runs and terminations (behaviours stay).
    pub fn clear(&self) {
        self.inner.runs.lock().unwrap().clear();
        self.inner.terminations.lock().unwrap().clear();
    }
}

impl Interpreter for RecordingInterpreter {
    fn eval(&self, script: &Script, bindings: &Bindings) -> anyhow::Result<()> {
        let invocation = Invocation {
            path: script.path().clone(),
            id: script.id(),
        };
        self.inner.runs.lock().unwrap().push(invocation.clone());

        let text: BTreeMap<String, String> = bindings
            .iter()
            .filter_map(|(name, value)| match value {
                Binding::Text(text) => Some((name.to_string(), text.clone())),
                Binding::Value(_) => None,
            })
            .collect();
        self.inner
            .bindings
            .lock()
            .unwrap()
            .insert(script.path().clone(), text);

        let inner = Arc::clone(&self.inner);
        script.closers().bind(move || -> anyhow::Result<()> {
            inner.terminations.lock().unwrap().push(invocation);
            Ok(())
        });

        let behaviour = self
            .inner
            .behaviours
            .lock()
            .unwrap()
            .get(script.path())
            .cloned();
        match behaviour {
            Some(f) => f(script),
            None => Ok(()),
        }
    }
}
