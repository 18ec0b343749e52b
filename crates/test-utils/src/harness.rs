use std::path::PathBuf;
use std::sync::Arc;

use scriptwatch::config::EnvironmentSettings;
use scriptwatch::engine::{CycleReport, EnvironmentSources, ScriptEnvironment};
use scriptwatch::errors::Result;
use scriptwatch::fs::mock::MockFileSystem;
use scriptwatch::watch::{event_channel, EventSender};

use crate::recording::RecordingInterpreter;

/// Root directory of every harness environment (in the mock filesystem).
pub const ROOT: &str = "/scripts";

/// A script environment over an in-memory filesystem with hand-fed events.
///
/// File helpers change the mock filesystem *and* send the matching event,
/// the way an OS watcher would report them. Cycles only run on
/// [`reload`](Self::reload).
pub struct EnvironmentHarness {
    pub fs: MockFileSystem,
    pub events: EventSender,
    pub interpreter: RecordingInterpreter,
    pub env: ScriptEnvironment,
}

impl EnvironmentHarness {
    /// Start with default settings (init script `init.js`, manual reloads).
    pub fn start(files: &[(&str, &str)], interpreter: RecordingInterpreter) -> Self {
        let settings = EnvironmentSettings::builder().manual_reload().build();
        Self::start_with(files, interpreter, settings).expect("harness environment starts")
    }

    pub fn start_with(
        files: &[(&str, &str)],
        interpreter: RecordingInterpreter,
        settings: EnvironmentSettings,
    ) -> Result<Self> {
        let fs = MockFileSystem::new();
        fs.add_dir(ROOT);
        for (rel, content) in files {
            fs.add_file(abs(rel), *content);
        }

        let (events, source) = event_channel();
        let sources = EnvironmentSources {
            fs: Arc::new(fs.clone()),
            events: Box::new(source),
        };
        let env = ScriptEnvironment::start(
            ROOT,
            settings,
            Arc::new(interpreter.clone()),
            sources,
        )?;

        Ok(Self {
            fs,
            events,
            interpreter,
            env,
        })
    }

    pub fn path(&self, rel: &str) -> PathBuf {
        abs(rel)
    }

    pub fn create(&self, rel: &str, content: &str) {
        self.fs.add_file(abs(rel), content);
        self.events.created(abs(rel));
    }

    pub fn modify(&self, rel: &str, content: &str) {
        self.fs.add_file(abs(rel), content);
        self.events.modified(abs(rel));
    }

    pub fn delete(&self, rel: &str) {
        self.fs.remove_file(abs(rel));
        self.events.removed(abs(rel));
    }

    pub fn reload(&self) -> CycleReport {
        self.env.reload()
    }

    /// Paths of live scripts, sorted.
    pub fn loaded(&self) -> Vec<String> {
        self.env
            .scripts()
            .iter()
            .map(|s| s.path().to_string())
            .collect()
    }

    pub fn watched(&self) -> Vec<String> {
        self.env.watched().iter().map(|p| p.to_string()).collect()
    }
}

fn abs(rel: &str) -> PathBuf {
    PathBuf::from(ROOT).join(rel)
}
