// tests/script_lifecycle.rs

mod common;
use crate::common::{init_tracing, EnvironmentHarness, RecordingInterpreter};

use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use scriptwatch::script::ScriptState;
use scriptwatch::types::ScriptPath;

fn counting_closer(count: &Arc<AtomicUsize>) -> impl FnOnce() -> anyhow::Result<()> + Send + 'static {
    let count = Arc::clone(count);
    move || {
        count.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}

#[test]
fn terminated_script_refuses_watches_and_releases_late_closers_at_once() {
    init_tracing();

    let h = EnvironmentHarness::start(&[("init.js", ""), ("late.js", "")], RecordingInterpreter::new());
    let script = h.env.script("init.js").unwrap();
    h.env.close().unwrap();
    assert_eq!(script.state(), ScriptState::Terminated);

    assert!(!script.watch("late.js"));
    assert!(!h.env.watch_set().contains(&ScriptPath::new("late.js")));

    let released = Arc::new(AtomicUsize::new(0));
    script.closers().bind(counting_closer(&released));
    assert_eq!(released.load(Ordering::SeqCst), 1);
    assert!(script.closers().is_empty());
}

#[test]
fn replaced_instance_cannot_pin_paths_after_a_reload() {
    init_tracing();

    let h = EnvironmentHarness::start(&[("init.js", ""), ("late.js", "")], RecordingInterpreter::new());
    let old = h.env.script("init.js").unwrap();

    h.modify("init.js", "v2");
    h.reload();
    assert_eq!(old.state(), ScriptState::Terminated);

    // The old instance's interpreter is still finishing on another worker.
    let released = Arc::new(AtomicUsize::new(0));
    assert!(!old.watch("late.js"));
    old.closers().bind(counting_closer(&released));
    assert_eq!(released.load(Ordering::SeqCst), 1);

    assert!(h.reload().is_empty());
    assert!(!h.env.is_loaded("late.js"));
    assert_eq!(h.loaded(), vec!["init.js"]);
}

#[test]
fn dependencies_outside_the_root_are_ignored() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().on("init.js", |script| {
        script.load("../shared.js");
        script.depend("/etc/hosts");
        Ok(())
    });
    let h = EnvironmentHarness::start(&[("init.js", "")], interpreter);

    let init = h.env.script("init.js").unwrap();
    assert_eq!(init.dependencies(), vec![ScriptPath::new("init.js")]);
    assert_eq!(h.watched(), vec!["init.js"]);
    assert!(h.env.preload_report().settled);
}
