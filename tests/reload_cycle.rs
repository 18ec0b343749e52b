// tests/reload_cycle.rs

mod common;
use crate::common::{init_tracing, EnvironmentHarness, RecordingInterpreter};

use scriptwatch::engine::CycleReport;
use scriptwatch::fs::FileSystem;
use scriptwatch::types::ScriptPath;

fn paths(list: &[ScriptPath]) -> Vec<&str> {
    list.iter().map(|p| p.as_str()).collect()
}

#[test]
fn preload_follows_loads_until_the_watch_set_settles() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().loads("init.js", &["lib.js"]);
    let h = EnvironmentHarness::start(&[("init.js", ""), ("lib.js", "")], interpreter);

    let preload = h.env.preload_report();
    assert_eq!(preload.iterations, 3);
    assert_eq!(preload.watched, 2);
    assert!(preload.settled);

    assert_eq!(h.loaded(), vec!["init.js", "lib.js"]);
    assert_eq!(h.interpreter.run_paths(), vec!["init.js", "lib.js"]);
}

#[test]
fn deleting_a_loaded_dependency_unloads_it_and_reloads_its_dependent() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().loads("init.js", &["lib.js"]);
    let h = EnvironmentHarness::start(&[("init.js", ""), ("lib.js", "")], interpreter);

    h.delete("lib.js");
    let report = h.reload();

    assert_eq!(paths(&report.unloaded), vec!["lib.js"]);
    assert_eq!(paths(&report.reloaded), vec!["init.js"]);
    assert!(report.loaded.is_empty());

    assert_eq!(h.loaded(), vec!["init.js"]);
    assert_eq!(h.interpreter.runs_of("init.js"), 2);
    assert_eq!(h.interpreter.terminations_of("lib.js"), 1);
    assert_eq!(h.interpreter.terminations_of("init.js"), 1);

    // The new init instance asked for lib.js again.
    assert_eq!(h.watched(), vec!["init.js", "lib.js"]);
    assert_eq!(h.reload(), CycleReport::default());

    h.create("lib.js", "");
    let report = h.reload();
    assert_eq!(paths(&report.loaded), vec!["lib.js"]);
    assert_eq!(h.loaded(), vec!["init.js", "lib.js"]);
}

#[test]
fn watched_paths_are_registered_exactly_when_their_file_exists() {
    init_tracing();

    let h = EnvironmentHarness::start(
        &[("init.js", ""), ("a.js", ""), ("lib/b.js", "")],
        RecordingInterpreter::new(),
    );
    h.env
        .root_scope()
        .watch_all(["a.js", "lib/b.js", "missing.js", "lib/gone.js"]);

    h.reload();

    for path in h.env.watched() {
        let exists = h.fs.is_file(&path.to_path(h.env.root()));
        assert_eq!(h.env.is_loaded(&path), exists, "path {path}");
    }
    assert_eq!(h.loaded(), vec!["a.js", "init.js", "lib/b.js"]);
}

#[test]
fn unwatching_unloads_once_and_rewatching_loads_a_fresh_instance() {
    init_tracing();

    let h = EnvironmentHarness::start(&[("init.js", ""), ("extra.js", "")], RecordingInterpreter::new());
    let scope = h.env.root_scope();

    scope.watch("extra.js");
    assert_eq!(paths(&h.reload().loaded), vec!["extra.js"]);
    let first_id = h.env.script("extra.js").unwrap().id();

    scope.unwatch("extra.js");
    assert_eq!(paths(&h.reload().unloaded), vec!["extra.js"]);
    h.reload();
    assert_eq!(h.interpreter.terminations_of("extra.js"), 1);
    assert!(!h.env.is_loaded("extra.js"));

    scope.watch("extra.js");
    assert_eq!(paths(&h.reload().loaded), vec!["extra.js"]);
    let second_id = h.env.script("extra.js").unwrap().id();

    assert_ne!(first_id, second_id);
    assert_eq!(h.interpreter.runs_of("extra.js"), 2);
}

#[test]
fn modifying_a_dependency_reloads_its_dependents_only() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().depends("b.js", &["a.js"]);
    let h = EnvironmentHarness::start(&[("a.js", ""), ("b.js", ""), ("c.js", "")], interpreter);
    h.env.root_scope().watch_all(["a.js", "b.js", "c.js"]);
    assert_eq!(paths(&h.reload().loaded), vec!["a.js", "b.js", "c.js"]);

    h.modify("a.js", "changed");
    let report = h.reload();

    assert_eq!(paths(&report.reloaded), vec!["a.js", "b.js"]);
    assert_eq!(h.interpreter.runs_of("a.js"), 2);
    assert_eq!(h.interpreter.runs_of("b.js"), 2);
    assert_eq!(h.interpreter.runs_of("c.js"), 1);
}

#[test]
fn mutual_dependencies_reload_each_script_once() {
    init_tracing();

    let interpreter = RecordingInterpreter::new()
        .depends("a.js", &["b.js"])
        .depends("b.js", &["a.js"]);
    let h = EnvironmentHarness::start(&[("a.js", ""), ("b.js", "")], interpreter);
    h.env.root_scope().watch_all(["a.js", "b.js"]);
    h.reload();

    h.modify("a.js", "changed");
    let report = h.reload();

    assert_eq!(paths(&report.reloaded), vec!["a.js", "b.js"]);
    assert_eq!(h.interpreter.runs_of("a.js"), 2);
    assert_eq!(h.interpreter.runs_of("b.js"), 2);
}

#[test]
fn changing_a_plain_file_reloads_scripts_that_depend_on_it() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().depends("init.js", &["config.env"]);
    let h = EnvironmentHarness::start(&[("init.js", ""), ("config.env", "A=1")], interpreter);

    h.modify("config.env", "A=2");
    let report = h.reload();
    assert_eq!(paths(&report.reloaded), vec!["init.js"]);

    h.delete("config.env");
    let report = h.reload();
    assert_eq!(paths(&report.reloaded), vec!["init.js"]);
    assert!(report.unloaded.is_empty());
    assert_eq!(h.interpreter.runs_of("init.js"), 3);
}

#[test]
fn repeated_preload_is_a_no_op_once_settled() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().loads("init.js", &["lib.js"]);
    let h = EnvironmentHarness::start(&[("init.js", ""), ("lib.js", "")], interpreter);
    let watched = h.env.watch_set().len();

    let again = h.env.preload();
    assert_eq!(again.iterations, 1);
    assert_eq!(again.watched, watched);
    assert_eq!(h.env.watch_set().len(), watched);
    assert_eq!(h.interpreter.runs().len(), 2);
}

#[test]
fn modify_then_delete_in_one_cycle_terminates_once_and_never_reruns() {
    init_tracing();

    let h = EnvironmentHarness::start(&[("init.js", "")], RecordingInterpreter::new());

    h.modify("init.js", "changed");
    h.delete("init.js");
    let report = h.reload();

    assert_eq!(paths(&report.unloaded), vec!["init.js"]);
    assert!(report.reloaded.is_empty());
    assert_eq!(h.interpreter.runs_of("init.js"), 1);
    assert_eq!(h.interpreter.terminations_of("init.js"), 1);
    assert!(h.loaded().is_empty());
}

#[test]
fn delete_then_recreate_in_one_cycle_reloads_in_place() {
    init_tracing();

    let h = EnvironmentHarness::start(&[("init.js", "")], RecordingInterpreter::new());
    let old_id = h.env.script("init.js").unwrap().id();

    h.delete("init.js");
    h.create("init.js", "new");
    let report = h.reload();

    assert_eq!(paths(&report.reloaded), vec!["init.js"]);
    assert!(report.unloaded.is_empty());
    assert_eq!(h.loaded(), vec!["init.js"]);
    assert_ne!(h.env.script("init.js").unwrap().id(), old_id);
    assert_eq!(h.interpreter.terminations_of("init.js"), 1);
}

#[test]
fn interpreter_failures_do_not_stop_the_cycle() {
    init_tracing();

    let interpreter = RecordingInterpreter::new()
        .loads("init.js", &["bad.js", "good.js"])
        .on("bad.js", |_| anyhow::bail!("boom"));
    let h = EnvironmentHarness::start(
        &[("init.js", ""), ("bad.js", ""), ("good.js", "")],
        interpreter,
    );

    assert_eq!(h.loaded(), vec!["bad.js", "good.js", "init.js"]);
    assert_eq!(h.interpreter.runs_of("good.js"), 1);
    assert_eq!(h.interpreter.runs_of("bad.js"), 1);
}

#[test]
fn closing_the_environment_terminates_every_script() {
    init_tracing();

    let interpreter = RecordingInterpreter::new().loads("init.js", &["lib.js"]);
    let h = EnvironmentHarness::start(&[("init.js", ""), ("lib.js", "")], interpreter);

    h.env.close().unwrap();

    assert!(h.env.is_closed());
    assert!(h.loaded().is_empty());
    assert!(h.watched().is_empty());
    assert_eq!(h.interpreter.terminations().len(), 2);

    h.env.close().unwrap();
    assert_eq!(h.interpreter.terminations().len(), 2);
    assert_eq!(h.reload(), CycleReport::default());
}
