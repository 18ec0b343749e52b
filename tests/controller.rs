// tests/controller.rs

mod common;
use crate::common::{init_tracing, RecordingInterpreter};

use std::fs;
use std::sync::Arc;

use scriptwatch::config::EnvironmentSettings;
use scriptwatch::engine::{EnvironmentSources, ScriptController};
use scriptwatch::errors::ScriptwatchError;
use scriptwatch::fs::mock::MockFileSystem;
use scriptwatch::watch::event_channel;

fn manual() -> EnvironmentSettings {
    EnvironmentSettings::builder().manual_reload().build()
}

fn mock_sources(root: &str, files: &[&str]) -> EnvironmentSources {
    let fs = MockFileSystem::new();
    fs.add_dir(root);
    for f in files {
        fs.add_file(format!("{root}/{f}"), "");
    }
    let (_tx, source) = event_channel();
    EnvironmentSources {
        fs: Arc::new(fs),
        events: Box::new(source),
    }
}

#[test]
fn builder_requires_an_interpreter() {
    let err = ScriptController::builder().build().err().expect("must fail");
    assert!(matches!(err, ScriptwatchError::ConfigError(_)));
}

#[test]
fn second_environment_on_the_same_root_is_rejected() {
    init_tracing();

    let controller = ScriptController::builder()
        .interpreter(Arc::new(RecordingInterpreter::new()))
        .build()
        .unwrap();

    controller
        .setup_environment_with("/a", manual(), mock_sources("/a", &["init.js"]))
        .unwrap();
    let err = controller
        .setup_environment_with("/a", manual(), mock_sources("/a", &["init.js"]))
        .err()
        .expect("duplicate root must fail");

    assert!(matches!(err, ScriptwatchError::DuplicateEnvironment(_)));
    assert_eq!(controller.environments().len(), 1);
}

#[test]
fn shutdown_closes_every_environment() {
    init_tracing();

    let interpreter = RecordingInterpreter::new();
    let controller = ScriptController::builder()
        .interpreter(Arc::new(interpreter.clone()))
        .build()
        .unwrap();

    let a = controller
        .setup_environment_with("/a", manual(), mock_sources("/a", &["init.js"]))
        .unwrap();
    let b = controller
        .setup_environment_with("/b", manual(), mock_sources("/b", &["init.js"]))
        .unwrap();
    assert_eq!(interpreter.runs().len(), 2);

    controller.shutdown().unwrap();

    assert!(a.is_closed() && b.is_closed());
    assert!(controller.environments().is_empty());
    assert_eq!(interpreter.terminations().len(), 2);

    // The root is free again.
    controller
        .setup_environment_with("/a", manual(), mock_sources("/a", &["init.js"]))
        .unwrap();
}

#[test]
fn removing_an_environment_closes_it() {
    init_tracing();

    let controller = ScriptController::builder()
        .interpreter(Arc::new(RecordingInterpreter::new()))
        .build()
        .unwrap();
    let env = controller
        .setup_environment_with("/a", manual(), mock_sources("/a", &["init.js"]))
        .unwrap();

    assert!(controller.remove_environment("/a").unwrap());
    assert!(env.is_closed());
    assert!(!controller.remove_environment("/a").unwrap());
}

#[test]
fn real_directory_environment_tracks_files_on_disk() {
    init_tracing();

    let dir = tempfile::tempdir().unwrap();
    fs::write(dir.path().join("init.sh"), "").unwrap();

    let interpreter = RecordingInterpreter::new().loads("init.sh", &["lib/util.sh"]);
    let controller = ScriptController::builder()
        .interpreter(Arc::new(interpreter.clone()))
        .defaults(
            EnvironmentSettings::builder()
                .manual_reload()
                .init_script("init.sh")
                .build(),
        )
        .build()
        .unwrap();

    let env = controller.setup_environment(dir.path()).unwrap();
    assert!(env.is_loaded("init.sh"));
    assert!(!env.is_loaded("lib/util.sh"));

    fs::create_dir(dir.path().join("lib")).unwrap();
    fs::write(dir.path().join("lib/util.sh"), "").unwrap();
    let report = env.reload();
    assert!(report.loaded.iter().any(|p| p.as_str() == "lib/util.sh"));
    assert!(env.is_loaded("lib/util.sh"));

    fs::remove_file(dir.path().join("lib/util.sh")).unwrap();
    let report = env.reload();
    assert!(report.unloaded.iter().any(|p| p.as_str() == "lib/util.sh"));
    assert!(report.reloaded.iter().any(|p| p.as_str() == "init.sh"));
    assert!(!env.is_loaded("lib/util.sh"));

    let err = controller
        .setup_environment(dir.path())
        .err()
        .expect("duplicate root must fail");
    assert!(matches!(err, ScriptwatchError::DuplicateEnvironment(_)));

    controller.shutdown().unwrap();
}

#[test]
fn missing_directory_is_a_setup_error() {
    let dir = tempfile::tempdir().unwrap();
    let controller = ScriptController::builder()
        .interpreter(Arc::new(RecordingInterpreter::new()))
        .build()
        .unwrap();

    let err = controller
        .setup_environment(dir.path().join("absent"))
        .err()
        .expect("must fail");
    assert!(matches!(err, ScriptwatchError::MissingRoot(_)));
}
