// src/lib.rs

pub mod cli;
pub mod config;
pub mod engine;
pub mod errors;
pub mod exec;
pub mod exports;
pub mod fs;
pub mod logging;
pub mod script;
pub mod types;
pub mod watch;

use std::path::{Path, PathBuf};
use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{
    default_config_path, load_and_validate, ConfigFile, EnvironmentSettings, RawConfigFile,
};
use crate::engine::{ScriptController, ScriptEnvironment};
use crate::exec::{CommandInterpreter, TokioExecutor};

pub use crate::config::EnvironmentSettingsBuilder;
pub use crate::engine::{CycleReport, EnvironmentSources, PreloadReport};
pub use crate::errors::ScriptwatchError;
pub use crate::exports::{Export, ExportRegistry, Pointer};
pub use crate::script::{Bindings, Script};
pub use crate::types::ScriptPath;

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - config loading and CLI overrides
/// - a controller with one environment on the configured root
/// - the shell-script interpreter
/// - Ctrl-C handling
pub async fn run(args: CliArgs) -> Result<()> {
    let (cfg, config_dir) = resolve_config(&args)?;
    let root = args.root.clone().unwrap_or_else(|| cfg.root(&config_dir));

    let mut builder = cfg.to_settings().to_builder();
    if let Some(init) = &args.init {
        builder = builder.init_script(init.clone());
    }
    if args.once {
        builder = builder.manual_reload();
    }
    let settings = builder
        .executor(Arc::new(TokioExecutor::current()?))
        .build();

    if args.dry_run {
        print_dry_run(&root, &settings, &cfg);
        return Ok(());
    }

    let controller = Arc::new(
        ScriptController::builder()
            .interpreter(Arc::new(CommandInterpreter::sh()?))
            .defaults(settings)
            .build()?,
    );

    // Preload runs scripts synchronously; keep it off the async workers.
    let environment = {
        let controller = Arc::clone(&controller);
        let root = root.clone();
        tokio::task::spawn_blocking(move || controller.setup_environment(&root)).await??
    };

    if args.print_graph {
        print_graph(&environment);
    }

    if args.once {
        print_state(&environment);
    } else {
        info!(root = ?root, "watching scripts; press Ctrl-C to stop");
        tokio::signal::ctrl_c().await?;
        info!("shutdown requested");
    }

    tokio::task::spawn_blocking(move || controller.shutdown()).await??;
    Ok(())
}

/// Explicit `--config`, else `Scriptwatch.toml` if present, else defaults.
/// Also returns the directory relative roots resolve against.
fn resolve_config(args: &CliArgs) -> Result<(ConfigFile, PathBuf)> {
    let path = match &args.config {
        Some(path) => Some(path.clone()),
        None => {
            let path = default_config_path();
            path.is_file().then_some(path)
        }
    };

    match path {
        Some(path) => {
            let cfg = load_and_validate(&path)?;
            debug!(config = ?path, "loaded config");
            Ok((cfg, config_root_dir(&path)))
        }
        None => {
            let cfg = ConfigFile::try_from(RawConfigFile::default())?;
            Ok((cfg, current_dir()))
        }
    }
}

/// Directory holding the config file; the working directory for a bare
/// file name.
fn config_root_dir(config_path: &Path) -> PathBuf {
    match config_path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => parent.to_path_buf(),
        _ => current_dir(),
    }
}

fn current_dir() -> PathBuf {
    std::env::current_dir().unwrap_or_else(|_| PathBuf::from("."))
}

fn print_dry_run(root: &Path, settings: &EnvironmentSettings, cfg: &ConfigFile) {
    println!("scriptwatch dry-run");
    println!("  root = {}", root.display());
    println!("  init_script = {}", settings.init_script);
    match settings.poll_interval {
        Some(every) => println!("  poll_interval = {}ms", every.as_millis()),
        None => println!("  poll_interval = manual"),
    }
    println!("  use_hash = {}", settings.use_hash);
    println!("  preload_max_iterations = {}", settings.preload_max_iterations);
    if !settings.exclude.is_empty() {
        println!("  exclude = {:?}", settings.exclude);
    }

    if !cfg.bindings.is_empty() {
        println!();
        println!("bindings ({}):", cfg.bindings.len());
        for (name, value) in &cfg.bindings {
            println!("  {name} = {value:?}");
        }
    }

    debug!("dry-run complete (no execution)");
}

fn print_state(environment: &ScriptEnvironment) {
    let preload = environment.preload_report();
    println!(
        "preload: {} iteration(s), {} watched path(s){}",
        preload.iterations,
        preload.watched,
        if preload.settled { "" } else { " (did not settle)" }
    );

    let scripts = environment.scripts();
    println!("scripts ({}):", scripts.len());
    for script in scripts {
        println!("  - {} ({:?})", script.path(), script.state());
    }
}

fn print_graph(environment: &ScriptEnvironment) {
    let graph = environment.dependency_graph();
    println!("dependency graph:");
    for line in graph.render() {
        println!("  {line}");
    }
    for cycle in graph.cycles() {
        let names: Vec<String> = cycle.iter().map(|p| p.to_string()).collect();
        println!("  cycle: {}", names.join(" <-> "));
    }
}
