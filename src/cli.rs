// src/cli.rs

//! CLI argument parsing using `clap`.

use std::path::PathBuf;

use clap::{Parser, ValueEnum};

/// Command-line arguments for `scriptwatch`.
#[derive(Debug, Clone, Parser)]
#[command(
    name = "scriptwatch",
    version,
    about = "Run a directory of shell scripts, reloading them as files change.",
    long_about = None
)]
pub struct CliArgs {
    /// Path to the config file (TOML).
    ///
    /// Default: `Scriptwatch.toml` in the current working directory, if it
    /// exists; built-in defaults otherwise.
    #[arg(long, value_name = "PATH")]
    pub config: Option<PathBuf>,

    /// Script root directory. Overrides `[environment].root`.
    #[arg(long, value_name = "DIR")]
    pub root: Option<PathBuf>,

    /// Init script, relative to the root. Overrides
    /// `[environment].init_script`.
    #[arg(long, value_name = "PATH")]
    pub init: Option<String>,

    /// Preload, print the loaded scripts, tear down and exit.
    #[arg(long)]
    pub once: bool,

    /// Logging level (error, warn, info, debug, trace).
    ///
    /// If omitted, `SCRIPTWATCH_LOG` or a default level will be used.
    #[arg(long, value_enum, value_name = "LEVEL")]
    pub log_level: Option<LogLevel>,

    /// Parse + validate config, print resolved settings, run nothing.
    #[arg(long)]
    pub dry_run: bool,

    /// Print the script dependency graph after preload.
    #[arg(long)]
    pub print_graph: bool,
}

/// Log level as exposed on the CLI.
#[derive(Debug, Copy, Clone, ValueEnum)]
pub enum LogLevel {
    Error,
    Warn,
    Info,
    Debug,
    Trace,
}

/// Convenience wrapper around `CliArgs::parse()`.
pub fn parse() -> CliArgs {
    CliArgs::parse()
}
