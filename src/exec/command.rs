// src/exec/command.rs

//! Interpreter used by the `scriptwatch` binary: scripts are shell files.
//!
//! Before running, the source is scanned for header directives in comments:
//!
//! ```text
//! # @load lib/util.sh       watch + depend (load it alongside this script)
//! # @depend config.env      reload this script when config.env changes
//! # @watch other.sh         keep other.sh loaded, no dependency
//! # @background             leave the process running until the script is
//!                           terminated (reload/unload kills it)
//! ```
//!
//! Directive paths are relative to the environment root. Text bindings are
//! exported to the process as `SCRIPTWATCH_<NAME>` environment variables.

use std::process::{Command, Stdio};

use anyhow::{bail, Context, Result};
use regex::Regex;
use tracing::{debug, info};

use crate::exec::Interpreter;
use crate::script::{Binding, Bindings, Script};

const DIRECTIVE_PATTERN: &str =
    r"(?m)^\s*(?:#|//|--)\s*@(load|depend|watch|background)\b[ \t]*(\S*)[ \t]*$";

/// A header directive found in a script.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Directive {
    Load(String),
    Depend(String),
    Watch(String),
    Background,
}

/// Extract directives in source order. Path directives without a path are
/// skipped.
pub fn parse_directives(pattern: &Regex, source: &str) -> Vec<Directive> {
    pattern
        .captures_iter(source)
        .filter_map(|caps| {
            let arg = caps.get(2).map(|m| m.as_str()).unwrap_or("");
            let with_path = |f: fn(String) -> Directive| {
                if arg.is_empty() {
                    None
                } else {
                    Some(f(arg.to_string()))
                }
            };
            match &caps[1] {
                "load" => with_path(Directive::Load),
                "depend" => with_path(Directive::Depend),
                "watch" => with_path(Directive::Watch),
                "background" => Some(Directive::Background),
                _ => None,
            }
        })
        .collect()
}

/// Environment variable name for a binding, e.g. `script.name` ->
/// `SCRIPTWATCH_SCRIPT_NAME`.
pub fn env_var_name(binding: &str) -> String {
    let suffix: String = binding
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() {
                c.to_ascii_uppercase()
            } else {
                '_'
            }
        })
        .collect();
    format!("SCRIPTWATCH_{suffix}")
}

#[derive(Debug, Clone)]
pub struct CommandInterpreter {
    shell: String,
    directives: Regex,
}

impl CommandInterpreter {
    /// Interpreter that runs scripts with `sh`.
    pub fn sh() -> Result<Self> {
        Self::new("sh")
    }

    pub fn new(shell: impl Into<String>) -> Result<Self> {
        Ok(Self {
            shell: shell.into(),
            directives: Regex::new(DIRECTIVE_PATTERN).context("compiling directive pattern")?,
        })
    }

    pub fn shell(&self) -> &str {
        &self.shell
    }

    fn command(&self, script: &Script, bindings: &Bindings) -> Command {
        let mut cmd = Command::new(&self.shell);
        cmd.arg(script.file()).current_dir(script.root());
        for (name, value) in bindings.iter() {
            if let Binding::Text(text) = value {
                cmd.env(env_var_name(name), text);
            }
        }
        cmd
    }
}

impl Interpreter for CommandInterpreter {
    fn eval(&self, script: &Script, bindings: &Bindings) -> Result<()> {
        let source = script.read_source()?;

        let mut background = false;
        for directive in parse_directives(&self.directives, &source) {
            debug!(script = %script.name(), ?directive, "applying directive");
            match directive {
                Directive::Load(path) => script.load(path.as_str()),
                Directive::Depend(path) => {
                    script.depend(path.as_str());
                }
                Directive::Watch(path) => {
                    script.watch(path.as_str());
                }
                Directive::Background => background = true,
            }
        }

        let mut cmd = self.command(script, bindings);

        if background {
            let child = cmd
                .stdin(Stdio::null())
                .spawn()
                .with_context(|| format!("spawning background process for {}", script.path()))?;
            let pid = child.id();
            info!(script = %script.name(), pid, "background process started");

            let mut child = child;
            let name = script.name().to_string();
            script.closers().bind(move || -> Result<()> {
                if child.try_wait()?.is_none() {
                    child.kill().with_context(|| format!("killing background process of {name}"))?;
                    child.wait()?;
                    info!(script = %name, pid, "background process stopped");
                }
                Ok(())
            });
            return Ok(());
        }

        let output = cmd
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("spawning process for {}", script.path()))?;

        for line in String::from_utf8_lossy(&output.stdout).lines() {
            script.logger().info(line);
        }
        for line in String::from_utf8_lossy(&output.stderr).lines() {
            script.logger().warn(line);
        }

        if !output.status.success() {
            bail!(
                "script exited with code {}",
                output.status.code().unwrap_or(-1)
            );
        }
        Ok(())
    }
}
