// src/exec/interpreter.rs

use anyhow::Result;

use crate::script::{Bindings, Script};

/// The capability that actually evaluates a script.
///
/// The engine calls `eval` exactly once per [`Script`] instance, on whatever
/// thread the environment's executor chooses. The script handle gives
/// access to everything a script may do to the engine: `depend`, `watch`,
/// `load`, bind closers, reach the exports, log.
///
/// Errors are logged against the script; they never abort a reload cycle.
pub trait Interpreter: Send + Sync {
    fn eval(&self, script: &Script, bindings: &Bindings) -> Result<()>;
}

impl<F> Interpreter for F
where
    F: Fn(&Script, &Bindings) -> Result<()> + Send + Sync,
{
    fn eval(&self, script: &Script, bindings: &Bindings) -> Result<()> {
        self(script, bindings)
    }
}
