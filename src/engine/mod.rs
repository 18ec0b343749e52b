// src/engine/mod.rs

//! Reload engine for script environments.
//!
//! This module ties together:
//! - the per-cycle plan (what to load, reload, unload) built from the watch
//!   set, the registry and drained filesystem events
//! - the dependency closure that widens a reload to every dependent script
//! - the loader that applies a plan under the cycle lock and hands the
//!   resulting lifecycle work to an executor
//! - environments (one per root directory) and the controller that owns them
//!
//! The pure planning logic lives in [`plan`] and [`closure`]; the stateful
//! shell around it is [`loader`] and [`environment`].

use crate::types::ScriptPath;

pub mod closure;
pub mod controller;
pub mod environment;
pub mod graph;
pub mod loader;
pub mod plan;

pub use closure::{dependency_closure, resolve_reload_queue};
pub use controller::{ScriptController, ScriptControllerBuilder};
pub use environment::{EnvironmentSources, ScriptEnvironment};
pub use graph::DependencyGraph;
pub use loader::ScriptLoader;
pub use plan::{CyclePlan, CycleView, OrderedPaths};

/// How a cycle hands off its load batch.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CycleMode {
    /// Execute the batch on the calling thread before returning, so scripts
    /// have declared their watches by the time the next iteration starts.
    Preload,
    /// Submit the batch to the environment's executor.
    Scheduled,
}

/// What one cycle changed, in the order it was applied.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CycleReport {
    pub loaded: Vec<ScriptPath>,
    pub reloaded: Vec<ScriptPath>,
    pub unloaded: Vec<ScriptPath>,
}

impl CycleReport {
    pub fn is_empty(&self) -> bool {
        self.loaded.is_empty() && self.reloaded.is_empty() && self.unloaded.is_empty()
    }

    /// Number of scripts touched by the cycle.
    pub fn len(&self) -> usize {
        self.loaded.len() + self.reloaded.len() + self.unloaded.len()
    }
}

/// Outcome of running cycles until the watch set settles.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PreloadReport {
    /// Cycles run, including the final no-op one.
    pub iterations: usize,
    /// Distinct watched paths once preload stopped.
    pub watched: usize,
    /// False if the iteration limit was hit before the fixed point.
    pub settled: bool,
}
