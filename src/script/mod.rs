// src/script/mod.rs

//! Script units and the registry of live instances.
//!
//! - [`unit`] is one loaded script: identity, declared dependencies, watch
//!   scope, closers, and the single call into the interpreter.
//! - [`registry`] maps paths to the live instance.
//! - [`closer`] aggregates resource release (LIFO, failures collected).
//! - [`bindings`] assembles the named values passed to the interpreter.
//! - [`context`] holds the collaborators shared by every script of an
//!   environment.

pub mod bindings;
pub mod closer;
pub mod context;
pub mod logger;
pub mod registry;
pub mod unit;

pub use bindings::{from_map, single_binding, Binding, Bindings, BindingsSupplier};
pub use closer::{Closer, CompositeCloseError, CompositeCloser};
pub use context::ScriptContext;
pub use logger::ScriptLogger;
pub use registry::ScriptRegistry;
pub use unit::{script_closer, Script, ScriptState};
