// src/exec/mod.rs

//! Script execution layer.
//!
//! - [`interpreter`] defines the [`Interpreter`] capability that evaluates a
//!   script.
//! - [`batch`] is the unit of work a reload cycle produces: terminate the
//!   retired instances, run the new ones.
//! - [`backend`] provides the [`ScriptExecutor`] trait and the inline, tokio
//!   and channel executors.
//! - [`command`] is the shell-script interpreter used by the binary.

pub mod backend;
pub mod batch;
pub mod command;
pub mod interpreter;

pub use backend::{
    channel_executor, BatchReceiver, ChannelExecutor, InlineExecutor, ScriptExecutor,
    TokioExecutor,
};
pub use batch::LoadBatch;
pub use command::CommandInterpreter;
pub use interpreter::Interpreter;
