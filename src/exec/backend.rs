// src/exec/backend.rs

//! Where load batches run.
//!
//! The reload engine never assumes a threading model for script execution.
//! It hands each [`LoadBatch`] to a [`ScriptExecutor`] and moves on:
//!
//! - [`InlineExecutor`] runs the batch on the calling thread, inside the
//!   cycle (the default; also what preload always does).
//! - [`TokioExecutor`] moves it onto tokio's blocking pool.
//! - [`ChannelExecutor`] queues it for a [`BatchReceiver`] owned by the host,
//!   for hosts whose state may only be touched from one thread.

use std::fmt;

use tokio::runtime::Handle;
use tokio::sync::mpsc;
use tracing::{debug, warn};

use crate::errors::{Result, ScriptwatchError};
use crate::exec::batch::LoadBatch;

/// Trait abstracting how load batches are executed. Submission is fire and
/// forget.
pub trait ScriptExecutor: Send + Sync {
    fn execute(&self, batch: LoadBatch);
}

#[derive(Debug, Clone, Copy, Default)]
pub struct InlineExecutor;

impl ScriptExecutor for InlineExecutor {
    fn execute(&self, batch: LoadBatch) {
        batch.execute();
    }
}

/// Runs batches with `spawn_blocking` on a tokio runtime.
#[derive(Debug, Clone)]
pub struct TokioExecutor {
    handle: Handle,
}

impl TokioExecutor {
    pub fn new(handle: Handle) -> Self {
        Self { handle }
    }

    /// Bind to the runtime of the calling context.
    pub fn current() -> Result<Self> {
        Handle::try_current()
            .map(Self::new)
            .map_err(|_| ScriptwatchError::NoRuntime)
    }
}

impl ScriptExecutor for TokioExecutor {
    fn execute(&self, batch: LoadBatch) {
        // Dropping the JoinHandle detaches the task.
        let _ = self.handle.spawn_blocking(move || batch.execute());
    }
}

/// Create an executor that queues batches, and the receiver that runs them.
pub fn channel_executor() -> (ChannelExecutor, BatchReceiver) {
    let (tx, rx) = mpsc::unbounded_channel();
    (ChannelExecutor { tx }, BatchReceiver { rx })
}

#[derive(Clone)]
pub struct ChannelExecutor {
    tx: mpsc::UnboundedSender<LoadBatch>,
}

impl fmt::Debug for ChannelExecutor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ChannelExecutor").finish_non_exhaustive()
    }
}

impl ScriptExecutor for ChannelExecutor {
    fn execute(&self, batch: LoadBatch) {
        if let Err(err) = self.tx.send(batch) {
            warn!("batch receiver dropped; running batch inline");
            err.0.execute();
        }
    }
}

/// Host side of a [`ChannelExecutor`].
#[derive(Debug)]
pub struct BatchReceiver {
    rx: mpsc::UnboundedReceiver<LoadBatch>,
}

impl BatchReceiver {
    /// Execute every queued batch on the calling thread without waiting.
    /// Returns how many ran.
    pub fn run_pending(&mut self) -> usize {
        let mut ran = 0;
        while let Ok(batch) = self.rx.try_recv() {
            batch.execute();
            ran += 1;
        }
        if ran > 0 {
            debug!(batches = ran, "ran pending load batches");
        }
        ran
    }

    /// Wait for the next batch. `None` once every executor is dropped.
    pub async fn recv(&mut self) -> Option<LoadBatch> {
        self.rx.recv().await
    }
}
