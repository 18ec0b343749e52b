// src/script/closer.rs

//! Aggregated resource release.
//!
//! A [`CompositeCloser`] collects release actions and runs them in LIFO order
//! when closed. One failing action never stops the others; all failures are
//! returned together in a [`CompositeCloseError`].
//!
//! [`close`](CompositeCloser::close) leaves the closer reusable.
//! [`terminate`](CompositeCloser::terminate) is final: anything bound
//! afterwards is released on the spot instead of being queued.

use std::sync::{Mutex, MutexGuard, PoisonError};

use thiserror::Error;
use tracing::{error, warn};

/// A single release action.
pub trait Closer: Send {
    fn close(self: Box<Self>) -> anyhow::Result<()>;
}

impl<F> Closer for F
where
    F: FnOnce() -> anyhow::Result<()> + Send,
{
    fn close(self: Box<Self>) -> anyhow::Result<()> {
        (*self)()
    }
}

#[derive(Error, Debug)]
#[error("{} resource(s) failed to close", .errors.len())]
pub struct CompositeCloseError {
    pub errors: Vec<anyhow::Error>,
}

#[derive(Default)]
struct CloserState {
    closers: Vec<Box<dyn Closer>>,
    terminated: bool,
}

#[derive(Default)]
pub struct CompositeCloser {
    state: Mutex<CloserState>,
}

impl std::fmt::Debug for CompositeCloser {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let state = self.state();
        f.debug_struct("CompositeCloser")
            .field("pending", &state.closers.len())
            .field("terminated", &state.terminated)
            .finish()
    }
}

impl CompositeCloser {
    pub fn new() -> Self {
        Self::default()
    }

    fn state(&self) -> MutexGuard<'_, CloserState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    /// Register a release action. Duplicates are not detected: binding the
    /// same resource twice closes it twice.
    ///
    /// After [`terminate`](Self::terminate) the action runs immediately and
    /// a failure is logged.
    pub fn bind(&self, closer: impl Closer + 'static) -> &Self {
        let mut state = self.state();
        if !state.terminated {
            state.closers.push(Box::new(closer));
            return self;
        }
        drop(state);

        warn!("resource bound after termination; releasing it now");
        if let Err(err) = Closer::close(Box::new(closer)) {
            error!(error = %format!("{err:#}"), "failed to close resource");
        }
        self
    }

    pub fn bind_all<I, C>(&self, closers: I) -> &Self
    where
        I: IntoIterator<Item = C>,
        C: Closer + 'static,
    {
        for closer in closers {
            self.bind(closer);
        }
        self
    }

    pub fn len(&self) -> usize {
        self.state().closers.len()
    }

    pub fn is_empty(&self) -> bool {
        self.state().closers.is_empty()
    }

    pub fn is_terminated(&self) -> bool {
        self.state().terminated
    }

    /// Run every bound action, last bound first. The closer is empty
    /// afterwards and can be reused.
    pub fn close(&self) -> Result<(), CompositeCloseError> {
        // Take the list first so actions may bind new closers without deadlocking.
        let closers = std::mem::take(&mut self.state().closers);
        run_all(closers)
    }

    /// Close for good: like [`close`](Self::close), but later binds are
    /// released immediately.
    pub fn terminate(&self) -> Result<(), CompositeCloseError> {
        let closers = {
            let mut state = self.state();
            state.terminated = true;
            std::mem::take(&mut state.closers)
        };
        run_all(closers)
    }

    /// Close, logging each failure instead of returning it.
    pub fn close_and_report(&self) {
        if let Err(err) = self.close() {
            for (idx, cause) in err.errors.iter().enumerate() {
                error!(index = idx, error = %format!("{cause:#}"), "failed to close resource");
            }
        }
    }
}

fn run_all(closers: Vec<Box<dyn Closer>>) -> Result<(), CompositeCloseError> {
    let errors: Vec<anyhow::Error> = closers
        .into_iter()
        .rev()
        .filter_map(|closer| closer.close().err())
        .collect();

    if errors.is_empty() {
        Ok(())
    } else {
        Err(CompositeCloseError { errors })
    }
}
