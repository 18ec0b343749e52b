// src/exec/batch.rs

use std::sync::Arc;

use tracing::debug;

use crate::script::{script_closer, CompositeCloser, Script};

/// One cycle's worth of lifecycle work.
///
/// Executing a batch first closes every retired instance (replaced or
/// unloaded), then runs every new instance in the order the cycle created
/// them.
#[derive(Debug, Default)]
pub struct LoadBatch {
    pub terminate: Vec<Arc<Script>>,
    pub run: Vec<Arc<Script>>,
}

impl LoadBatch {
    pub fn is_empty(&self) -> bool {
        self.terminate.is_empty() && self.run.is_empty()
    }

    pub fn execute(self) {
        debug!(
            terminate = self.terminate.len(),
            run = self.run.len(),
            "executing load batch"
        );

        let closer = CompositeCloser::new();
        closer.bind_all(self.terminate.into_iter().map(script_closer));
        closer.close_and_report();

        for script in self.run {
            script.run();
        }
    }
}
