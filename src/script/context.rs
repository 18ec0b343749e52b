// src/script/context.rs

use std::fmt;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::exec::Interpreter;
use crate::exports::ExportRegistry;
use crate::fs::FileSystem;
use crate::script::bindings::BindingsSupplier;

/// Environment-wide collaborators every script of one environment shares.
pub struct ScriptContext {
    root: PathBuf,
    interpreter: Arc<dyn Interpreter>,
    bindings: Vec<Arc<dyn BindingsSupplier>>,
    exports: Arc<ExportRegistry>,
    fs: Arc<dyn FileSystem>,
}

impl fmt::Debug for ScriptContext {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ScriptContext")
            .field("root", &self.root)
            .field("bindings", &self.bindings.len())
            .field("fs", &self.fs)
            .finish_non_exhaustive()
    }
}

impl ScriptContext {
    pub fn new(
        root: impl Into<PathBuf>,
        interpreter: Arc<dyn Interpreter>,
        bindings: Vec<Arc<dyn BindingsSupplier>>,
        exports: Arc<ExportRegistry>,
        fs: Arc<dyn FileSystem>,
    ) -> Self {
        Self {
            root: root.into(),
            interpreter,
            bindings,
            exports,
            fs,
        }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    pub fn interpreter(&self) -> &dyn Interpreter {
        self.interpreter.as_ref()
    }

    pub fn bindings(&self) -> &[Arc<dyn BindingsSupplier>] {
        &self.bindings
    }

    pub fn exports(&self) -> &Arc<ExportRegistry> {
        &self.exports
    }

    pub fn fs(&self) -> &dyn FileSystem {
        self.fs.as_ref()
    }
}
