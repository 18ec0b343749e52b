// src/exports/export.rs

use std::any::Any;
use std::fmt;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard, PoisonError};

/// Shared, type-erased export value.
pub type ExportValue = Arc<dyn Any + Send + Sync>;

/// A named value cell shared between scripts and across reloads.
///
/// Every operation takes this export's own read/write lock; independent
/// exports never contend.
pub struct Export {
    name: String,
    value: RwLock<Option<ExportValue>>,
}

impl fmt::Debug for Export {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Export")
            .field("name", &self.name)
            .field("has_value", &self.contains_value())
            .finish()
    }
}

impl Export {
    pub(crate) fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            value: RwLock::new(None),
        }
    }

    fn read(&self) -> RwLockReadGuard<'_, Option<ExportValue>> {
        self.value.read().unwrap_or_else(PoisonError::into_inner)
    }

    fn write(&self) -> RwLockWriteGuard<'_, Option<ExportValue>> {
        self.value.write().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn get(&self) -> Option<ExportValue> {
        self.read().clone()
    }

    /// Current value downcast to `T`; `None` if empty or of another type.
    pub fn get_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.get().and_then(|v| v.downcast::<T>().ok())
    }

    pub fn get_or(&self, other: ExportValue) -> ExportValue {
        self.get().unwrap_or(other)
    }

    pub fn put<T: Any + Send + Sync>(&self, value: T) -> &Self {
        self.put_value(Arc::new(value))
    }

    pub fn put_value(&self, value: ExportValue) -> &Self {
        *self.write() = Some(value);
        self
    }

    pub fn put_if_absent<T: Any + Send + Sync>(&self, value: T) -> &Self {
        let mut slot = self.write();
        if slot.is_none() {
            *slot = Some(Arc::new(value));
        }
        drop(slot);
        self
    }

    /// Run `f` under the write lock if no value is present. `f` must not
    /// touch this same export.
    pub fn compute_if_absent<T, F>(&self, f: F) -> &Self
    where
        T: Any + Send + Sync,
        F: FnOnce() -> T,
    {
        let mut slot = self.write();
        if slot.is_none() {
            *slot = Some(Arc::new(f()));
        }
        drop(slot);
        self
    }

    pub fn contains_value(&self) -> bool {
        self.read().is_some()
    }

    pub fn clear(&self) {
        *self.write() = None;
    }

    pub fn pointer(self: &Arc<Self>) -> Pointer {
        Pointer {
            export: Arc::clone(self),
        }
    }
}

/// Stable indirection to an export.
///
/// Holds no value of its own; every read goes to the export, so a pointer
/// handed out once keeps observing later `put`s.
#[derive(Debug, Clone)]
pub struct Pointer {
    export: Arc<Export>,
}

impl Pointer {
    pub fn name(&self) -> &str {
        self.export.name()
    }

    pub fn get(&self) -> Option<ExportValue> {
        self.export.get()
    }

    pub fn get_as<T: Any + Send + Sync>(&self) -> Option<Arc<T>> {
        self.export.get_as::<T>()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn put_if_absent_keeps_existing_value() {
        let export = Export::new("x");
        export.put_if_absent(1u32).put_if_absent(2u32);
        assert_eq!(export.get_as::<u32>().as_deref(), Some(&1));
    }

    #[test]
    fn compute_if_absent_runs_only_when_empty() {
        let export = Export::new("x");
        let mut calls = 0;
        export.compute_if_absent(|| {
            calls += 1;
            "first".to_string()
        });
        export.compute_if_absent(|| {
            calls += 1;
            "second".to_string()
        });
        assert_eq!(calls, 1);
        assert_eq!(export.get_as::<String>().as_deref().map(String::as_str), Some("first"));
    }

    #[test]
    fn clear_empties_and_get_or_falls_back() {
        let export = Export::new("x");
        export.put(5i64);
        assert!(export.contains_value());

        export.clear();
        assert!(!export.contains_value());

        let fallback = export.get_or(Arc::new(9i64));
        assert_eq!(fallback.downcast::<i64>().ok().as_deref(), Some(&9));
    }

    #[test]
    fn wrong_type_reads_as_none() {
        let export = Export::new("x");
        export.put("text".to_string());
        assert!(export.get_as::<u32>().is_none());
        assert!(export.get().is_some());
    }
}
