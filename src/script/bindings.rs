// src/script/bindings.rs

//! Named values handed to the interpreter for each script run.

use std::any::Any;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::Arc;

use crate::script::Script;

/// A single binding: plain text, or an opaque shared value the interpreter
/// downcasts itself.
#[derive(Clone)]
pub enum Binding {
    Text(String),
    Value(Arc<dyn Any + Send + Sync>),
}

impl fmt::Debug for Binding {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Binding::Text(s) => f.debug_tuple("Text").field(s).finish(),
            Binding::Value(_) => f.write_str("Value(..)"),
        }
    }
}

impl From<String> for Binding {
    fn from(s: String) -> Self {
        Binding::Text(s)
    }
}

impl From<&str> for Binding {
    fn from(s: &str) -> Self {
        Binding::Text(s.to_string())
    }
}

/// Accumulated bindings for one run. Later writers overwrite earlier names.
#[derive(Debug, Clone, Default)]
pub struct Bindings {
    values: BTreeMap<String, Binding>,
}

impl Bindings {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn put(&mut self, name: impl Into<String>, value: impl Into<Binding>) -> &mut Self {
        self.values.insert(name.into(), value.into());
        self
    }

    pub fn put_value<T: Any + Send + Sync>(&mut self, name: impl Into<String>, value: T) -> &mut Self {
        self.values
            .insert(name.into(), Binding::Value(Arc::new(value)));
        self
    }

    pub fn get(&self, name: &str) -> Option<&Binding> {
        self.values.get(name)
    }

    pub fn text(&self, name: &str) -> Option<&str> {
        match self.values.get(name) {
            Some(Binding::Text(s)) => Some(s),
            _ => None,
        }
    }

    pub fn value_as<T: Any + Send + Sync>(&self, name: &str) -> Option<Arc<T>> {
        match self.values.get(name) {
            Some(Binding::Value(v)) => Arc::clone(v).downcast::<T>().ok(),
            _ => None,
        }
    }

    pub fn contains(&self, name: &str) -> bool {
        self.values.contains_key(name)
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &Binding)> {
        self.values.iter().map(|(k, v)| (k.as_str(), v))
    }
}

/// Contributes bindings before every script run.
pub trait BindingsSupplier: Send + Sync {
    fn supply(&self, script: &Script, bindings: &mut Bindings);
}

impl<F> BindingsSupplier for F
where
    F: Fn(&Script, &mut Bindings) + Send + Sync,
{
    fn supply(&self, script: &Script, bindings: &mut Bindings) {
        self(script, bindings)
    }
}

/// Supplier that always binds `name` to `value`.
pub fn single_binding(name: impl Into<String>, value: impl Into<Binding>) -> Arc<dyn BindingsSupplier> {
    let name = name.into();
    let value = value.into();
    Arc::new(move |_: &Script, bindings: &mut Bindings| {
        bindings.put(name.clone(), value.clone());
    })
}

/// Supplier that binds every entry of a text map.
pub fn from_map(map: BTreeMap<String, String>) -> Arc<dyn BindingsSupplier> {
    Arc::new(move |_: &Script, bindings: &mut Bindings| {
        for (name, value) in &map {
            bindings.put(name.clone(), value.clone());
        }
    })
}
