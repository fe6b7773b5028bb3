// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module values and factories.

use anyhow::anyhow;
use std::collections::BTreeMap;
use std::fmt;
use std::sync::{Arc, OnceLock};

use crate::descriptor::ModuleId;

/// Signature of a module factory.
pub type FactoryFn = dyn Fn(&[Export]) -> anyhow::Result<Export> + Send + Sync;

/// The value a module exposes to its dependents.
#[derive(Debug, Clone, Default, PartialEq)]
pub enum Export {
    /// No value
    #[default]
    Undefined,
    /// Structured data (JSON modules, plain values)
    Data(serde_json::Value),
    /// Raw text (HTML templates and the like)
    Text(String),
    /// A factory, possibly with dependencies bound
    Callable(Callable),
}

impl Export {
    /// Whether the value can be invoked.
    pub fn is_callable(&self) -> bool {
        matches!(self, Export::Callable(_))
    }

    /// The callable, if this is one.
    pub fn as_callable(&self) -> Option<&Callable> {
        match self {
            Export::Callable(callable) => Some(callable),
            _ => None,
        }
    }

    /// The data, if this is a data value.
    pub fn as_data(&self) -> Option<&serde_json::Value> {
        match self {
            Export::Data(data) => Some(data),
            _ => None,
        }
    }

    /// The text, if this is a text value.
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Export::Text(text) => Some(text),
            _ => None,
        }
    }

    /// Final value: callables are evaluated once, everything else is cloned.
    pub fn resolve(&self) -> anyhow::Result<Export> {
        match self {
            Export::Callable(callable) => callable.resolve(),
            other => Ok(other.clone()),
        }
    }
}

impl From<serde_json::Value> for Export {
    fn from(data: serde_json::Value) -> Self {
        Export::Data(data)
    }
}

impl From<String> for Export {
    fn from(text: String) -> Self {
        Export::Text(text)
    }
}

impl From<Callable> for Export {
    fn from(callable: Callable) -> Self {
        Export::Callable(callable)
    }
}

/// A shareable factory with bound leading arguments and static properties.
#[derive(Clone)]
pub struct Callable {
    inner: Arc<CallableInner>,
}

#[derive(Clone)]
struct CallableInner {
    func: Arc<FactoryFn>,
    bound: Vec<Export>,
    statics: BTreeMap<String, serde_json::Value>,
    /// Registry id, present once the factory is defined as a module
    name: Option<ModuleId>,
    output: OnceLock<Result<Export, String>>,
}

impl Callable {
    /// Wrap a factory function.
    pub fn new<F>(func: F) -> Self
    where
        F: Fn(&[Export]) -> anyhow::Result<Export> + Send + Sync + 'static,
    {
        Self {
            inner: Arc::new(CallableInner {
                func: Arc::new(func),
                bound: Vec::new(),
                statics: BTreeMap::new(),
                name: None,
                output: OnceLock::new(),
            }),
        }
    }

    /// Attach a static property.
    pub fn with_static(self, key: impl Into<String>, value: serde_json::Value) -> Self {
        let mut inner = Arc::unwrap_or_clone(self.inner);
        inner.statics.insert(key.into(), value);
        Self {
            inner: Arc::new(inner),
        }
    }

    /// Static properties.
    pub fn statics(&self) -> &BTreeMap<String, serde_json::Value> {
        &self.inner.statics
    }

    /// A single static property.
    pub fn static_value(&self, key: &str) -> Option<&serde_json::Value> {
        self.inner.statics.get(key)
    }

    /// Registry id, if this factory belongs to a defined module.
    pub fn name(&self) -> Option<&ModuleId> {
        self.inner.name.as_ref()
    }

    /// Arguments injected ahead of call-site arguments.
    pub fn bound_args(&self) -> &[Export] {
        &self.inner.bound
    }

    /// Invoke the factory with bound arguments followed by `args`.
    pub fn call(&self, args: &[Export]) -> anyhow::Result<Export> {
        if self.inner.bound.is_empty() {
            return (self.inner.func)(args);
        }
        let mut all = Vec::with_capacity(self.inner.bound.len() + args.len());
        all.extend_from_slice(&self.inner.bound);
        all.extend_from_slice(args);
        (self.inner.func)(&all)
    }

    /// Evaluate with no extra arguments, at most once.
    pub fn resolve(&self) -> anyhow::Result<Export> {
        self.inner
            .output
            .get_or_init(|| self.call(&[]).map_err(|e| format!("{e:#}")))
            .clone()
            .map_err(|msg| anyhow!(msg))
    }

    /// New callable with `args` appended to the bound arguments.
    ///
    /// Statics and module metadata are copied over; the memoized output is not.
    pub fn bind(&self, args: Vec<Export>) -> Callable {
        let mut bound = self.inner.bound.clone();
        bound.extend(args);
        Callable {
            inner: Arc::new(CallableInner {
                func: Arc::clone(&self.inner.func),
                bound,
                statics: self.inner.statics.clone(),
                name: self.inner.name.clone(),
                output: OnceLock::new(),
            }),
        }
    }

    /// Same factory, tagged with its registry id.
    pub(crate) fn with_name(&self, name: ModuleId) -> Callable {
        Callable {
            inner: Arc::new(CallableInner {
                func: Arc::clone(&self.inner.func),
                bound: self.inner.bound.clone(),
                statics: self.inner.statics.clone(),
                name: Some(name),
                output: OnceLock::new(),
            }),
        }
    }

    /// Whether both handles point at the same callable.
    pub fn ptr_eq(a: &Callable, b: &Callable) -> bool {
        Arc::ptr_eq(&a.inner, &b.inner)
    }
}

impl PartialEq for Callable {
    fn eq(&self, other: &Self) -> bool {
        Callable::ptr_eq(self, other)
    }
}

impl fmt::Debug for Callable {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Callable")
            .field("name", &self.inner.name)
            .field("bound", &self.inner.bound.len())
            .field("statics", &self.inner.statics)
            .finish_non_exhaustive()
    }
}
