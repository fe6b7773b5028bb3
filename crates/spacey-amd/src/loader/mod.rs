// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Resource loading.
//!
//! The resolver only needs "fetch this module and tell me whether it
//! registered". [`Loader`] is that boundary. [`ResourceLoader`] is the
//! stock implementation: it picks a strategy from the locator's
//! extension, pulls the body through a [`Transport`], and either hands
//! scripts to a [`ScriptHost`] or registers data and text directly.

mod file;
mod http;

pub use file::FileTransport;
pub use http::HttpTransport;

use async_trait::async_trait;
use dashmap::DashMap;
use serde::Deserialize;
use std::collections::BTreeMap;
use std::sync::Arc;
use tracing::{debug, instrument};

use crate::definition::{Definition, ModuleScope};
use crate::descriptor::{Descriptor, ModuleId};
use crate::error::FetchCause;
use crate::export::{Callable, Export};

/// Extension appended to locators that have none.
pub const DEFAULT_EXTENSION: &str = "js";

/// Longest suffix, dot included, still treated as an extension.
const EXTENSION_WINDOW: usize = 5;

/// Fetches a module and makes it register itself.
#[async_trait]
pub trait Loader: Send + Sync {
    /// Load the resource behind `scope`.
    ///
    /// On success the module must be defined through `scope`. On failure
    /// the loader leaves the registry alone.
    async fn fetch(&self, scope: ModuleScope) -> Result<(), FetchCause>;
}

/// Moves resource bodies from wherever they live.
#[async_trait]
pub trait Transport: Send + Sync {
    /// Fetch the body at `locator`.
    async fn get(&self, locator: &str) -> Result<String, FetchCause>;
}

/// Runs fetched scripts.
pub trait ScriptHost: Send + Sync {
    /// Execute `source` for the resource behind `scope`.
    fn execute(&self, scope: &ModuleScope, source: &str) -> Result<(), FetchCause>;
}

/// Lookup for values non-cooperative scripts leave behind.
pub trait GlobalContext: Send + Sync {
    /// Value published under `name`, if any.
    fn lookup(&self, name: &ModuleId) -> Option<Export>;
}

/// How a resource is turned into a module
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceKind {
    /// Executable script
    Script,
    /// JSON document
    Json,
    /// Raw text
    Text,
}

const KINDS: &[(&str, ResourceKind)] = &[
    ("js", ResourceKind::Script),
    ("json", ResourceKind::Json),
    ("html", ResourceKind::Text),
];

impl ResourceKind {
    /// Strategy for a locator, by extension.
    pub fn from_locator(locator: &str) -> Option<Self> {
        let (_, ext) = last_segment(locator).rsplit_once('.')?;
        KINDS
            .iter()
            .find(|(known, _)| ext.eq_ignore_ascii_case(known))
            .map(|(_, kind)| *kind)
    }
}

/// Append `.{ext}` unless the last path segment already ends in an extension.
pub fn with_default_extension(locator: &str, ext: &str) -> String {
    let segment = last_segment(locator);
    match segment.rfind('.') {
        Some(dot) if segment.len() - dot <= EXTENSION_WINDOW => locator.to_string(),
        _ => format!("{locator}.{ext}"),
    }
}

fn last_segment(locator: &str) -> &str {
    locator.rsplit('/').next().unwrap_or(locator)
}

/// Transport-backed loader with extension dispatch.
#[derive(Clone)]
pub struct ResourceLoader {
    transport: Arc<dyn Transport>,
    host: Arc<dyn ScriptHost>,
    globals: Arc<dyn GlobalContext>,
    default_extension: String,
}

impl ResourceLoader {
    /// Create a loader over `transport` using the declarative script host.
    pub fn new(transport: impl Transport + 'static) -> Self {
        Self {
            transport: Arc::new(transport),
            host: Arc::new(DeclarativeHost),
            globals: Arc::new(Globals::new()),
            default_extension: DEFAULT_EXTENSION.to_string(),
        }
    }

    /// Use a different script host.
    pub fn with_host(mut self, host: impl ScriptHost + 'static) -> Self {
        self.host = Arc::new(host);
        self
    }

    /// Use a different global context.
    pub fn with_globals(mut self, globals: Arc<dyn GlobalContext>) -> Self {
        self.globals = globals;
        self
    }

    /// Extension appended to bare locators.
    pub fn with_default_extension(mut self, ext: impl Into<String>) -> Self {
        self.default_extension = ext.into();
        self
    }

    fn run_script(&self, scope: &ModuleScope, source: &str) -> Result<(), FetchCause> {
        self.host.execute(scope, source)?;

        // `{name: locator}` resources do not register themselves
        if scope.descriptor().is_named() {
            let value = self
                .globals
                .lookup(scope.id())
                .ok_or_else(|| FetchCause::MissingGlobal(scope.id().to_string()))?;
            scope.define_value(value);
        }
        Ok(())
    }
}

#[async_trait]
impl Loader for ResourceLoader {
    #[instrument(skip(self, scope), fields(module = %scope.id()))]
    async fn fetch(&self, scope: ModuleScope) -> Result<(), FetchCause> {
        let locator = with_default_extension(scope.locator(), &self.default_extension);
        let kind = ResourceKind::from_locator(&locator)
            .ok_or_else(|| FetchCause::Unsupported(locator.clone()))?;

        debug!(?kind, "fetching {}", locator);
        let body = self.transport.get(&locator).await?;

        match kind {
            ResourceKind::Script => self.run_script(&scope, &body)?,
            ResourceKind::Json => {
                let data: serde_json::Value =
                    serde_json::from_str(&body).map_err(|e| FetchCause::Parse(e.to_string()))?;
                scope.define_value(data);
            }
            ResourceKind::Text => {
                scope.define_value(body);
            }
        }
        Ok(())
    }
}

/// Thread-safe global context
#[derive(Default)]
pub struct Globals {
    values: DashMap<ModuleId, Export>,
}

impl Globals {
    /// Create an empty context
    pub fn new() -> Self {
        Self::default()
    }

    /// Publish a value under `name`
    pub fn set(&self, name: impl Into<ModuleId>, value: impl Into<Export>) {
        self.values.insert(name.into(), value.into());
    }

    /// Remove a value
    pub fn remove(&self, name: &ModuleId) -> Option<Export> {
        self.values.remove(name).map(|(_, v)| v)
    }
}

impl GlobalContext for Globals {
    fn lookup(&self, name: &ModuleId) -> Option<Export> {
        self.values.get(name).map(|entry| entry.clone())
    }
}

/// Script host for declarative module scripts.
///
/// A script is a JSON document:
///
/// ```json
/// { "name": "optional/name", "deps": ["a", {"b": "/vendor/b.js"}],
///   "value": {"any": "json"}, "statics": {"version": "1.0"} }
/// ```
///
/// Without `deps` the module is the plain `value`. With `deps` the module
/// is a factory returning `{"value": ..., "deps": [<resolved deps>]}`, so
/// the injected values are observable. An empty script registers nothing,
/// which is how non-cooperative resources look.
#[derive(Debug, Clone, Copy, Default)]
pub struct DeclarativeHost;

#[derive(Deserialize)]
struct ModuleScript {
    name: Option<String>,
    #[serde(default)]
    deps: Vec<Descriptor>,
    #[serde(default)]
    value: serde_json::Value,
    #[serde(default)]
    statics: BTreeMap<String, serde_json::Value>,
}

impl ScriptHost for DeclarativeHost {
    fn execute(&self, scope: &ModuleScope, source: &str) -> Result<(), FetchCause> {
        if source.trim().is_empty() {
            return Ok(());
        }

        let script: ModuleScript =
            serde_json::from_str(source).map_err(|e| FetchCause::Script(e.to_string()))?;

        let value = if script.deps.is_empty() && script.statics.is_empty() {
            Export::Data(script.value)
        } else {
            let body = script.value;
            let factory = Callable::new(move |args| {
                let deps = args
                    .iter()
                    .map(|arg| arg.resolve().map(export_to_json))
                    .collect::<anyhow::Result<Vec<_>>>()?;
                Ok(Export::Data(serde_json::json!({ "value": body, "deps": deps })))
            });
            let factory = script
                .statics
                .into_iter()
                .fold(factory, |f, (key, value)| f.with_static(key, value));
            Export::Callable(factory)
        };

        let definition = match script.name {
            Some(name) => Definition::full(name, script.deps, value),
            None => Definition::Full {
                name: scope.id().to_string(),
                deps: script.deps,
                value,
            },
        };
        scope
            .define(definition)
            .map_err(|e| FetchCause::Script(e.to_string()))?;
        Ok(())
    }
}

/// JSON view of an export, for data-only consumers.
pub fn export_to_json(export: Export) -> serde_json::Value {
    match export {
        Export::Undefined => serde_json::Value::Null,
        Export::Data(data) => data,
        Export::Text(text) => serde_json::Value::String(text),
        Export::Callable(callable) => serde_json::json!({ "callable": callable.name().map(ModuleId::to_string) }),
    }
}
