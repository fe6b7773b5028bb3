// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! `define` / `require` entry points.

use std::sync::Arc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use crate::config::Config;
use crate::definition::{Definition, register};
use crate::descriptor::{Descriptor, ModuleId};
use crate::error::{InjectorError, Result};
use crate::export::Callable;
use crate::loader::{FileTransport, HttpTransport, Loader, ResourceLoader};
use crate::registry::Registry;
use crate::resolver::{Request, Resolution, Resolver};

/// Module injector: a registry plus the resolver that fills it.
///
/// Cloning is cheap and every clone shares the same registry.
#[derive(Clone)]
pub struct Injector {
    resolver: Resolver,
}

impl Injector {
    /// Create an injector with an empty registry.
    pub fn new(loader: impl Loader + 'static) -> Self {
        Self::with_registry(Arc::new(Registry::new()), Arc::new(loader))
    }

    /// Create an injector over an existing registry.
    pub fn with_registry(registry: Arc<Registry>, loader: Arc<dyn Loader>) -> Self {
        Self {
            resolver: Resolver::new(registry, loader),
        }
    }

    /// Create an injector loading over HTTP when `base-url` is set, from
    /// the `root` directory otherwise.
    pub fn from_config(config: &Config) -> Result<Self> {
        let loader = match &config.base_url {
            Some(base) => ResourceLoader::new(HttpTransport::new(
                Some(base),
                config.timeout(),
                !config.strict_ssl,
            )?),
            None => ResourceLoader::new(FileTransport::new(config.root_dir())),
        };
        Ok(Self::new(loader.with_default_extension(config.default_extension.clone())))
    }

    /// The shared registry.
    pub fn registry(&self) -> &Arc<Registry> {
        self.resolver.registry()
    }

    /// Register a module and return its canonical id.
    ///
    /// Anonymous definitions are only valid inside a loading resource, see
    /// [`crate::ModuleScope::define`].
    pub fn define(&self, definition: Definition) -> Result<ModuleId> {
        register(self.registry(), definition, None)
    }

    /// Resolve `deps` and return their exports.
    pub async fn require<D: Into<Descriptor>>(&self, deps: impl IntoIterator<Item = D>) -> Result<Resolution> {
        self.resolver.resolve(Request::new(deps)).await
    }

    /// Resolve `deps` and bind `factory` to their exports.
    ///
    /// The bound factory is returned in [`Resolution::value`]; it is not
    /// invoked.
    pub async fn require_fn<D: Into<Descriptor>>(
        &self,
        deps: impl IntoIterator<Item = D>,
        factory: Callable,
    ) -> Result<Resolution> {
        self.resolver
            .resolve(Request::new(deps).with_root(factory))
            .await
    }

    /// Resolve a prepared request.
    pub async fn resolve(&self, request: Request) -> Result<Resolution> {
        self.resolver.resolve(request).await
    }

    /// Resolve in the background and hand the result to `callback`.
    ///
    /// Failures are logged and otherwise dropped.
    pub fn require_then<D, F>(&self, deps: impl IntoIterator<Item = D>, callback: F) -> JoinHandle<()>
    where
        D: Into<Descriptor>,
        F: FnOnce(Resolution) + Send + 'static,
    {
        self.require_or_else(deps, callback, |err| {
            debug!("require failed with no failure handler: {}", err);
        })
    }

    /// Resolve in the background; exactly one of `callback` or
    /// `on_failure` runs.
    pub fn require_or_else<D, F, E>(
        &self,
        deps: impl IntoIterator<Item = D>,
        callback: F,
        on_failure: E,
    ) -> JoinHandle<()>
    where
        D: Into<Descriptor>,
        F: FnOnce(Resolution) + Send + 'static,
        E: FnOnce(InjectorError) + Send + 'static,
    {
        let request = Request::new(deps);
        let resolver = self.resolver.clone();
        tokio::spawn(async move {
            match resolver.resolve(request).await {
                Ok(resolution) => callback(resolution),
                Err(err) => {
                    warn!("require failed: {}", err);
                    on_failure(err);
                }
            }
        })
    }
}
