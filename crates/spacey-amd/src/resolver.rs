// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dependency resolution.
//!
//! A request walks its dependency list depth-first. Defined modules are
//! recursed into directly; unknown ones are claimed in the registry and
//! fetched; modules another request is already fetching are awaited on
//! that request's fetch. Once the whole subtree is defined the binder
//! composes the result.

use dashmap::DashSet;
use futures::FutureExt;
use futures::future::{BoxFuture, try_join_all};
use std::collections::HashSet;
use std::sync::Arc;
use tracing::{debug, info, instrument, warn};

use crate::binder::Binder;
use crate::definition::ModuleScope;
use crate::descriptor::{Descriptor, ModuleId};
use crate::error::{FetchCause, FetchError, InjectorError, Result};
use crate::export::Export;
use crate::loader::Loader;
use crate::registry::{Claim, ModuleRecord, PendingFetch, Registry};

/// A resolution request.
#[derive(Debug, Clone, Default)]
pub struct Request {
    /// Dependencies to resolve, in declared order
    pub deps: Vec<Descriptor>,
    /// Value bound to the resolved dependencies
    pub root: Export,
}

impl Request {
    /// Request for `deps` with no root.
    pub fn new<D: Into<Descriptor>>(deps: impl IntoIterator<Item = D>) -> Self {
        Self {
            deps: deps.into_iter().map(Into::into).collect(),
            root: Export::Undefined,
        }
    }

    /// Set the root value.
    pub fn with_root(mut self, root: impl Into<Export>) -> Self {
        self.root = root.into();
        self
    }

    /// Canonical ids of the requested dependencies.
    pub fn ids(&self) -> Vec<ModuleId> {
        self.deps.iter().map(Descriptor::name).collect()
    }
}

/// Result of a successful request.
#[derive(Debug, Clone)]
pub struct Resolution {
    /// The root, bound to the dependency exports
    pub value: Export,
    /// Dependency exports, in declared order
    pub exports: Vec<Export>,
    /// Locators of the dependency tree, dependencies before dependents
    pub locators: Vec<String>,
}

impl Resolution {
    /// Export of the dependency at `index`.
    pub fn export(&self, index: usize) -> Option<&Export> {
        self.exports.get(index)
    }
}

/// Dependency resolver.
#[derive(Clone)]
pub struct Resolver {
    registry: Arc<Registry>,
    loader: Arc<dyn Loader>,
}

impl Resolver {
    /// Create a resolver fetching missing modules through `loader`.
    pub fn new(registry: Arc<Registry>, loader: Arc<dyn Loader>) -> Self {
        Self { registry, loader }
    }

    /// Registry this resolver populates.
    pub fn registry(&self) -> &Arc<Registry> {
        &self.registry
    }

    /// Resolve a request.
    ///
    /// Fails on the first dependency anywhere in the tree that cannot be
    /// fetched. Modules already defined stay defined.
    #[instrument(skip(self, request), fields(deps = request.deps.len()))]
    pub async fn resolve(&self, request: Request) -> Result<Resolution> {
        let visited = DashSet::new();
        self.walk(request.deps.clone(), Vec::new(), &visited).await?;

        let ids = request.ids();
        if let Some(missing) = ids
            .iter()
            .find(|id| !self.registry.is_resolved(std::slice::from_ref(*id)))
        {
            return Err(InjectorError::Unresolved(missing.clone()));
        }

        let binder = Binder::new(&self.registry);
        let value = binder.bind(&ids, request.root)?;
        let exports = ids
            .iter()
            .map(|id| binder.export_of(id))
            .collect::<Result<Vec<_>>>()?;
        let locators = self.locator_tree(&request.deps);

        debug!("resolved {} dependencies", exports.len());
        Ok(Resolution {
            value,
            exports,
            locators,
        })
    }

    /// Make every module under `deps` defined.
    ///
    /// `path` holds the modules on the way down from the request, for cycle
    /// detection. `visited` holds every module this request has entered, so
    /// shared dependencies are walked once. Siblings are walked concurrently.
    fn walk<'a>(
        &'a self,
        deps: Vec<Descriptor>,
        path: Vec<ModuleId>,
        visited: &'a DashSet<ModuleId>,
    ) -> BoxFuture<'a, Result<()>> {
        async move {
            let branches = deps.into_iter().map(|dep| {
                let path = path.clone();
                async move {
                    let id = dep.name();
                    if let Some(start) = path.iter().position(|seen| *seen == id) {
                        let mut cycle = path[start..].to_vec();
                        cycle.push(id);
                        return Err(InjectorError::CircularDependency(cycle));
                    }
                    if !visited.insert(id.clone()) {
                        return Ok(());
                    }

                    let record = self.ensure(&dep, &id).await?;
                    let mut path = path;
                    path.push(id);
                    self.walk(record.deps, path, visited).await
                }
            });

            try_join_all(branches).await.map(|_| ())
        }
        .boxed()
    }

    /// Return the defined record for `id`, fetching it if needed.
    async fn ensure(&self, dep: &Descriptor, id: &ModuleId) -> Result<ModuleRecord> {
        loop {
            let fetch = match self.registry.claim(id, || self.start_fetch(dep.clone())) {
                Claim::Ready(record) => return Ok(record),
                Claim::Pending(fetch) => {
                    debug!(module = %id, "waiting on in-flight fetch");
                    fetch
                }
                Claim::Started(fetch) => {
                    // Runs to completion even if every requester goes away
                    tokio::spawn(fetch.clone());
                    fetch
                }
            };
            fetch.await?;
        }
    }

    /// Build the single fetch for a module. Not started until polled.
    fn start_fetch(&self, descriptor: Descriptor) -> PendingFetch {
        let registry = Arc::clone(&self.registry);
        let loader = Arc::clone(&self.loader);
        async move { fetch_module(registry, loader, descriptor).await }
            .boxed()
            .shared()
    }

    /// Locators under `deps`, each module once, dependencies first.
    fn locator_tree(&self, deps: &[Descriptor]) -> Vec<String> {
        let mut seen = HashSet::new();
        let mut out = Vec::new();
        for dep in deps {
            self.collect_locators(dep, &mut seen, &mut out);
        }
        out
    }

    fn collect_locators(&self, dep: &Descriptor, seen: &mut HashSet<ModuleId>, out: &mut Vec<String>) {
        let id = dep.name();
        if !seen.insert(id.clone()) {
            return;
        }
        if let Some(record) = self.registry.get(&id) {
            for child in &record.deps {
                self.collect_locators(child, seen, out);
            }
        }
        out.push(dep.locator().to_string());
    }
}

/// Fetch one module and check that it registered itself.
///
/// On failure the record is removed so a later request fetches again.
async fn fetch_module(
    registry: Arc<Registry>,
    loader: Arc<dyn Loader>,
    descriptor: Descriptor,
) -> std::result::Result<ModuleId, FetchError> {
    let id = descriptor.name();
    let scope = ModuleScope::new(Arc::clone(&registry), descriptor.clone());

    let outcome = match loader.fetch(scope).await {
        Ok(()) if registry.get(&id).is_some_and(|record| !record.is_pending()) => Ok(()),
        Ok(()) => Err(FetchCause::NotRegistered),
        Err(cause) => Err(cause),
    };

    match outcome {
        Ok(()) => {
            info!("[OK] Load: {}", descriptor.locator());
            Ok(id)
        }
        Err(cause) => {
            warn!(module = %id, "load failed: {}", cause);
            registry.remove(&id);
            Err(FetchError { name: id, cause })
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::definition::{Definition, register};
    use crate::export::Callable;
    use async_trait::async_trait;
    use serde_json::json;

    /// Defines `name -> deps` tables on demand.
    struct TableLoader(Vec<(&'static str, Vec<&'static str>)>);

    #[async_trait]
    impl Loader for TableLoader {
        async fn fetch(&self, scope: ModuleScope) -> std::result::Result<(), FetchCause> {
            let (_, deps) = self
                .0
                .iter()
                .find(|(name, _)| *name == scope.id().as_str())
                .ok_or(FetchCause::Status(404))?;
            scope
                .define(Definition::full(scope.id().as_str(), deps.clone(), json!(scope.id().as_str())))
                .map_err(|e| FetchCause::Script(e.to_string()))?;
            Ok(())
        }
    }

    fn resolver(table: Vec<(&'static str, Vec<&'static str>)>) -> Resolver {
        Resolver::new(Arc::new(Registry::new()), Arc::new(TableLoader(table)))
    }

    #[tokio::test]
    async fn test_locator_tree_lists_dependencies_first() {
        let resolver = resolver(vec![
            ("app", vec!["ui", "net"]),
            ("ui", vec!["dom"]),
            ("net", vec!["dom"]),
            ("dom", vec![]),
        ]);

        let resolution = resolver.resolve(Request::new(["app"])).await.unwrap();
        assert_eq!(resolution.locators, vec!["dom", "ui", "net", "app"]);
        assert_eq!(resolution.exports, vec![Export::Data(json!("app"))]);
    }

    #[tokio::test]
    async fn test_missing_transitive_dependency_fails_whole_request() {
        let resolver = resolver(vec![("app", vec!["gone"])]);

        let err = resolver.resolve(Request::new(["app"])).await.unwrap_err();
        assert_eq!(err.module().map(ModuleId::as_str), Some("gone"));
        assert!(matches!(
            err,
            InjectorError::Unresolvable(FetchError { cause: FetchCause::Status(404), .. })
        ));

        // The sibling that did load stays defined
        assert!(resolver.registry().contains(&"app".into()));
        assert!(!resolver.registry().contains(&"gone".into()));
    }

    #[tokio::test]
    async fn test_cycle_is_reported() {
        let resolver = resolver(vec![("a", vec!["b"]), ("b", vec!["a"])]);
        let err = resolver.resolve(Request::new(["a"])).await.unwrap_err();
        match err {
            InjectorError::CircularDependency(cycle) => {
                let names: Vec<_> = cycle.iter().map(ModuleId::as_str).collect();
                assert_eq!(names, ["a", "b", "a"]);
            }
            other => panic!("expected cycle, got {other}"),
        }
    }

    #[tokio::test]
    async fn test_shared_dependencies_are_walked_once() {
        // Two modules per layer, each depending on both modules of the next
        const LAYERS: usize = 40;

        let registry = Arc::new(Registry::new());
        let layer = |i: usize| [format!("l{i}/a"), format!("l{i}/b")];
        for i in 0..LAYERS {
            let deps = if i + 1 < LAYERS { layer(i + 1).to_vec() } else { Vec::new() };
            for name in layer(i) {
                let factory = Callable::new(|args| Ok(Export::Data(json!(args.len()))));
                register(&registry, Definition::full(name, deps.clone(), factory), None).unwrap();
            }
        }

        let resolver = Resolver::new(registry, Arc::new(TableLoader(Vec::new())));
        let resolution = tokio::time::timeout(
            std::time::Duration::from_secs(10),
            resolver.resolve(Request::new(layer(0))),
        )
        .await
        .expect("resolution should not revisit shared subtrees")
        .unwrap();

        assert_eq!(resolution.locators.len(), 2 * LAYERS);
        assert_eq!(resolution.locators.first().map(String::as_str), Some("l39/a"));
        assert_eq!(
            resolution.exports[0].as_callable().unwrap().bound_args().len(),
            2
        );
    }

    #[tokio::test]
    async fn test_module_removed_mid_request_is_unresolved() {
        /// Defines every module; `late` also evicts `early` once it has loaded.
        struct Evicting(Arc<Registry>);

        #[async_trait]
        impl Loader for Evicting {
            async fn fetch(&self, scope: ModuleScope) -> std::result::Result<(), FetchCause> {
                if scope.id().as_str() == "late" {
                    tokio::time::sleep(std::time::Duration::from_millis(10)).await;
                    self.0.remove(&"early".into());
                }
                scope.define_value(json!(scope.id().as_str()));
                Ok(())
            }
        }

        let registry = Arc::new(Registry::new());
        let resolver = Resolver::new(Arc::clone(&registry), Arc::new(Evicting(registry)));

        let err = resolver
            .resolve(Request::new(["late", "early"]))
            .await
            .unwrap_err();
        assert!(matches!(err, InjectorError::Unresolved(ref id) if id.as_str() == "early"));
    }

    #[tokio::test]
    async fn test_unregistered_resource_fails() {
        struct Silent;

        #[async_trait]
        impl Loader for Silent {
            async fn fetch(&self, _scope: ModuleScope) -> std::result::Result<(), FetchCause> {
                Ok(())
            }
        }

        let resolver = Resolver::new(Arc::new(Registry::new()), Arc::new(Silent));
        let err = resolver.resolve(Request::new(["quiet"])).await.unwrap_err();
        assert!(matches!(
            err,
            InjectorError::Unresolvable(FetchError { cause: FetchCause::NotRegistered, .. })
        ));
        assert!(resolver.registry().is_empty());
    }
}
