// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dependency injection into factories.
//!
//! Binding walks a resolved dependency graph depth-first, dependencies of
//! dependencies first, and replaces each module's factory with a callable
//! that has its dependency exports prepended as leading arguments. The
//! replacement happens once per module through [`Registry::bind_once`];
//! later binds reuse the stored callable. Nothing is executed here.

use tracing::{debug, trace};

use crate::descriptor::ModuleId;
use crate::error::{InjectorError, Result};
use crate::export::Export;
use crate::registry::{ModuleValue, Registry};

/// Composes factories over a fully resolved registry subtree.
pub struct Binder<'a> {
    registry: &'a Registry,
}

impl<'a> Binder<'a> {
    /// Create a binder over `registry`.
    pub fn new(registry: &'a Registry) -> Self {
        Self { registry }
    }

    /// Bind every module in `ids`, then `root` to their exports.
    ///
    /// A root that is not callable is returned unchanged. A root that is a
    /// defined module's factory is bound through its registry record; any
    /// other callable is bound to the exports of `ids` without caching.
    pub fn bind(&self, ids: &[ModuleId], root: Export) -> Result<Export> {
        let mut path = Vec::new();
        let args = self.bind_all(ids, &mut path)?;

        let callable = match root {
            Export::Callable(callable) => callable,
            other => return Ok(other),
        };

        if let Some(name) = callable.name().cloned() {
            if self.registry.contains(&name) {
                self.bind_module(&name, &mut path)?;
                return self.export_of(&name);
            }
        }

        trace!(args = args.len(), "binding anonymous callable");
        Ok(Export::Callable(callable.bind(args)))
    }

    /// Current export of a module.
    pub fn export_of(&self, id: &ModuleId) -> Result<Export> {
        self.registry
            .get(id)
            .and_then(|record| record.export())
            .ok_or_else(|| InjectorError::Unresolved(id.clone()))
    }

    /// Bind each id and collect their exports in order.
    fn bind_all(&self, ids: &[ModuleId], path: &mut Vec<ModuleId>) -> Result<Vec<Export>> {
        for id in ids {
            self.bind_module(id, path)?;
        }
        ids.iter().map(|id| self.export_of(id)).collect()
    }

    fn bind_module(&self, id: &ModuleId, path: &mut Vec<ModuleId>) -> Result<()> {
        if let Some(start) = path.iter().position(|seen| seen == id) {
            let mut cycle = path[start..].to_vec();
            cycle.push(id.clone());
            return Err(InjectorError::CircularDependency(cycle));
        }

        let record = self
            .registry
            .get(id)
            .ok_or_else(|| InjectorError::Unresolved(id.clone()))?;

        match record.value {
            ModuleValue::Factory(_) => {
                path.push(id.clone());
                let args = self.bind_all(&record.dep_ids(), path)?;
                path.pop();

                self.registry
                    .bind_once(id, |raw| raw.bind(args))
                    .ok_or_else(|| InjectorError::Unresolved(id.clone()))?;
                debug!(module = %id, "injected {} dependencies", record.deps.len());
                Ok(())
            }
            // Already bound, or plain data whose dependencies are never injected
            ModuleValue::Bound(_) | ModuleValue::Value(_) => Ok(()),
            ModuleValue::Pending(_) => Err(InjectorError::Unresolved(id.clone())),
        }
    }
}
