// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module definitions.
//!
//! `define` accepts four shapes. Each is a [`Definition`] variant, and
//! every variant reduces to the same `(id, deps, value)` triple before it
//! reaches the registry.

use std::sync::Arc;
use tracing::debug;

use crate::descriptor::{Descriptor, ModuleId};
use crate::error::{InjectorError, Result};
use crate::export::{Callable, Export};
use crate::registry::{ModuleRecord, ModuleValue, Registry};

/// A module definition, classified by shape.
#[derive(Debug, Clone)]
pub enum Definition {
    /// `define(factory)`
    Anonymous {
        /// Module factory
        factory: Callable,
    },
    /// `define(deps, factory)`
    AnonymousWithDeps {
        /// Dependencies injected into the factory
        deps: Vec<Descriptor>,
        /// Module factory
        factory: Callable,
    },
    /// `define(name, value)`
    Named {
        /// Module name
        name: String,
        /// Value or factory
        value: Export,
    },
    /// `define(name, deps, value)`
    Full {
        /// Module name
        name: String,
        /// Dependencies injected into the factory
        deps: Vec<Descriptor>,
        /// Value or factory
        value: Export,
    },
}

impl Definition {
    /// `define(factory)`
    pub fn factory(factory: Callable) -> Self {
        Definition::Anonymous { factory }
    }

    /// `define(deps, factory)`
    pub fn with_deps<D: Into<Descriptor>>(deps: impl IntoIterator<Item = D>, factory: Callable) -> Self {
        Definition::AnonymousWithDeps {
            deps: deps.into_iter().map(Into::into).collect(),
            factory,
        }
    }

    /// `define(name, value)`
    pub fn named(name: impl Into<String>, value: impl Into<Export>) -> Self {
        Definition::Named {
            name: name.into(),
            value: value.into(),
        }
    }

    /// `define(name, deps, value)`
    pub fn full<D: Into<Descriptor>>(
        name: impl Into<String>,
        deps: impl IntoIterator<Item = D>,
        value: impl Into<Export>,
    ) -> Self {
        Definition::Full {
            name: name.into(),
            deps: deps.into_iter().map(Into::into).collect(),
            value: value.into(),
        }
    }

    /// Split into `(id, deps, value)`, naming anonymous modules `current`.
    fn into_parts(self, current: Option<&ModuleId>) -> Result<(ModuleId, Vec<Descriptor>, Export)> {
        let anonymous = || current.cloned().ok_or(InjectorError::MissingModuleName);
        match self {
            Definition::Anonymous { factory } => Ok((anonymous()?, Vec::new(), factory.into())),
            Definition::AnonymousWithDeps { deps, factory } => Ok((anonymous()?, deps, factory.into())),
            Definition::Named { name, value } => Ok((ModuleId::new(&name), Vec::new(), value)),
            Definition::Full { name, deps, value } => Ok((ModuleId::new(&name), deps, value)),
        }
    }
}

/// Register a definition, replacing any existing record for its id.
pub(crate) fn register(
    registry: &Registry,
    definition: Definition,
    current: Option<&ModuleId>,
) -> Result<ModuleId> {
    let (id, deps, value) = definition.into_parts(current)?;
    Ok(store(registry, id, deps, value))
}

fn store(registry: &Registry, id: ModuleId, deps: Vec<Descriptor>, value: Export) -> ModuleId {
    let value = match value {
        Export::Callable(factory) => ModuleValue::Factory(factory.with_name(id.clone())),
        other => ModuleValue::Value(other),
    };

    debug!(module = %id, deps = deps.len(), "defined module");
    registry.insert(id.clone(), ModuleRecord { deps, value });
    id
}

/// The resource currently being loaded, as seen by the code it contains.
///
/// Loaders receive one per fetch; the fetched unit registers itself
/// through it.
#[derive(Clone)]
pub struct ModuleScope {
    registry: Arc<Registry>,
    descriptor: Descriptor,
    id: ModuleId,
}

impl ModuleScope {
    pub(crate) fn new(registry: Arc<Registry>, descriptor: Descriptor) -> Self {
        let id = descriptor.name();
        Self {
            registry,
            descriptor,
            id,
        }
    }

    /// Descriptor that triggered the fetch.
    pub fn descriptor(&self) -> &Descriptor {
        &self.descriptor
    }

    /// Canonical id the resource is expected to register.
    pub fn id(&self) -> &ModuleId {
        &self.id
    }

    /// Locator being fetched.
    pub fn locator(&self) -> &str {
        self.descriptor.locator()
    }

    /// Define a module from inside the resource.
    ///
    /// Anonymous definitions are registered under [`ModuleScope::id`].
    pub fn define(&self, definition: Definition) -> Result<ModuleId> {
        register(&self.registry, definition, Some(&self.id))
    }

    /// Register `value` as this resource's module, with no dependencies.
    pub fn define_value(&self, value: impl Into<Export>) -> ModuleId {
        store(&self.registry, self.id.clone(), Vec::new(), value.into())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn noop() -> Callable {
        Callable::new(|_| Ok(Export::Undefined))
    }

    #[test]
    fn test_anonymous_needs_a_scope() {
        let registry = Registry::new();
        let err = register(&registry, Definition::factory(noop()), None).unwrap_err();
        assert!(matches!(err, InjectorError::MissingModuleName));
        assert!(registry.is_empty());
    }

    #[test]
    fn test_named_definitions_are_normalized() {
        let registry = Registry::new();
        let id = register(&registry, Definition::named("/util/strings", json!({"sep": ","})), None).unwrap();
        assert_eq!(id.as_str(), "util/strings");
        let record = registry.get(&id).unwrap();
        assert!(record.deps.is_empty());
        assert!(matches!(record.value, ModuleValue::Value(Export::Data(_))));
    }

    #[test]
    fn test_factories_carry_their_id() {
        let registry = Registry::new();
        let id = register(&registry, Definition::full("app", ["dom", "net"], noop()), None).unwrap();
        let record = registry.get(&id).unwrap();
        assert_eq!(record.dep_ids(), vec![ModuleId::new("dom"), ModuleId::new("net")]);
        match record.value {
            ModuleValue::Factory(f) => assert_eq!(f.name(), Some(&id)),
            other => panic!("expected factory, got {other:?}"),
        }
    }

    #[test]
    fn test_scope_names_anonymous_modules() {
        let registry = Arc::new(Registry::new());
        let scope = ModuleScope::new(Arc::clone(&registry), "http://cdn.example.com/widgets/tabs.js".into());
        assert_eq!(scope.id().as_str(), "widgets/tabs");

        let id = scope.define(Definition::with_deps(["widgets/base"], noop())).unwrap();
        assert_eq!(id.as_str(), "widgets/tabs");
        assert_eq!(registry.get(&id).unwrap().deps.len(), 1);
    }

    #[test]
    fn test_define_overwrites_pending() {
        use futures::FutureExt;

        let registry = Arc::new(Registry::new());
        let id = ModuleId::new("late");
        registry.claim(&id, || futures::future::pending().boxed().shared());
        assert!(registry.is_pending(&id));

        let scope = ModuleScope::new(Arc::clone(&registry), "late".into());
        scope.define_value(Export::Text("ready".into()));
        assert!(!registry.is_pending(&id));
        assert_eq!(registry.get(&id).unwrap().export(), Some(Export::Text("ready".into())));
    }
}
