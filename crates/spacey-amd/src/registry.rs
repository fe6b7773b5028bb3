// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Module registry
//!
//! The single source of truth for whether a module is unknown, pending
//! or defined. Records are always handed out as clones; nothing outside
//! the registry holds a reference into its storage across a mutation.

use dashmap::DashMap;
use dashmap::mapref::entry::Entry;
use futures::future::{BoxFuture, Shared};
use std::collections::HashSet;
use std::fmt;
use tracing::debug;

use crate::descriptor::{Descriptor, ModuleId};
use crate::error::FetchError;
use crate::export::{Callable, Export};

/// In-flight fetch shared by every request waiting on the same module.
pub type PendingFetch = Shared<BoxFuture<'static, Result<ModuleId, FetchError>>>;

/// What a registry slot currently holds.
#[derive(Clone)]
pub enum ModuleValue {
    /// Fetch started, module not yet defined
    Pending(PendingFetch),
    /// Factory that has not been bound to its dependencies
    Factory(Callable),
    /// Factory with its dependencies injected
    Bound(Callable),
    /// Plain value
    Value(Export),
}

impl fmt::Debug for ModuleValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ModuleValue::Pending(_) => f.write_str("Pending"),
            ModuleValue::Factory(c) => f.debug_tuple("Factory").field(c).finish(),
            ModuleValue::Bound(c) => f.debug_tuple("Bound").field(c).finish(),
            ModuleValue::Value(v) => f.debug_tuple("Value").field(v).finish(),
        }
    }
}

/// Registry entry for one module
#[derive(Debug, Clone)]
pub struct ModuleRecord {
    /// Dependencies the module was declared with
    pub deps: Vec<Descriptor>,
    /// Current value slot
    pub value: ModuleValue,
}

impl ModuleRecord {
    /// Placeholder for a module being fetched.
    pub fn pending(fetch: PendingFetch) -> Self {
        Self {
            deps: Vec::new(),
            value: ModuleValue::Pending(fetch),
        }
    }

    /// Whether a fetch is still in flight.
    pub fn is_pending(&self) -> bool {
        matches!(self.value, ModuleValue::Pending(_))
    }

    /// Whether the factory has been bound.
    pub fn is_bound(&self) -> bool {
        matches!(self.value, ModuleValue::Bound(_))
    }

    /// Canonical ids of the declared dependencies.
    pub fn dep_ids(&self) -> Vec<ModuleId> {
        self.deps.iter().map(Descriptor::name).collect()
    }

    /// The value dependents receive, `None` while pending.
    pub fn export(&self) -> Option<Export> {
        match &self.value {
            ModuleValue::Pending(_) => None,
            ModuleValue::Factory(c) | ModuleValue::Bound(c) => Some(Export::Callable(c.clone())),
            ModuleValue::Value(v) => Some(v.clone()),
        }
    }
}

/// Outcome of [`Registry::claim`].
pub enum Claim {
    /// Module is defined
    Ready(ModuleRecord),
    /// Another request is already fetching it
    Pending(PendingFetch),
    /// The caller installed the pending record and owns the fetch
    Started(PendingFetch),
}

/// Thread-safe module registry
#[derive(Default)]
pub struct Registry {
    records: DashMap<ModuleId, ModuleRecord>,
}

impl Registry {
    /// Create a new empty registry
    pub fn new() -> Self {
        Self::default()
    }

    /// Get a record by id
    pub fn get(&self, id: &ModuleId) -> Option<ModuleRecord> {
        self.records.get(id).map(|entry| entry.clone())
    }

    /// Check if a record exists, pending or not
    pub fn contains(&self, id: &ModuleId) -> bool {
        self.records.contains_key(id)
    }

    /// Check if a fetch is in flight for `id`
    pub fn is_pending(&self, id: &ModuleId) -> bool {
        self.records.get(id).is_some_and(|entry| entry.is_pending())
    }

    /// Store a record, replacing any previous one
    pub fn insert(&self, id: ModuleId, record: ModuleRecord) -> Option<ModuleRecord> {
        self.records.insert(id, record)
    }

    /// Remove a record
    pub fn remove(&self, id: &ModuleId) -> Option<ModuleRecord> {
        self.records.remove(id).map(|(_, record)| record)
    }

    /// All registered ids
    pub fn ids(&self) -> Vec<ModuleId> {
        self.records.iter().map(|entry| entry.key().clone()).collect()
    }

    /// Number of records
    pub fn len(&self) -> usize {
        self.records.len()
    }

    /// Check if the registry is empty
    pub fn is_empty(&self) -> bool {
        self.records.is_empty()
    }

    /// Drop every record
    pub fn clear(&self) {
        self.records.clear();
    }

    /// Observe `id`, or install a pending record built by `start`.
    ///
    /// Runs as one entry operation, so of any number of concurrent
    /// claimers exactly one gets [`Claim::Started`].
    pub fn claim(&self, id: &ModuleId, start: impl FnOnce() -> PendingFetch) -> Claim {
        match self.records.entry(id.clone()) {
            Entry::Occupied(entry) => match &entry.get().value {
                ModuleValue::Pending(fetch) => Claim::Pending(fetch.clone()),
                _ => Claim::Ready(entry.get().clone()),
            },
            Entry::Vacant(entry) => {
                let fetch = start();
                entry.insert(ModuleRecord::pending(fetch.clone()));
                debug!(module = %id, "marked pending");
                Claim::Started(fetch)
            }
        }
    }

    /// Replace an unbound factory with `bind(factory)`, once.
    ///
    /// Returns the bound callable, whether bound now or earlier; `None` if
    /// the record is missing or does not hold a factory.
    pub fn bind_once(&self, id: &ModuleId, bind: impl FnOnce(&Callable) -> Callable) -> Option<Callable> {
        let mut entry = self.records.get_mut(id)?;
        let raw = match &entry.value {
            ModuleValue::Factory(raw) => raw.clone(),
            ModuleValue::Bound(bound) => return Some(bound.clone()),
            _ => return None,
        };
        let bound = bind(&raw);
        entry.value = ModuleValue::Bound(bound.clone());
        debug!(module = %id, "bound factory");
        Some(bound)
    }

    /// Whether every id, and everything it transitively depends on, is
    /// defined.
    pub fn is_resolved(&self, ids: &[ModuleId]) -> bool {
        let mut seen = HashSet::new();
        ids.iter().all(|id| self.is_resolved_from(id, &mut seen))
    }

    fn is_resolved_from(&self, id: &ModuleId, seen: &mut HashSet<ModuleId>) -> bool {
        // Revisits are already being checked further up
        if !seen.insert(id.clone()) {
            return true;
        }
        match self.get(id) {
            Some(record) if !record.is_pending() => record
                .dep_ids()
                .iter()
                .all(|dep| self.is_resolved_from(dep, seen)),
            _ => false,
        }
    }
}
