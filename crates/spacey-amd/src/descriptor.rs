// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Dependency descriptors and module identity.
//!
//! A dependency is written either as a bare string (a name, a path or a
//! URL) or as a single-key mapping `{name: locator}` that pairs a canonical
//! name with an explicit fetch location. Every form is reduced to a
//! [`ModuleId`] before it touches the registry.

use regex::Regex;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::fmt;
use std::str::FromStr;
use std::sync::LazyLock;

use crate::error::InjectorError;

/// Scheme, host and `.js` suffix around a module path.
static URL_MODULE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?i)^https?://[^/]+(.*)\.js$").expect("module URL pattern is valid")
});

/// Canonical registry key for a module.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(into = "String", from = "String")]
pub struct ModuleId(String);

impl ModuleId {
    /// Canonicalize a raw module reference.
    pub fn new(raw: &str) -> Self {
        Self(clear_name(raw))
    }

    /// The identifier as a string slice.
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ModuleId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ModuleId {
    fn from(raw: &str) -> Self {
        Self::new(raw)
    }
}

impl From<String> for ModuleId {
    fn from(raw: String) -> Self {
        Self::new(&raw)
    }
}

impl From<ModuleId> for String {
    fn from(id: ModuleId) -> Self {
        id.0
    }
}

/// A dependency as written by a caller.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "RawDescriptor", into = "RawDescriptor")]
pub enum Descriptor {
    /// Bare name, path or URL; also used as the fetch locator
    Path(String),
    /// Explicit name paired with a distinct locator
    Named {
        /// Canonical module name
        name: String,
        /// Where to fetch it from
        locator: String,
    },
}

impl Descriptor {
    /// Descriptor pairing `name` with an explicit `locator`.
    pub fn named(name: impl Into<String>, locator: impl Into<String>) -> Self {
        Descriptor::Named {
            name: name.into(),
            locator: locator.into(),
        }
    }

    /// Canonical identifier of the module this descriptor refers to.
    pub fn name(&self) -> ModuleId {
        match self {
            Descriptor::Path(path) | Descriptor::Named { name: path, .. } => ModuleId::new(path),
        }
    }

    /// Locator to fetch the module from.
    pub fn locator(&self) -> &str {
        match self {
            Descriptor::Path(path) => path,
            Descriptor::Named { locator, .. } => locator,
        }
    }

    /// Whether this is an explicit `{name: locator}` pair.
    pub fn is_named(&self) -> bool {
        matches!(self, Descriptor::Named { .. })
    }
}

impl fmt::Display for Descriptor {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Descriptor::Path(path) => f.write_str(path),
            Descriptor::Named { name, locator } => write!(f, "{name}={locator}"),
        }
    }
}

impl From<&str> for Descriptor {
    fn from(path: &str) -> Self {
        Descriptor::Path(path.to_string())
    }
}

impl From<String> for Descriptor {
    fn from(path: String) -> Self {
        Descriptor::Path(path)
    }
}

impl From<(&str, &str)> for Descriptor {
    fn from((name, locator): (&str, &str)) -> Self {
        Descriptor::named(name, locator)
    }
}

impl FromStr for Descriptor {
    type Err = InjectorError;

    /// Parses `name=locator` as a pair, anything else as a path.
    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let s = s.trim();
        if s.is_empty() {
            return Err(InjectorError::InvalidDescriptor("empty descriptor".into()));
        }

        match s.split_once('=') {
            Some((name, locator)) if !name.contains(['/', ':']) => {
                if name.is_empty() || locator.is_empty() {
                    return Err(InjectorError::InvalidDescriptor(s.to_string()));
                }
                Ok(Descriptor::named(name, locator))
            }
            _ => Ok(Descriptor::Path(s.to_string())),
        }
    }
}

/// Wire form: a string or a single-key object.
#[derive(Serialize, Deserialize)]
#[serde(untagged)]
enum RawDescriptor {
    Path(String),
    Pair(BTreeMap<String, String>),
}

impl TryFrom<RawDescriptor> for Descriptor {
    type Error = String;

    fn try_from(raw: RawDescriptor) -> Result<Self, Self::Error> {
        match raw {
            RawDescriptor::Path(path) => Ok(Descriptor::Path(path)),
            RawDescriptor::Pair(pair) => {
                if pair.len() != 1 {
                    return Err(format!(
                        "dependency mapping must have exactly one key, found {}",
                        pair.len()
                    ));
                }
                let (name, locator) = pair.into_iter().next().ok_or("empty mapping")?;
                Ok(Descriptor::Named { name, locator })
            }
        }
    }
}

impl From<Descriptor> for RawDescriptor {
    fn from(descriptor: Descriptor) -> Self {
        match descriptor {
            Descriptor::Path(path) => RawDescriptor::Path(path),
            Descriptor::Named { name, locator } => {
                RawDescriptor::Pair(BTreeMap::from([(name, locator)]))
            }
        }
    }
}

/// Canonical identifier for a descriptor.
pub fn module_name(descriptor: &Descriptor) -> ModuleId {
    descriptor.name()
}

/// Fetch locator for a descriptor.
pub fn module_locator(descriptor: &Descriptor) -> &str {
    descriptor.locator()
}

/// Strip scheme, host and `.js` from a module URL, then any leading `/`.
pub fn clear_name(raw: &str) -> String {
    let path = URL_MODULE
        .captures(raw)
        .and_then(|caps| caps.get(1))
        .map(|m| m.as_str())
        .filter(|p| !p.is_empty())
        .unwrap_or(raw);

    // Trimming every leading separator keeps normalization idempotent
    path.trim_start_matches('/').to_string()
}
