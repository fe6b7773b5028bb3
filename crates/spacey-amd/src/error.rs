// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! Error types for the module injector.

use thiserror::Error;

use crate::descriptor::ModuleId;

/// Result type for injector operations.
pub type Result<T> = std::result::Result<T, InjectorError>;

/// Why a single resource fetch failed.
///
/// Cloneable because one fetch outcome is observed by every request
/// waiting on the same module.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum FetchCause {
    /// Transport-level failure (connection, TLS, timeout)
    #[error("transport error: {0}")]
    Transport(String),

    /// Non-success HTTP status
    #[error("HTTP {0}")]
    Status(u16),

    /// File system error
    #[error("IO error: {0}")]
    Io(String),

    /// Resource body could not be parsed
    #[error("parse error: {0}")]
    Parse(String),

    /// Script host rejected the resource
    #[error("script error: {0}")]
    Script(String),

    /// No loading strategy for this locator
    #[error("unsupported resource: {0}")]
    Unsupported(String),

    /// Non-cooperative resource left nothing in the global context
    #[error("global '{0}' not found after load")]
    MissingGlobal(String),

    /// Resource loaded but never defined its module
    #[error("resource did not register its module")]
    NotRegistered,
}

impl From<reqwest::Error> for FetchCause {
    fn from(err: reqwest::Error) -> Self {
        match err.status() {
            Some(status) => FetchCause::Status(status.as_u16()),
            None => FetchCause::Transport(err.to_string()),
        }
    }
}

impl From<std::io::Error> for FetchCause {
    fn from(err: std::io::Error) -> Self {
        FetchCause::Io(err.to_string())
    }
}

/// A failed fetch, tagged with the module it was meant to provide.
#[derive(Error, Debug, Clone, PartialEq, Eq)]
#[error("failed to load module '{name}': {cause}")]
pub struct FetchError {
    /// Canonical identifier of the module being fetched
    pub name: ModuleId,
    /// Underlying cause
    pub cause: FetchCause,
}

/// Main error type for the injector.
#[derive(Error, Debug)]
pub enum InjectorError {
    /// A transitive dependency could not be fetched
    #[error("Unresolvable dependency: {0}")]
    Unresolvable(#[from] FetchError),

    /// Dependency graph loops back on itself
    #[error("Circular dependency detected: {}", format_cycle(.0))]
    CircularDependency(Vec<ModuleId>),

    /// Anonymous define outside of a loading resource
    #[error("Anonymous module defined outside of a loading resource")]
    MissingModuleName,

    /// Module expected in the registry is missing or still pending
    #[error("Module '{0}' is not resolved")]
    Unresolved(ModuleId),

    /// Malformed dependency descriptor
    #[error("Invalid dependency descriptor: {0}")]
    InvalidDescriptor(String),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// JSON parsing error
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    /// HTTP client construction error
    #[error("HTTP client error: {0}")]
    Http(#[from] reqwest::Error),

    /// General error with message
    #[error("{0}")]
    Other(String),
}

impl InjectorError {
    /// The module this error is about, when there is one.
    pub fn module(&self) -> Option<&ModuleId> {
        match self {
            InjectorError::Unresolvable(fetch) => Some(&fetch.name),
            InjectorError::CircularDependency(cycle) => cycle.last(),
            InjectorError::Unresolved(id) => Some(id),
            _ => None,
        }
    }
}

impl From<anyhow::Error> for InjectorError {
    fn from(err: anyhow::Error) -> Self {
        InjectorError::Other(format!("{err:#}"))
    }
}

fn format_cycle(cycle: &[ModuleId]) -> String {
    cycle
        .iter()
        .map(ModuleId::as_str)
        .collect::<Vec<_>>()
        .join(" -> ")
}
