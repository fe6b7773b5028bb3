// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! File system transport.

use async_trait::async_trait;
use std::path::{Component, Path, PathBuf};
use tokio::fs;
use tracing::debug;

use super::Transport;
use crate::error::FetchCause;

/// Reads module resources from a directory tree.
#[derive(Debug, Clone)]
pub struct FileTransport {
    root: PathBuf,
}

impl FileTransport {
    /// Create a transport rooted at `root`.
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    /// Root directory.
    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Path for a locator; `file://` prefixes and leading `/` are relative to the root.
    pub fn path_for(&self, locator: &str) -> Result<PathBuf, FetchCause> {
        let relative = locator.strip_prefix("file://").unwrap_or(locator);
        let relative = Path::new(relative.trim_start_matches('/'));

        if relative
            .components()
            .any(|c| matches!(c, Component::ParentDir | Component::Prefix(_)))
        {
            return Err(FetchCause::Unsupported(format!("locator '{locator}' escapes the module root")));
        }

        Ok(self.root.join(relative))
    }
}

#[async_trait]
impl Transport for FileTransport {
    async fn get(&self, locator: &str) -> Result<String, FetchCause> {
        let path = self.path_for(locator)?;
        debug!("Reading {}", path.display());
        Ok(fs::read_to_string(&path).await?)
    }
}
