// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! HTTP transport.

use async_trait::async_trait;
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;

use super::Transport;
use crate::error::{FetchCause, InjectorError, Result};

/// Fetches module resources over HTTP(S).
#[derive(Clone, Debug)]
pub struct HttpTransport {
    client: Client,
    base_url: Option<Url>,
}

impl HttpTransport {
    /// Create a new transport.
    ///
    /// Relative locators are resolved against `base_url`; without one they
    /// must be absolute URLs.
    pub fn new(base_url: Option<&str>, timeout: Duration, insecure: bool) -> Result<Self> {
        let base_url = base_url
            .map(|raw| {
                // A base without a trailing slash would drop its last segment on join
                let raw = if raw.ends_with('/') {
                    raw.to_string()
                } else {
                    format!("{raw}/")
                };
                Url::parse(&raw).map_err(|e| InjectorError::Config(format!("invalid base URL '{raw}': {e}")))
            })
            .transpose()?;

        let mut builder = Client::builder()
            .timeout(timeout)
            .connect_timeout(timeout.min(Duration::from_secs(30)))
            .user_agent(format!("samd/{}", env!("CARGO_PKG_VERSION")));

        if insecure {
            builder = builder.danger_accept_invalid_certs(true);
        }

        Ok(Self {
            client: builder.build()?,
            base_url,
        })
    }

    /// Base URL relative locators are joined to.
    pub fn base_url(&self) -> Option<&Url> {
        self.base_url.as_ref()
    }

    /// Absolute URL for a locator.
    pub fn resolve_url(&self, locator: &str) -> std::result::Result<Url, FetchCause> {
        if let Ok(url) = Url::parse(locator) {
            return Ok(url);
        }
        let base = self
            .base_url
            .as_ref()
            .ok_or_else(|| FetchCause::Unsupported(format!("relative locator '{locator}' without a base URL")))?;
        base.join(locator.trim_start_matches('/'))
            .map_err(|e| FetchCause::Unsupported(format!("{locator}: {e}")))
    }
}

#[async_trait]
impl Transport for HttpTransport {
    #[instrument(skip(self))]
    async fn get(&self, locator: &str) -> std::result::Result<String, FetchCause> {
        let url = self.resolve_url(locator)?;
        debug!("GET {}", url);

        let response = self.client.get(url).send().await?;
        if !response.status().is_success() {
            return Err(FetchCause::Status(response.status().as_u16()));
        }

        Ok(response.text().await?)
    }
}
