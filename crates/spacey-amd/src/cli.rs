// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! CLI argument parsing for samd.

use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;

use spacey_amd::Config;

/// samd - resolve AMD module dependency trees
#[derive(Parser, Debug)]
#[command(name = "samd")]
#[command(author, version, about, long_about = None)]
#[command(propagate_version = true)]
pub struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    pub verbose: bool,

    /// Base URL modules are fetched from
    #[arg(long, global = true, env = "SAMD_BASE_URL")]
    pub base_url: Option<String>,

    /// Directory modules are read from when no base URL is set
    #[arg(long, global = true)]
    pub root: Option<PathBuf>,

    /// Request timeout in seconds
    #[arg(long, global = true)]
    pub timeout: Option<u64>,

    /// Skip SSL certificate verification
    #[arg(long, global = true)]
    pub insecure: bool,

    #[command(subcommand)]
    pub command: Commands,
}

impl Cli {
    /// Apply command line overrides on top of loaded configuration.
    pub fn apply(&self, config: &mut Config) {
        if let Some(base_url) = &self.base_url {
            config.base_url = Some(base_url.clone());
        }
        if let Some(root) = &self.root {
            config.root = Some(root.clone());
        }
        if let Some(timeout) = self.timeout {
            config.timeout = timeout;
        }
        if self.insecure {
            config.strict_ssl = false;
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Load modules and print their exports
    #[command(alias = "r")]
    Resolve(ResolveArgs),

    /// Print the canonical id of each dependency
    #[command(alias = "n")]
    Normalize(NormalizeArgs),

    /// Show samd configuration
    #[command(alias = "c")]
    Config(ConfigArgs),
}

#[derive(Args, Debug, Clone)]
pub struct ResolveArgs {
    /// Dependencies, as locators or `name=locator` pairs
    #[arg(value_name = "DEP", required = true)]
    pub deps: Vec<String>,

    /// Only print the load order
    #[arg(long)]
    pub tree: bool,
}

#[derive(Args, Debug, Clone)]
pub struct NormalizeArgs {
    /// Dependencies, as locators or `name=locator` pairs
    #[arg(value_name = "DEP", required = true)]
    pub deps: Vec<String>,
}

#[derive(Args, Debug, Clone)]
pub struct ConfigArgs {
    #[command(subcommand)]
    pub action: ConfigAction,
}

#[derive(Subcommand, Debug, Clone)]
pub enum ConfigAction {
    /// Get a config value
    Get { key: String },
    /// List all config values
    List,
}
