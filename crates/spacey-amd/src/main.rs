// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! samd - resolve AMD module dependency trees
//!
//! This is the main entry point for the samd binary.

use clap::Parser;
use owo_colors::OwoColorize;
use std::process::ExitCode;
use tracing_subscriber::{EnvFilter, layer::SubscriberExt, util::SubscriberInitExt};

mod cli;

use cli::{Cli, Commands, ConfigAction, NormalizeArgs, ResolveArgs};
use spacey_amd::loader::export_to_json;
use spacey_amd::{Config, Descriptor, Injector, Result};

#[tokio::main]
async fn main() -> ExitCode {
    // Parse CLI arguments
    let cli = Cli::parse();

    let mut config = match Config::load() {
        Ok(config) => config,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            return ExitCode::FAILURE;
        }
    };
    cli.apply(&mut config);

    // Initialize tracing
    let level = if cli.verbose { "debug" } else { config.loglevel.as_str() };
    tracing_subscriber::registry()
        .with(tracing_subscriber::fmt::layer().with_writer(std::io::stderr))
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level)))
        .init();

    let result = match &cli.command {
        Commands::Resolve(args) => resolve(args, &config).await,
        Commands::Normalize(args) => normalize(args),
        Commands::Config(args) => show_config(&args.action, &config),
    };

    match result {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", "error:".red().bold(), e);
            ExitCode::FAILURE
        }
    }
}

fn parse_deps(raw: &[String]) -> Result<Vec<Descriptor>> {
    raw.iter().map(|dep| dep.parse()).collect()
}

async fn resolve(args: &ResolveArgs, config: &Config) -> Result<()> {
    let deps = parse_deps(&args.deps)?;
    let injector = Injector::from_config(config)?;
    let resolution = injector.require(deps.iter().cloned()).await?;

    println!("{}", "Load order:".bold());
    for (i, locator) in resolution.locators.iter().enumerate() {
        println!("  {} {}", format!("{:>3}.", i + 1).dimmed(), locator.cyan());
    }

    if args.tree {
        return Ok(());
    }

    println!();
    for (dep, export) in deps.iter().zip(&resolution.exports) {
        let value = export_to_json(export.resolve()?);
        let rendered = serde_json::to_string_pretty(&value)?;
        println!("{} {}", dep.name().as_str().green().bold(), rendered);
    }

    Ok(())
}

fn normalize(args: &NormalizeArgs) -> Result<()> {
    for dep in parse_deps(&args.deps)? {
        println!("{} {} {}", dep.to_string().dimmed(), "->".dimmed(), dep.name().as_str().cyan());
    }
    Ok(())
}

fn show_config(action: &ConfigAction, config: &Config) -> Result<()> {
    match action {
        ConfigAction::Get { key } => match config.get(key) {
            Some(value) => println!("{}", value),
            None => println!("{}", "undefined".dimmed()),
        },
        ConfigAction::List => {
            for (key, value) in config.entries() {
                println!("{} = {}", key.cyan(), value);
            }
        }
    }
    Ok(())
}
