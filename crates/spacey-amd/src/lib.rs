// This Source Code Form is subject to the terms of the Mozilla Public
// License, v. 2.0. If a copy of the MPL was not distributed with this
// file, You can obtain one at https://mozilla.org/MPL/2.0/.
//
// Copyright (c) 2025 Pegasus Heavy Industries, LLC

//! # spacey-amd
//!
//! An asynchronous AMD-style module loader: `define` registers modules,
//! `require` resolves a dependency list, fetching whatever is missing,
//! and injects resolved modules into factories as positional arguments.
//!
//! - Each module is fetched at most once, however many requests need it
//! - Each factory is bound to its dependencies at most once
//! - A failed fetch fails the requests that need it and can be retried
//!
//! ## Quick Start
//!
//! ```rust,ignore
//! use serde_json::json;
//! use spacey_amd::{Callable, Definition, Export, FileTransport, Injector, ResourceLoader};
//!
//! #[tokio::main]
//! async fn main() -> spacey_amd::Result<()> {
//!     let injector = Injector::new(ResourceLoader::new(FileTransport::new("./modules")));
//!
//!     injector.define(Definition::named("greeting", json!("hello")))?;
//!     injector.define(Definition::full(
//!         "greeter",
//!         ["greeting"],
//!         Callable::new(|args| Ok(args[0].clone())),
//!     ))?;
//!
//!     let resolution = injector.require(["greeter"]).await?;
//!     let greeter = resolution.exports[0].resolve()?;
//!     assert_eq!(greeter, Export::Data(json!("hello")));
//!     Ok(())
//! }
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod binder;
pub mod config;
pub mod definition;
pub mod descriptor;
pub mod error;
pub mod export;
pub mod injector;
pub mod loader;
pub mod registry;
pub mod resolver;

// Re-exports
pub use binder::Binder;
pub use config::Config;
pub use definition::{Definition, ModuleScope};
pub use descriptor::{Descriptor, ModuleId, module_locator, module_name};
pub use error::{FetchCause, FetchError, InjectorError, Result};
pub use export::{Callable, Export};
pub use injector::Injector;
pub use loader::{
    DeclarativeHost, FileTransport, GlobalContext, Globals, HttpTransport, Loader, ResourceKind,
    ResourceLoader, ScriptHost, Transport,
};
pub use registry::{ModuleRecord, ModuleValue, Registry};
pub use resolver::{Request, Resolution, Resolver};

/// Version of spacey-amd
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
