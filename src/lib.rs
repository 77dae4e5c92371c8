//! # nodepack
//!
//! The build cache of a Node.js buildpack.
//!
//! Package-manager caches (`.npm`, `.cache/yarn`, `bower_components`, or whatever
//! the application lists under `cacheDirectories` in its `package.json`) are kept
//! in a persistent cache directory between builds. Before the install step they
//! are moved into the build directory, afterwards they are copied back. A cache
//! is only reused when it was written by the same `node`, `npm` and `yarn`
//! versions.
//!
//! ## Modules Overview
//! - [`cache`] – Signature-gated restore and save of cached directories
//! - [`manifest`] – Reading `cacheDirectories` from `package.json`
//! - [`config`] – `nodepack.toml` settings and the `NODE_MODULES_CACHE` toggle
//! - [`command`] – Running external tools (`node --version` and friends)
//! - [`log`] – Buildpack-style step/info/warning output
//! - [`finalize`] – Restore, install, save, with per-stage error reporting
//! - [`util`] – Filesystem helpers (copy, move, remove)
//! - [`global`] – Per-user default directories


pub mod cache;
pub mod manifest;
pub mod config;
pub mod command;
pub mod log;
pub mod finalize;
pub mod util;
pub mod global;

pub use cache::{CacheDirSource, CacheManager, ToolVersions, DEFAULT_CACHE_DIRS};
pub use command::{CommandRunner, SystemCommand};
pub use config::BuildpackConfig;
pub use log::{ConsoleLogger, Logger};
