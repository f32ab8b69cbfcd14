// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! A partitioned map/join engine for scanning large files (or streams) in
//! parallel, plus three specializations built on top of it: a line
//! indexer, a byte-regex searcher (with in-place replace), and a
//! whole-file duplicate checker.

pub mod config;
pub mod engine;
pub mod error;
pub mod facade;
pub mod specializations;

pub use config::{BufferMode, JobConfig, JoinMode};
pub use error::{ConfigError, EngineError, EngineResult};
pub use facade::{AnyJob, Job, JobGroup, JobStateSnapshot};

/// Initializes the crate's logger. Safe to call more than once; only the
/// first call takes effect. Respects `RUST_LOG` the same way every binary
/// built on top of `log` does.
pub fn init_logging() {
    let _ = pretty_env_logger::try_init();
}
