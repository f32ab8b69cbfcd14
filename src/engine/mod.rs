// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! The partitioned map/join engine: byte sources, partitioning, the worker
//! pool, join disciplines and the job manager that ties them together.
//! None of this module knows what a line, a regex match or a duplicate
//! byte range is; that's entirely up to the [`strategy::Strategy`]
//! implementations in `crate::specializations`.

pub mod job;
pub mod joiner;
pub mod partition;
pub mod planner;
pub mod pool;
pub mod pulse;
pub mod source;
pub mod strategy;

pub use partition::{PartitionDescriptor, PartitionResult};
pub use source::{ByteSource, FileSource, SourceMode};
pub use strategy::Strategy;
