// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

/// One unit of work handed from a planner to the worker pool.
///
/// `payload` is `Some` in stream mode, where the planner has already read
/// the bytes off the stream and there is no file to seek back into. In file
/// mode it is `None` and a worker reads `start_offset..start_offset+len`
/// itself.
#[derive(Debug, Clone)]
pub struct PartitionDescriptor {
    pub id: u64,
    pub start_offset: u64,
    pub payload: Option<Vec<u8>>,
}

/// What a `Strategy::map`/`join` call hands back to the engine. The engine
/// only needs the id to keep sequential joins in order; everything else is
/// specialization-owned state accumulated on the side.
pub trait PartitionResult: Send + Clone + 'static {
    fn id(&self) -> u64;
}
