// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use crate::engine::partition::PartitionResult;
use crate::error::EngineResult;

/// A specialization of the engine: what to compute per-partition, how (if
/// at all) to fold partitions together, and what to do once every partition
/// has been accounted for.
///
/// A `Strategy` never holds a reference back into the engine. If it needs
/// to short-circuit the job (the duplicate checker does, on first mismatch)
/// it is handed its own `Arc<AtomicBool>` cancellation flag at construction
/// time and flips that directly.
pub trait Strategy: Send + Sync {
    type Result: PartitionResult;

    /// Runs on a worker thread against one partition's bytes. `bytes` is
    /// either the descriptor's stream payload or a fresh read from the
    /// source at `start_offset`.
    fn map(&self, id: u64, start_offset: u64, bytes: &[u8]) -> EngineResult<Self::Result>;

    /// Only invoked when the job's join mode is `Sequential`, in ascending
    /// id order. The very first partition is folded as `join(r0, r0)` to
    /// seed the accumulator.
    fn join(&self, prior: Self::Result, next: Self::Result) -> EngineResult<Self::Result> {
        let _ = prior;
        Ok(next)
    }

    /// Runs once on the manager thread after every partition has been
    /// mapped (and joined, if applicable) and the job was not cancelled.
    /// Specializations use this for dedup, sorting, or other whole-job
    /// finalization that would be wasteful to do per-partition.
    fn finish(&self) -> EngineResult<()> {
        Ok(())
    }
}
