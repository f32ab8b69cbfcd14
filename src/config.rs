// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Job configuration: sizes, join discipline and I/O hints, normalized
//! before a job is ever started.

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Partitions smaller than this make per-thread overhead dominate the work.
pub const MIN_PARTITION_SIZE: usize = 2048;

/// Default partition size used when a caller doesn't pick one.
pub const DEFAULT_PARTITION_SIZE: usize = 1 << 20;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum JoinMode {
    /// No cross-partition fold. Specializations that need shared state
    /// accumulate it themselves.
    None,
    /// Partitions are folded in ascending id order, one at a time.
    Sequential,
    /// Reserved for a future commutative-reduce discipline. Rejected at
    /// `start()` with [`ConfigError::UnsupportedJoinMode`].
    Reduce,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum BufferMode {
    /// Let the OS page cache behave normally.
    Buffered,
    /// Best-effort hint (via `posix_fadvise` on unix) that pages read for a
    /// partition can be dropped immediately afterwards. Never fails the job.
    Unbuffered,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct JobConfig {
    pub partition_size: usize,
    pub overlap: usize,
    /// 0 means "pick a sensible default for this machine".
    pub max_workers: usize,
    pub join_mode: JoinMode,
    pub buffer_mode: BufferMode,
}

impl Default for JobConfig {
    fn default() -> Self {
        Self {
            partition_size: DEFAULT_PARTITION_SIZE,
            overlap: 0,
            max_workers: 0,
            join_mode: JoinMode::None,
            buffer_mode: BufferMode::Buffered,
        }
    }
}

impl JobConfig {
    /// Clamps `partition_size`/`overlap` into sane ranges and rejects
    /// join modes that aren't implemented yet. Called once by the facade
    /// before a job's manager thread is spawned.
    pub fn normalized(mut self) -> Result<Self, ConfigError> {
        if matches!(self.join_mode, JoinMode::Reduce) {
            return Err(ConfigError::UnsupportedJoinMode(self.join_mode));
        }

        if self.partition_size < MIN_PARTITION_SIZE {
            self.partition_size = MIN_PARTITION_SIZE;
        }

        let max_overlap = self.partition_size / 2;
        if self.overlap > max_overlap {
            self.overlap = max_overlap;
        }
        if self.overlap % 2 != 0 {
            if self.overlap + 1 <= max_overlap {
                self.overlap += 1;
            } else {
                self.overlap -= 1;
            }
        }

        Ok(self)
    }

    /// Bytes a planner advances between successive partition starts.
    pub fn step(&self) -> usize {
        self.partition_size - self.overlap
    }

    pub fn resolve_worker_count(&self) -> usize {
        if self.max_workers == 0 {
            (num_cpus::get() * 2).min(32)
        } else {
            self.max_workers
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn clamps_tiny_partition_size() {
        let cfg = JobConfig {
            partition_size: 16,
            ..JobConfig::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(cfg.partition_size, MIN_PARTITION_SIZE);
    }

    #[test]
    fn clamps_and_evens_overlap() {
        let cfg = JobConfig {
            partition_size: 4096,
            overlap: 4000,
            ..JobConfig::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(cfg.overlap, 2048);

        let cfg = JobConfig {
            partition_size: 4096,
            overlap: 3,
            ..JobConfig::default()
        }
        .normalized()
        .unwrap();
        assert_eq!(cfg.overlap % 2, 0);
    }

    #[test]
    fn rejects_reduce_join_mode() {
        let err = JobConfig {
            join_mode: JoinMode::Reduce,
            ..JobConfig::default()
        }
        .normalized()
        .unwrap_err();
        assert_eq!(err, ConfigError::UnsupportedJoinMode(JoinMode::Reduce));
    }
}
