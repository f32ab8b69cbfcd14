// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use thiserror::Error;

use crate::config::JoinMode;

/// Errors that can be detected synchronously, before a job's manager thread
/// is ever spawned.
#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum ConfigError {
    #[error("join mode {0:?} is reserved and not yet implemented")]
    UnsupportedJoinMode(JoinMode),
    #[error("a source path is required to start this job")]
    MissingPath,
    #[error("source file not found: {0}")]
    PathNotFound(String),
    #[error("the two inputs being compared must have the same partition size")]
    MismatchedPartitionSize,
}

/// Errors surfaced from a running job, either synchronously from `start()`
/// (Configuration) or asynchronously via `JobState::error` (everything else).
#[derive(Debug, Error)]
pub enum EngineError {
    #[error(transparent)]
    Config(#[from] ConfigError),
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("computation failed: {0}")]
    Compute(String),
}

pub type EngineResult<T> = Result<T, EngineError>;

/// Write-once error slot shared between a job's worker threads and its
/// manager. First writer wins: once an error is recorded, later writes are
/// dropped on the floor so the reported cause is always the first failure.
#[derive(Default)]
pub struct ErrorSlot(std::sync::Mutex<Option<String>>);

impl ErrorSlot {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn set(&self, err: EngineError) {
        let mut guard = self.0.lock().unwrap();
        if guard.is_none() {
            *guard = Some(err.to_string());
        }
    }

    pub fn get(&self) -> Option<String> {
        self.0.lock().unwrap().clone()
    }

    pub fn clear(&self) {
        *self.0.lock().unwrap() = None;
    }
}
