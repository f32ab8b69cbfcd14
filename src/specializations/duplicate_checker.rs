// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Duplicate Checker: compares two files partition-by-partition. Each
//! worker reads the matching range out of the *other* file itself and
//! compares word-at-a-time; on the first mismatch it flips the job's own
//! cancellation flag directly rather than going through the error path, so
//! "files differ" is reported as a clean, error-free cancellation.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use crate::engine::partition::PartitionResult;
use crate::engine::source::ByteSource;
use crate::engine::strategy::Strategy;
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct DupPartitionResult {
    pub id: u64,
}

impl PartitionResult for DupPartitionResult {
    fn id(&self) -> u64 {
        self.id
    }
}

pub struct DuplicateCheckStrategy {
    other: Arc<dyn ByteSource>,
    partition_size: usize,
    cancel: Arc<AtomicBool>,
    identical: AtomicBool,
}

impl DuplicateCheckStrategy {
    /// `self_len` is the length of the file this job's own planner is
    /// enumerating. A length mismatch is decided here rather than left to
    /// the caller: the planner only ever walks `self_len` worth of
    /// partitions, so if `other` is a strict superset (or subset) every
    /// partition Map does see will still compare equal, and nothing else
    /// in the job would ever notice the trailing bytes.
    pub fn new(
        other: Arc<dyn ByteSource>,
        partition_size: usize,
        cancel: Arc<AtomicBool>,
        self_len: u64,
    ) -> Self {
        let identical = self_len == other.len();
        Self {
            other,
            partition_size,
            cancel,
            identical: AtomicBool::new(identical),
        }
    }

    pub fn is_identical(&self) -> bool {
        self.identical.load(Ordering::SeqCst)
    }
}

impl Strategy for DuplicateCheckStrategy {
    type Result = DupPartitionResult;

    fn map(&self, id: u64, start_offset: u64, bytes_a: &[u8]) -> EngineResult<DupPartitionResult> {
        let mut buf_b = vec![0u8; self.partition_size];
        let n = self.other.read_at(start_offset, &mut buf_b)?;
        buf_b.truncate(n);

        if !words_equal(bytes_a, &buf_b) {
            self.identical.store(false, Ordering::SeqCst);
            self.cancel.store(true, Ordering::SeqCst);
        }

        Ok(DupPartitionResult { id })
    }
}

/// Compares two byte slices eight bytes at a time, falling back to a
/// byte-wise tail comparison for whatever doesn't divide evenly into a
/// `u64` word. Lengths must match first; callers that skip that check will
/// just get `false`.
fn words_equal(a: &[u8], b: &[u8]) -> bool {
    if a.len() != b.len() {
        return false;
    }

    let mut a_words = a.chunks_exact(8);
    let mut b_words = b.chunks_exact(8);
    for (wa, wb) in (&mut a_words).zip(&mut b_words) {
        let wa = u64::from_ne_bytes(wa.try_into().unwrap());
        let wb = u64::from_ne_bytes(wb.try_into().unwrap());
        if wa != wb {
            return false;
        }
    }
    a_words.remainder() == b_words.remainder()
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BufferMode, JobConfig, JoinMode};
    use crate::engine::job;
    use crate::engine::source::{FileSource, SourceMode};
    use crate::facade::Job;
    use std::io::Write;

    fn write_temp(contents: &[u8]) -> tempfile::NamedTempFile {
        let mut f = tempfile::NamedTempFile::new().unwrap();
        f.write_all(contents).unwrap();
        f.flush().unwrap();
        f
    }

    fn run_check(a: &[u8], b: &[u8]) -> Arc<DuplicateCheckStrategy> {
        let file_a = write_temp(a);
        let file_b = write_temp(b);

        let source_a: Arc<dyn ByteSource> =
            Arc::new(FileSource::open(file_a.path(), BufferMode::Buffered).unwrap());
        let source_b: Arc<dyn ByteSource> =
            Arc::new(FileSource::open(file_b.path(), BufferMode::Buffered).unwrap());

        let config = JobConfig {
            partition_size: crate::config::MIN_PARTITION_SIZE,
            join_mode: JoinMode::None,
            ..JobConfig::default()
        };
        let path_a = file_a.path().to_path_buf();
        let length_a = a.len() as u64;
        let job = Job::with_strategy_factory(
            config,
            Some(path_a.clone()),
            Box::new(move || {
                Ok(SourceMode::File {
                    source: source_a.clone(),
                    length: length_a,
                })
            }),
            move |cancel| {
                Arc::new(DuplicateCheckStrategy::new(
                    source_b,
                    crate::config::MIN_PARTITION_SIZE,
                    cancel,
                    length_a,
                ))
            },
        )
        .unwrap();

        job.start().unwrap();
        job.wait(std::time::Duration::from_millis(20), |_| {});
        job.strategy().clone()
    }

    #[test]
    fn identical_files_report_identical() {
        let contents = vec![7u8; 5000];
        let strategy = run_check(&contents, &contents);
        assert!(strategy.is_identical());
    }

    #[test]
    fn mismatched_files_report_difference_without_error() {
        let a = vec![1u8; 5000];
        let mut b = a.clone();
        b[4500] = 2;
        let strategy = run_check(&a, &b);
        assert!(!strategy.is_identical());
    }

    #[test]
    fn superset_file_is_not_reported_identical() {
        // `a` is a byte-for-byte prefix of `b`. The planner only ever walks
        // `a`'s length, so every partition Map sees compares equal; the
        // length check is what catches this.
        let a = vec![9u8; 5000];
        let mut b = a.clone();
        b.extend(vec![9u8; 200]);
        let strategy = run_check(&a, &b);
        assert!(!strategy.is_identical());
    }

    #[test]
    fn words_equal_matches_naive_comparison() {
        let a = b"abcdefghij";
        let b = b"abcdefghij";
        assert!(words_equal(a, b));
        let c = b"abcdefghik";
        assert!(!words_equal(a, c));
    }
}
