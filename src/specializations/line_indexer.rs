// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Line Indexer: counts newlines per partition and, under a `Sequential`
//! join, folds chunk boundaries together so the whole file's line numbers
//! line up. The folded chunk records are kept around afterwards so
//! `offset_for_line`/`line_for_offset` can answer without rescanning the
//! whole file.

use std::sync::{Arc, Mutex};

use crate::engine::partition::PartitionResult;
use crate::engine::source::ByteSource;
use crate::engine::strategy::Strategy;
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct LineChunk {
    pub id: u64,
    pub start_offset: u64,
    pub byte_count: u64,
    pub newline_count: u64,
    pub ends_with_newline: bool,
    /// Offset of the first newline relative to this chunk's start, if any.
    pub first_newline_offset: Option<u64>,
    /// Offset of the last newline relative to this chunk's start, if any.
    pub last_newline_offset: Option<u64>,
    pub is_final: bool,
    pub start_line: u64,
    pub end_line: u64,
    /// Absolute offset where this chunk's first line (`start_line`) truly
    /// begins. Equal to `start_offset` unless that line started further
    /// back, in an earlier chunk whose tail never hit a newline.
    pub leading_line_start: u64,
    /// Absolute offset where this chunk's trailing, still-unterminated
    /// line begins. `None` once the chunk ends on a newline (or is empty),
    /// since there is then no open line to carry into the next chunk.
    pub trailing_open_start: Option<u64>,
}

impl PartitionResult for LineChunk {
    fn id(&self) -> u64 {
        self.id
    }
}

pub struct LineIndexStrategy {
    total_len: u64,
    source: Arc<dyn ByteSource>,
    chunks: Mutex<Vec<LineChunk>>,
}

impl LineIndexStrategy {
    pub fn new(source: Arc<dyn ByteSource>, total_len: u64) -> Self {
        Self {
            total_len,
            source,
            chunks: Mutex::new(Vec::new()),
        }
    }

    /// Total number of lines in the file. An empty file has zero lines by
    /// convention, even though it technically has one empty "line".
    pub fn line_count(&self) -> u64 {
        self.chunks
            .lock()
            .unwrap()
            .last()
            .map(|c| c.end_line)
            .unwrap_or(0)
    }

    /// Byte offset of the start of 1-based line `n`, or `-1` if `n` is out
    /// of range.
    pub fn offset_for_line(&self, n: u64) -> i64 {
        let chunks = self.chunks.lock().unwrap();
        if chunks.is_empty() || n == 0 {
            return -1;
        }
        let total_lines = chunks.last().unwrap().end_line;
        if n > total_lines {
            return -1;
        }

        let idx = chunks.partition_point(|c| c.end_line < n).min(chunks.len() - 1);
        let chunk = &chunks[idx];
        if n < chunk.start_line {
            return -1;
        }

        let newlines_to_skip = n - chunk.start_line;
        if newlines_to_skip == 0 {
            return chunk.leading_line_start as i64;
        }

        let mut buf = vec![0u8; chunk.byte_count as usize];
        if self.source.read_at(chunk.start_offset, &mut buf).is_err() {
            return -1;
        }

        let mut seen = 0u64;
        let mut after_last_newline = 0usize;
        for (i, &b) in buf.iter().enumerate() {
            if b == b'\n' {
                seen += 1;
                after_last_newline = i + 1;
                if seen == newlines_to_skip {
                    return (chunk.start_offset + i as u64 + 1) as i64;
                }
            }
        }

        // `n` names the trailing unterminated line at EOF, which has no
        // newline of its own to scan for.
        if chunk.is_final && !chunk.ends_with_newline && newlines_to_skip == chunk.newline_count {
            return (chunk.start_offset + after_last_newline as u64) as i64;
        }
        -1
    }

    /// 1-based line number containing byte offset `p`, or `-1` if `p` is
    /// past the end of the file.
    pub fn line_for_offset(&self, p: u64) -> i64 {
        let chunks = self.chunks.lock().unwrap();
        let idx = chunks
            .iter()
            .position(|c| p >= c.start_offset && p < c.start_offset + c.byte_count)
            .or_else(|| {
                chunks
                    .last()
                    .filter(|c| p == c.start_offset + c.byte_count)
                    .map(|_| chunks.len() - 1)
            });
        let idx = match idx {
            Some(i) => i,
            None => return -1,
        };
        let chunk = &chunks[idx];

        let mut buf = vec![0u8; chunk.byte_count as usize];
        if self.source.read_at(chunk.start_offset, &mut buf).is_err() {
            return -1;
        }
        let local = (p - chunk.start_offset) as usize;
        let newlines_before = buf[..local.min(buf.len())]
            .iter()
            .filter(|&&b| b == b'\n')
            .count() as u64;
        (chunk.start_line + newlines_before) as i64
    }
}

impl Strategy for LineIndexStrategy {
    type Result = LineChunk;

    fn map(&self, id: u64, start_offset: u64, bytes: &[u8]) -> EngineResult<LineChunk> {
        let newline_count = bytes.iter().filter(|&&b| b == b'\n').count() as u64;
        let first_newline_offset = bytes.iter().position(|&b| b == b'\n').map(|p| p as u64);
        let last_newline_offset = bytes.iter().rposition(|&b| b == b'\n').map(|p| p as u64);
        let ends_with_newline = bytes.last() == Some(&b'\n');
        let is_final = start_offset + bytes.len() as u64 >= self.total_len;

        Ok(LineChunk {
            id,
            start_offset,
            byte_count: bytes.len() as u64,
            newline_count,
            ends_with_newline,
            first_newline_offset,
            last_newline_offset,
            is_final,
            start_line: 0,
            end_line: 0,
            leading_line_start: start_offset,
            trailing_open_start: None,
        })
    }

    fn join(&self, prior: LineChunk, mut next: LineChunk) -> EngineResult<LineChunk> {
        // `end_line` only ever counts newline-terminated lines; it doesn't
        // matter whether a given newline closes a line that started in an
        // earlier chunk or one that started fresh here; either way it's one
        // more terminated line than the running total. Only at EOF, if the
        // file's last byte isn't a newline, does the trailing partial line
        // need to be counted explicitly.
        if prior.id == next.id {
            next.start_line = if next.byte_count == 0 { 0 } else { 1 };
            next.end_line = next.newline_count;
            next.leading_line_start = next.start_offset;
        } else {
            next.start_line = prior.end_line + 1;
            next.end_line = prior.end_line + next.newline_count;

            // If `prior`'s tail never hit a newline, `next`'s first line is
            // a continuation of it and really started wherever that open
            // line began, possibly several chunks further back.
            next.leading_line_start = match prior.trailing_open_start {
                Some(open) => open,
                None => next.start_offset,
            };
        }
        if next.is_final && !next.ends_with_newline && next.byte_count > 0 {
            next.end_line += 1;
        }

        next.trailing_open_start = if next.ends_with_newline || next.byte_count == 0 {
            None
        } else {
            match next.last_newline_offset {
                Some(local) => Some(next.start_offset + local + 1),
                None => Some(next.leading_line_start),
            }
        };

        self.chunks.lock().unwrap().push(next.clone());
        Ok(next)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BufferMode, JobConfig, JoinMode};
    use crate::engine::job;
    use crate::engine::source::{FileSource, SourceMode};
    use std::io::Write;
    use std::sync::atomic::AtomicBool;

    fn run_indexer(contents: &[u8], partition_size: usize) -> Arc<LineIndexStrategy> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();

        let source: Arc<dyn ByteSource> =
            Arc::new(FileSource::open(file.path(), BufferMode::Buffered).unwrap());
        let strategy = Arc::new(LineIndexStrategy::new(source.clone(), contents.len() as u64));

        let config = JobConfig {
            partition_size,
            join_mode: JoinMode::Sequential,
            ..JobConfig::default()
        }
        .normalized()
        .unwrap();

        let state = Arc::new(job::JobStateInner::new(
            Arc::new(AtomicBool::new(false)),
            Some(file.path().to_path_buf()),
        ));
        job::run_to_completion(
            config,
            SourceMode::File {
                source,
                length: contents.len() as u64,
            },
            strategy.clone(),
            state.clone(),
        );
        assert!(state.error_slot.get().is_none(), "{:?}", state.error_slot.get());
        strategy
    }

    #[test]
    fn six_lines_with_trailing_newline() {
        let text = b"hello\nworld\n\n\nfoo\nbar\n";
        let strategy = run_indexer(text, crate::config::MIN_PARTITION_SIZE);
        assert_eq!(strategy.line_count(), 6);
        assert_eq!(strategy.offset_for_line(1), 0);

        // Derive the expected start of line 5 independently of the engine,
        // by walking newlines in the source text itself.
        let expected_line5 = text
            .iter()
            .enumerate()
            .filter(|&(_, &b)| b == b'\n')
            .nth(3)
            .map(|(i, _)| i as i64 + 1)
            .unwrap();
        let got = strategy.offset_for_line(5);
        assert_eq!(got, expected_line5);
        assert_eq!(&text[got as usize..got as usize + 3], b"foo");
    }

    #[test]
    fn missing_trailing_newline_counts_partial_line() {
        let text = b"one\ntwo\nthree";
        let strategy = run_indexer(text, crate::config::MIN_PARTITION_SIZE);
        assert_eq!(strategy.line_count(), 3);
        assert_eq!(strategy.line_for_offset(0), 1);
        assert_eq!(strategy.line_for_offset(4), 2);
        assert_eq!(strategy.line_for_offset(8), 3);
    }

    #[test]
    fn line_straddling_a_partition_boundary_reports_its_true_start() {
        // A single unterminated line fills all of partition 0 and the
        // newline that closes it doesn't land until partition 1; line 1
        // started at offset 0, not at the partition boundary.
        let mut text = vec![b'a'; 3000];
        text.push(b'\n');
        text.extend(vec![b'b'; 1095]);
        assert_eq!(text.len(), 4096);

        let strategy = run_indexer(&text, crate::config::MIN_PARTITION_SIZE);
        assert_eq!(strategy.line_count(), 2);
        assert_eq!(strategy.offset_for_line(1), 0);
        assert_eq!(strategy.offset_for_line(2), 3001);
        assert_eq!(strategy.line_for_offset(0), 1);
        assert_eq!(strategy.line_for_offset(3001), 2);
    }

    #[test]
    fn empty_file_has_zero_lines() {
        let strategy = run_indexer(b"", crate::config::MIN_PARTITION_SIZE);
        assert_eq!(strategy.line_count(), 0);
        assert_eq!(strategy.offset_for_line(1), -1);
    }

    #[test]
    fn line_boundary_split_across_partitions() {
        let mut text = Vec::new();
        for i in 0..2000 {
            text.extend_from_slice(format!("line-{i}\n").as_bytes());
        }
        // Several thousand bytes over a 2048-byte partition forces the
        // fold across more than one chunk boundary.
        let strategy = run_indexer(&text, crate::config::MIN_PARTITION_SIZE);
        assert_eq!(strategy.line_count(), 2000);
        for n in [1u64, 50, 500, 1500, 2000] {
            let off = strategy.offset_for_line(n);
            assert!(off >= 0, "line {n} had no offset");
            assert_eq!(strategy.line_for_offset(off as u64), n as i64);
        }
    }
}
