// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Regex Searcher: runs one or more byte-regexes against each partition
//! independently (join discipline `None`) and accumulates matches into
//! per-regex queues. Matches found in an overlap region can be reported by
//! two neighboring partitions; `finish()` sorts by offset and dedups.
//!
//! Matching happens directly against partition bytes via
//! [`regex::bytes::Regex`] rather than decoding to `str` first, so a
//! partition boundary landing inside a multi-byte UTF-8 sequence can never
//! panic or corrupt a match.

use std::fs::File;
use std::io::{self, Read, Seek, SeekFrom, Write};
use std::path::Path;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;

use regex::bytes::Regex;

use crate::engine::partition::PartitionResult;
use crate::engine::strategy::Strategy;
use crate::error::EngineResult;

#[derive(Debug, Clone)]
pub struct Capture {
    pub start_offset: u64,
    pub value: Vec<u8>,
}

#[derive(Debug, Clone)]
pub struct Group {
    pub start_offset: u64,
    pub name: Option<String>,
    pub value: Vec<u8>,
    pub captures: Vec<Capture>,
}

#[derive(Debug, Clone)]
pub struct MatchRecord {
    pub start_offset: u64,
    pub value: Vec<u8>,
    pub groups: Vec<Group>,
    pub regex_index: usize,
}

#[derive(Debug, Clone)]
pub struct SearchPartitionResult {
    pub id: u64,
}

impl PartitionResult for SearchPartitionResult {
    fn id(&self) -> u64 {
        self.id
    }
}

pub struct RegexSearchStrategy {
    regexes: Vec<Regex>,
    /// 0 means unbounded.
    max_match_count: usize,
    queues: Vec<Mutex<Vec<MatchRecord>>>,
    match_counts: Vec<AtomicUsize>,
}

impl RegexSearchStrategy {
    pub fn new(regexes: Vec<Regex>, max_match_count: usize) -> Self {
        let queues = regexes.iter().map(|_| Mutex::new(Vec::new())).collect();
        let match_counts = regexes.iter().map(|_| AtomicUsize::new(0)).collect();
        Self {
            regexes,
            max_match_count,
            queues,
            match_counts,
        }
    }

    pub fn matches(&self, regex_index: usize) -> Vec<MatchRecord> {
        self.queues[regex_index].lock().unwrap().clone()
    }

    /// The cap is per regex: one pattern reaching `max_match_count` must
    /// not starve another pattern's own queue.
    fn at_limit(&self, regex_index: usize) -> bool {
        self.max_match_count != 0
            && self.match_counts[regex_index].load(Ordering::SeqCst) >= self.max_match_count
    }
}

impl Strategy for RegexSearchStrategy {
    type Result = SearchPartitionResult;

    fn map(&self, id: u64, start_offset: u64, bytes: &[u8]) -> EngineResult<SearchPartitionResult> {
        for (regex_index, re) in self.regexes.iter().enumerate() {
            if self.at_limit(regex_index) {
                continue;
            }
            let mut queue = self.queues[regex_index].lock().unwrap();

            for caps in re.captures_iter(bytes) {
                if self.at_limit(regex_index) {
                    break;
                }
                let whole = caps.get(0).expect("capture group 0 always matches");
                let groups = (1..caps.len())
                    .filter_map(|gi| caps.get(gi).map(|g| (gi, g)))
                    .map(|(gi, g)| Group {
                        start_offset: start_offset + g.start() as u64,
                        name: re.capture_names().nth(gi).flatten().map(str::to_string),
                        value: g.as_bytes().to_vec(),
                        captures: vec![Capture {
                            start_offset: start_offset + g.start() as u64,
                            value: g.as_bytes().to_vec(),
                        }],
                    })
                    .collect();

                queue.push(MatchRecord {
                    start_offset: start_offset + whole.start() as u64,
                    value: whole.as_bytes().to_vec(),
                    groups,
                    regex_index,
                });
                self.match_counts[regex_index].fetch_add(1, Ordering::SeqCst);
            }
        }

        Ok(SearchPartitionResult { id })
    }

    fn finish(&self) -> EngineResult<()> {
        for queue in &self.queues {
            let mut matches = queue.lock().unwrap();
            matches.sort_by_key(|m| m.start_offset);
            matches.dedup_by_key(|m| m.start_offset);
        }
        Ok(())
    }
}

/// Streams `input_path` to `out`, substituting every match in `matches`
/// (already sorted and deduped, as `finish()` leaves them) with whatever
/// `callback` returns for it. File-mode only: a stream source has already
/// been consumed by the time matches are known.
pub fn replace_to_writer<W: Write>(
    input_path: &Path,
    matches: &[MatchRecord],
    mut callback: impl FnMut(&MatchRecord) -> Vec<u8>,
    mut out: W,
) -> EngineResult<()> {
    let mut file = File::open(input_path)?;
    let mut pos: u64 = 0;

    for m in matches {
        let remaining = m.start_offset.saturating_sub(pos);
        io::copy(&mut (&mut file).take(remaining), &mut out)?;

        let replacement = callback(m);
        out.write_all(&replacement)?;

        let match_end = m.start_offset + m.value.len() as u64;
        file.seek(SeekFrom::Start(match_end))?;
        pos = match_end;
    }

    io::copy(&mut file, &mut out)?;
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{BufferMode, JobConfig, JoinMode};
    use crate::engine::job;
    use crate::engine::source::{ByteSource, FileSource, SourceMode};
    use std::io::Write as _;
    use std::sync::atomic::AtomicBool;
    use std::sync::Arc;

    fn run_search(contents: &[u8], patterns: &[&str], max_match_count: usize) -> Arc<RegexSearchStrategy> {
        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(contents).unwrap();
        file.flush().unwrap();

        let source: Arc<dyn ByteSource> =
            Arc::new(FileSource::open(file.path(), BufferMode::Buffered).unwrap());

        let regexes = patterns.iter().map(|p| Regex::new(p).unwrap()).collect();
        let strategy = Arc::new(RegexSearchStrategy::new(regexes, max_match_count));

        let config = JobConfig {
            partition_size: crate::config::MIN_PARTITION_SIZE,
            overlap: 64,
            join_mode: JoinMode::None,
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
    fn case_insensitive_match_count() {
        let text = b"Error: disk full\nerror: retrying\nWARN: slow\nERROR: fatal\n";
        let strategy = run_search(text, &["(?i)error"], 0);
        assert_eq!(strategy.matches(0).len(), 3);
    }

    #[test]
    fn matches_spanning_a_partition_boundary_are_not_duplicated() {
        // With partition_size=2048 and overlap=64, partition 0 covers bytes
        // [0, 2048) and partition 1 starts at 1984, so [1984, 2048) is
        // visible to both. A needle placed entirely inside that window is
        // found twice at the same absolute offset; finish() must dedup it.
        let mut text = vec![b'x'; 2000];
        text.extend_from_slice(b"NEEDLE");
        text.extend(vec![b'y'; 994]);
        assert_eq!(text.len(), 3000);

        let strategy = run_search(&text, &["NEEDLE"], 0);
        let matches = strategy.matches(0);
        assert_eq!(matches.len(), 1);
        assert_eq!(matches[0].start_offset, 2000);
    }

    #[test]
    fn max_match_count_caps_results() {
        let text = b"a a a a a a a a a a".repeat(10);
        let strategy = run_search(&text, &["a"], 5);
        assert!(strategy.matches(0).len() <= 5);
    }

    #[test]
    fn max_match_count_is_per_regex_not_shared() {
        // "a" hits the cap almost immediately; "z" appears only twice.
        // The cap must not starve "z"'s own queue once "a"'s is full.
        let text = b"a a a a a a a a a a z z".repeat(20);
        let strategy = run_search(&text, &["a", "z"], 3);
        assert_eq!(strategy.matches(0).len(), 3);
        assert_eq!(strategy.matches(1).len(), 3);
    }

    #[test]
    fn replace_substitutes_every_match() {
        let text = b"foo bar foo baz foo";
        let strategy = run_search(text, &["foo"], 0);
        let matches = strategy.matches(0);
        assert_eq!(matches.len(), 3);

        let mut file = tempfile::NamedTempFile::new().unwrap();
        file.write_all(text).unwrap();
        file.flush().unwrap();

        let mut out = Vec::new();
        replace_to_writer(file.path(), &matches, |_| b"qux".to_vec(), &mut out).unwrap();
        assert_eq!(out, b"qux bar qux baz qux".to_vec());
    }
}
