// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use std::path::PathBuf;

use clap::{Args as ClapArgs, Parser, Subcommand};

#[derive(Parser)]
#[command(
    version,
    about = "Partitioned parallel scanning over large files: index lines, search/replace with regex, or diff two files"
)]
#[command(next_line_help = true)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand)]
pub enum Command {
    /// Count lines and report offset <-> line-number mappings
    Index(IndexArgs),
    /// Search a file for one or more regular expressions
    Search(SearchArgs),
    /// Replace every match of a regular expression in a file
    Replace(ReplaceArgs),
    /// Compare two files for byte-for-byte equality
    Diff(DiffArgs),
}

#[derive(ClapArgs)]
pub struct PartitionOpts {
    #[arg(
        short = 's',
        long,
        value_name = "BYTES",
        default_value_t = partwise::config::DEFAULT_PARTITION_SIZE,
        help = "Bytes per partition",
        long_help = "Size in bytes of each partition handed to a worker. Clamped to at least \
                     2048 bytes; larger values mean fewer, coarser-grained units of work"
    )]
    pub partition_size: usize,

    #[arg(
        long,
        default_value_t = 0,
        value_name = "BYTES",
        help = "Bytes of overlap between adjacent partitions",
        long_help = "How many trailing bytes of one partition are repeated at the start of the \
                     next, so a match or line boundary straddling the seam isn't missed. Clamped \
                     to at most half the partition size and rounded up to an even number"
    )]
    pub overlap: usize,

    #[arg(
        short = 't',
        long,
        value_name = "COUNT",
        help = "Number of worker threads",
        long_help = "Number of worker threads processing partitions concurrently. Defaults to \
                     twice the number of CPU cores, capped at 32"
    )]
    pub threads: Option<usize>,

    #[arg(
        long,
        help = "Hint the OS to drop page cache behind each partition as it's read",
        long_help = "Advises the kernel that pages read for a partition won't be needed again \
                     soon, keeping the page cache from filling up on very large files. Best \
                     effort only; never fails the job if the hint isn't supported"
    )]
    pub unbuffered: bool,
}

#[derive(ClapArgs)]
pub struct IndexArgs {
    #[arg(value_name = "FILE", help = "Path to the file to index")]
    pub path: PathBuf,

    #[arg(long, help = "Print the total line count and exit")]
    pub count: bool,

    #[arg(
        long,
        value_name = "N",
        help = "Print the byte offset where line N starts"
    )]
    pub offset_of_line: Option<u64>,

    #[arg(
        long,
        value_name = "OFFSET",
        help = "Print the line number containing byte offset OFFSET"
    )]
    pub line_of_offset: Option<u64>,

    #[command(flatten)]
    pub partition: PartitionOpts,
}

#[derive(ClapArgs)]
pub struct SearchArgs {
    #[arg(value_name = "FILE", help = "Path to the file to search")]
    pub path: PathBuf,

    #[arg(value_name = "PATTERN", help = "Regular expression to search for")]
    pub pattern: String,

    #[arg(
        long,
        value_name = "COUNT",
        default_value_t = 0,
        help = "Stop after COUNT matches (0 for unbounded)"
    )]
    pub max_matches: usize,

    #[command(flatten)]
    pub partition: PartitionOpts,
}

#[derive(ClapArgs)]
pub struct ReplaceArgs {
    #[arg(value_name = "FILE", help = "Path to the file to rewrite")]
    pub path: PathBuf,

    #[arg(value_name = "PATTERN", help = "Regular expression to replace")]
    pub pattern: String,

    #[arg(value_name = "REPLACEMENT", help = "Literal text to substitute in")]
    pub replacement: String,

    #[arg(short = 'o', long, value_name = "FILE", help = "Output path")]
    pub out: PathBuf,

    #[command(flatten)]
    pub partition: PartitionOpts,
}

#[derive(ClapArgs)]
pub struct DiffArgs {
    #[arg(value_name = "A", help = "First file")]
    pub path_a: PathBuf,

    #[arg(value_name = "B", help = "Second file")]
    pub path_b: PathBuf,

    #[command(flatten)]
    pub partition: PartitionOpts,
}

impl PartitionOpts {
    pub fn to_config(&self, join_mode: partwise::config::JoinMode) -> partwise::config::JobConfig {
        partwise::config::JobConfig {
            partition_size: self.partition_size,
            overlap: self.overlap,
            max_workers: self.threads.unwrap_or(0),
            join_mode,
            buffer_mode: if self.unbuffered {
                partwise::config::BufferMode::Unbuffered
            } else {
                partwise::config::BufferMode::Buffered
            },
        }
    }
}
