// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use std::fs::File;
use std::io::{BufWriter, Write};
use std::sync::Arc;
use std::time::{Duration, Instant};

use anyhow::{bail, Context, Result};
use clap::Parser;

use crate::cli::args::{Cli, Command, DiffArgs, IndexArgs, ReplaceArgs, SearchArgs};
use partwise::config::JoinMode;
use partwise::engine::source::{ByteSource, FileSource, SourceMode};
use partwise::facade::Job;
use partwise::specializations::{DuplicateCheckStrategy, LineIndexStrategy, RegexSearchStrategy};

pub fn run() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Command::Index(args) => run_index(args),
        Command::Search(args) => run_search(args),
        Command::Replace(args) => run_replace(args),
        Command::Diff(args) => run_diff(args),
    }
}

fn open_source(path: &std::path::Path, buffer_mode: partwise::config::BufferMode) -> Result<(Arc<dyn ByteSource>, u64)> {
    if !path.exists() {
        bail!("source file not found: {}", path.display());
    }
    let source = FileSource::open(path, buffer_mode).context("failed to open source file")?;
    let length = source.len();
    Ok((Arc::new(source), length))
}

fn wait_with_progress<S: partwise::engine::Strategy + 'static>(job: &Job<S>, label: &str) {
    let start = Instant::now();
    job.wait(Duration::from_millis(250), |state| {
        log::debug!(
            "{label}: {} bytes processed in {:?}",
            state.byte_count,
            start.elapsed()
        );
    });
}

fn run_index(args: IndexArgs) -> Result<()> {
    let config = args.partition.to_config(JoinMode::Sequential);
    let (source, length) = open_source(&args.path, config.buffer_mode)?;
    let strategy = Arc::new(LineIndexStrategy::new(source.clone(), length));

    let path = args.path.clone();
    let job = Job::new(
        config,
        Some(path.clone()),
        Box::new(move || {
            Ok(SourceMode::File {
                source: source.clone(),
                length,
            })
        }),
        strategy.clone(),
    )?;

    job.start()?;
    wait_with_progress(&job, "index");

    if let Some(err) = job.snapshot().error {
        bail!("indexing failed: {err}");
    }

    if args.count {
        println!("{}", strategy.line_count());
        return Ok(());
    }
    if let Some(n) = args.offset_of_line {
        println!("{}", strategy.offset_for_line(n));
        return Ok(());
    }
    if let Some(p) = args.line_of_offset {
        println!("{}", strategy.line_for_offset(p));
        return Ok(());
    }

    println!("{}", strategy.line_count());
    Ok(())
}

fn run_search(args: SearchArgs) -> Result<()> {
    let regex = regex::bytes::Regex::new(&args.pattern).context("invalid regular expression")?;
    let config = args.partition.to_config(JoinMode::None);
    let (source, length) = open_source(&args.path, config.buffer_mode)?;
    let strategy = Arc::new(RegexSearchStrategy::new(vec![regex], args.max_matches));

    let job = Job::new(
        config,
        Some(args.path.clone()),
        Box::new(move || {
            Ok(SourceMode::File {
                source: source.clone(),
                length,
            })
        }),
        strategy.clone(),
    )?;

    job.start()?;
    wait_with_progress(&job, "search");

    if let Some(err) = job.snapshot().error {
        bail!("search failed: {err}");
    }

    for m in strategy.matches(0) {
        println!("{}: {}", m.start_offset, String::from_utf8_lossy(&m.value));
    }
    Ok(())
}

fn run_replace(args: ReplaceArgs) -> Result<()> {
    let regex = regex::bytes::Regex::new(&args.pattern).context("invalid regular expression")?;
    let config = args.partition.to_config(JoinMode::None);
    let (source, length) = open_source(&args.path, config.buffer_mode)?;
    let strategy = Arc::new(RegexSearchStrategy::new(vec![regex], 0));

    let job = Job::new(
        config,
        Some(args.path.clone()),
        Box::new(move || {
            Ok(SourceMode::File {
                source: source.clone(),
                length,
            })
        }),
        strategy.clone(),
    )?;

    job.start()?;
    wait_with_progress(&job, "replace");

    if let Some(err) = job.snapshot().error {
        bail!("search pass failed: {err}");
    }

    let matches = strategy.matches(0);
    let out = File::create(&args.out).context("failed to create output file")?;
    let replacement = args.replacement.into_bytes();
    partwise::specializations::regex_searcher::replace_to_writer(
        &args.path,
        &matches,
        |_| replacement.clone(),
        BufWriter::new(out),
    )?;

    println!("replaced {} match(es)", matches.len());
    Ok(())
}

fn run_diff(args: DiffArgs) -> Result<()> {
    let config = args.partition.to_config(JoinMode::None);
    let (source_a, length_a) = open_source(&args.path_a, config.buffer_mode)?;
    let (source_b, length_b) = open_source(&args.path_b, config.buffer_mode)?;

    if length_a != length_b {
        println!("files differ (different lengths: {length_a} vs {length_b})");
        std::process::exit(1);
    }

    let partition_size = config.partition_size;
    let path_a = args.path_a.clone();
    let job = Job::with_strategy_factory(
        config,
        Some(path_a.clone()),
        Box::new(move || {
            Ok(SourceMode::File {
                source: source_a.clone(),
                length: length_a,
            })
        }),
        move |cancel| Arc::new(DuplicateCheckStrategy::new(source_b, partition_size, cancel, length_a)),
    )?;

    job.start()?;
    wait_with_progress(&job, "diff");

    if let Some(err) = job.snapshot().error {
        bail!("diff failed: {err}");
    }

    if job.strategy().is_identical() {
        println!("files are identical");
        Ok(())
    } else {
        println!("files differ");
        std::process::exit(1);
    }
}
