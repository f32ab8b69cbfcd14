// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Job Manager: the single coordinating thread that wires a planner, a
//! worker pool and a joiner together and watches them to completion.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, AtomicU64, AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use crossbeam_channel::unbounded;

use crate::config::{JobConfig, JoinMode};
use crate::engine::joiner::Joiner;
use crate::engine::planner::{spawn_file_planner, spawn_stream_planner};
use crate::engine::pool::spawn_workers;
use crate::engine::pulse::Pulse;
use crate::engine::source::SourceMode;
use crate::engine::strategy::Strategy;
use crate::error::ErrorSlot;

/// Shared state a running job's manager thread updates and that the
/// facade reads from any thread, including while the job is running.
pub struct JobStateInner {
    pub running: AtomicBool,
    pub cancel: Arc<AtomicBool>,
    pub byte_count: Arc<AtomicU64>,
    pub error_slot: Arc<ErrorSlot>,
    pub pulse: Arc<Pulse>,
    pub path: Option<PathBuf>,
}

impl JobStateInner {
    pub fn new(cancel: Arc<AtomicBool>, path: Option<PathBuf>) -> Self {
        Self {
            running: AtomicBool::new(false),
            cancel,
            byte_count: Arc::new(AtomicU64::new(0)),
            error_slot: Arc::new(ErrorSlot::new()),
            pulse: Arc::new(Pulse::new()),
            path,
        }
    }

    pub fn reset_for_start(&self) {
        self.cancel.store(false, Ordering::SeqCst);
        self.byte_count.store(0, Ordering::SeqCst);
        self.error_slot.clear();
        self.running.store(true, Ordering::SeqCst);
    }
}

/// Runs a job to completion on the calling thread. The facade spawns this
/// on its own manager thread so `start()` can return immediately.
pub fn run_to_completion<S: Strategy + 'static>(
    config: JobConfig,
    source_mode: SourceMode,
    strategy: Arc<S>,
    state: Arc<JobStateInner>,
) {
    let (descriptor_tx, descriptor_rx) = unbounded();
    let (result_tx, result_rx) = unbounded();

    let in_flight = Arc::new(AtomicUsize::new(0));
    let planner_done = Arc::new(AtomicBool::new(false));
    let worker_count = config.resolve_worker_count();

    let (source, planner_handle) = match source_mode {
        SourceMode::File { source, length } => {
            let handle = spawn_file_planner(
                length,
                &config,
                descriptor_tx,
                state.cancel.clone(),
                state.pulse.clone(),
                planner_done.clone(),
                in_flight.clone(),
            );
            (Some(source), handle)
        }
        SourceMode::Stream { reader } => {
            let handle = spawn_stream_planner(
                reader,
                &config,
                descriptor_tx,
                state.cancel.clone(),
                state.pulse.clone(),
                planner_done.clone(),
                in_flight.clone(),
                worker_count,
            );
            (None, handle)
        }
    };

    let worker_handles = spawn_workers(
        worker_count,
        descriptor_rx,
        result_tx,
        source,
        strategy.clone(),
        config.partition_size,
        config.overlap,
        state.byte_count.clone(),
        state.cancel.clone(),
        state.error_slot.clone(),
        state.pulse.clone(),
    );

    let mut joiner = match config.join_mode {
        JoinMode::None => Joiner::none(),
        JoinMode::Sequential => Joiner::sequential(strategy.clone()),
        JoinMode::Reduce => unreachable!("rejected during JobConfig::normalized"),
    };

    let drain = |joiner: &mut Joiner<S>, state: &JobStateInner, in_flight: &AtomicUsize| {
        let mut drained = 0usize;
        while let Ok(r) = result_rx.try_recv() {
            drained += 1;
            if let JoinMode::Sequential = config.join_mode {
                if let Err(e) = joiner.offer(r) {
                    state.error_slot.set(e);
                    state.cancel.store(true, Ordering::SeqCst);
                }
            }
        }
        in_flight.fetch_sub(drained.min(in_flight.load(Ordering::SeqCst)), Ordering::SeqCst);
    };

    loop {
        drain(&mut joiner, &state, &in_flight);

        if state.cancel.load(Ordering::SeqCst) {
            break;
        }
        if planner_done.load(Ordering::SeqCst) && in_flight.load(Ordering::SeqCst) == 0 {
            drain(&mut joiner, &state, &in_flight);
            break;
        }

        state.pulse.wait_timeout(Duration::from_secs(1));
    }

    let _ = planner_handle.join();
    for h in worker_handles {
        let _ = h.join();
    }

    if !state.cancel.load(Ordering::SeqCst) {
        if let Err(e) = strategy.finish() {
            state.error_slot.set(e);
        }
    }

    state.running.store(false, Ordering::SeqCst);
    state.pulse.notify();
}
