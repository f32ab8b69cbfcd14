// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Partition Planner: turns a source into a stream of `PartitionDescriptor`s.
//!
//! File mode is pure arithmetic: partition boundaries are known the moment
//! the file length is. Stream mode can't look ahead, so it keeps a small
//! carry buffer of the trailing `overlap` bytes from the previous chunk and
//! prepends it to the next read, the same sliding-window trick used by
//! line-oriented chunk readers that can't seek backwards.

use std::io::Read;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crossbeam_channel::Sender;

use crate::config::JobConfig;
use crate::engine::partition::PartitionDescriptor;
use crate::engine::pulse::Pulse;
use crate::engine::source::read_full;

pub fn spawn_file_planner(
    length: u64,
    config: &JobConfig,
    tx: Sender<PartitionDescriptor>,
    cancel: Arc<AtomicBool>,
    pulse: Arc<Pulse>,
    planner_done: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
) -> JoinHandle<()> {
    let partition_size = config.partition_size as u64;
    let step = config.step().max(1) as u64;

    thread::spawn(move || {
        let mut id = 0u64;
        let mut offset = 0u64;

        while offset < length {
            if cancel.load(Ordering::SeqCst) {
                break;
            }
            if tx
                .send(PartitionDescriptor {
                    id,
                    start_offset: offset,
                    payload: None,
                })
                .is_err()
            {
                break;
            }
            in_flight.fetch_add(1, Ordering::SeqCst);
            pulse.notify();

            id += 1;
            if offset + partition_size >= length {
                break;
            }
            offset += step;
        }

        planner_done.store(true, Ordering::SeqCst);
        pulse.notify();
    })
}

#[allow(clippy::too_many_arguments)]
pub fn spawn_stream_planner(
    mut reader: Box<dyn Read + Send>,
    config: &JobConfig,
    tx: Sender<PartitionDescriptor>,
    cancel: Arc<AtomicBool>,
    pulse: Arc<Pulse>,
    planner_done: Arc<AtomicBool>,
    in_flight: Arc<AtomicUsize>,
    worker_count: usize,
) -> JoinHandle<()> {
    let partition_size = config.partition_size;
    let overlap = config.overlap;
    let fresh_len = partition_size - overlap;

    thread::spawn(move || {
        let mut id = 0u64;
        let mut offset = 0u64;
        let mut carry: Vec<u8> = Vec::new();

        loop {
            if cancel.load(Ordering::SeqCst) {
                break;
            }

            // Back-pressure: don't let an unbounded stream outrun a bounded
            // worker pool by more than a couple of partitions per worker.
            while in_flight.load(Ordering::SeqCst) > worker_count.max(1) * 2 {
                if cancel.load(Ordering::SeqCst) {
                    break;
                }
                thread::sleep(Duration::from_millis(2));
            }

            let mut buf = vec![0u8; partition_size];
            let carry_len = carry.len().min(partition_size);
            buf[..carry_len].copy_from_slice(&carry[..carry_len]);

            let fresh_n = if carry_len < partition_size {
                read_full(&mut *reader, &mut buf[carry_len..]).unwrap_or(0)
            } else {
                0
            };
            let total_len = carry_len + fresh_n;
            buf.truncate(total_len);

            if buf.is_empty() {
                break;
            }

            let is_short = fresh_n < partition_size - carry_len;

            // Next carry is the trailing `overlap` bytes of this partition.
            let next_carry_len = overlap.min(buf.len());
            carry = buf[buf.len() - next_carry_len..].to_vec();

            let start_offset = offset;
            if tx
                .send(PartitionDescriptor {
                    id,
                    start_offset,
                    payload: Some(buf),
                })
                .is_err()
            {
                break;
            }
            in_flight.fetch_add(1, Ordering::SeqCst);
            pulse.notify();

            id += 1;
            offset += fresh_len.max(1) as u64;

            if is_short {
                break;
            }
        }

        planner_done.store(true, Ordering::SeqCst);
        pulse.notify();
    })
}
