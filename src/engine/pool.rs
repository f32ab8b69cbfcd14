// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Worker Pool: a fixed number of OS threads pulling descriptors off a
//! shared channel and running `Strategy::map` against each one.
//!
//! The channel itself is the descriptor queue; bounding concurrency is just
//! a matter of how many threads are reading from it; there is no separate
//! dispatch step.

use std::cell::RefCell;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::thread::{self, JoinHandle};

use crossbeam_channel::{Receiver, Sender};

use crate::engine::partition::PartitionDescriptor;
use crate::engine::source::ByteSource;
use crate::engine::strategy::Strategy;
use crate::error::{EngineError, ErrorSlot};

#[allow(clippy::too_many_arguments)]
pub fn spawn_workers<S: Strategy + 'static>(
    worker_count: usize,
    descriptor_rx: Receiver<PartitionDescriptor>,
    result_tx: Sender<S::Result>,
    source: Option<Arc<dyn ByteSource>>,
    strategy: Arc<S>,
    partition_size: usize,
    overlap: usize,
    byte_count: Arc<AtomicU64>,
    cancel: Arc<AtomicBool>,
    error_slot: Arc<ErrorSlot>,
    pulse: Arc<crate::engine::pulse::Pulse>,
) -> Vec<JoinHandle<()>> {
    (0..worker_count.max(1))
        .map(|_| {
            let descriptor_rx = descriptor_rx.clone();
            let result_tx = result_tx.clone();
            let source = source.clone();
            let strategy = strategy.clone();
            let byte_count = byte_count.clone();
            let cancel = cancel.clone();
            let error_slot = error_slot.clone();
            let pulse = pulse.clone();

            thread::spawn(move || {
                thread_local! {
                    static SCRATCH: RefCell<Vec<u8>> = RefCell::new(Vec::new());
                }

                while let Ok(descriptor) = descriptor_rx.recv() {
                    if cancel.load(Ordering::SeqCst) {
                        pulse.notify();
                        continue;
                    }

                    let id = descriptor.id;
                    let start_offset = descriptor.start_offset;

                    let outcome = match &descriptor.payload {
                        Some(payload) => strategy
                            .map(id, start_offset, payload)
                            .map(|r| (r, payload.len())),
                        None => SCRATCH.with(|cell| {
                            let mut buf = cell.borrow_mut();
                            buf.resize(partition_size, 0);
                            let source = source
                                .as_ref()
                                .expect("file-mode descriptor requires a byte source");
                            match source.read_at(start_offset, &mut buf) {
                                Ok(n) => {
                                    let slice = &buf[..n];
                                    strategy.map(id, start_offset, slice).map(|r| (r, n))
                                }
                                Err(e) => Err(EngineError::Io(e)),
                            }
                        }),
                    };

                    match outcome {
                        Ok((result, len)) => {
                            let new_bytes = if id == 0 {
                                len
                            } else {
                                len.saturating_sub(overlap)
                            };
                            byte_count.fetch_add(new_bytes as u64, Ordering::SeqCst);
                            let _ = result_tx.send(result);
                        }
                        Err(e) => {
                            error_slot.set(e);
                            cancel.store(true, Ordering::SeqCst);
                        }
                    }

                    pulse.notify();
                }
            })
        })
        .collect()
}
