// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

use std::sync::{Condvar, Mutex};
use std::time::Duration;

/// A coarse wakeup bell shared between a job's manager thread and everyone
/// that can change its state: the planner, the worker pool and `cancel()`
/// callers. Nobody blocks on it forever; the manager re-checks its own
/// termination predicate every time it wakes, whether woken early by a
/// `notify()` or by its own timeout.
pub struct Pulse {
    lock: Mutex<()>,
    condvar: Condvar,
}

impl Pulse {
    pub fn new() -> Self {
        Self {
            lock: Mutex::new(()),
            condvar: Condvar::new(),
        }
    }

    pub fn notify(&self) {
        self.condvar.notify_all();
    }

    pub fn wait_timeout(&self, timeout: Duration) {
        let guard = self.lock.lock().unwrap();
        let _ = self.condvar.wait_timeout(guard, timeout);
    }
}

impl Default for Pulse {
    fn default() -> Self {
        Self::new()
    }
}
