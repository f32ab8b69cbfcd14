// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Background Facade: the public handle a caller actually holds. Wraps a
//! job's manager thread so `start()` returns immediately, and gives
//! callers `cancel`/`wait`/state-polling without reaching into the engine.

use std::path::PathBuf;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::Duration;

use crate::config::JobConfig;
use crate::engine::job::{self, JobStateInner};
use crate::engine::source::SourceMode;
use crate::engine::strategy::Strategy;
use crate::error::{ConfigError, EngineResult};

#[derive(Debug, Clone)]
pub struct JobStateSnapshot {
    pub running: bool,
    pub cancelled: bool,
    pub error: Option<String>,
    pub byte_count: u64,
    pub path: Option<PathBuf>,
}

/// Type-erased view of a running job, so a [`JobGroup`] can hold jobs of
/// different strategies together.
pub trait AnyJob: Send + Sync {
    fn snapshot(&self) -> JobStateSnapshot;
    fn cancel(&self);
    fn is_running(&self) -> bool;
}

pub type SourceFactory = Box<dyn Fn() -> EngineResult<SourceMode> + Send + Sync>;

pub struct Job<S: Strategy> {
    config: JobConfig,
    strategy: Arc<S>,
    source_factory: SourceFactory,
    state: Arc<JobStateInner>,
    manager_handle: Mutex<Option<JoinHandle<()>>>,
}

impl<S: Strategy + 'static> Job<S> {
    /// Builds a job whose strategy doesn't need an early look at the
    /// job's cancellation flag.
    pub fn new(
        config: JobConfig,
        path: Option<PathBuf>,
        source_factory: SourceFactory,
        strategy: Arc<S>,
    ) -> Result<Self, ConfigError> {
        Self::with_strategy_factory(config, path, source_factory, move |_cancel| strategy)
    }

    /// Builds a job whose strategy needs to flip the job's own
    /// cancellation flag directly (the duplicate checker, on mismatch).
    pub fn with_strategy_factory(
        config: JobConfig,
        path: Option<PathBuf>,
        source_factory: SourceFactory,
        strategy_factory: impl FnOnce(Arc<AtomicBool>) -> Arc<S>,
    ) -> Result<Self, ConfigError> {
        let config = config.normalized()?;
        let cancel = Arc::new(AtomicBool::new(false));
        let strategy = strategy_factory(cancel.clone());
        let state = Arc::new(JobStateInner::new(cancel, path));
        Ok(Self {
            config,
            strategy,
            source_factory,
            state,
            manager_handle: Mutex::new(None),
        })
    }

    /// Spawns the manager thread and returns immediately. Idempotent while
    /// already running; may be called again after the job reaches a
    /// terminal state to restart it from scratch.
    pub fn start(&self) -> EngineResult<()> {
        if self.state.running.load(Ordering::SeqCst) {
            return Ok(());
        }

        let source_mode = (self.source_factory)()?;
        self.state.reset_for_start();

        let config = self.config.clone();
        let strategy = self.strategy.clone();
        let state = self.state.clone();
        let handle = thread::spawn(move || {
            job::run_to_completion(config, source_mode, strategy, state);
        });
        *self.manager_handle.lock().unwrap() = Some(handle);
        Ok(())
    }

    pub fn cancel(&self) {
        self.state.cancel.store(true, Ordering::SeqCst);
        self.state.pulse.notify();
    }

    /// Blocks until the job reaches a terminal state, calling `on_tick`
    /// every time the manager's pulse wakes this thread (at least once per
    /// `period`, sooner on state changes).
    pub fn wait(&self, period: Duration, mut on_tick: impl FnMut(&JobStateSnapshot)) {
        loop {
            if !self.state.running.load(Ordering::SeqCst) {
                break;
            }
            self.state.pulse.wait_timeout(period);
            on_tick(&self.snapshot());
        }
        if let Some(h) = self.manager_handle.lock().unwrap().take() {
            let _ = h.join();
        }
    }

    pub fn snapshot(&self) -> JobStateSnapshot {
        JobStateSnapshot {
            running: self.state.running.load(Ordering::SeqCst),
            cancelled: self.state.cancel.load(Ordering::SeqCst),
            error: self.state.error_slot.get(),
            byte_count: self.state.byte_count.load(Ordering::SeqCst),
            path: self.state.path.clone(),
        }
    }

    pub fn strategy(&self) -> &Arc<S> {
        &self.strategy
    }
}

impl<S: Strategy + 'static> AnyJob for Job<S> {
    fn snapshot(&self) -> JobStateSnapshot {
        Job::snapshot(self)
    }

    fn cancel(&self) {
        Job::cancel(self)
    }

    fn is_running(&self) -> bool {
        self.state.running.load(Ordering::SeqCst)
    }
}

/// A handful of jobs tracked together, e.g. a directory's worth of files
/// indexed in parallel. `any_error`/`any_cancelled` let a caller stop
/// waiting on the rest as soon as one member fails.
#[derive(Default)]
pub struct JobGroup {
    jobs: Vec<Arc<dyn AnyJob>>,
}

impl JobGroup {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, job: Arc<dyn AnyJob>) {
        self.jobs.push(job);
    }

    pub fn any_error(&self) -> Option<String> {
        self.jobs.iter().find_map(|j| j.snapshot().error)
    }

    pub fn any_cancelled(&self) -> bool {
        self.jobs.iter().any(|j| j.snapshot().cancelled)
    }

    pub fn cancel_all(&self) {
        for j in &self.jobs {
            j.cancel();
        }
    }

    pub fn wait_all(&self, period: Duration) {
        loop {
            if self.jobs.iter().all(|j| !j.is_running()) {
                break;
            }
            thread::sleep(period.min(Duration::from_millis(50)));
        }
    }
}
