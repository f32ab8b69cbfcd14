// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Result Joiner: folds partition results together according to a job's
//! join discipline. This is deliberately dumb; all it knows how to do is
//! buffer out-of-order arrivals until the next id in sequence shows up and
//! hand them to `Strategy::join` one at a time.

use std::collections::BTreeMap;
use std::sync::Arc;

use crate::engine::partition::PartitionResult;
use crate::engine::strategy::Strategy;
use crate::error::EngineResult;

pub enum Joiner<S: Strategy> {
    None,
    Sequential {
        strategy: Arc<S>,
        next_id: u64,
        accumulator: Option<S::Result>,
        pending: BTreeMap<u64, S::Result>,
    },
}

impl<S: Strategy> Joiner<S> {
    pub fn none() -> Self {
        Joiner::None
    }

    pub fn sequential(strategy: Arc<S>) -> Self {
        Joiner::Sequential {
            strategy,
            next_id: 0,
            accumulator: None,
            pending: BTreeMap::new(),
        }
    }

    /// Hands one partition's result to the joiner. Under `Sequential`, this
    /// may fold several buffered out-of-order results in one call once the
    /// missing id finally arrives.
    pub fn offer(&mut self, result: S::Result) -> EngineResult<()> {
        match self {
            Joiner::None => Ok(()),
            Joiner::Sequential {
                strategy,
                next_id,
                accumulator,
                pending,
            } => {
                pending.insert(result.id(), result);
                while let Some(r) = pending.remove(&*next_id) {
                    let folded = match accumulator.take() {
                        None => strategy.join(r.clone(), r)?,
                        Some(prior) => strategy.join(prior, r)?,
                    };
                    *accumulator = Some(folded);
                    *next_id += 1;
                }
                Ok(())
            }
        }
    }

    pub fn into_result(self) -> Option<S::Result> {
        match self {
            Joiner::None => None,
            Joiner::Sequential { accumulator, .. } => accumulator,
        }
    }
}
