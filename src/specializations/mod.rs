// SPDX-License-Identifier: Apache-2.0
// Copyright (c) 2025 rhythmcache
// https://github.com/rhythmcache/payload-dumper-rust

//! Concrete [`crate::engine::Strategy`] implementations: the three things
//! this crate actually knows how to compute over partitioned bytes.

pub mod duplicate_checker;
pub mod line_indexer;
pub mod regex_searcher;

pub use duplicate_checker::DuplicateCheckStrategy;
pub use line_indexer::LineIndexStrategy;
pub use regex_searcher::RegexSearchStrategy;
