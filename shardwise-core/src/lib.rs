// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Core functionality for shardwise.
//!
//! Shardwise turns the per-test durations recorded by one run of a whole test suite into balanced
//! groups of test filters, so that the suite can be re-run across several executors with roughly
//! equal wall-clock time on each. The flow is:
//!
//! 1. [`aggregate`] sums raw durations into a [`LeafMap`](aggregate::LeafMap) keyed by
//!    deparameterized test name, plus a [`GroupMap`](aggregate::GroupMap) keyed by parent name.
//! 2. [`coalesce`] optionally merges the cheapest groups until the number of filters fits a
//!    budget.
//! 3. [`partition`] spreads the filters over `k` partitions, longest first.
//! 4. [`plan`] runs the partitioner once per requested factor and writes the result.

pub mod aggregate;
pub mod coalesce;
pub mod config;
pub mod errors;
mod helpers;
pub mod normalize;
pub mod output_format;
pub mod partition;
pub mod plan;
