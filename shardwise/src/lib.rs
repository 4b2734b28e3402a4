// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Split a test suite into balanced groups of filters, using the per-test durations recorded in a
//! TRX report from a previous run of the whole suite.
//!
//! For each requested parallelization factor `k`, shardwise prints `k` lists of test filters whose
//! total durations are as even as possible. Each list can be handed to one executor.

#![warn(missing_docs)]

mod dispatch;
mod errors;
mod output;

#[doc(hidden)]
pub use dispatch::*;
#[doc(hidden)]
pub use errors::*;
#[doc(hidden)]
pub use output::OutputWriter;
