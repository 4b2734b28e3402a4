// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

#![warn(missing_docs)]

//! Structured access to shardwise's machine-readable output.
//!
//! `shardwise --message-format json` prints a [`SplitPlanSummary`]. Tools that consume the plan,
//! e.g. CI job generators that hand one partition's filters to each executor, can deserialize it
//! with this crate instead of hand-rolling the schema.
//!
//! Exit codes produced by the `shardwise` binary are documented in [`ShardwiseExitCode`].

mod exit_codes;
mod summary;

pub use exit_codes::*;
pub use summary::*;
