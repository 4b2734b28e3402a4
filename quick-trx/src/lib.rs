// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Read Visual Studio TRX test result files in Rust.
//!
//! A TRX file is the XML report produced by `dotnet test --logger trx` and `vstest.console`. This
//! crate only models the parts of the format needed to recover per-test timings: the test run
//! name and, for every `UnitTestResult`, its test name, duration and outcome.

#![warn(missing_docs)]

mod deserialize;
mod duration;
mod errors;
mod report;

pub use duration::{MAX_TIMESPAN, parse_timespan};
pub use errors::*;
pub use report::*;
