// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

/// Documented exit codes for `shardwise` failures.
///
/// Unknown/unexpected failures will always result in exit code 1.
pub enum ShardwiseExitCode {}

impl ShardwiseExitCode {
    /// No errors occurred and shardwise exited normally.
    pub const OK: i32 = 0;

    /// The configuration file or profile couldn't be loaded.
    pub const SETUP_ERROR: i32 = 96;

    /// An argument was out of range, e.g. a parallelization factor of zero.
    pub const INVALID_ARGUMENT: i32 = 97;

    /// The test result report couldn't be read or decoded.
    pub const REPORT_READ_FAILED: i32 = 104;

    /// Writing data to stdout or stderr produced an error.
    pub const WRITE_OUTPUT_ERROR: i32 = 110;
}
