// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! General support code for shardwise-core.

use std::{fmt, time::Duration};

/// Utilities for pluralizing various words based on count.
pub(crate) mod plural {
    /// Returns "filter" if `count` is 1, otherwise "filters".
    pub(crate) fn filters_str(count: usize) -> &'static str {
        if count == 1 { "filter" } else { "filters" }
    }

    /// Returns "partition" if `count` is 1, otherwise "partitions".
    pub(crate) fn partitions_str(count: usize) -> &'static str {
        if count == 1 { "partition" } else { "partitions" }
    }
}

/// Converts a duration to whole milliseconds, saturating at `u64::MAX`.
pub(crate) fn duration_ms(duration: Duration) -> u64 {
    u64::try_from(duration.as_millis()).unwrap_or(u64::MAX)
}

/// Displays a duration as right-aligned seconds with millisecond precision.
pub(crate) struct DisplayDuration(pub(crate) Duration);

impl fmt::Display for DisplayDuration {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        // Buffer so that width and alignment apply to the whole string.
        let out = format!("{:.3}s", self.0.as_secs_f64());
        f.pad(&out)
    }
}
