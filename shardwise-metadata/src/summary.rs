// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// Root element for a serializable split plan.
///
/// One entry in `factors` exists for each requested parallelization factor.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
#[non_exhaustive]
pub struct SplitPlanSummary {
    /// The name of the test run the plan was computed from, if the report recorded one.
    pub report_name: Option<String>,

    /// The total duration of all tests in the report, in milliseconds.
    pub total_duration_ms: u64,

    /// The number of filters that were partitioned.
    pub filter_count: usize,

    /// Information about coalescing, if a filter budget was requested.
    #[serde(default)]
    pub coalesce: Option<CoalesceSummary>,

    /// The partitions for each parallelization factor, keyed by factor.
    pub factors: BTreeMap<usize, Vec<PartitionSummary>>,
}

impl SplitPlanSummary {
    /// Creates a new, empty summary.
    pub fn new(total_duration_ms: u64, filter_count: usize) -> Self {
        Self {
            report_name: None,
            total_duration_ms,
            filter_count,
            coalesce: None,
            factors: BTreeMap::new(),
        }
    }

    /// Parse JSON output produced by `shardwise --message-format json`.
    pub fn parse_json(json: impl AsRef<str>) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json.as_ref())
    }

    /// Returns the filters for each factor, without durations.
    ///
    /// This is the shape most CI integrations want: for factor `k`, a list of `k` lists of
    /// filters, one per executor.
    pub fn filters_by_factor(&self) -> BTreeMap<usize, Vec<Vec<&str>>> {
        self.factors
            .iter()
            .map(|(factor, partitions)| {
                let filters = partitions
                    .iter()
                    .map(|partition| partition.filters.iter().map(String::as_str).collect())
                    .collect();
                (*factor, filters)
            })
            .collect()
    }
}

/// Information about how the filter list was coalesced.
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct CoalesceSummary {
    /// The maximum number of filters that was requested.
    pub budget: usize,

    /// Whether the number of filters was brought within the budget.
    ///
    /// This is false if the test names were too shallow to coalesce further.
    pub budget_met: bool,

    /// The number of merge rounds that ran.
    pub rounds: usize,
}

/// A single partition within a [`SplitPlanSummary`].
#[derive(Clone, Debug, Deserialize, Serialize, PartialEq, Eq)]
#[serde(rename_all = "kebab-case")]
pub struct PartitionSummary {
    /// The cumulative duration of all filters in this partition, in milliseconds.
    pub duration_ms: u64,

    /// The filters assigned to this partition, in assignment order.
    pub filters: Vec<String>,
}
