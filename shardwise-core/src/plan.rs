// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Split plans: the partitions for every requested parallelization factor.

use crate::{
    aggregate::LeafMap,
    coalesce::CoalesceOutcome,
    errors::{PartitionError, WriteSplitPlanError},
    helpers::{DisplayDuration, duration_ms, plural},
    output_format::{OutputFormat, Styles},
    partition::{Partition, Partitioner, makespan},
};
use itertools::Itertools;
use owo_colors::OwoColorize;
use shardwise_metadata::{CoalesceSummary, PartitionSummary, SplitPlanSummary};
use std::{collections::BTreeMap, io};
use tracing::info;

/// The partitions computed for each requested parallelization factor.
///
/// Every factor is partitioned independently against the same set of filters.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct SplitPlan {
    report_name: Option<String>,
    leaves: LeafMap,
    coalesce: Option<CoalesceSummary>,
    factors: BTreeMap<usize, Vec<Partition>>,
}

impl SplitPlan {
    /// Partitions `leaves` once for each factor in `factors`.
    ///
    /// Duplicate factors are partitioned once. Returns an error if any factor is zero.
    pub fn build(
        leaves: LeafMap,
        factors: impl IntoIterator<Item = usize>,
    ) -> Result<Self, PartitionError> {
        let mut partitions_by_factor = BTreeMap::new();
        for factor in factors {
            if partitions_by_factor.contains_key(&factor) {
                continue;
            }
            let partitions = Partitioner::new(factor)?.partition(&leaves);
            info!(
                "factor {factor}: makespan {}, partition durations [{}]",
                DisplayDuration(makespan(&partitions)),
                partitions
                    .iter()
                    .map(|partition| DisplayDuration(partition.duration()))
                    .join(", "),
            );
            partitions_by_factor.insert(factor, partitions);
        }

        Ok(Self {
            report_name: None,
            leaves,
            coalesce: None,
            factors: partitions_by_factor,
        })
    }

    /// Builds a plan from the result of coalescing, recording how coalescing went.
    pub fn from_coalesced(
        outcome: CoalesceOutcome,
        factors: impl IntoIterator<Item = usize>,
    ) -> Result<Self, PartitionError> {
        let coalesce = outcome.budget.map(|budget| CoalesceSummary {
            budget,
            budget_met: outcome.budget_met(),
            rounds: outcome.rounds,
        });
        let mut plan = Self::build(outcome.leaves, factors)?;
        plan.coalesce = coalesce;
        Ok(plan)
    }

    /// Records the name of the test run this plan was computed from.
    pub fn set_report_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.report_name = Some(name.into());
        self
    }

    /// Returns the name of the test run, if one was recorded.
    pub fn report_name(&self) -> Option<&str> {
        self.report_name.as_deref()
    }

    /// Returns the filters that were partitioned.
    pub fn leaves(&self) -> &LeafMap {
        &self.leaves
    }

    /// Returns information about coalescing, if a budget was requested.
    pub fn coalesce(&self) -> Option<&CoalesceSummary> {
        self.coalesce.as_ref()
    }

    /// Returns the partitions for `factor`, if it was requested.
    pub fn partitions(&self, factor: usize) -> Option<&[Partition]> {
        self.factors.get(&factor).map(Vec::as_slice)
    }

    /// Iterates over factors and their partitions, in ascending factor order.
    pub fn iter(&self) -> impl Iterator<Item = (usize, &[Partition])> + '_ {
        self.factors
            .iter()
            .map(|(factor, partitions)| (*factor, partitions.as_slice()))
    }

    /// Returns a serializable summary of this plan.
    pub fn to_summary(&self) -> SplitPlanSummary {
        let mut summary =
            SplitPlanSummary::new(duration_ms(self.leaves.total()), self.leaves.len());
        summary.report_name = self.report_name.clone();
        summary.coalesce = self.coalesce.clone();
        summary.factors = self
            .factors
            .iter()
            .map(|(factor, partitions)| {
                let partitions = partitions
                    .iter()
                    .map(|partition| PartitionSummary {
                        duration_ms: duration_ms(partition.duration()),
                        filters: partition.keys().to_vec(),
                    })
                    .collect();
                (*factor, partitions)
            })
            .collect();
        summary
    }

    /// Writes this plan in the given format.
    pub fn write(
        &self,
        output_format: OutputFormat,
        writer: impl io::Write,
        colorize: bool,
    ) -> Result<(), WriteSplitPlanError> {
        match output_format {
            OutputFormat::Human { verbose } => self
                .write_human(writer, verbose, colorize)
                .map_err(WriteSplitPlanError::Io),
            OutputFormat::Serializable(format) => format
                .to_writer(&self.to_summary(), writer)
                .map_err(WriteSplitPlanError::Json),
        }
    }

    fn write_human(
        &self,
        mut writer: impl io::Write,
        verbose: bool,
        colorize: bool,
    ) -> io::Result<()> {
        let mut styles = Styles::default();
        if colorize {
            styles.colorize();
        }

        let filter_count = self.leaves.len();
        write!(
            writer,
            "{} {}, {} total",
            filter_count.style(styles.filter),
            plural::filters_str(filter_count),
            DisplayDuration(self.leaves.total()).style(styles.duration),
        )?;
        if let Some(name) = &self.report_name {
            write!(writer, " (from {name})")?;
        }
        writeln!(writer)?;

        if let Some(coalesce) = &self.coalesce {
            let status = if coalesce.budget_met { "met" } else { "not met" };
            writeln!(
                writer,
                "coalesced in {} rounds, budget of {} {status}",
                coalesce.rounds,
                coalesce.budget.style(styles.filter),
            )?;
        }

        for (factor, partitions) in &self.factors {
            writeln!(
                writer,
                "{} {}:",
                factor.style(styles.factor),
                plural::partitions_str(*factor),
            )?;
            for (index, partition) in partitions.iter().enumerate() {
                writeln!(
                    writer,
                    "  {} [{:>9}]:",
                    index.style(styles.partition),
                    DisplayDuration(partition.duration()).style(styles.duration),
                )?;
                for key in partition.keys() {
                    write!(writer, "      {}", key.style(styles.filter))?;
                    if verbose {
                        let duration = self.leaves.get(key).unwrap_or_default();
                        write!(writer, " [{}]", DisplayDuration(duration).style(styles.duration))?;
                    }
                    writeln!(writer)?;
                }
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{
        aggregate::DurationAggregator,
        coalesce::Coalescer,
        output_format::SerializableFormat,
    };
    use indoc::indoc;
    use maplit::btreemap;
    use pretty_assertions::assert_eq;
    use std::time::Duration;

    fn example_leaves() -> LeafMap {
        [
            ("A.B.C1", Duration::from_secs(10)),
            ("A.B.C2", Duration::from_secs(5)),
            ("A.D.C3", Duration::from_secs(2)),
        ]
        .into_iter()
        .collect()
    }

    #[test]
    fn build_collapses_duplicate_factors() {
        let plan = SplitPlan::build(example_leaves(), [3, 1, 3]).expect("factors are valid");
        let factors: Vec<_> = plan.iter().map(|(factor, _)| factor).collect();
        assert_eq!(factors, vec![1, 3]);
        assert_eq!(plan.partitions(3).map(<[_]>::len), Some(3));
        assert_eq!(plan.partitions(2), None);
    }

    #[test]
    fn build_rejects_zero_factor() {
        assert_eq!(
            SplitPlan::build(example_leaves(), [2, 0]),
            Err(PartitionError::ZeroFactor)
        );
    }

    #[test]
    fn summary_lists_filters_by_factor() {
        let mut plan = SplitPlan::build(example_leaves(), [1, 2]).expect("factors are valid");
        plan.set_report_name("nightly");
        let summary = plan.to_summary();

        assert_eq!(summary.report_name.as_deref(), Some("nightly"));
        assert_eq!(summary.total_duration_ms, 17_000);
        assert_eq!(summary.filter_count, 3);
        assert_eq!(
            summary.filters_by_factor(),
            btreemap! {
                1 => vec![vec!["A.B.C1", "A.B.C2", "A.D.C3"]],
                2 => vec![vec!["A.B.C1"], vec!["A.B.C2", "A.D.C3"]],
            }
        );
    }

    #[test]
    fn coalesced_plan_records_budget() {
        let aggregation = DurationAggregator::default().aggregate(example_leaves());
        let outcome = Coalescer::default().coalesce(aggregation, Some(1));
        let plan = SplitPlan::from_coalesced(outcome, [1]).expect("factors are valid");

        assert_eq!(
            plan.coalesce(),
            Some(&CoalesceSummary {
                budget: 1,
                budget_met: true,
                rounds: 3,
            })
        );
        assert_eq!(
            plan.to_summary().filters_by_factor(),
            btreemap! { 1 => vec![vec!["A"]] }
        );
    }

    #[test]
    fn write_json() {
        let plan = SplitPlan::build(example_leaves(), [2]).expect("factors are valid");
        let mut out = Vec::new();
        plan.write(
            OutputFormat::Serializable(SerializableFormat::Json),
            &mut out,
            false,
        )
        .expect("writing to a Vec succeeds");

        let out = String::from_utf8(out).expect("output is UTF-8");
        let summary = SplitPlanSummary::parse_json(&out).expect("output is valid JSON");
        assert_eq!(summary, plan.to_summary());
        assert!(out.ends_with('\n'));
    }

    #[test]
    fn write_human() {
        let mut plan = SplitPlan::build(example_leaves(), [2]).expect("factors are valid");
        plan.set_report_name("nightly");

        let mut out = Vec::new();
        plan.write(OutputFormat::Human { verbose: true }, &mut out, false)
            .expect("writing to a Vec succeeds");

        assert_eq!(
            String::from_utf8(out).expect("output is UTF-8"),
            indoc! {"
                3 filters, 17.000s total (from nightly)
                2 partitions:
                  0 [  10.000s]:
                      A.B.C1 [10.000s]
                  1 [   7.000s]:
                      A.B.C2 [5.000s]
                      A.D.C3 [2.000s]
            "}
        );
    }
}
