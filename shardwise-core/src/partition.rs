// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Support for partitioning filters across several executors.
//!
//! Partitioning uses the longest-processing-time-first heuristic: filters are taken largest first
//! and each is assigned to the partition with the least cumulative duration so far. The resulting
//! makespan is at most `4/3 - 1/(3k)` times the optimal one.

use crate::{aggregate::LeafMap, errors::PartitionError};
use std::{cmp::Reverse, collections::BinaryHeap, time::Duration};
use tracing::trace;

/// A set of filters assigned to a single executor.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Partition {
    keys: Vec<String>,
    duration: Duration,
}

impl Partition {
    /// Returns the filters in this partition, in the order they were assigned.
    pub fn keys(&self) -> &[String] {
        &self.keys
    }

    /// Returns the cumulative duration of all filters in this partition.
    pub fn duration(&self) -> Duration {
        self.duration
    }

    /// Returns the number of filters in this partition.
    pub fn len(&self) -> usize {
        self.keys.len()
    }

    /// Returns true if no filters were assigned to this partition.
    pub fn is_empty(&self) -> bool {
        self.keys.is_empty()
    }

    fn push(&mut self, key: &str, duration: Duration) {
        self.keys.push(key.to_owned());
        self.duration = self.duration.saturating_add(duration);
    }
}

/// Returns the largest cumulative duration across `partitions`, or zero if there are none.
pub fn makespan(partitions: &[Partition]) -> Duration {
    partitions
        .iter()
        .map(Partition::duration)
        .max()
        .unwrap_or_default()
}

/// Distributes filters across a fixed number of partitions.
#[derive(Clone, Copy, Debug, Eq, PartialEq)]
pub struct Partitioner {
    factor: usize,
}

impl Partitioner {
    /// Creates a new partitioner for `factor` partitions.
    ///
    /// Returns an error if `factor` is zero.
    pub fn new(factor: usize) -> Result<Self, PartitionError> {
        if factor == 0 {
            return Err(PartitionError::ZeroFactor);
        }
        Ok(Self { factor })
    }

    /// Returns the number of partitions this partitioner produces.
    pub fn factor(&self) -> usize {
        self.factor
    }

    /// Distributes the filters in `leaves` across exactly `factor` partitions.
    ///
    /// Filters are taken in descending order of duration, with ties broken by ascending key. Each
    /// goes to the partition with the least cumulative duration, with ties broken by lowest index.
    /// If there are fewer filters than partitions, the extra partitions are empty.
    pub fn partition(&self, leaves: &LeafMap) -> Vec<Partition> {
        let mut items: Vec<_> = leaves.iter().collect();
        // The map iterates in key order, and the sort is stable.
        items.sort_by_key(|&(_, duration)| Reverse(duration));

        let mut partitions = vec![Partition::default(); self.factor];
        let mut loads: BinaryHeap<_> = (0..self.factor)
            .map(|index| Reverse((Duration::ZERO, index)))
            .collect();

        for (key, duration) in items {
            // The heap always holds exactly one entry per partition.
            let Some(Reverse((load, index))) = loads.pop() else {
                break;
            };
            let partition = &mut partitions[index];
            partition.push(key, duration);
            trace!(
                factor = self.factor,
                partition = index,
                filter = key,
                ?duration,
                ?load,
                "assigned filter",
            );
            loads.push(Reverse((partition.duration, index)));
        }

        partitions
    }
}

/// Distributes the filters in `leaves` across `factor` partitions.
///
/// This is a shortcut for [`Partitioner::new`] followed by [`Partitioner::partition`].
pub fn partition(leaves: &LeafMap, factor: usize) -> Result<Vec<Partition>, PartitionError> {
    Ok(Partitioner::new(factor)?.partition(leaves))
}
