// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Coalescing of fine-grained filters into coarser prefixes.
//!
//! CI systems often limit how many filters can be passed to a single executor. When the number of
//! distinct test names exceeds `min(factors) × max-filters`, the cheapest group is repeatedly
//! merged into a single filter that selects its whole subtree. Total duration is conserved: only
//! the granularity of the keys changes.
//!
//! Each round is computed as a [`MergePlan`] from the current [`CoalesceState`] and then applied,
//! which turns the old state into the new one.

use crate::{
    aggregate::{Aggregation, GroupMap, LeafMap},
    normalize::KeyNormalizer,
};
use std::{
    collections::{BTreeMap, BTreeSet},
    num::NonZeroUsize,
    ops::Bound,
    time::Duration,
};
use tracing::{debug, trace, warn};

/// Computes the filter budget: the smallest factor times the maximum filters per partition.
///
/// Returns `None` if no factors are given.
pub fn filter_budget(
    factors: impl IntoIterator<Item = NonZeroUsize>,
    max_filters_per_partition: NonZeroUsize,
) -> Option<usize> {
    factors
        .into_iter()
        .min()
        .map(|factor| factor.get().saturating_mul(max_filters_per_partition.get()))
}

/// A min-priority set of groups, ordered by duration and then by key.
///
/// Supports updating the duration of a group that's already queued.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct GroupQueue {
    by_duration: BTreeSet<(Duration, String)>,
    durations: BTreeMap<String, Duration>,
}

impl GroupQueue {
    /// Creates a queue containing every group in `groups`.
    pub fn from_groups(groups: &GroupMap) -> Self {
        let mut queue = Self::default();
        for (key, duration) in groups.iter() {
            queue.set(key, duration);
        }
        queue
    }

    /// Returns the number of queued groups.
    pub fn len(&self) -> usize {
        self.durations.len()
    }

    /// Returns true if no groups are queued.
    pub fn is_empty(&self) -> bool {
        self.durations.is_empty()
    }

    /// Returns the duration of `key`, if it is queued.
    pub fn get(&self, key: &str) -> Option<Duration> {
        self.durations.get(key).copied()
    }

    /// Inserts `key`, or updates its duration if it's already queued.
    pub fn set(&mut self, key: &str, duration: Duration) {
        if let Some(old) = self.durations.insert(key.to_owned(), duration) {
            self.by_duration.remove(&(old, key.to_owned()));
        }
        self.by_duration.insert((duration, key.to_owned()));
    }

    /// Removes `key` from the queue, returning its duration if it was queued.
    pub fn remove(&mut self, key: &str) -> Option<Duration> {
        let duration = self.durations.remove(key)?;
        self.by_duration.remove(&(duration, key.to_owned()));
        Some(duration)
    }

    /// Returns the group with the smallest duration. Ties are broken by the smallest key.
    pub fn peek_min(&self) -> Option<(&str, Duration)> {
        self.by_duration
            .first()
            .map(|(duration, key)| (key.as_str(), *duration))
    }

    /// Returns the queued groups strictly below `group` in the hierarchy.
    pub fn descendants<'a>(
        &'a self,
        normalizer: &'a KeyNormalizer,
        group: &'a str,
    ) -> impl Iterator<Item = &'a str> + 'a {
        self.durations
            .range::<str, _>((Bound::Excluded(group), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(group))
            .filter(move |(key, _)| normalizer.is_within(key, group))
            .map(|(key, _)| key.as_str())
    }

    /// Returns a snapshot of the queue as a [`GroupMap`].
    pub fn to_group_map(&self) -> GroupMap {
        self.durations
            .iter()
            .map(|(key, duration)| (key.as_str(), *duration))
            .collect()
    }
}

/// The leaf and group state between coalescing rounds.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CoalesceState {
    /// The current filters and their durations.
    pub leaves: LeafMap,

    /// The groups that may be merged next.
    pub groups: GroupQueue,
}

impl CoalesceState {
    /// Creates a new state from the output of aggregation.
    pub fn new(leaves: LeafMap, groups: &GroupMap) -> Self {
        Self {
            leaves,
            groups: GroupQueue::from_groups(groups),
        }
    }

    /// Applies a merge plan, producing the state for the next round.
    pub fn apply(mut self, plan: &MergePlan) -> Self {
        for key in &plan.absorbed {
            self.leaves.remove(key);
        }
        if !plan.absorbed.is_empty() {
            self.leaves.insert(plan.group.clone(), plan.merged_duration);
        }

        self.groups.remove(&plan.group);
        for key in &plan.purged_groups {
            self.groups.remove(key);
        }
        if let Some((parent, duration)) = &plan.parent {
            self.groups.set(parent, *duration);
        }

        self
    }
}

/// A single coalescing round, computed from a [`CoalesceState`] without modifying it.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MergePlan {
    /// The group being merged into a single leaf.
    pub group: String,

    /// The duration of the group's direct leaves, as recorded in the queue.
    pub group_duration: Duration,

    /// The leaves absorbed into the new leaf: everything within the group's subtree.
    pub absorbed: Vec<String>,

    /// The total duration of the absorbed leaves.
    pub merged_duration: Duration,

    /// Queued groups below the merged group. They no longer have any leaves and are dropped.
    pub purged_groups: Vec<String>,

    /// The new queue entry for the group's parent, if it becomes (or already was) mergeable.
    pub parent: Option<(String, Duration)>,
}

impl MergePlan {
    /// Plans the merge of `group` in the given state.
    pub fn compute(
        state: &CoalesceState,
        normalizer: &KeyNormalizer,
        group: &str,
        group_duration: Duration,
    ) -> Self {
        let mut absorbed = Vec::new();
        let mut merged_duration = Duration::ZERO;
        for (key, duration) in state.leaves.subtree(normalizer, group) {
            absorbed.push(key.to_owned());
            merged_duration = merged_duration.saturating_add(duration);
        }

        let purged_groups = state
            .groups
            .descendants(normalizer, group)
            .map(str::to_owned)
            .collect();

        let parent = Self::compute_parent(state, normalizer, group, merged_duration);

        Self {
            group: group.to_owned(),
            group_duration,
            absorbed,
            merged_duration,
            purged_groups,
            parent,
        }
    }

    // After the merge, the parent's subtree consists of the new leaf plus every leaf within the
    // parent but outside the merged group. The parent becomes mergeable if all of those are its
    // direct children. If it is already queued, its duration is refreshed either way.
    fn compute_parent(
        state: &CoalesceState,
        normalizer: &KeyNormalizer,
        group: &str,
        merged_duration: Duration,
    ) -> Option<(String, Duration)> {
        let parent = normalizer.up(group);
        if parent == group {
            return None;
        }

        let mut direct_duration = merged_duration;
        let mut flat = true;
        for (key, duration) in state.leaves.subtree(normalizer, parent) {
            if normalizer.is_within(key, group) {
                continue;
            }
            if normalizer.up(key) == parent {
                direct_duration = direct_duration.saturating_add(duration);
            } else {
                flat = false;
            }
        }

        (flat || state.groups.get(parent).is_some()).then(|| (parent.to_owned(), direct_duration))
    }
}

/// The result of [`Coalescer::coalesce`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct CoalesceOutcome {
    /// The filters after coalescing.
    pub leaves: LeafMap,

    /// The groups that were still mergeable when coalescing stopped.
    pub groups: GroupMap,

    /// The budget that was requested, if any.
    pub budget: Option<usize>,

    /// The number of merge rounds that ran.
    pub rounds: usize,
}

impl CoalesceOutcome {
    /// Returns true if no budget was requested, or if the number of filters is within it.
    ///
    /// This is false if the test names ran out of hierarchy before the budget could be met.
    pub fn budget_met(&self) -> bool {
        self.budget.is_none_or(|budget| self.leaves.len() <= budget)
    }
}

/// Merges the cheapest groups of filters until a budget is met.
#[derive(Clone, Debug, Default)]
pub struct Coalescer {
    normalizer: KeyNormalizer,
}

impl Coalescer {
    /// Creates a new coalescer using the given normalizer.
    pub fn new(normalizer: KeyNormalizer) -> Self {
        Self { normalizer }
    }

    /// Coalesces the output of aggregation so that at most `budget` filters remain.
    ///
    /// With no budget, the leaves are returned unchanged.
    pub fn coalesce(&self, aggregation: Aggregation, budget: Option<usize>) -> CoalesceOutcome {
        let Aggregation { leaves, groups, .. } = aggregation;
        self.coalesce_maps(leaves, &groups, budget)
    }

    /// Coalesces the given leaf and group maps so that at most `budget` filters remain.
    pub fn coalesce_maps(
        &self,
        leaves: LeafMap,
        groups: &GroupMap,
        budget: Option<usize>,
    ) -> CoalesceOutcome {
        let Some(budget) = budget else {
            return CoalesceOutcome {
                leaves,
                groups: groups.clone(),
                budget: None,
                rounds: 0,
            };
        };

        let mut state = CoalesceState::new(leaves, groups);
        let mut rounds = 0;

        while state.leaves.len() > budget {
            let Some((group, group_duration)) = state.groups.peek_min() else {
                break;
            };
            let plan = MergePlan::compute(&state, &self.normalizer, group, group_duration);
            trace!(
                group = %plan.group,
                duration = ?plan.group_duration,
                absorbed = plan.absorbed.len(),
                merged_duration = ?plan.merged_duration,
                "coalescing group",
            );
            state = state.apply(&plan);
            rounds += 1;
        }

        let outcome = CoalesceOutcome {
            groups: state.groups.to_group_map(),
            leaves: state.leaves,
            budget: Some(budget),
            rounds,
        };

        if outcome.budget_met() {
            debug!(
                leaves = outcome.leaves.len(),
                groups = outcome.groups.len(),
                rounds,
                "coalesced filters within budget of {budget}",
            );
        } else {
            warn!(
                "could only coalesce down to {} filters (budget: {budget}); \
                 test names have no more hierarchy to merge",
                outcome.leaves.len(),
            );
        }

        outcome
    }
}
