// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Aggregation of raw per-test durations into leaf and group maps.

use crate::normalize::KeyNormalizer;
use std::{
    collections::{BTreeMap, btree_map},
    ops::Bound,
    time::Duration,
};
use tracing::debug;

/// A single decoded test result: a raw test name and the time it took.
pub trait TestRecord {
    /// The raw, possibly parameterized, test name.
    fn name(&self) -> &str;

    /// The time the test took.
    fn duration(&self) -> Duration;
}

impl TestRecord for quick_trx::UnitTestResult {
    fn name(&self) -> &str {
        &self.test_name
    }

    fn duration(&self) -> Duration {
        self.duration
    }
}

impl<S: AsRef<str>> TestRecord for (S, Duration) {
    fn name(&self) -> &str {
        self.0.as_ref()
    }

    fn duration(&self) -> Duration {
        self.1
    }
}

impl<T: TestRecord + ?Sized> TestRecord for &T {
    fn name(&self) -> &str {
        (**self).name()
    }

    fn duration(&self) -> Duration {
        (**self).duration()
    }
}

/// An ordered map from key to cumulative duration.
///
/// Iteration is always in key order, so anything derived from a `DurationMap` is deterministic.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct DurationMap {
    entries: BTreeMap<String, Duration>,
}

/// Map from filter key (a deparameterized test name, or a coalesced prefix) to duration.
pub type LeafMap = DurationMap;

/// Map from group key (the parent of one or more leaves) to the duration of its direct leaves.
pub type GroupMap = DurationMap;

impl DurationMap {
    /// Creates a new, empty map.
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the number of entries.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns true if there are no entries.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Returns the duration for `key`, if present.
    pub fn get(&self, key: &str) -> Option<Duration> {
        self.entries.get(key).copied()
    }

    /// Returns true if `key` is present.
    pub fn contains_key(&self, key: &str) -> bool {
        self.entries.contains_key(key)
    }

    /// Adds `duration` to the entry for `key`, creating it if necessary.
    ///
    /// Sums saturate at [`Duration::MAX`].
    pub fn add(&mut self, key: &str, duration: Duration) {
        match self.entries.get_mut(key) {
            Some(existing) => *existing = existing.saturating_add(duration),
            None => {
                self.entries.insert(key.to_owned(), duration);
            }
        }
    }

    /// Sets the entry for `key`, returning the previous duration if any.
    pub fn insert(&mut self, key: impl Into<String>, duration: Duration) -> Option<Duration> {
        self.entries.insert(key.into(), duration)
    }

    /// Removes the entry for `key`, returning its duration if it was present.
    pub fn remove(&mut self, key: &str) -> Option<Duration> {
        self.entries.remove(key)
    }

    /// Iterates over entries in key order.
    pub fn iter(&self) -> impl ExactSizeIterator<Item = (&str, Duration)> + '_ {
        self.entries.iter().map(|(key, duration)| (key.as_str(), *duration))
    }

    /// Iterates over keys in key order.
    pub fn keys(&self) -> impl ExactSizeIterator<Item = &str> + '_ {
        self.entries.keys().map(String::as_str)
    }

    /// Returns the sum of all durations, saturating at [`Duration::MAX`].
    pub fn total(&self) -> Duration {
        self.entries
            .values()
            .fold(Duration::ZERO, |total, duration| total.saturating_add(*duration))
    }

    /// Iterates over the entries within the subtree rooted at `group`, including `group` itself.
    pub fn subtree<'a>(
        &'a self,
        normalizer: &'a KeyNormalizer,
        group: &'a str,
    ) -> impl Iterator<Item = (&'a str, Duration)> + 'a {
        // Every key within the subtree starts with `group`, and all such keys sort contiguously
        // from `group` onwards.
        self.entries
            .range::<str, _>((Bound::Included(group), Bound::Unbounded))
            .take_while(move |(key, _)| key.starts_with(group))
            .filter(move |(key, _)| normalizer.is_within(key, group))
            .map(|(key, duration)| (key.as_str(), *duration))
    }
}

impl<K: Into<String>> FromIterator<(K, Duration)> for DurationMap {
    fn from_iter<T: IntoIterator<Item = (K, Duration)>>(iter: T) -> Self {
        let mut map = Self::new();
        for (key, duration) in iter {
            let key = key.into();
            map.add(&key, duration);
        }
        map
    }
}

impl IntoIterator for DurationMap {
    type Item = (String, Duration);
    type IntoIter = btree_map::IntoIter<String, Duration>;

    fn into_iter(self) -> Self::IntoIter {
        self.entries.into_iter()
    }
}

/// The output of [`DurationAggregator::aggregate`].
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Aggregation {
    /// Durations keyed by deparameterized test name.
    pub leaves: LeafMap,

    /// Durations keyed by the parent of each deparameterized test name.
    pub groups: GroupMap,

    /// The number of records that were aggregated.
    pub record_count: usize,
}

/// Sums raw test durations into a [`LeafMap`] and a [`GroupMap`].
#[derive(Clone, Debug, Default)]
pub struct DurationAggregator {
    normalizer: KeyNormalizer,
}

impl DurationAggregator {
    /// Creates a new aggregator using the given normalizer.
    pub fn new(normalizer: KeyNormalizer) -> Self {
        Self { normalizer }
    }

    /// Aggregates the given records.
    ///
    /// Records that share a deparameterized name (different parameterizations of one test method)
    /// are summed into a single leaf, since a filter on that name selects all of them together.
    pub fn aggregate<I>(&self, records: I) -> Aggregation
    where
        I: IntoIterator,
        I::Item: TestRecord,
    {
        let mut aggregation = Aggregation::default();

        for record in records {
            let leaf_key = self.normalizer.deparameterize(record.name());
            let group_key = self.normalizer.up(leaf_key);
            let duration = record.duration();

            aggregation.leaves.add(leaf_key, duration);
            aggregation.groups.add(group_key, duration);
            aggregation.record_count += 1;
        }

        debug!(
            records = aggregation.record_count,
            leaves = aggregation.leaves.len(),
            groups = aggregation.groups.len(),
            "aggregated test durations",
        );

        aggregation
    }
}
