// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{deserialize::deserialize_test_run, errors::TrxReadError};
use std::{io, str::FromStr, time::Duration};

/// The XML namespace used by TRX documents.
pub static TRX_NAMESPACE: &str = "http://microsoft.com/schemas/VisualStudio/TeamTest/2010";

/// The root element of a TRX document.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct TestRun {
    /// The name of this run, if recorded.
    ///
    /// `vstest` usually fills this in as `user@machine timestamp`.
    pub name: Option<String>,

    /// The unit test results in this run, in document order.
    pub results: Vec<UnitTestResult>,

    /// The total number of XML elements seen while reading this run.
    ///
    /// This is zero for runs that were constructed in memory.
    pub element_count: usize,
}

impl TestRun {
    /// Creates a new, empty `TestRun`.
    pub fn new() -> Self {
        Self::default()
    }

    /// Sets the name of the run.
    pub fn set_name(&mut self, name: impl Into<String>) -> &mut Self {
        self.name = Some(name.into());
        self
    }

    /// Adds a result to this run.
    pub fn add_result(&mut self, result: UnitTestResult) -> &mut Self {
        self.results.push(result);
        self
    }

    /// Adds several results to this run.
    pub fn add_results(&mut self, results: impl IntoIterator<Item = UnitTestResult>) -> &mut Self {
        self.results.extend(results);
        self
    }

    /// Returns the sum of all result durations, saturating at [`Duration::MAX`].
    pub fn total_duration(&self) -> Duration {
        self.results
            .iter()
            .fold(Duration::ZERO, |total, result| total.saturating_add(result.duration))
    }

    /// Reads a TRX document from the given buffered reader.
    ///
    /// Fails if the document isn't well-formed, if any `UnitTestResult` is missing its `testName`
    /// or `duration`, or if the document doesn't contain any results at all.
    pub fn from_reader(reader: impl io::BufRead) -> Result<Self, TrxReadError> {
        deserialize_test_run(reader)
    }
}

impl FromStr for TestRun {
    type Err = TrxReadError;

    fn from_str(input: &str) -> Result<Self, Self::Err> {
        Self::from_reader(input.as_bytes())
    }
}

/// The outcome of a single test, as recorded in the TRX document.
#[derive(Clone, Debug, PartialEq, Eq)]
#[non_exhaustive]
pub enum TestOutcome {
    /// The test passed.
    Passed,

    /// The test failed.
    Failed,

    /// The test was not executed.
    NotExecuted,

    /// Any other outcome string, e.g. `Inconclusive` or `Timeout`.
    Other(String),
}

impl TestOutcome {
    /// Parses an outcome from its TRX attribute value.
    pub fn new(value: &str) -> Self {
        match value {
            "Passed" => Self::Passed,
            "Failed" => Self::Failed,
            "NotExecuted" => Self::NotExecuted,
            other => Self::Other(other.to_owned()),
        }
    }

    /// Returns the TRX attribute value for this outcome.
    pub fn as_str(&self) -> &str {
        match self {
            Self::Passed => "Passed",
            Self::Failed => "Failed",
            Self::NotExecuted => "NotExecuted",
            Self::Other(other) => other,
        }
    }
}

/// A single `UnitTestResult` element.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct UnitTestResult {
    /// The fully qualified test name, e.g. `Namespace.Class.Method(arg1,arg2)`.
    pub test_name: String,

    /// The time the test took to run.
    pub duration: Duration,

    /// The outcome of the test, if recorded.
    pub outcome: Option<TestOutcome>,
}

impl UnitTestResult {
    /// Creates a new result with the given name and duration.
    pub fn new(test_name: impl Into<String>, duration: Duration) -> Self {
        Self {
            test_name: test_name.into(),
            duration,
            outcome: None,
        }
    }

    /// Sets the outcome.
    pub fn set_outcome(&mut self, outcome: TestOutcome) -> &mut Self {
        self.outcome = Some(outcome);
        self
    }
}
