// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use thiserror::Error;

/// An error that occurs while reading a [`TestRun`](crate::TestRun).
///
/// Returned by [`TestRun::from_reader`](crate::TestRun::from_reader) and
/// its [`FromStr`](std::str::FromStr) implementation.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum TrxReadError {
    /// The document was not well-formed XML.
    #[error("error reading TRX document at byte {position}")]
    Xml {
        /// The byte offset at which the error was detected.
        position: u64,

        /// The underlying XML error.
        #[source]
        err: quick_xml::Error,
    },

    /// A `UnitTestResult` element was missing a required attribute.
    #[error("UnitTestResult #{index} is missing required attribute `{attribute}`")]
    MissingAttribute {
        /// The 1-based index of the result within the document.
        index: usize,

        /// The name of the missing attribute.
        attribute: &'static str,
    },

    /// A `UnitTestResult` element had a duration that couldn't be parsed.
    #[error("UnitTestResult #{index} (`{test_name}`) has an invalid duration")]
    InvalidDuration {
        /// The 1-based index of the result within the document.
        index: usize,

        /// The test name of the offending result.
        test_name: String,

        /// The parse error.
        #[source]
        err: DurationParseError,
    },

    /// The document did not contain any `UnitTestResult` elements.
    #[error("TRX document contains no UnitTestResult elements ({element_count} elements seen)")]
    NoResults {
        /// The total number of elements in the document.
        element_count: usize,
    },
}

/// An error that occurs while parsing a `TimeSpan`-formatted duration.
///
/// Returned by [`parse_timespan`](crate::parse_timespan).
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid duration `{input}`: {reason}")]
pub struct DurationParseError {
    input: String,
    reason: &'static str,
}

impl DurationParseError {
    pub(crate) fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }

    /// Returns the input that failed to parse.
    pub fn input(&self) -> &str {
        &self.input
    }

    /// Returns a short description of why parsing failed.
    pub fn reason(&self) -> &'static str {
        self.reason
    }
}
