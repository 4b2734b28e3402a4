// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Errors produced by shardwise.

use camino::{Utf8Path, Utf8PathBuf};
use config::ConfigError;
use std::{collections::BTreeSet, fmt, io};
use thiserror::Error;

/// An error returned by the partitioner.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[non_exhaustive]
pub enum PartitionError {
    /// A parallelization factor of zero was requested.
    #[error("parallelization factor must be at least 1")]
    ZeroFactor,
}

/// An error that occurred while parsing the config.
#[derive(Debug, Error)]
#[error("failed to parse shardwise config at `{config_file}`")]
#[non_exhaustive]
pub struct ConfigParseError {
    config_file: Utf8PathBuf,
    #[source]
    kind: ConfigParseErrorKind,
}

impl ConfigParseError {
    pub(crate) fn new(config_file: impl Into<Utf8PathBuf>, kind: ConfigParseErrorKind) -> Self {
        Self {
            config_file: config_file.into(),
            kind,
        }
    }

    /// Returns the config file for this error.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the kind of error this is.
    pub fn kind(&self) -> &ConfigParseErrorKind {
        &self.kind
    }
}

/// The kind of error that occurred while parsing a config.
///
/// Returned by [`ConfigParseError::kind`].
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum ConfigParseErrorKind {
    /// An error occurred while building the config.
    #[error(transparent)]
    BuildError(Box<ConfigError>),

    /// An error occurred while deserializing the config.
    #[error(transparent)]
    DeserializeError(Box<ConfigError>),

    /// A profile listed a parallelization factor of zero.
    #[error("profile `{profile}`: parallelization factors must be at least 1")]
    ZeroFactor {
        /// The name of the profile.
        profile: String,
    },

    /// A profile listed a maximum filter count of zero.
    #[error("profile `{profile}`: max-filters must be at least 1")]
    ZeroMaxFilters {
        /// The name of the profile.
        profile: String,
    },

    /// A profile had an invalid separator set.
    #[error("profile `{profile}`: invalid separators")]
    InvalidSeparators {
        /// The name of the profile.
        profile: String,

        /// The underlying error.
        #[source]
        err: InvalidSeparatorsError,
    },
}

/// An error which indicates that a profile was requested but not known to shardwise.
#[derive(Clone, Debug, Error)]
#[error("profile `{profile}` not found (known profiles: {})", .all_profiles.join(", "))]
pub struct ProfileNotFound {
    profile: String,
    all_profiles: Vec<String>,
}

impl ProfileNotFound {
    pub(crate) fn new(
        profile: impl Into<String>,
        all_profiles: impl IntoIterator<Item = impl Into<String>>,
    ) -> Self {
        let mut all_profiles: Vec<_> = all_profiles.into_iter().map(|s| s.into()).collect();
        all_profiles.sort_unstable();
        Self {
            profile: profile.into(),
            all_profiles,
        }
    }
}

/// An invalid set of hierarchy separators was specified.
#[derive(Clone, Debug, Error, PartialEq, Eq)]
#[error("invalid separators `{input}`: {reason}")]
pub struct InvalidSeparatorsError {
    input: String,
    reason: &'static str,
}

impl InvalidSeparatorsError {
    pub(crate) fn new(input: impl Into<String>, reason: &'static str) -> Self {
        Self {
            input: input.into(),
            reason,
        }
    }
}

/// An error that occurs while writing a split plan.
#[derive(Debug, Error)]
#[non_exhaustive]
pub enum WriteSplitPlanError {
    /// An error occurred while writing the plan to the output.
    #[error("error writing to output")]
    Io(#[source] io::Error),

    /// An error occurred while serializing JSON, or while writing it to the output.
    #[error("error serializing to JSON")]
    Json(#[source] serde_json::Error),
}

/// Displays a list of unknown config keys.
pub(crate) struct DisplayUnknownKeys<'a>(pub(crate) &'a BTreeSet<String>);

impl fmt::Display for DisplayUnknownKeys<'_> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for (idx, key) in self.0.iter().enumerate() {
            if idx > 0 {
                write!(f, ", ")?;
            }
            write!(f, "`{key}`")?;
        }
        Ok(())
    }
}
