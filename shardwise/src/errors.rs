// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::output::StderrStyles;
use camino::{FromPathBufError, Utf8PathBuf};
use owo_colors::OwoColorize;
use quick_trx::TrxReadError;
use shardwise_core::errors::{
    ConfigParseError, PartitionError, ProfileNotFound, WriteSplitPlanError,
};
use shardwise_metadata::ShardwiseExitCode;
use std::error::Error;
use thiserror::Error;
use tracing::error;

// Note that the #[error()] strings are mostly placeholder messages -- the expected way to print out
// errors is with the display_to_stderr method, which colorizes errors.

/// An error that shardwise anticipates and reports with a specific exit code.
#[derive(Debug, Error)]
#[doc(hidden)]
pub enum ExpectedError {
    #[error("could not determine current directory")]
    CurrentDirFailed {
        #[source]
        err: std::io::Error,
    },
    #[error("current directory is not valid UTF-8")]
    CurrentDirInvalidUtf8 {
        #[source]
        err: FromPathBufError,
    },
    #[error("config parse error")]
    ConfigParseError {
        #[from]
        err: ConfigParseError,
    },
    #[error("profile not found")]
    ProfileNotFound {
        #[from]
        err: ProfileNotFound,
    },
    #[error("failed to open report")]
    ReportOpenFailed {
        path: Utf8PathBuf,
        #[source]
        err: std::io::Error,
    },
    #[error("failed to read report")]
    ReportReadFailed {
        path: Utf8PathBuf,
        #[source]
        err: TrxReadError,
    },
    #[error("failed to partition filters")]
    PartitionFailed {
        #[from]
        err: PartitionError,
    },
    #[error("failed to write split plan")]
    WriteOutputFailed {
        #[from]
        err: WriteSplitPlanError,
    },
}

impl ExpectedError {
    pub(crate) fn report_open_failed(path: impl Into<Utf8PathBuf>, err: std::io::Error) -> Self {
        Self::ReportOpenFailed {
            path: path.into(),
            err,
        }
    }

    pub(crate) fn report_read_failed(path: impl Into<Utf8PathBuf>, err: TrxReadError) -> Self {
        Self::ReportReadFailed {
            path: path.into(),
            err,
        }
    }

    /// Returns the exit code for the process.
    pub fn process_exit_code(&self) -> i32 {
        match self {
            Self::CurrentDirFailed { .. }
            | Self::CurrentDirInvalidUtf8 { .. }
            | Self::ConfigParseError { .. }
            | Self::ProfileNotFound { .. } => ShardwiseExitCode::SETUP_ERROR,
            Self::ReportOpenFailed { .. } | Self::ReportReadFailed { .. } => {
                ShardwiseExitCode::REPORT_READ_FAILED
            }
            Self::PartitionFailed { .. } => ShardwiseExitCode::INVALID_ARGUMENT,
            Self::WriteOutputFailed { .. } => ShardwiseExitCode::WRITE_OUTPUT_ERROR,
        }
    }

    /// Displays this error to stderr.
    pub fn display_to_stderr(&self, styles: &StderrStyles) {
        let mut next_error = match &self {
            Self::CurrentDirFailed { err } => {
                error!("could not determine current directory");
                Some(err as &dyn Error)
            }
            Self::CurrentDirInvalidUtf8 { err } => {
                error!(
                    "current directory `{}` is not valid UTF-8",
                    err.as_path().display().style(styles.bold)
                );
                None
            }
            Self::ConfigParseError { err } => {
                error!(
                    "failed to parse shardwise config at `{}`",
                    err.config_file().style(styles.bold)
                );
                Some(err.kind() as &dyn Error)
            }
            Self::ProfileNotFound { err } => {
                error!("{}", err);
                err.source()
            }
            Self::ReportOpenFailed { path, err } => {
                error!("failed to open report at `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::ReportReadFailed { path, err } => {
                error!("failed to read report at `{}`", path.style(styles.bold));
                Some(err as &dyn Error)
            }
            Self::PartitionFailed { err } => {
                error!("{}", err);
                err.source()
            }
            Self::WriteOutputFailed { err } => {
                error!("failed to write split plan to output");
                Some(err as &dyn Error)
            }
        };

        while let Some(err) = next_error {
            error!(target: "shardwise::no_heading", "\nCaused by:\n  {}", err);
            next_error = err.source();
        }
    }
}
