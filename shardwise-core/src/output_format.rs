// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Output formats for split plans.

use owo_colors::Style;
use serde::Serialize;
use std::io;

/// Output formats for shardwise.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum OutputFormat {
    /// A human-readable output format.
    Human {
        /// Whether to also print the duration of each filter.
        verbose: bool,
    },

    /// Machine-readable output format.
    Serializable(SerializableFormat),
}

/// A serialized, machine-readable output format.
#[derive(Copy, Clone, Debug, Eq, PartialEq)]
#[non_exhaustive]
pub enum SerializableFormat {
    /// JSON with no whitespace.
    Json,
    /// JSON, prettified.
    JsonPretty,
}

impl SerializableFormat {
    /// Write this data in the given format to the writer.
    pub fn to_writer(
        self,
        value: &impl Serialize,
        mut writer: impl io::Write,
    ) -> serde_json::Result<()> {
        match self {
            SerializableFormat::Json => serde_json::to_writer(&mut writer, value)?,
            SerializableFormat::JsonPretty => serde_json::to_writer_pretty(&mut writer, value)?,
        }
        // Terminate the output with a newline.
        writer.write_all(b"\n").map_err(serde_json::Error::io)
    }
}

#[derive(Clone, Debug, Default)]
pub(crate) struct Styles {
    pub(crate) factor: Style,
    pub(crate) partition: Style,
    pub(crate) filter: Style,
    pub(crate) duration: Style,
}

impl Styles {
    pub(crate) fn colorize(&mut self) {
        self.factor = Style::new().magenta().bold();
        self.partition = Style::new().blue().bold();
        self.filter = Style::new().cyan();
        self.duration = Style::new().yellow();
    }
}
