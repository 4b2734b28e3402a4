// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Deserialize a `TestRun`.

use crate::{
    TRX_NAMESPACE, TestOutcome, TestRun, UnitTestResult, duration::parse_timespan,
    errors::TrxReadError,
};
use quick_xml::{
    NsReader,
    events::{BytesStart, Event},
    name::{Namespace, ResolveResult},
};
use std::io;

const TEST_RUN_TAG: &[u8] = b"TestRun";
const UNIT_TEST_RESULT_TAG: &[u8] = b"UnitTestResult";

const NAME_ATTR: &[u8] = b"name";
const TEST_NAME_ATTR: &[u8] = b"testName";
const DURATION_ATTR: &[u8] = b"duration";
const OUTCOME_ATTR: &[u8] = b"outcome";

pub(crate) fn deserialize_test_run(reader: impl io::BufRead) -> Result<TestRun, TrxReadError> {
    let mut reader = NsReader::from_reader(reader);
    let mut buf = Vec::new();
    let mut test_run = TestRun::new();

    loop {
        let (resolved, event) = match reader.read_resolved_event_into(&mut buf) {
            Ok(resolved_event) => resolved_event,
            Err(err) => return Err(xml_error(reader.buffer_position(), err)),
        };
        // Only elements in the TRX namespace are interesting. Anything else (e.g. embedded
        // test output in another schema) is skipped over.
        let in_trx_namespace = matches!(
            resolved,
            ResolveResult::Bound(Namespace(ns)) if ns == TRX_NAMESPACE.as_bytes()
        );

        match event {
            Event::Start(start) | Event::Empty(start) => {
                test_run.element_count += 1;
                if in_trx_namespace {
                    match start.local_name().as_ref() {
                        UNIT_TEST_RESULT_TAG => {
                            let index = test_run.results.len() + 1;
                            let result = read_unit_test_result(&start, index)
                                .map_err(|err| err.with_position(reader.buffer_position()))?;
                            test_run.add_result(result);
                        }
                        TEST_RUN_TAG => {
                            if let Some(name) = read_attribute(&start, NAME_ATTR)
                                .map_err(|err| xml_error(reader.buffer_position(), err))?
                            {
                                test_run.set_name(name);
                            }
                        }
                        _ => {}
                    }
                }
            }
            Event::Eof => break,
            _ => {}
        }

        buf.clear();
    }

    if test_run.results.is_empty() {
        return Err(TrxReadError::NoResults {
            element_count: test_run.element_count,
        });
    }

    Ok(test_run)
}

/// An error produced while reading a single element, before the reader position is known.
enum ElementError {
    Xml(quick_xml::Error),
    Trx(TrxReadError),
}

impl ElementError {
    fn with_position(self, position: usize) -> TrxReadError {
        match self {
            Self::Xml(err) => xml_error(position, err),
            Self::Trx(err) => err,
        }
    }
}

impl From<quick_xml::Error> for ElementError {
    fn from(err: quick_xml::Error) -> Self {
        Self::Xml(err)
    }
}

fn read_unit_test_result(
    start: &BytesStart<'_>,
    index: usize,
) -> Result<UnitTestResult, ElementError> {
    let mut test_name = None;
    let mut duration = None;
    let mut outcome = None;

    for attr in start.attributes() {
        let attr = attr.map_err(quick_xml::Error::from)?;
        let key = attr.key.local_name();
        if key.as_ref() == TEST_NAME_ATTR {
            test_name = Some(attr.unescape_value()?.into_owned());
        } else if key.as_ref() == DURATION_ATTR {
            duration = Some(attr.unescape_value()?.into_owned());
        } else if key.as_ref() == OUTCOME_ATTR {
            outcome = Some(TestOutcome::new(&attr.unescape_value()?));
        }
    }

    let test_name = test_name.ok_or(ElementError::Trx(TrxReadError::MissingAttribute {
        index,
        attribute: "testName",
    }))?;
    let duration = duration.ok_or(ElementError::Trx(TrxReadError::MissingAttribute {
        index,
        attribute: "duration",
    }))?;
    let duration = parse_timespan(&duration).map_err(|err| {
        ElementError::Trx(TrxReadError::InvalidDuration {
            index,
            test_name: test_name.clone(),
            err,
        })
    })?;

    let mut result = UnitTestResult::new(test_name, duration);
    if let Some(outcome) = outcome {
        result.set_outcome(outcome);
    }
    Ok(result)
}

fn read_attribute(start: &BytesStart<'_>, name: &[u8]) -> quick_xml::Result<Option<String>> {
    for attr in start.attributes() {
        let attr = attr?;
        if attr.key.local_name().as_ref() == name {
            return Ok(Some(attr.unescape_value()?.into_owned()));
        }
    }
    Ok(None)
}

fn xml_error(position: usize, err: quick_xml::Error) -> TrxReadError {
    TrxReadError::Xml {
        position: position as u64,
        err,
    }
}
