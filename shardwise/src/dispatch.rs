// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

use crate::{
    ExpectedError,
    output::{OutputContext, OutputOpts, OutputWriter, clap_styles},
};
use camino::{Utf8Path, Utf8PathBuf};
use clap::{Args, Parser, ValueEnum};
use quick_trx::TestRun;
use shardwise_core::{
    aggregate::DurationAggregator,
    coalesce::{Coalescer, filter_budget},
    config::{ShardwiseConfig, ShardwiseProfile},
    errors::WriteSplitPlanError,
    output_format::{OutputFormat, SerializableFormat},
    plan::SplitPlan,
};
use shardwise_metadata::ShardwiseExitCode;
use std::{
    fs::File,
    io::{BufReader, Write},
    num::NonZeroUsize,
};
use tracing::{debug, trace};

/// Split a test suite into balanced groups of filters, using the per-test durations from a single
/// run of the whole suite.
///
/// For each parallelization factor N, prints N lists of test filters whose total durations are as
/// even as possible. Each list can then be passed to one executor.
#[derive(Debug, Parser)]
#[command(version, styles = clap_styles::style())]
pub struct ShardwiseApp {
    /// The TRX file produced by a single run of the whole test suite
    #[arg(long, value_name = "PATH")]
    file: Utf8PathBuf,

    /// The number of parts to split the tests into; accepts several values [default: from profile]
    #[arg(long, num_args = 1.., value_name = "N")]
    parallelization: Vec<NonZeroUsize>,

    /// The maximum number of test filters to produce per part [default: from profile]
    #[arg(long, value_name = "N")]
    max_filters: Option<NonZeroUsize>,

    /// Shardwise profile to use
    #[arg(long, short = 'P', env = "SHARDWISE_PROFILE", value_name = "NAME")]
    profile: Option<String>,

    #[command(flatten)]
    config_opts: ConfigOpts,

    /// Output format
    #[arg(
        short = 'T',
        long,
        value_enum,
        default_value_t,
        help_heading = "Output options",
        value_name = "FMT"
    )]
    message_format: MessageFormatOpts,

    #[command(flatten)]
    output: OutputOpts,
}

impl ShardwiseApp {
    /// Initializes the output context.
    pub fn init_output(&self) -> OutputContext {
        self.output.init()
    }

    /// Executes the app, returning the process exit code.
    pub fn exec(
        self,
        output: OutputContext,
        output_writer: &mut OutputWriter,
    ) -> Result<i32, ExpectedError> {
        let config = self.config_opts.make_config()?;
        let profile = config.profile(
            self.profile
                .as_deref()
                .unwrap_or(ShardwiseConfig::DEFAULT_PROFILE),
        )?;

        let factors = resolve_factors(&self.parallelization, profile);
        let max_filters = self.max_filters.or(profile.max_filters());
        debug!(
            profile = profile.name(),
            ?factors,
            ?max_filters,
            "resolved settings",
        );

        let test_run = read_report(&self.file)?;

        let aggregation = DurationAggregator::new(profile.normalizer().clone())
            .aggregate(&test_run.results);
        let budget = max_filters
            .and_then(|max_filters| filter_budget(factors.iter().copied(), max_filters));
        let outcome = Coalescer::new(profile.normalizer().clone()).coalesce(aggregation, budget);

        let mut plan =
            SplitPlan::from_coalesced(outcome, factors.iter().map(|factor| factor.get()))?;
        if let Some(name) = &test_run.name {
            plan.set_report_name(name);
        }

        let output_format = self.message_format.to_output_format(output.verbose);
        let mut writer = output_writer.stdout_writer();
        plan.write(
            output_format,
            &mut writer,
            output.color.should_colorize(supports_color::Stream::Stdout),
        )?;
        writer
            .flush()
            .map_err(|err| ExpectedError::from(WriteSplitPlanError::Io(err)))?;

        Ok(ShardwiseExitCode::OK)
    }
}

#[derive(Debug, Args)]
#[command(next_help_heading = "Config options")]
struct ConfigOpts {
    /// Config file [default: workspace-root/.config/shardwise.toml]
    #[arg(long, value_name = "PATH")]
    config_file: Option<Utf8PathBuf>,

    /// Directory to look for `.config/shardwise.toml` in [default: current directory]
    #[arg(long, value_name = "DIR")]
    workspace_root: Option<Utf8PathBuf>,
}

impl ConfigOpts {
    /// Creates a shardwise config with the given options.
    fn make_config(&self) -> Result<ShardwiseConfig, ExpectedError> {
        let workspace_root = match &self.workspace_root {
            Some(root) => root.clone(),
            None => current_dir()?,
        };
        Ok(ShardwiseConfig::from_sources(
            &workspace_root,
            self.config_file.as_deref(),
        )?)
    }
}

fn current_dir() -> Result<Utf8PathBuf, ExpectedError> {
    let dir = std::env::current_dir().map_err(|err| ExpectedError::CurrentDirFailed { err })?;
    Utf8PathBuf::try_from(dir).map_err(|err| ExpectedError::CurrentDirInvalidUtf8 { err })
}

#[derive(Copy, Clone, Debug, Default, ValueEnum)]
enum MessageFormatOpts {
    Human,
    Json,
    #[default]
    JsonPretty,
}

impl MessageFormatOpts {
    fn to_output_format(self, verbose: bool) -> OutputFormat {
        match self {
            Self::Human => OutputFormat::Human { verbose },
            Self::Json => OutputFormat::Serializable(SerializableFormat::Json),
            Self::JsonPretty => OutputFormat::Serializable(SerializableFormat::JsonPretty),
        }
    }
}

/// Command-line factors replace the profile's. The result is sorted, deduplicated, and never
/// empty.
fn resolve_factors(cli: &[NonZeroUsize], profile: &ShardwiseProfile) -> Vec<NonZeroUsize> {
    let mut factors = if cli.is_empty() {
        profile.parallelization().to_vec()
    } else {
        cli.to_vec()
    };
    if factors.is_empty() {
        factors.push(ShardwiseProfile::DEFAULT_FACTOR);
    }
    factors.sort_unstable();
    factors.dedup();
    factors
}

fn read_report(path: &Utf8Path) -> Result<TestRun, ExpectedError> {
    let file = File::open(path).map_err(|err| ExpectedError::report_open_failed(path, err))?;
    let test_run = TestRun::from_reader(BufReader::new(file))
        .map_err(|err| ExpectedError::report_read_failed(path, err))?;
    trace!(
        elements = test_run.element_count,
        results = test_run.results.len(),
        "read report {path}",
    );
    Ok(test_run)
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::{Utf8TempDir, tempdir};
    use indoc::indoc;
    use maplit::btreemap;
    use pretty_assertions::assert_eq;
    use shardwise_metadata::SplitPlanSummary;
    use test_case::test_case;

    const REPORT: &str = indoc! {r#"
        <?xml version="1.0" encoding="utf-8"?>
        <TestRun name="nightly" xmlns="http://microsoft.com/schemas/VisualStudio/TeamTest/2010">
          <Results>
            <UnitTestResult testName="A.B.C1" duration="00:00:10" outcome="Passed" />
            <UnitTestResult testName="A.B.C2(1)" duration="00:00:02" outcome="Passed" />
            <UnitTestResult testName="A.B.C2(2)" duration="00:00:03" outcome="Passed" />
            <UnitTestResult testName="A.D.C3" duration="00:00:02" outcome="Failed" />
          </Results>
        </TestRun>
    "#};

    struct Fixture {
        dir: Utf8TempDir,
        report: Utf8PathBuf,
    }

    impl Fixture {
        fn new(report_contents: &str) -> Self {
            let dir = tempdir().expect("error creating temp dir");
            let report = dir.path().join("results.trx");
            std::fs::write(&report, report_contents).expect("error writing report");
            Self { dir, report }
        }

        fn write_config(&self, contents: &str) {
            let config_dir = self.dir.path().join(".config");
            std::fs::create_dir_all(&config_dir).expect("error creating .config");
            std::fs::write(config_dir.join("shardwise.toml"), contents)
                .expect("error writing config file");
        }

        fn run(&self, extra_args: &[&str]) -> Result<String, ExpectedError> {
            let mut args = vec![
                "shardwise",
                "--file",
                self.report.as_str(),
                "--workspace-root",
                self.dir.path().as_str(),
            ];
            args.extend_from_slice(extra_args);
            let app = ShardwiseApp::try_parse_from(args).expect("arguments are valid");

            let mut output_writer = OutputWriter::Test { stdout: Vec::new() };
            let code = app.exec(OutputContext::for_test(false), &mut output_writer)?;
            assert_eq!(code, ShardwiseExitCode::OK);

            let OutputWriter::Test { stdout } = output_writer else {
                unreachable!("output writer is always Test");
            };
            Ok(String::from_utf8(stdout).expect("output is UTF-8"))
        }

        fn run_json(&self, extra_args: &[&str]) -> SplitPlanSummary {
            let out = self.run(extra_args).expect("run succeeds");
            SplitPlanSummary::parse_json(out).expect("output is valid JSON")
        }
    }

    #[test]
    fn default_factor_is_two() {
        let fixture = Fixture::new(REPORT);
        let summary = fixture.run_json(&[]);

        assert_eq!(summary.report_name.as_deref(), Some("nightly"));
        assert_eq!(summary.total_duration_ms, 17_000);
        assert_eq!(summary.coalesce, None);
        assert_eq!(
            summary.filters_by_factor(),
            btreemap! {
                2 => vec![vec!["A.B.C1"], vec!["A.B.C2", "A.D.C3"]],
            }
        );
    }

    #[test]
    fn several_factors_and_coalescing() {
        let fixture = Fixture::new(REPORT);
        let summary = fixture.run_json(&[
            "--parallelization",
            "1",
            "3",
            "--parallelization",
            "3",
            "--max-filters",
            "1",
            "--message-format",
            "json",
        ]);

        let coalesce = summary.coalesce.as_ref().expect("budget was requested");
        assert_eq!(coalesce.budget, 1);
        assert!(coalesce.budget_met);
        assert_eq!(
            summary.filters_by_factor(),
            btreemap! {
                1 => vec![vec!["A"]],
                3 => vec![vec!["A"], vec![], vec![]],
            }
        );
    }

    #[test]
    fn profile_settings_apply() {
        let fixture = Fixture::new(REPORT);
        fixture.write_config(indoc! {r#"
            [profile.ci]
            parallelization = [1]
            max-filters = 2
        "#});

        let summary = fixture.run_json(&["--profile", "ci"]);
        assert_eq!(
            summary.filters_by_factor(),
            btreemap! {
                1 => vec![vec!["A.B", "A.D"]],
            }
        );

        // Command-line factors replace the profile's.
        let summary = fixture.run_json(&["--profile", "ci", "--parallelization", "2"]);
        assert_eq!(summary.factors.keys().copied().collect::<Vec<_>>(), vec![2]);
    }

    #[test]
    fn human_output() {
        let fixture = Fixture::new(REPORT);
        let out = fixture
            .run(&["--message-format", "human"])
            .expect("run succeeds");
        assert_eq!(
            out,
            indoc! {"
                3 filters, 17.000s total (from nightly)
                2 partitions:
                  0 [  10.000s]:
                      A.B.C1
                  1 [   7.000s]:
                      A.B.C2
                      A.D.C3
            "}
        );
    }

    #[test_case("", ShardwiseExitCode::REPORT_READ_FAILED ; "empty report")]
    #[test_case("<TestRun><Results>", ShardwiseExitCode::REPORT_READ_FAILED ; "truncated report")]
    fn bad_reports(contents: &str, expected_code: i32) {
        let fixture = Fixture::new(contents);
        let error = fixture.run(&[]).expect_err("report is invalid");
        assert_eq!(error.process_exit_code(), expected_code);
    }

    #[test]
    fn missing_report() {
        let fixture = Fixture::new(REPORT);
        std::fs::remove_file(&fixture.report).expect("error removing report");
        let error = fixture.run(&[]).expect_err("report is missing");
        assert!(
            matches!(error, ExpectedError::ReportOpenFailed { .. }),
            "unexpected error: {error:?}"
        );
        assert_eq!(
            error.process_exit_code(),
            ShardwiseExitCode::REPORT_READ_FAILED
        );
    }

    #[test]
    fn unknown_profile() {
        let fixture = Fixture::new(REPORT);
        let error = fixture
            .run(&["--profile", "nightly"])
            .expect_err("profile is unknown");
        assert_eq!(error.process_exit_code(), ShardwiseExitCode::SETUP_ERROR);
    }

    #[test_case(&["--parallelization", "0"] ; "zero factor")]
    #[test_case(&["--max-filters", "0"] ; "zero max filters")]
    #[test_case(&["--parallelization"] ; "missing factor")]
    fn invalid_arguments(args: &[&str]) {
        let mut all_args = vec!["shardwise", "--file", "results.trx"];
        all_args.extend_from_slice(args);
        ShardwiseApp::try_parse_from(all_args).expect_err("arguments are invalid");
    }

    #[test]
    fn file_is_required() {
        ShardwiseApp::try_parse_from(["shardwise"]).expect_err("--file is required");
    }

    #[test]
    fn verify_app() {
        use clap::CommandFactory;
        ShardwiseApp::command().debug_assert();
    }
}
