// Copyright (c) The shardwise Contributors
// SPDX-License-Identifier: MIT OR Apache-2.0

//! Configuration support for shardwise.
//!
//! Configuration is layered: the embedded [`ShardwiseConfig::DEFAULT_CONFIG`] comes first, and a
//! repository's `.config/shardwise.toml` (or an explicitly passed file) is merged on top. Settings
//! are grouped into named profiles. Profiles other than `default` inherit any setting they don't
//! specify from `default`.

use crate::{
    errors::{ConfigParseError, ConfigParseErrorKind, DisplayUnknownKeys, ProfileNotFound},
    normalize::KeyNormalizer,
};
use camino::{Utf8Path, Utf8PathBuf};
use config::{Config, ConfigBuilder, File, FileFormat, builder::DefaultState};
use serde::Deserialize;
use std::{
    collections::{BTreeMap, BTreeSet},
    num::NonZeroUsize,
};
use tracing::warn;

/// Trait for handling configuration warnings.
pub trait ConfigWarnings {
    /// Handle unknown configuration keys found in a config file.
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>);
}

/// Default implementation of [`ConfigWarnings`] that logs warnings using the `tracing` crate.
#[derive(Clone, Copy, Debug, Default)]
pub struct DefaultConfigWarnings;

impl ConfigWarnings for DefaultConfigWarnings {
    fn unknown_config_keys(&mut self, config_file: &Utf8Path, unknown: &BTreeSet<String>) {
        warn!(
            "in config file {config_file}, ignoring unknown configuration keys: {}",
            DisplayUnknownKeys(unknown),
        );
    }
}

/// Overall configuration for shardwise.
///
/// This is the root data structure for shardwise configuration. Use [`profile`](Self::profile) to
/// look up the settings for a profile.
#[derive(Clone, Debug)]
pub struct ShardwiseConfig {
    config_file: Utf8PathBuf,
    profiles: BTreeMap<String, ShardwiseProfile>,
}

impl ShardwiseConfig {
    /// The default location of the config within the workspace: `.config/shardwise.toml`.
    pub const CONFIG_PATH: &'static str = ".config/shardwise.toml";

    /// Contains the default config as a TOML file.
    ///
    /// Repository-specific configuration is layered on top of the default config.
    pub const DEFAULT_CONFIG: &'static str = include_str!("../default-config.toml");

    /// The name of the default profile.
    pub const DEFAULT_PROFILE: &'static str = "default";

    /// Reads the config from the given file, or if not specified from `.config/shardwise.toml` in
    /// the workspace root.
    ///
    /// If no config file is specified and the workspace root doesn't have
    /// `.config/shardwise.toml`, uses the default config options.
    pub fn from_sources(
        workspace_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
    ) -> Result<Self, ConfigParseError> {
        Self::from_sources_with_warnings(workspace_root, config_file, &mut DefaultConfigWarnings)
    }

    /// Load configuration from the given sources with custom warning handling.
    pub fn from_sources_with_warnings(
        workspace_root: &Utf8Path,
        config_file: Option<&Utf8Path>,
        warnings: &mut impl ConfigWarnings,
    ) -> Result<Self, ConfigParseError> {
        let (config_file, source) = match config_file {
            Some(file) => (file.to_owned(), File::new(file.as_str(), FileFormat::Toml)),
            None => {
                let config_file = workspace_root.join(Self::CONFIG_PATH);
                let source = File::new(config_file.as_str(), FileFormat::Toml).required(false);
                (config_file, source)
            }
        };

        let builder = Self::make_default_config().add_source(source);
        let (deserialized, unknown) = Self::build_and_deserialize_config(&builder)
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        if !unknown.is_empty() {
            warnings.unknown_config_keys(&config_file, &unknown);
        }

        let profiles = deserialized
            .resolve_profiles()
            .map_err(|kind| ConfigParseError::new(&config_file, kind))?;

        Ok(Self {
            config_file,
            profiles,
        })
    }

    /// Returns the default config, without reading any files.
    pub fn default_config() -> Self {
        let (deserialized, _) = Self::build_and_deserialize_config(&Self::make_default_config())
            .expect("default config is always valid");
        let profiles = deserialized
            .resolve_profiles()
            .expect("default config is always valid");
        Self {
            config_file: Utf8PathBuf::from(Self::CONFIG_PATH),
            profiles,
        }
    }

    /// Returns the config file that was read, or would have been read if it existed.
    pub fn config_file(&self) -> &Utf8Path {
        &self.config_file
    }

    /// Returns the names of all known profiles, in sorted order.
    pub fn profile_names(&self) -> impl Iterator<Item = &str> + '_ {
        self.profiles.keys().map(String::as_str)
    }

    /// Returns the profile with the given name.
    pub fn profile(&self, name: &str) -> Result<&ShardwiseProfile, ProfileNotFound> {
        self.profiles
            .get(name)
            .ok_or_else(|| ProfileNotFound::new(name, self.profiles.keys()))
    }

    fn make_default_config() -> ConfigBuilder<DefaultState> {
        Config::builder().add_source(File::from_str(Self::DEFAULT_CONFIG, FileFormat::Toml))
    }

    fn build_and_deserialize_config(
        builder: &ConfigBuilder<DefaultState>,
    ) -> Result<(ShardwiseConfigDeserialize, BTreeSet<String>), ConfigParseErrorKind> {
        let config = builder
            .build_cloned()
            .map_err(|error| ConfigParseErrorKind::BuildError(Box::new(error)))?;

        let mut ignored = BTreeSet::new();
        let config: ShardwiseConfigDeserialize =
            serde_ignored::deserialize(config, |path: serde_ignored::Path| {
                ignored.insert(path.to_string());
            })
            .map_err(|error| ConfigParseErrorKind::DeserializeError(Box::new(error)))?;

        Ok((config, ignored))
    }
}

/// The settings for a single profile, with defaults applied.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ShardwiseProfile {
    name: String,
    parallelization: Vec<NonZeroUsize>,
    max_filters: Option<NonZeroUsize>,
    normalizer: KeyNormalizer,
}

impl ShardwiseProfile {
    /// The parallelization factor used if neither the profile nor the command line specify any.
    pub const DEFAULT_FACTOR: NonZeroUsize = NonZeroUsize::MIN.saturating_add(1);

    #[cfg(test)]
    fn builtin(name: &str) -> Self {
        Self {
            name: name.to_owned(),
            parallelization: vec![Self::DEFAULT_FACTOR],
            max_filters: None,
            normalizer: KeyNormalizer::default(),
        }
    }

    /// Returns the name of the profile.
    pub fn name(&self) -> &str {
        &self.name
    }

    /// Returns the parallelization factors, sorted and deduplicated.
    pub fn parallelization(&self) -> &[NonZeroUsize] {
        &self.parallelization
    }

    /// Returns the maximum number of filters per partition, if set.
    pub fn max_filters(&self) -> Option<NonZeroUsize> {
        self.max_filters
    }

    /// Returns the key normalizer for the configured separators.
    pub fn normalizer(&self) -> &KeyNormalizer {
        &self.normalizer
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ShardwiseConfigDeserialize {
    #[serde(default)]
    profile: BTreeMap<String, ProfileDeserialize>,
}

impl ShardwiseConfigDeserialize {
    fn resolve_profiles(
        self,
    ) -> Result<BTreeMap<String, ShardwiseProfile>, ConfigParseErrorKind> {
        let default = self
            .profile
            .get(ShardwiseConfig::DEFAULT_PROFILE)
            .cloned()
            .unwrap_or_default();

        self.profile
            .into_iter()
            .map(|(name, profile)| {
                let resolved = profile.resolve(&name, &default)?;
                Ok((name, resolved))
            })
            .collect()
    }
}

#[derive(Clone, Debug, Default, Deserialize)]
#[serde(rename_all = "kebab-case")]
struct ProfileDeserialize {
    #[serde(default)]
    parallelization: Option<Vec<usize>>,
    #[serde(default)]
    max_filters: Option<usize>,
    #[serde(default)]
    separators: Option<String>,
}

impl ProfileDeserialize {
    fn resolve(
        self,
        name: &str,
        default: &ProfileDeserialize,
    ) -> Result<ShardwiseProfile, ConfigParseErrorKind> {
        let parallelization = self
            .parallelization
            .or_else(|| default.parallelization.clone())
            .unwrap_or_default();
        let mut factors = parallelization
            .into_iter()
            .map(|factor| {
                NonZeroUsize::new(factor).ok_or_else(|| ConfigParseErrorKind::ZeroFactor {
                    profile: name.to_owned(),
                })
            })
            .collect::<Result<Vec<_>, _>>()?;
        factors.sort_unstable();
        factors.dedup();

        let max_filters = self
            .max_filters
            .or(default.max_filters)
            .map(|max_filters| {
                NonZeroUsize::new(max_filters).ok_or_else(|| {
                    ConfigParseErrorKind::ZeroMaxFilters {
                        profile: name.to_owned(),
                    }
                })
            })
            .transpose()?;

        let normalizer = match self.separators.as_deref().or(default.separators.as_deref()) {
            Some(separators) => KeyNormalizer::new(separators).map_err(|err| {
                ConfigParseErrorKind::InvalidSeparators {
                    profile: name.to_owned(),
                    err,
                }
            })?,
            None => KeyNormalizer::default(),
        };

        Ok(ShardwiseProfile {
            name: name.to_owned(),
            parallelization: factors,
            max_filters,
            normalizer,
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use camino_tempfile::{Utf8TempDir, tempdir};
    use indoc::indoc;
    use pretty_assertions::assert_eq;

    #[derive(Default)]
    struct RecordingWarnings {
        unknown: Vec<String>,
    }

    impl ConfigWarnings for RecordingWarnings {
        fn unknown_config_keys(&mut self, _config_file: &Utf8Path, unknown: &BTreeSet<String>) {
            self.unknown.extend(unknown.iter().cloned());
        }
    }

    fn temp_workspace(config_contents: &str) -> Utf8TempDir {
        let temp_dir = tempdir().expect("error creating temp dir");
        let config_dir = temp_dir.path().join(".config");
        std::fs::create_dir_all(&config_dir).expect("error creating .config");
        std::fs::write(config_dir.join("shardwise.toml"), config_contents)
            .expect("error writing config file");
        temp_dir
    }

    fn factors(profile: &ShardwiseProfile) -> Vec<usize> {
        profile
            .parallelization()
            .iter()
            .map(|factor| factor.get())
            .collect()
    }

    #[test]
    fn missing_config_file_uses_defaults() {
        let temp_dir = tempdir().expect("error creating temp dir");
        let config =
            ShardwiseConfig::from_sources(temp_dir.path(), None).expect("default config is valid");

        let profile = config
            .profile(ShardwiseConfig::DEFAULT_PROFILE)
            .expect("default profile exists");
        assert_eq!(factors(profile), vec![2]);
        assert_eq!(profile.max_filters(), None);
        assert_eq!(profile.normalizer(), &KeyNormalizer::default());
        assert_eq!(
            config.config_file(),
            temp_dir.path().join(ShardwiseConfig::CONFIG_PATH)
        );
    }

    #[test]
    fn default_config_matches_embedded_file() {
        let config = ShardwiseConfig::default_config();
        let profile = config
            .profile(ShardwiseConfig::DEFAULT_PROFILE)
            .expect("default profile exists");
        assert_eq!(profile, &ShardwiseProfile::builtin(ShardwiseConfig::DEFAULT_PROFILE));
    }

    #[test]
    fn custom_profile_inherits_from_default() {
        let temp_dir = temp_workspace(indoc! {r#"
            [profile.default]
            max-filters = 20

            [profile.ci]
            parallelization = [8, 4, 4]
            separators = ".+"
        "#});

        let config =
            ShardwiseConfig::from_sources(temp_dir.path(), None).expect("config is valid");
        assert_eq!(config.profile_names().collect::<Vec<_>>(), vec!["ci", "default"]);

        let default = config.profile("default").expect("default profile exists");
        assert_eq!(factors(default), vec![2]);
        assert_eq!(default.max_filters(), NonZeroUsize::new(20));

        let ci = config.profile("ci").expect("ci profile exists");
        assert_eq!(factors(ci), vec![4, 8]);
        assert_eq!(ci.max_filters(), NonZeroUsize::new(20));
        assert_eq!(ci.normalizer().separators(), &['+', '.']);
    }

    #[test]
    fn explicit_config_file() {
        let temp_dir = tempdir().expect("error creating temp dir");
        let config_file = temp_dir.path().join("custom.toml");
        std::fs::write(&config_file, "[profile.default]\nparallelization = [3]\n")
            .expect("error writing config file");

        let config = ShardwiseConfig::from_sources(temp_dir.path(), Some(&config_file))
            .expect("config is valid");
        assert_eq!(config.config_file(), config_file);
        let profile = config.profile("default").expect("default profile exists");
        assert_eq!(factors(profile), vec![3]);
    }

    #[test]
    fn unknown_keys_are_reported() {
        let temp_dir = temp_workspace(indoc! {r#"
            [profile.default]
            parallelisation = [3]

            [store]
            dir = "target"
        "#});

        let mut warnings = RecordingWarnings::default();
        ShardwiseConfig::from_sources_with_warnings(temp_dir.path(), None, &mut warnings)
            .expect("config is valid");
        assert_eq!(
            warnings.unknown,
            vec![
                "profile.default.parallelisation".to_owned(),
                "store".to_owned(),
            ]
        );
    }

    #[test]
    fn unknown_profile() {
        let config = ShardwiseConfig::default_config();
        let error = config.profile("nightly").expect_err("profile does not exist");
        assert_eq!(
            error.to_string(),
            "profile `nightly` not found (known profiles: default)"
        );
    }

    #[test]
    fn invalid_values() {
        let temp_dir = temp_workspace(indoc! {r#"
            [profile.default]
            parallelization = [2, 0]
        "#});
        let error = ShardwiseConfig::from_sources(temp_dir.path(), None)
            .expect_err("zero factor is invalid");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::ZeroFactor { profile } if profile == "default"),
            "unexpected error: {error:?}",
        );

        let temp_dir = temp_workspace(indoc! {r#"
            [profile.ci]
            max-filters = 0
        "#});
        let error = ShardwiseConfig::from_sources(temp_dir.path(), None)
            .expect_err("zero max-filters is invalid");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::ZeroMaxFilters { profile } if profile == "ci"),
            "unexpected error: {error:?}",
        );

        let temp_dir = temp_workspace(indoc! {r#"
            [profile.default]
            separators = ""
        "#});
        let error = ShardwiseConfig::from_sources(temp_dir.path(), None)
            .expect_err("empty separators are invalid");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::InvalidSeparators { .. }),
            "unexpected error: {error:?}",
        );
    }

    #[test]
    fn malformed_toml() {
        let temp_dir = temp_workspace("[profile.default\n");
        let error =
            ShardwiseConfig::from_sources(temp_dir.path(), None).expect_err("TOML is malformed");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::BuildError(_)),
            "unexpected error: {error:?}",
        );
    }

    #[test]
    fn wrong_type() {
        let temp_dir = temp_workspace(indoc! {r#"
            [profile.default]
            parallelization = "many"
        "#});
        let error =
            ShardwiseConfig::from_sources(temp_dir.path(), None).expect_err("type is wrong");
        assert!(
            matches!(error.kind(), ConfigParseErrorKind::DeserializeError(_)),
            "unexpected error: {error:?}",
        );
    }
}
