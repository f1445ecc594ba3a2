//! Layered settings for the command-line tool.
//!
//! Sources, later ones winning:
//!
//! 1. compiled defaults ([`Settings::default`])
//! 2. a TOML file: `--config <FILE>`, or `refpoint-ap.toml` in the working
//!    directory when present
//! 3. environment variables prefixed `REFPOINT_AP_`
//! 4. explicit command-line flags (applied by the binary)
//!
//! ```toml
//! [ap]
//! quantile = 0.05
//! damping = 0.5
//! max_iterations = 2000
//! flag_policy = "recompute"
//!
//! [output]
//! output_dir = "clusters"
//! format = "xy"
//! file_prefix = "floor3_"
//! ```
//!
//! Unlike the library, whose runs are uncapped by default, the tool stops
//! after [`DEFAULT_MAX_ITERATIONS`] unless told otherwise, so a survey
//! that oscillates ends in an error instead of a hang.
//!
//! Environment keys map onto the tables: `REFPOINT_AP_DAMPING` sets
//! `ap.damping`, `REFPOINT_AP_FORMAT` sets `output.format`, and a double
//! underscore names a table explicitly (`REFPOINT_AP_OUTPUT__OUTPUT_DIR`).

use std::path::{Path, PathBuf};

use figment::{
    providers::{Env, Format, Serialized, Toml},
    Figment,
};
use serde::{Deserialize, Serialize};

use crate::io::OutputFormat;
use crate::propagation::ApConfig;

/// Default TOML file looked up in the working directory.
pub const DEFAULT_CONFIG_FILE: &str = "refpoint-ap.toml";

/// Prefix of environment overrides.
pub const ENV_PREFIX: &str = "REFPOINT_AP_";

/// Iteration cap the command-line tool applies when none is configured.
pub const DEFAULT_MAX_ITERATIONS: usize = 10_000;

const OUTPUT_KEYS: [&str; 3] = ["output_dir", "format", "file_prefix"];

/// Everything the command-line tool can be configured with.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Settings {
    /// Clustering parameters.
    pub ap: ApConfig,
    /// Where and how clusters are written.
    pub output: OutputSettings,
}

/// Output options.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct OutputSettings {
    /// Directory receiving the cluster files.
    pub output_dir: PathBuf,
    /// File layout.
    pub format: OutputFormat,
    /// File name prefix. `None` uses the format's conventional prefix.
    pub file_prefix: Option<String>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            ap: ApConfig::default().with_max_iterations(Some(DEFAULT_MAX_ITERATIONS)),
            output: OutputSettings::default(),
        }
    }
}

impl Default for OutputSettings {
    fn default() -> Self {
        Self { output_dir: PathBuf::from("."), format: OutputFormat::default(), file_prefix: None }
    }
}

impl Settings {
    /// The provider stack without extraction: defaults, then the TOML file,
    /// then the environment.
    pub fn figment(config_path: Option<&Path>) -> Figment {
        let file = config_path.map_or_else(|| PathBuf::from(DEFAULT_CONFIG_FILE), Path::to_path_buf);
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::file(file))
            .merge(Env::prefixed(ENV_PREFIX).map(|key| env_key(key.as_str()).into()))
    }

    /// Load settings from every source.
    ///
    /// A missing TOML file is not an error; a present but invalid one is.
    pub fn load(config_path: Option<&Path>) -> Result<Self, Box<figment::Error>> {
        Self::figment(config_path).extract().map_err(Box::new)
    }
}

/// Map an environment key (prefix already stripped) to a settings path.
fn env_key(key: &str) -> String {
    let key = key.to_lowercase();
    if key.contains("__") {
        key.replace("__", ".")
    } else if OUTPUT_KEYS.contains(&key.as_str()) {
        format!("output.{key}")
    } else {
        format!("ap.{key}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cluster::Grouping;
    use crate::exemplar::ExemplarFlagPolicy;

    fn with_toml(toml: &str) -> Settings {
        Figment::new()
            .merge(Serialized::defaults(Settings::default()))
            .merge(Toml::string(toml))
            .extract()
            .unwrap()
    }

    #[test]
    fn test_defaults_match_core_defaults() {
        let s = Settings::default();
        assert_eq!(s.ap, ApConfig::default().with_max_iterations(Some(DEFAULT_MAX_ITERATIONS)));
        assert_eq!(ApConfig::default().max_iterations, None);
        assert_eq!(s.output.format, OutputFormat::Record);
        assert_eq!(s.output.output_dir, PathBuf::from("."));
    }

    #[test]
    fn test_toml_overrides_only_named_keys() {
        let s = with_toml(
            r#"
[ap]
quantile = 0.05
max_iterations = 500
flag_policy = "recompute"
grouping = "by_index"

[output]
format = "xy"
file_prefix = "floor3_"
"#,
        );
        assert_eq!(s.ap.quantile, 0.05);
        assert_eq!(s.ap.max_iterations, Some(500));
        assert_eq!(s.ap.flag_policy, ExemplarFlagPolicy::Recompute);
        assert_eq!(s.ap.grouping, Grouping::ByIndex);
        assert_eq!(s.ap.gamma, ApConfig::default().gamma);
        assert_eq!(s.output.format, OutputFormat::Xy);
        assert_eq!(s.output.file_prefix.as_deref(), Some("floor3_"));
    }

    #[test]
    fn test_missing_file_falls_back_to_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let absent = dir.path().join("absent.toml");
        let figment = Settings::figment(Some(absent.as_path()));
        let s: Settings = figment.extract().unwrap();
        assert_eq!(s.output, OutputSettings::default());
    }

    #[test]
    fn test_iteration_cap_survives_partial_ap_table() {
        let s = with_toml("[ap]\ndamping = 0.7\n");
        assert_eq!(s.ap.damping, 0.7);
        assert_eq!(s.ap.max_iterations, Some(DEFAULT_MAX_ITERATIONS));
        assert!(s.ap.validate().is_ok());
    }

    #[test]
    fn test_env_keys_land_in_their_tables() {
        assert_eq!(env_key("DAMPING"), "ap.damping");
        assert_eq!(env_key("MAX_ITERATIONS"), "ap.max_iterations");
        assert_eq!(env_key("FORMAT"), "output.format");
        assert_eq!(env_key("OUTPUT_DIR"), "output.output_dir");
        assert_eq!(env_key("OUTPUT__FILE_PREFIX"), "output.file_prefix");
    }
}
