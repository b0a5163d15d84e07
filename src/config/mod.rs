use regex::Regex;
use serde::Deserialize;
use std::path::{Path, PathBuf};
use thiserror::Error;

pub const DEFAULT_SUB_EXT: &str = "srt";
pub const DEFAULT_VID_EXT: &str = "mkv";
pub const DEFAULT_SUB_REGEX: &str = "x([0-9]+)";
pub const DEFAULT_VID_REGEX: &str = "E([0-9]+)";
pub const DEFAULT_SUB_PATH: &str = "./subs";
pub const DEFAULT_VID_PATH: &str = ".";

/// Settings as given on the command line or in a config file. Unset values fall back to the next
/// layer, and finally to the built-in defaults.
#[derive(Debug, Default, Deserialize, PartialEq)]
#[serde(deny_unknown_fields)]
pub struct RawConfig {
    pub subext: Option<String>,
    pub vidext: Option<String>,
    pub subregex: Option<String>,
    pub vidregex: Option<String>,
    pub subpath: Option<PathBuf>,
    pub vidpath: Option<PathBuf>,
    pub write: Option<bool>,
}

impl RawConfig {
    /// Fills any values unset in `self` from `fallback`.
    pub fn or(self, fallback: RawConfig) -> RawConfig {
        RawConfig {
            subext: self.subext.or(fallback.subext),
            vidext: self.vidext.or(fallback.vidext),
            subregex: self.subregex.or(fallback.subregex),
            vidregex: self.vidregex.or(fallback.vidregex),
            subpath: self.subpath.or(fallback.subpath),
            vidpath: self.vidpath.or(fallback.vidpath),
            write: self.write.or(fallback.write),
        }
    }
}

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Regex pattern for subtitle and videos required. Aborting.")]
    MissingRegex,
    #[error("invalid {kind} regex {pattern:?}: {source}")]
    InvalidRegex {
        kind: &'static str,
        pattern: String,
        source: regex::Error,
    },
    #[error("failed to read config file {}: {source}", .path.display())]
    Read {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("config file {} contains invalid toml: {source}", .path.display())]
    Parse {
        path: PathBuf,
        source: toml::de::Error,
    },
}

pub fn load_file(path: &Path) -> Result<RawConfig, ConfigError> {
    let contents = std::fs::read_to_string(path).map_err(|source| ConfigError::Read {
        path: path.to_path_buf(),
        source,
    })?;
    toml::from_str(&contents).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })
}

/// Settings for a single run. Built once at startup and only read afterwards.
#[derive(Debug)]
pub struct Config {
    pub sub_ext: String,
    pub vid_ext: String,
    pub sub_regex: Regex,
    pub vid_regex: Regex,
    pub sub_path: PathBuf,
    pub vid_path: PathBuf,
    pub write: bool,
}

impl TryFrom<RawConfig> for Config {
    type Error = ConfigError;

    fn try_from(raw: RawConfig) -> Result<Self, Self::Error> {
        let sub_pattern = raw
            .subregex
            .unwrap_or_else(|| DEFAULT_SUB_REGEX.to_owned());
        let vid_pattern = raw
            .vidregex
            .unwrap_or_else(|| DEFAULT_VID_REGEX.to_owned());
        if sub_pattern.is_empty() || vid_pattern.is_empty() {
            return Err(ConfigError::MissingRegex);
        }

        Ok(Config {
            sub_ext: raw.subext.unwrap_or_else(|| DEFAULT_SUB_EXT.to_owned()),
            vid_ext: raw.vidext.unwrap_or_else(|| DEFAULT_VID_EXT.to_owned()),
            sub_regex: compile("subtitle", sub_pattern)?,
            vid_regex: compile("video", vid_pattern)?,
            sub_path: raw.subpath.unwrap_or_else(|| DEFAULT_SUB_PATH.into()),
            vid_path: raw.vidpath.unwrap_or_else(|| DEFAULT_VID_PATH.into()),
            write: raw.write.unwrap_or(false),
        })
    }
}

fn compile(kind: &'static str, pattern: String) -> Result<Regex, ConfigError> {
    Regex::new(&pattern).map_err(|source| ConfigError::InvalidRegex {
        kind,
        pattern,
        source,
    })
}
