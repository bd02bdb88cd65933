//! Configuration management for textfmt
//!
//! textfmt reads its defaults from ~/.textfmt/config.toml

use anyhow::{Context, Result};
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fs;
use std::path::{Path, PathBuf};

use crate::format::{Encoding, FormatInfo, LineEnding};
use crate::processor::DEFAULT_EXCLUDE;
use crate::transform::DEFAULT_BUFFER_SIZE;

/// Smallest accepted `scan.buffer_size`.
pub const MIN_BUFFER_SIZE: usize = 64;
/// Largest accepted `scan.buffer_size`.
pub const MAX_BUFFER_SIZE: usize = 16 * 1024 * 1024;

/// textfmt configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Config {
    /// Default conversion target
    #[serde(default)]
    pub target: TargetConfig,

    /// Directory walk and I/O settings
    #[serde(default)]
    pub scan: ScanConfig,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingConfig,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct TargetConfig {
    /// Target encoding name (e.g. "UTF-8", "SJIS")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub encoding: Option<String>,

    /// Target line ending name (e.g. "LF", "CRLF")
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub eol: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ScanConfig {
    /// Exclude pattern for directory walks
    #[serde(default = "default_exclude")]
    pub exclude: String,

    /// Read buffer size in bytes
    #[serde(default = "default_buffer_size")]
    pub buffer_size: usize,
}

impl Default for ScanConfig {
    fn default() -> Self {
        Self {
            exclude: default_exclude(),
            buffer_size: default_buffer_size(),
        }
    }
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log at debug level
    #[serde(default)]
    pub debug: bool,

    /// Write log output to this file instead of stderr
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub file: Option<PathBuf>,
}

// Default functions for serde
fn default_exclude() -> String {
    DEFAULT_EXCLUDE.to_string()
}
fn default_buffer_size() -> usize {
    DEFAULT_BUFFER_SIZE
}

impl Config {
    /// The configured conversion target. Unset fields keep the source format.
    pub fn target_format(&self) -> Result<FormatInfo> {
        let encoding = match &self.target.encoding {
            Some(name) => name
                .parse::<Encoding>()
                .map_err(|e| anyhow::anyhow!("Invalid target.encoding: {e}"))?,
            None => Encoding::default(),
        };
        let eol = match &self.target.eol {
            Some(name) => name
                .parse::<LineEnding>()
                .map_err(|e| anyhow::anyhow!("Invalid target.eol: {e}"))?,
            None => LineEnding::default(),
        };
        Ok(FormatInfo::new(encoding, eol))
    }

    /// The compiled exclude pattern, `None` when the pattern is empty.
    pub fn exclude_regex(&self) -> Result<Option<Regex>> {
        if self.scan.exclude.is_empty() {
            return Ok(None);
        }
        Regex::new(&self.scan.exclude)
            .map(Some)
            .with_context(|| format!("Invalid scan.exclude pattern: {}", self.scan.exclude))
    }

    pub fn to_toml(&self) -> Result<String> {
        toml::to_string_pretty(self).context("Failed to serialize config")
    }
}

/// Get the default configuration file path
pub fn config_file_path() -> Result<PathBuf> {
    let home_dir =
        dirs::home_dir().ok_or_else(|| anyhow::anyhow!("Cannot determine home directory"))?;
    Ok(home_dir.join(".textfmt").join("config.toml"))
}

/// Get the default configuration file content with comments
fn get_default_config_content() -> &'static str {
    r#"# textfmt Configuration File
#
# Values set here are defaults; command-line flags override them.

[target]
# Target encoding: UTF8, EUC, JIS or CP932 (default: keep the source encoding)
#encoding = "UTF-8"

# Target line ending: LF, CRLF or CR (default: keep the source line endings)
#eol = "LF"

[scan]
# Paths matching this regex are skipped when walking directories.
# Set to "" to walk everything.
exclude = '\.git$|\.svn$|\.hg$|\.o$|\.obj$|\.exe$'

# Read buffer size in bytes (64 to 16777216, default: 8192)
buffer_size = 8192

[logging]
# Log at debug level (default: false)
debug = false

# Write logs to a file instead of stderr (optional)
#file = "/tmp/textfmt.log"
"#
}

/// Write the commented default configuration file.
///
/// Refuses to overwrite an existing file. Returns the path written.
pub fn save_default_config(path: Option<&Path>) -> Result<PathBuf> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => config_file_path()?,
    };
    if config_path.exists() {
        anyhow::bail!("Config file already exists: {}", config_path.display());
    }

    if let Some(parent) = config_path.parent() {
        fs::create_dir_all(parent).with_context(|| {
            format!("Failed to create config directory: {}", parent.display())
        })?;
    }
    fs::write(&config_path, get_default_config_content()).with_context(|| {
        format!(
            "Failed to write default config file: {}",
            config_path.display()
        )
    })?;

    Ok(config_path)
}

/// Load configuration.
///
/// With an explicit `path` the file must exist. Otherwise the default location
/// is used and a missing file means built-in defaults.
pub fn load_config(path: Option<&Path>) -> Result<Config> {
    let config_path = match path {
        Some(path) => path.to_path_buf(),
        None => match config_file_path() {
            Ok(path) if path.exists() => path,
            _ => return Ok(Config::default()),
        },
    };

    let config_str = fs::read_to_string(&config_path)
        .with_context(|| format!("Failed to read config file: {}", config_path.display()))?;
    parse_config(&config_str)
        .with_context(|| format!("Failed to parse config file: {}", config_path.display()))
}

fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Validate configuration values
pub fn validate_config(config: &Config) -> Result<()> {
    config.target_format()?;
    config.exclude_regex()?;

    let size = config.scan.buffer_size;
    if !(MIN_BUFFER_SIZE..=MAX_BUFFER_SIZE).contains(&size) {
        anyhow::bail!(
            "Invalid buffer_size: {} (must be {}-{})",
            size,
            MIN_BUFFER_SIZE,
            MAX_BUFFER_SIZE
        );
    }

    Ok(())
}
