//! INI configuration file.
//!
//! ```ini
//! [location]
//! high_accuracy = true
//! timeout_ms = 10000
//! maximum_age_ms = 300000
//!
//! [search]
//! quiet_period_ms = 300
//!
//! [logging]
//! level = info
//! directory = /var/log/storefinder
//! ```
//!
//! Every key is optional; missing keys keep their defaults and unknown keys
//! are ignored.

use std::path::{Path, PathBuf};
use std::time::Duration;

use ini::Ini;
use thiserror::Error;
use tracing::{debug, info};

use crate::logging::LoggingConfig;
use crate::position::{PositionOptions, DEFAULT_HIGH_ACCURACY, DEFAULT_MAXIMUM_AGE, DEFAULT_TIMEOUT};
use crate::stabilizer::DEFAULT_QUIET_PERIOD;

/// Directory under the platform config dir.
pub const CONFIG_DIR_NAME: &str = "storefinder";

/// Config file name.
pub const CONFIG_FILE_NAME: &str = "config.ini";

const SECTION_LOCATION: &str = "location";
const SECTION_SEARCH: &str = "search";
const SECTION_LOGGING: &str = "logging";

/// Errors loading or saving configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// Reading or writing the file failed.
    #[error("Config I/O error at {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// The file is not valid INI.
    #[error("Config parse error: {0}")]
    Parse(#[from] ini::ParseError),

    /// A key holds a value of the wrong shape.
    #[error("Invalid value {value:?} for [{section}] {key}: {reason}")]
    InvalidValue {
        section: String,
        key: String,
        value: String,
        reason: String,
    },

    /// No platform config directory could be determined.
    #[error("No config directory available on this platform")]
    NoConfigDir,
}

/// `[location]`: options for every position acquisition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct LocationSection {
    /// `high_accuracy`: prefer a precise fix over a fast one.
    pub high_accuracy: bool,
    /// `timeout_ms`: how long the sensor may take.
    pub timeout: Duration,
    /// `maximum_age_ms`: oldest cached fix accepted.
    pub maximum_age: Duration,
}

impl Default for LocationSection {
    fn default() -> Self {
        Self {
            high_accuracy: DEFAULT_HIGH_ACCURACY,
            timeout: DEFAULT_TIMEOUT,
            maximum_age: DEFAULT_MAXIMUM_AGE,
        }
    }
}

impl LocationSection {
    /// Options to hand to the tracker.
    pub fn position_options(&self) -> PositionOptions {
        PositionOptions::default()
            .with_high_accuracy(self.high_accuracy)
            .with_timeout(self.timeout)
            .with_maximum_age(self.maximum_age)
    }
}

/// `[search]`: search box debouncing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct SearchSection {
    /// `quiet_period_ms`: idle time before a query is searched.
    pub quiet_period: Duration,
}

impl Default for SearchSection {
    fn default() -> Self {
        Self {
            quiet_period: DEFAULT_QUIET_PERIOD,
        }
    }
}

impl SearchSection {
    /// Quiet period for the query stabilizer.
    pub fn quiet_period(&self) -> Duration {
        self.quiet_period
    }
}

/// Complete configuration.
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct StorefinderConfig {
    /// `[location]` section.
    pub location: LocationSection,
    /// `[search]` section.
    pub search: SearchSection,
    /// `[logging]` section.
    pub logging: LoggingConfig,
}

impl StorefinderConfig {
    /// Set the `[location]` section.
    pub fn with_location(mut self, location: LocationSection) -> Self {
        self.location = location;
        self
    }

    /// Set the search quiet period.
    pub fn with_quiet_period(mut self, quiet_period: Duration) -> Self {
        self.search.quiet_period = quiet_period;
        self
    }

    /// Set the `[logging]` section.
    pub fn with_logging(mut self, logging: LoggingConfig) -> Self {
        self.logging = logging;
        self
    }

    /// `<config dir>/storefinder/config.ini`.
    pub fn default_path() -> Result<PathBuf, ConfigError> {
        dirs::config_dir()
            .map(|dir| dir.join(CONFIG_DIR_NAME).join(CONFIG_FILE_NAME))
            .ok_or(ConfigError::NoConfigDir)
    }

    /// Load from `path`. The file must exist.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        let config = Self::from_ini_str(&content)?;
        debug!(path = %path.display(), "Loaded configuration");
        Ok(config)
    }

    /// Load from the default path, falling back to defaults when the file
    /// does not exist.
    pub fn load_default() -> Result<Self, ConfigError> {
        let path = Self::default_path()?;
        if !path.exists() {
            info!(path = %path.display(), "No config file, using defaults");
            return Ok(Self::default());
        }
        Self::load(&path)
    }

    /// Parse INI text.
    pub fn from_ini_str(content: &str) -> Result<Self, ConfigError> {
        let ini = Ini::load_from_str(content)?;
        let mut config = Self::default();

        if let Some(section) = ini.section(Some(SECTION_LOCATION)) {
            if let Some(value) = section.get("high_accuracy") {
                config.location.high_accuracy =
                    parse_bool(SECTION_LOCATION, "high_accuracy", value)?;
            }
            if let Some(value) = section.get("timeout_ms") {
                config.location.timeout = parse_millis(SECTION_LOCATION, "timeout_ms", value)?;
            }
            if let Some(value) = section.get("maximum_age_ms") {
                config.location.maximum_age =
                    parse_millis(SECTION_LOCATION, "maximum_age_ms", value)?;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_SEARCH)) {
            if let Some(value) = section.get("quiet_period_ms") {
                config.search.quiet_period =
                    parse_millis(SECTION_SEARCH, "quiet_period_ms", value)?;
            }
        }

        if let Some(section) = ini.section(Some(SECTION_LOGGING)) {
            if let Some(value) = section.get("level") {
                let value = value.trim();
                if value.is_empty() {
                    return Err(invalid(SECTION_LOGGING, "level", value, "must not be empty"));
                }
                config.logging.level = value.to_string();
            }
            if let Some(value) = section.get("directory") {
                let value = value.trim();
                config.logging.directory = (!value.is_empty()).then(|| PathBuf::from(value));
            }
        }

        Ok(config)
    }

    /// Render as INI text.
    pub fn to_ini(&self) -> Ini {
        let mut ini = Ini::new();
        ini.with_section(Some(SECTION_LOCATION))
            .set("high_accuracy", self.location.high_accuracy.to_string())
            .set("timeout_ms", self.location.timeout.as_millis().to_string())
            .set(
                "maximum_age_ms",
                self.location.maximum_age.as_millis().to_string(),
            );
        ini.with_section(Some(SECTION_SEARCH)).set(
            "quiet_period_ms",
            self.search.quiet_period.as_millis().to_string(),
        );
        ini.with_section(Some(SECTION_LOGGING))
            .set("level", self.logging.level.clone());
        if let Some(directory) = &self.logging.directory {
            ini.with_section(Some(SECTION_LOGGING))
                .set("directory", directory.display().to_string());
        }
        ini
    }

    /// Write to `path`, creating parent directories.
    pub fn save(&self, path: &Path) -> Result<(), ConfigError> {
        let io_error = |source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        };
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).map_err(io_error)?;
        }
        self.to_ini().write_to_file(path).map_err(io_error)?;
        debug!(path = %path.display(), "Saved configuration");
        Ok(())
    }
}

fn invalid(section: &str, key: &str, value: &str, reason: &str) -> ConfigError {
    ConfigError::InvalidValue {
        section: section.to_string(),
        key: key.to_string(),
        value: value.to_string(),
        reason: reason.to_string(),
    }
}

fn parse_bool(section: &str, key: &str, value: &str) -> Result<bool, ConfigError> {
    match value.trim().to_ascii_lowercase().as_str() {
        "true" | "yes" | "on" | "1" => Ok(true),
        "false" | "no" | "off" | "0" => Ok(false),
        _ => Err(invalid(section, key, value, "expected true or false")),
    }
}

fn parse_millis(section: &str, key: &str, value: &str) -> Result<Duration, ConfigError> {
    value
        .trim()
        .parse::<u64>()
        .map(Duration::from_millis)
        .map_err(|e| invalid(section, key, value, &e.to_string()))
}
