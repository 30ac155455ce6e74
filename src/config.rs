//! Tracer configuration
//!
//! The recorder needs little: where to write, and whether `mark` records
//! anything. Both can come from a TOML file:
//!
//! ```toml
//! filename = "router_run"
//! events_enabled = true
//! ```

use serde::Deserialize;
use std::fs;
use std::path::Path;

use crate::error::{Result, TraceError};

/// Suffix every trace file name carries
pub const FILE_SUFFIX: &str = ".scnx";

/// File name used when none is configured
pub const DEFAULT_FILENAME: &str = "tracefile.scnx";

/// Settings applied when a session is created
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(default, deny_unknown_fields)]
pub struct TracerConfig {
    /// Destination file; the `.scnx` suffix is appended when missing
    pub filename: String,
    /// Runtime switch for event records; registrations are unaffected
    pub events_enabled: bool,
}

impl Default for TracerConfig {
    fn default() -> Self {
        Self {
            filename: DEFAULT_FILENAME.to_string(),
            events_enabled: true,
        }
    }
}

impl TracerConfig {
    /// Load a configuration from a TOML file
    ///
    /// # Errors
    /// Returns [`TraceError::Config`] if the file cannot be read or does not
    /// parse.
    pub fn from_toml<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let content = fs::read_to_string(path).map_err(|e| TraceError::Config {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        Self::from_toml_str(&content).map_err(|e| match e {
            TraceError::Config { message, .. } => TraceError::Config {
                path: path.to_path_buf(),
                message,
            },
            other => other,
        })
    }

    /// Parse a configuration from TOML text
    pub fn from_toml_str(content: &str) -> Result<Self> {
        let mut config: TracerConfig =
            toml::from_str(content).map_err(|e| TraceError::Config {
                path: "<inline>".into(),
                message: e.to_string(),
            })?;
        config.filename = normalize_filename(&config.filename);
        Ok(config)
    }

    pub fn with_filename(mut self, filename: &str) -> Self {
        self.filename = normalize_filename(filename);
        self
    }

    pub fn with_events_enabled(mut self, enabled: bool) -> Self {
        self.events_enabled = enabled;
        self
    }
}

/// Append [`FILE_SUFFIX`] unless `name` already ends with it
///
/// A suffix found anywhere but the end does not count, so `run.scnx.bak`
/// becomes `run.scnx.bak.scnx`.
pub fn normalize_filename(name: &str) -> String {
    if name.ends_with(FILE_SUFFIX) {
        name.to_string()
    } else {
        format!("{}{}", name, FILE_SUFFIX)
    }
}
