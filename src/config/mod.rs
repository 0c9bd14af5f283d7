//! Configuration for `updates-for.toml`.
//!
//! Every section is optional; a missing file means all defaults.
//!
//! | Section    | Purpose                                        |
//! |------------|------------------------------------------------|
//! | `[cable]`  | Action Cable endpoint and channel               |
//! | `[fetch]`  | Document location and extra request headers     |
//! | `[live]`   | Debounce default, frame depth, permanent marker |
//! | `[log]`    | Verbose pass logging                            |
//!
//! Command-line flags override file values (see `cli`).

mod error;
mod section;

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};

pub use error::ConfigError;
pub use section::{CableConfig, FetchConfig, LiveSectionConfig, LogConfig};

use crate::live::LiveSettings;
use crate::log;

/// Default config file name, looked up in the working directory.
pub const CONFIG_FILE: &str = "updates-for.toml";

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveConfig {
    pub cable: CableConfig,
    pub fetch: FetchConfig,
    pub live: LiveSectionConfig,
    pub log: LogConfig,
}

impl LiveConfig {
    /// Load `path`, falling back to defaults when it does not exist.
    ///
    /// Unknown fields are reported and ignored.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            crate::debug!("config"; "{} not found, using defaults", path.display());
            return Ok(Self::default());
        }

        let content =
            fs::read_to_string(path).map_err(|err| ConfigError::Io(path.to_path_buf(), err))?;
        let (config, ignored) = Self::parse_with_ignored(&content)?;
        if !ignored.is_empty() {
            log!("warn"; "unknown fields in {} ignored: {}", path.display(), ignored.join(", "));
        }

        config.validate()?;
        Ok(config)
    }

    pub fn from_str(content: &str) -> Result<Self, ConfigError> {
        Ok(toml::from_str(content)?)
    }

    /// Parse TOML content, collecting any unknown fields.
    fn parse_with_ignored(content: &str) -> Result<(Self, Vec<String>), ConfigError> {
        let mut ignored = Vec::new();
        let deserializer = toml::Deserializer::new(content);
        let config = serde_ignored::deserialize(deserializer, |path: serde_ignored::Path| {
            ignored.push(path.to_string());
        })?;
        Ok((config, ignored))
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        self.cable
            .validate()
            .and_then(|_| self.fetch.validate())
            .and_then(|_| self.live.validate())
            .map_err(ConfigError::Validation)
    }

    /// Engine settings derived from `[cable]` and `[live]`.
    pub fn settings(&self) -> LiveSettings {
        self.live.settings(&self.cable.channel)
    }
}

/// Parse a config snippet for tests, rejecting unknown fields.
#[cfg(test)]
pub fn test_parse_config(content: &str) -> LiveConfig {
    let (parsed, ignored) = LiveConfig::parse_with_ignored(content).unwrap();
    assert!(
        ignored.is_empty(),
        "test config has unknown fields: {:?}",
        ignored
    );
    parsed
}
