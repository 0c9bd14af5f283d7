//! `[live]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [live]
//! debounce_ms = 20                              # Window for regions without `debounce`
//! max_frame_depth = 32                          # Nested turbo-frame limit
//! permanent_attribute = "data-ignore-updates"   # Nodes a patch leaves alone
//! ```

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::frame::DEFAULT_MAX_FRAME_DEPTH;
use crate::live::{DEFAULT_DEBOUNCE_MS, LiveSettings};
use crate::patch::PERMANENT_ATTRIBUTE;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LiveSectionConfig {
    pub debounce_ms: u64,
    pub max_frame_depth: usize,
    pub permanent_attribute: String,
}

impl Default for LiveSectionConfig {
    fn default() -> Self {
        Self {
            debounce_ms: DEFAULT_DEBOUNCE_MS,
            max_frame_depth: DEFAULT_MAX_FRAME_DEPTH,
            permanent_attribute: PERMANENT_ATTRIBUTE.to_string(),
        }
    }
}

impl LiveSectionConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.max_frame_depth == 0 {
            return Err("live.max_frame_depth must be at least 1".into());
        }
        if self.permanent_attribute.trim().is_empty() {
            return Err("live.permanent_attribute must not be empty".into());
        }
        Ok(())
    }

    pub fn settings(&self, channel: &str) -> LiveSettings {
        LiveSettings {
            channel: channel.to_string(),
            default_debounce: Duration::from_millis(self.debounce_ms),
            max_frame_depth: self.max_frame_depth,
            permanent_attribute: self.permanent_attribute.clone(),
        }
    }
}
