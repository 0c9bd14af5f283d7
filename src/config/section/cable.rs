//! `[cable]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [cable]
//! url = "ws://localhost:3000/cable"   # Action Cable endpoint
//! origin = "http://localhost:3000"    # Origin header, if the server checks it
//! channel = "CableReady::Stream"      # Channel regions subscribe to
//! ```
//!
//! Without `url` no transport exists and regions stay disconnected.

use serde::{Deserialize, Serialize};

use crate::transport::STREAM_CHANNEL;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct CableConfig {
    pub url: Option<String>,
    pub origin: Option<String>,
    pub channel: String,
}

impl Default for CableConfig {
    fn default() -> Self {
        Self {
            url: None,
            origin: None,
            channel: STREAM_CHANNEL.to_string(),
        }
    }
}

impl CableConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if self.channel.trim().is_empty() {
            return Err("cable.channel must not be empty".into());
        }
        if let Some(url) = &self.url {
            let parsed = url::Url::parse(url).map_err(|e| format!("cable.url `{url}`: {e}"))?;
            match parsed.scheme() {
                "ws" => {}
                "wss" => {
                    return Err(format!(
                        "cable.url `{url}`: wss:// is not supported, connect through a local ws:// endpoint"
                    ));
                }
                _ => return Err(format!("cable.url `{url}` must use ws://")),
            }
        }
        Ok(())
    }
}
