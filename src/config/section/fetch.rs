//! `[fetch]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [fetch]
//! location = "http://localhost:3000/boards/1"  # Document location, base for relative URLs
//!
//! [fetch.headers]
//! Authorization = "Bearer …"                   # Sent with every fetch
//! ```

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Location of the mirrored document. Regions without `url` fetch this.
    pub location: Option<String>,
    /// Extra request headers.
    pub headers: BTreeMap<String, String>,
}

impl FetchConfig {
    pub(crate) fn validate(&self) -> Result<(), String> {
        if let Some(location) = &self.location {
            let parsed =
                url::Url::parse(location).map_err(|e| format!("fetch.location `{location}`: {e}"))?;
            if !matches!(parsed.scheme(), "http" | "https") {
                return Err(format!("fetch.location `{location}` must be an http(s) URL"));
            }
        }
        Ok(())
    }
}
