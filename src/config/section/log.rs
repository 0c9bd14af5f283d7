//! `[log]` section configuration.
//!
//! ```toml
//! [log]
//! verbose = false   # Print pass lifecycle (request/response/morph/cancel)
//! record = false    # Keep pass entries in memory
//! ```

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct LogConfig {
    pub verbose: bool,
    pub record: bool,
}
