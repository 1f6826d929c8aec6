//! `[host]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [host]
//! url = "ws://localhost:4568"   # Editor bridge websocket
//! timeout_ms = 30000            # Wait limit for one host call
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct HostConfig {
    pub url: String,
    pub timeout_ms: u64,
}

impl Default for HostConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:4568".into(),
            timeout_ms: 30000,
        }
    }
}

impl HostConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        super::validate_ws_url(&self.url, FieldPath::new("host.url"), diag);
        if self.timeout_ms == 0 {
            diag.error(FieldPath::new("host.timeout_ms"), "must be greater than 0");
        }
    }
}
