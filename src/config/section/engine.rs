//! `[engine]` section configuration.
//!
//! # Example
//!
//! ```toml
//! [engine]
//! url = "ws://localhost:4567"   # Atlas engine websocket
//! debounce_ms = 300             # Quiet window before a request is sent
//! reconnect_ms = 2000           # Delay between connection attempts
//! response_timeout_ms = 15000   # How long one-shot commands wait for a reply
//! ```

use serde::{Deserialize, Serialize};

use crate::config::{ConfigDiagnostics, FieldPath};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine websocket URL.
    pub url: String,

    /// Only the newest request within this window is sent.
    pub debounce_ms: u64,

    /// Delay between reconnect attempts.
    pub reconnect_ms: u64,

    /// Wait limit for `generate` and one-shot `sync`.
    pub response_timeout_ms: u64,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            url: "ws://localhost:4567".into(),
            debounce_ms: 300,
            reconnect_ms: 2000,
            response_timeout_ms: 15000,
        }
    }
}

impl EngineConfig {
    pub fn validate(&self, diag: &mut ConfigDiagnostics) {
        super::validate_ws_url(&self.url, FieldPath::new("engine.url"), diag);

        if self.reconnect_ms == 0 {
            diag.error_with_hint(
                FieldPath::new("engine.reconnect_ms"),
                "must be greater than 0",
                "use 2000 to retry every two seconds",
            );
        }
        if self.response_timeout_ms == 0 {
            diag.error(
                FieldPath::new("engine.response_timeout_ms"),
                "must be greater than 0",
            );
        }
    }
}
