//! Host document editor capability.
//!
//! The editor is an opaque command interpreter: it runs a batch of
//! structural commands against the open document and may fail on any
//! command. It offers no transactions, so callers must treat every batch
//! as possibly half-applied.
//!
//! # Module Structure
//!
//! - `command` - editor-neutral commands and their action descriptors
//! - `simulated` - in-memory document with editor failure behavior
//! - `remote` - bridge to a live editor over WebSocket

mod command;
pub mod remote;
pub mod simulated;

use thiserror::Error;

pub use command::{Command, SelectMode};
pub use remote::RemoteHost;
pub use simulated::SimulatedHost;

/// Opaque handle to a staged, host-readable resource.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ImageToken(pub String);

impl ImageToken {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// Failure reported by the host for a single command.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum HostError {
    /// The command's target does not exist (empty selection, unknown layer).
    ///
    /// Cleanup steps read this as "already in the desired state".
    #[error("{0}")]
    ExpectedAbsence(String),

    /// A command ran and failed.
    #[error("`{command}` failed: {message}")]
    CommandFailed { command: String, message: String },

    /// The host could not be reached or answered nonsense.
    #[error("host unavailable: {0}")]
    Unavailable(String),
}

impl HostError {
    pub fn failed(command: impl Into<String>, message: impl Into<String>) -> Self {
        Self::CommandFailed {
            command: command.into(),
            message: message.into(),
        }
    }

    pub fn absent(what: impl Into<String>) -> Self {
        Self::ExpectedAbsence(what.into())
    }

    #[inline]
    pub fn is_absence(&self) -> bool {
        matches!(self, Self::ExpectedAbsence(_))
    }
}

/// Capability interface to the document editor.
///
/// Calls are strictly serialized: `&mut self` on every method means one
/// host can never see two overlapping requests.
#[allow(async_fn_in_trait)]
pub trait Host {
    /// Whether a document is open.
    async fn has_document(&mut self) -> Result<bool, HostError>;

    /// Names of the top-level layers, topmost first.
    async fn layer_names(&mut self) -> Result<Vec<String>, HostError>;

    /// Write bytes to a host-readable temporary resource.
    async fn stage_image(&mut self, bytes: &[u8]) -> Result<ImageToken, HostError>;

    /// Drop a resource created by `stage_image`.
    async fn release(&mut self, token: &ImageToken) -> Result<(), HostError>;

    /// Run commands in order. The first failing command ends the batch;
    /// commands before it stay applied.
    async fn execute_batch(&mut self, commands: &[Command]) -> Result<(), HostError>;
}

/// Either host adapter, chosen at runtime.
pub enum AnyHost {
    Simulated(SimulatedHost),
    Remote(RemoteHost),
}

impl Host for AnyHost {
    async fn has_document(&mut self) -> Result<bool, HostError> {
        match self {
            Self::Simulated(host) => host.has_document().await,
            Self::Remote(host) => host.has_document().await,
        }
    }

    async fn layer_names(&mut self) -> Result<Vec<String>, HostError> {
        match self {
            Self::Simulated(host) => host.layer_names().await,
            Self::Remote(host) => host.layer_names().await,
        }
    }

    async fn stage_image(&mut self, bytes: &[u8]) -> Result<ImageToken, HostError> {
        match self {
            Self::Simulated(host) => host.stage_image(bytes).await,
            Self::Remote(host) => host.stage_image(bytes).await,
        }
    }

    async fn release(&mut self, token: &ImageToken) -> Result<(), HostError> {
        match self {
            Self::Simulated(host) => host.release(token).await,
            Self::Remote(host) => host.release(token).await,
        }
    }

    async fn execute_batch(&mut self, commands: &[Command]) -> Result<(), HostError> {
        match self {
            Self::Simulated(host) => host.execute_batch(commands).await,
            Self::Remote(host) => host.execute_batch(commands).await,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_host_error_display() {
        let err = HostError::failed("delete", "cannot delete the last layer");
        assert_eq!(err.to_string(), "`delete` failed: cannot delete the last layer");
        assert!(!err.is_absence());

        let err = HostError::absent("layer `AtlasSource` does not exist");
        assert_eq!(err.to_string(), "layer `AtlasSource` does not exist");
        assert!(err.is_absence());
    }
}
