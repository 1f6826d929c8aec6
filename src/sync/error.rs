use std::fmt;

use thiserror::Error;

use crate::host::HostError;

/// Orchestrator phase, in execution order.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Phase {
    PrepareTarget,
    PlaceAtlas,
    DiscardPlaceholder,
    SliceGlyphs,
    Finalize,
}

impl Phase {
    /// 1-based position in the run.
    pub const fn number(self) -> u8 {
        match self {
            Self::PrepareTarget => 1,
            Self::PlaceAtlas => 2,
            Self::DiscardPlaceholder => 3,
            Self::SliceGlyphs => 4,
            Self::Finalize => 5,
        }
    }

    pub const fn name(self) -> &'static str {
        match self {
            Self::PrepareTarget => "prepare target",
            Self::PlaceAtlas => "place atlas",
            Self::DiscardPlaceholder => "discard placeholder",
            Self::SliceGlyphs => "slice glyphs",
            Self::Finalize => "finalize",
        }
    }
}

impl fmt::Display for Phase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "phase {} ({})", self.number(), self.name())
    }
}

/// Why a synchronization run stopped.
#[derive(Debug, Error)]
pub enum SyncError {
    /// A precondition failed before the document was touched.
    #[error("nothing to sync: {0}")]
    MissingInput(&'static str),

    /// A structural host command failed. The document may be partially
    /// modified; running again recovers it.
    #[error("{phase} failed: {cause}")]
    HostCommandFailure {
        phase: Phase,
        #[source]
        cause: HostError,
    },
}

impl SyncError {
    pub fn host(phase: Phase, cause: HostError) -> Self {
        Self::HostCommandFailure { phase, cause }
    }

    /// Phase that failed, if the run got that far.
    pub fn phase(&self) -> Option<Phase> {
        match self {
            Self::MissingInput(_) => None,
            Self::HostCommandFailure { phase, .. } => Some(*phase),
        }
    }
}
