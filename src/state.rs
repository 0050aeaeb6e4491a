//! Lifecycle stages for remap and template-export cycles.

use serde::{Deserialize, Serialize};
use std::fmt;
use thiserror::Error;

/// Stages of one remap cycle, in the only order they may be visited.
///
/// A stage with nothing to do is passed through, never skipped over, so the
/// sequence observed by the store is always the full chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum RemapState {
    /// Quiescent.
    #[default]
    None = 0,
    /// Locator run in flight.
    Tokenizing = 10,
    /// Detected renames are being substituted into the spec.
    Replacing = 20,
    /// Refreshed tracking (and mapping indicators) written back.
    Tracking = 30,
    /// Editor buffer being synchronized with the rewritten spec.
    UpdatingEditor = 40,
    Complete = 100,
}

impl RemapState {
    pub fn value(self) -> u8 {
        self as u8
    }

    /// The stage that follows this one.
    pub fn next(self) -> Option<RemapState> {
        match self {
            RemapState::None => Some(RemapState::Tokenizing),
            RemapState::Tokenizing => Some(RemapState::Replacing),
            RemapState::Replacing => Some(RemapState::Tracking),
            RemapState::Tracking => Some(RemapState::UpdatingEditor),
            RemapState::UpdatingEditor => Some(RemapState::Complete),
            RemapState::Complete => None,
        }
    }

    /// Forward by exactly one stage, or back to `None` from `Complete`.
    pub fn can_transition_to(self, target: RemapState) -> bool {
        self.next() == Some(target) || (self == RemapState::Complete && target == RemapState::None)
    }

    pub fn is_idle(self) -> bool {
        matches!(self, RemapState::None | RemapState::Complete)
    }
}

impl fmt::Display for RemapState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            RemapState::None => "none",
            RemapState::Tokenizing => "tokenizing",
            RemapState::Replacing => "replacing",
            RemapState::Tracking => "tracking",
            RemapState::UpdatingEditor => "updatingEditor",
            RemapState::Complete => "complete",
        };
        f.write_str(name)
    }
}

/// Stages of a single template export.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
#[repr(u8)]
pub enum TemplateExportProcessingState {
    #[default]
    None = 0,
    Tokenizing = 10,
    Complete = 100,
}

impl TemplateExportProcessingState {
    pub fn value(self) -> u8 {
        self as u8
    }

    pub fn can_transition_to(self, target: TemplateExportProcessingState) -> bool {
        use TemplateExportProcessingState::*;
        matches!(
            (self, target),
            (None, Tokenizing) | (Tokenizing, Complete) | (Complete, None) | (Complete, Tokenizing)
        )
    }
}

impl fmt::Display for TemplateExportProcessingState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            TemplateExportProcessingState::None => "none",
            TemplateExportProcessingState::Tokenizing => "tokenizing",
            TemplateExportProcessingState::Complete => "complete",
        };
        f.write_str(name)
    }
}

#[derive(Error, Debug, Clone, PartialEq, Eq)]
pub enum TransitionError {
    #[error("illegal remap transition from {from} to {to}")]
    Remap { from: RemapState, to: RemapState },

    #[error("illegal export transition from {from} to {to}")]
    Export {
        from: TemplateExportProcessingState,
        to: TemplateExportProcessingState,
    },
}
