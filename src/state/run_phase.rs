//! Pipeline phase definitions for a harvest run
//!
//! A run walks the phases in order; `Failed` is reachable from every
//! non-terminal phase.
use std::fmt;

/// Represents the current phase of the coordinator's pipeline
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RunPhase {
    /// Coordinator built, nothing done yet
    Init,

    /// Loading the last checkpoint
    Restore,

    /// Reading input rows and listing repository cases
    Enumerate,

    /// Submitting one job per work item
    Schedule,

    /// Waiting for every submitted job to finish
    AwaitCompletion,

    /// Looking up cached text for every input row
    MapOutput,

    /// Writing output columns to the tabular store
    Persist,

    // ===== Terminal States =====
    /// Run finished
    Done,

    /// Run aborted on an unrecoverable error
    Failed,
}

impl RunPhase {
    /// Returns true if no further transition is possible
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Done | Self::Failed)
    }

    /// Returns the phase that follows this one on the success path
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Init => Some(Self::Restore),
            Self::Restore => Some(Self::Enumerate),
            Self::Enumerate => Some(Self::Schedule),
            Self::Schedule => Some(Self::AwaitCompletion),
            Self::AwaitCompletion => Some(Self::MapOutput),
            Self::MapOutput => Some(Self::Persist),
            Self::Persist => Some(Self::Done),
            Self::Done | Self::Failed => None,
        }
    }

    /// Returns true if moving from this phase to `to` is allowed
    pub fn can_transition_to(&self, to: Self) -> bool {
        if self.is_terminal() {
            return false;
        }
        to == Self::Failed || self.next() == Some(to)
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Init => "init",
            Self::Restore => "restore",
            Self::Enumerate => "enumerate",
            Self::Schedule => "schedule",
            Self::AwaitCompletion => "await_completion",
            Self::MapOutput => "map_output",
            Self::Persist => "persist",
            Self::Done => "done",
            Self::Failed => "failed",
        }
    }

    /// Returns all phases in pipeline order, `Failed` last
    pub fn all_phases() -> Vec<Self> {
        vec![
            Self::Init,
            Self::Restore,
            Self::Enumerate,
            Self::Schedule,
            Self::AwaitCompletion,
            Self::MapOutput,
            Self::Persist,
            Self::Done,
            Self::Failed,
        ]
    }
}

impl fmt::Display for RunPhase {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
