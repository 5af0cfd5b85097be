//! Download job states.

use serde::{Deserialize, Serialize};

/// State of the manager's download slot.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "lowercase")]
pub enum JobState {
    /// No job is active; a new one may begin.
    #[default]
    Available,
    /// Workers are fetching resources.
    Running,
    /// Workers are stopped; the job keeps its store and cursor.
    Suspended,
    /// The job is being torn down.
    Canceling,
}

impl JobState {
    /// Returns true if a job occupies the slot.
    #[must_use]
    pub const fn is_active(&self) -> bool {
        !matches!(self, Self::Available)
    }

    /// Returns the state as a string identifier.
    #[must_use]
    pub const fn as_str(&self) -> &'static str {
        match self {
            Self::Available => "available",
            Self::Running => "running",
            Self::Suspended => "suspended",
            Self::Canceling => "canceling",
        }
    }
}

impl std::fmt::Display for JobState {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.as_str())
    }
}
