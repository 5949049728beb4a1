use serde::{Deserialize, Serialize};
use std::fmt;

/// Lifecycle status of a [`Container`](super::Container).
///
/// ```text
/// Unstarted ──► Starting ──► Running ──► Ready ──► Stopped
///     │             │           │                    ▲
///     │             └─────► Failed ─────────────────►┤
///     └──────────────────────────────────────────────┘
/// ```
///
/// `Failed` is reached on a provision error, a fatal readiness error, or
/// context termination. A failed handle can only be stopped.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Status {
    /// Not yet handed to an engine
    Unstarted,
    /// Purge and launch in progress
    Starting,
    /// Launched, readiness not yet confirmed
    Running,
    /// Readiness checker reported the service usable
    Ready,
    /// Resource released
    Stopped,
    /// Terminal failure; discard the handle
    Failed,
}

impl fmt::Display for Status {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Status::Unstarted => write!(f, "unstarted"),
            Status::Starting => write!(f, "starting"),
            Status::Running => write!(f, "running"),
            Status::Ready => write!(f, "ready"),
            Status::Stopped => write!(f, "stopped"),
            Status::Failed => write!(f, "failed"),
        }
    }
}

impl Status {
    /// Check if a status transition is valid according to the state machine.
    ///
    /// ```
    /// use service_harness::container::Status;
    ///
    /// assert!(Status::Unstarted.is_valid_transition(Status::Starting));
    /// assert!(Status::Running.is_valid_transition(Status::Ready));
    /// assert!(!Status::Ready.is_valid_transition(Status::Running));
    /// ```
    pub fn is_valid_transition(&self, to: Status) -> bool {
        use Status::*;
        match (self, to) {
            (Unstarted, Starting) => true,
            // Tearing down a handle that never launched
            (Unstarted, Stopped) => true,

            (Starting, Running) => true,
            (Starting, Failed) => true,

            (Running, Ready) => true,
            (Running, Failed) => true,
            (Running, Stopped) => true,

            (Ready, Stopped) => true,

            // A failed launch may still hold a resource to release
            (Failed, Stopped) => true,

            (s1, s2) if *s1 == s2 => true,

            _ => false,
        }
    }

    /// True once the handle can no longer make progress.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Status::Stopped | Status::Failed)
    }
}
