//! Transition status kind, shared between the event types published during
//! a transition and the transition runner's own status record.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Where a per-user transition currently stands.
///
/// Transitions: `NotStarted -> InProgress -> (Verified | Failed)`;
/// `Failed` may move back to `InProgress` on retry.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum TransitionStatusKind {
    /// No run has started yet.
    NotStarted,
    /// Copy or verify is underway.
    InProgress,
    /// Copy and verify both completed successfully.
    Verified,
    /// Verify found a missing or divergent item.
    Failed,
}

impl fmt::Display for TransitionStatusKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            TransitionStatusKind::NotStarted => "NotStarted",
            TransitionStatusKind::InProgress => "InProgress",
            TransitionStatusKind::Verified => "Verified",
            TransitionStatusKind::Failed => "Failed",
        };
        write!(f, "{s}")
    }
}
