//! Disagreement detection between specialists during the debate phase.

use warroom_core::messages::AgentMessage;

/// How many preceding transcript messages a candidate is compared
/// against.
pub const CONFLICT_WINDOW: usize = 3;

/// Markers that signal a specialist is pushing back on an earlier
/// assessment. Matched case-insensitively.
pub const DEFAULT_CONFLICT_MARKERS: [&str; 5] =
    ["disagree", "however", "alternative", "on the contrary", "instead"];

/// Decides whether a candidate message contradicts recent discussion.
/// Implementations must be cheap; the runner calls this inline on the
/// event path.
pub trait ConflictDetector: Send + Sync {
    /// `recent` is the window of messages preceding the candidate, in
    /// transcript order. The candidate itself is not part of it.
    fn is_conflict(&self, candidate: &AgentMessage, recent: &[AgentMessage]) -> bool;
}

/// Marker-phrase detector. A candidate conflicts when it contains one
/// of the markers and the window holds at least one message from a
/// different specialist, so an agent cannot conflict with itself.
pub struct LexicalConflictDetector {
    markers: Vec<String>,
}

impl LexicalConflictDetector {
    pub fn new(markers: impl IntoIterator<Item = impl Into<String>>) -> Self {
        Self {
            markers: markers.into_iter().map(|m| m.into().to_lowercase()).collect(),
        }
    }
}

impl Default for LexicalConflictDetector {
    fn default() -> Self {
        Self::new(DEFAULT_CONFLICT_MARKERS)
    }
}

impl ConflictDetector for LexicalConflictDetector {
    fn is_conflict(&self, candidate: &AgentMessage, recent: &[AgentMessage]) -> bool {
        let other_voice = recent.iter().any(|m| m.agent_id != candidate.agent_id);
        if !other_voice {
            return false;
        }
        let lower = candidate.content.to_lowercase();
        self.markers.iter().any(|marker| lower.contains(marker))
    }
}
