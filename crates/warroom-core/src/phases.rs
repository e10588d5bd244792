//! Discussion phase state machine.
//!
//! Phases advance strictly forward: Triage opens every run, Complete ends
//! it, and no phase repeats or is skipped. The enum owns the per-phase
//! facts the runner needs (successor, speaker cap, announcement line) so
//! the sequencing logic stays table-driven.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiscussionPhase {
    Triage,
    Opening,
    Analysis,
    Debate,
    Consensus,
    Complete,
}

/// The phases in which selected specialists speak, in protocol order.
pub const SPEAKING_PHASES: [DiscussionPhase; 3] = [
    DiscussionPhase::Opening,
    DiscussionPhase::Analysis,
    DiscussionPhase::Debate,
];

impl DiscussionPhase {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Triage => "triage",
            Self::Opening => "opening",
            Self::Analysis => "analysis",
            Self::Debate => "debate",
            Self::Consensus => "consensus",
            Self::Complete => "complete",
        }
    }

    /// The phase that follows this one, if any.
    pub fn next(&self) -> Option<Self> {
        match self {
            Self::Triage => Some(Self::Opening),
            Self::Opening => Some(Self::Analysis),
            Self::Analysis => Some(Self::Debate),
            Self::Debate => Some(Self::Consensus),
            Self::Consensus => Some(Self::Complete),
            Self::Complete => None,
        }
    }

    /// How many of the selected panel speak in this phase. The whole
    /// panel speaks in Opening; selection itself never exceeds five.
    pub fn speaker_limit(&self) -> usize {
        match self {
            Self::Opening => 5,
            Self::Analysis => 3,
            Self::Debate => 2,
            _ => 0,
        }
    }

    /// Human line carried by the `phase_change` event.
    pub fn announcement(&self) -> &'static str {
        match self {
            Self::Triage => "Analyzing case and assembling specialist team...",
            Self::Opening => "Specialists providing initial assessments...",
            Self::Analysis => "Deep analysis of findings...",
            Self::Debate => "Specialists challenging divergent assessments...",
            Self::Consensus => "Building consensus recommendation...",
            Self::Complete => "Discussion complete",
        }
    }

    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete)
    }
}

impl std::fmt::Display for DiscussionPhase {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
