//! The medical reasoning seam.
//!
//! Everything the engine knows about "what a specialist would say" goes
//! through `AgentResponder`. The engine treats reply content as opaque
//! text; backends decide how it is produced.

use async_trait::async_trait;

use crate::case::{PatientCase, Urgency};
use crate::errors::ResponderError;
use crate::messages::AgentMessage;
use crate::phases::DiscussionPhase;
use crate::registry::Specialist;

/// Who is being asked to speak.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ResponderRole {
    /// A consultable specialist from the catalog.
    Specialist(&'static Specialist),
    /// The triage orchestrator assembling the panel.
    Orchestrator,
    /// The consensus synthesizer.
    Synthesizer,
}

impl ResponderRole {
    pub fn id(&self) -> &str {
        match self {
            Self::Specialist(s) => s.id,
            Self::Orchestrator => "orchestrator",
            Self::Synthesizer => "synthesizer",
        }
    }

    pub fn display_name(&self) -> &str {
        match self {
            Self::Specialist(s) => s.name,
            Self::Orchestrator => "Triage Orchestrator",
            Self::Synthesizer => "Consensus Synthesizer",
        }
    }
}

/// One turn's worth of context for a responder.
#[derive(Clone, Copy, Debug)]
pub struct ResponderCall<'a> {
    pub role: ResponderRole,
    pub case: &'a PatientCase,
    pub urgency: Urgency,
    pub transcript: &'a [AgentMessage],
    pub phase: DiscussionPhase,
}

/// What a responder produced for one turn.
#[derive(Clone, Debug, Default)]
pub struct AgentReply {
    pub content: String,
    pub confidence: Option<f64>,
    pub reasoning: Option<String>,
    pub alerts: Vec<String>,
    pub recommendations: Vec<String>,
    pub needs_more_info: Vec<String>,
}

impl AgentReply {
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            ..Self::default()
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }
}

#[async_trait]
pub trait AgentResponder: Send + Sync {
    /// Backend name for logs.
    fn name(&self) -> &str;

    async fn respond(&self, call: ResponderCall<'_>) -> Result<AgentReply, ResponderError>;
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::registry;

    #[test]
    fn role_ids_cover_the_three_callers() {
        let cardio = registry::get("cardiology").unwrap();
        assert_eq!(ResponderRole::Specialist(cardio).id(), "cardiology");
        assert_eq!(ResponderRole::Orchestrator.id(), "orchestrator");
        assert_eq!(ResponderRole::Synthesizer.id(), "synthesizer");
    }

    #[test]
    fn specialist_roles_use_catalog_display_names() {
        let lab = registry::get("lab_interpreter").unwrap();
        assert_eq!(
            ResponderRole::Specialist(lab).display_name(),
            "Laboratory Medicine Specialist"
        );
    }
}
