//! Transcript messages.
//!
//! One `AgentMessage` per specialist turn. The transcript is append-only
//! and owned by the running discussion; everything else sees slices.

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::ids::MessageId;
use crate::phases::DiscussionPhase;

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AgentMessage {
    pub id: MessageId,
    pub agent_id: String,
    pub agent_name: String,
    pub content: String,
    pub phase: DiscussionPhase,
    /// Unix millis at message creation. The event envelope carries its
    /// own emission timestamp.
    pub timestamp: i64,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub confidence: Option<f64>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub reasoning: Option<String>,
    #[serde(default)]
    pub is_conflict: bool,
}

impl AgentMessage {
    pub fn new(
        agent_id: impl Into<String>,
        agent_name: impl Into<String>,
        phase: DiscussionPhase,
        content: impl Into<String>,
    ) -> Self {
        Self {
            id: MessageId::new(),
            agent_id: agent_id.into(),
            agent_name: agent_name.into(),
            content: content.into(),
            phase,
            timestamp: Utc::now().timestamp_millis(),
            confidence: None,
            reasoning: None,
            is_conflict: false,
        }
    }

    pub fn with_confidence(mut self, confidence: f64) -> Self {
        self.confidence = Some(confidence);
        self
    }

    pub fn with_reasoning(mut self, reasoning: impl Into<String>) -> Self {
        self.reasoning = Some(reasoning.into());
        self
    }

    pub fn flag_conflict(mut self) -> Self {
        self.is_conflict = true;
        self
    }
}

/// Append-only record of the discussion so far.
#[derive(Clone, Debug, Default, Serialize)]
#[serde(transparent)]
pub struct Transcript {
    messages: Vec<AgentMessage>,
}

impl Transcript {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, message: AgentMessage) {
        self.messages.push(message);
    }

    pub fn messages(&self) -> &[AgentMessage] {
        &self.messages
    }

    pub fn len(&self) -> usize {
        self.messages.len()
    }

    pub fn is_empty(&self) -> bool {
        self.messages.is_empty()
    }

    pub fn last(&self) -> Option<&AgentMessage> {
        self.messages.last()
    }

    /// The last `n` messages, oldest first.
    pub fn recent(&self, n: usize) -> &[AgentMessage] {
        &self.messages[self.messages.len().saturating_sub(n)..]
    }

    /// Mean of the per-message confidences, when any are present.
    pub fn mean_confidence(&self) -> Option<f64> {
        let values: Vec<f64> = self.messages.iter().filter_map(|m| m.confidence).collect();
        if values.is_empty() {
            None
        } else {
            Some(values.iter().sum::<f64>() / values.len() as f64)
        }
    }
}
