//! Discussion event protocol.
//!
//! Every frame on the wire is an `EventEnvelope`: `{"type": ...,
//! "data": ..., "timestamp": ...}`. The envelope timestamp is stamped at
//! emission time; message objects inside carry their own creation time.
//!
//! Event ordering contract for one run:
//!   phase_change(triage) -> orchestration_complete ->
//!   phase_change(opening) -> (agent_thinking, agent_message)* ->
//!   phase_change(analysis) -> ... -> phase_change(debate) -> ... ->
//!   phase_change(consensus) -> consensus_building(50) ->
//!   consensus_building(100) -> consensus_complete ->
//!   exactly one of: complete | error

use chrono::Utc;
use serde::{Deserialize, Serialize};

use crate::case::Urgency;
use crate::ids::MessageId;
use crate::messages::AgentMessage;
use crate::phases::DiscussionPhase;

/// Parsed output of the triage call. `relevant_agents` here is the raw
/// parse; the selected panel is what `orchestration_complete` carries.
#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct TriageSummary {
    #[serde(default)]
    pub relevant_agents: Vec<String>,
    #[serde(default)]
    pub urgency_level: Urgency,
    #[serde(default)]
    pub key_findings: Vec<String>,
    #[serde(default)]
    pub initial_assessment: String,
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum RiskLevel {
    Low,
    #[default]
    Moderate,
    High,
    Critical,
}

impl RiskLevel {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Low => "low",
            Self::Moderate => "moderate",
            Self::High => "high",
            Self::Critical => "critical",
        }
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Differential {
    pub diagnosis: String,
    pub probability: f64,
    pub reasoning: String,
}

/// Synthesized team decision.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Consensus {
    pub summary: String,
    pub primary_diagnosis: String,
    #[serde(default)]
    pub differential_diagnoses: Vec<Differential>,
    pub risk_level: RiskLevel,
    pub recommended_actions: Vec<String>,
    pub confidence: f64,
    pub participating_agents: Vec<String>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(tag = "type", content = "data")]
pub enum DiscussionEvent {
    #[serde(rename = "phase_change")]
    PhaseChange {
        phase: DiscussionPhase,
        message: String,
    },

    #[serde(rename = "orchestration_complete", rename_all = "camelCase")]
    OrchestrationComplete {
        relevant_agents: Vec<String>,
        urgency_level: Urgency,
        key_findings: Vec<String>,
        initial_assessment: String,
    },

    #[serde(rename = "agent_thinking", rename_all = "camelCase")]
    AgentThinking {
        agent_id: String,
        agent_name: String,
    },

    #[serde(rename = "agent_message", rename_all = "camelCase")]
    AgentMessage {
        message: AgentMessage,
        alerts: Vec<String>,
        recommendations: Vec<String>,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        needs_more_info: Option<Vec<String>>,
    },

    #[serde(rename = "conflict_detected", rename_all = "camelCase")]
    ConflictDetected {
        agent_id: String,
        agent_name: String,
        message_id: MessageId,
    },

    #[serde(rename = "consensus_building")]
    ConsensusBuilding { progress: u8 },

    #[serde(rename = "consensus_complete")]
    ConsensusComplete { consensus: Consensus },

    #[serde(rename = "complete", rename_all = "camelCase")]
    Complete {
        total_messages: usize,
        agents_consulted: Vec<String>,
        consensus_reached: bool,
        consensus: Consensus,
    },

    #[serde(rename = "error")]
    Error { message: String },
}

impl DiscussionEvent {
    /// Wire tag, matching the serde rename exactly.
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::PhaseChange { .. } => "phase_change",
            Self::OrchestrationComplete { .. } => "orchestration_complete",
            Self::AgentThinking { .. } => "agent_thinking",
            Self::AgentMessage { .. } => "agent_message",
            Self::ConflictDetected { .. } => "conflict_detected",
            Self::ConsensusBuilding { .. } => "consensus_building",
            Self::ConsensusComplete { .. } => "consensus_complete",
            Self::Complete { .. } => "complete",
            Self::Error { .. } => "error",
        }
    }

    /// Terminal events end the run; exactly one is emitted per run.
    pub fn is_terminal(&self) -> bool {
        matches!(self, Self::Complete { .. } | Self::Error { .. })
    }
}

/// One wire frame: the event plus its emission timestamp.
#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EventEnvelope {
    #[serde(flatten)]
    pub event: DiscussionEvent,
    pub timestamp: i64,
}

impl EventEnvelope {
    /// Wrap an event, stamping the current time.
    pub fn now(event: DiscussionEvent) -> Self {
        Self {
            event,
            timestamp: Utc::now().timestamp_millis(),
        }
    }

    pub fn event_type(&self) -> &'static str {
        self.event.event_type()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn sample_consensus() -> Consensus {
        Consensus {
            summary: "Likely ACS, admit to telemetry.".to_string(),
            primary_diagnosis: "Acute coronary syndrome".to_string(),
            differential_diagnoses: vec![Differential {
                diagnosis: "Pulmonary embolism".to_string(),
                probability: 0.2,
                reasoning: "pleuritic features".to_string(),
            }],
            risk_level: RiskLevel::High,
            recommended_actions: vec!["Serial troponins".to_string()],
            confidence: 0.82,
            participating_agents: vec!["cardiology".to_string()],
        }
    }

    #[test]
    fn event_type_matches_the_wire_tag() {
        let event = DiscussionEvent::PhaseChange {
            phase: DiscussionPhase::Triage,
            message: "Analyzing case...".to_string(),
        };
        assert_eq!(event.event_type(), "phase_change");
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["type"], "phase_change");
        assert_eq!(json["data"]["phase"], "triage");
    }

    #[test]
    fn envelope_has_type_data_timestamp() {
        let envelope = EventEnvelope::now(DiscussionEvent::ConsensusBuilding { progress: 50 });
        let json = serde_json::to_value(&envelope).unwrap();
        assert_eq!(json["type"], "consensus_building");
        assert_eq!(json["data"]["progress"], 50);
        assert!(json["timestamp"].as_i64().unwrap() > 0);
    }

    #[test]
    fn agent_message_payload_is_camel_case() {
        let message =
            AgentMessage::new("cardiology", "Cardiology Specialist", DiscussionPhase::Opening, "x");
        let event = DiscussionEvent::AgentMessage {
            message,
            alerts: vec!["EMERGENCY INDICATORS DETECTED".to_string()],
            recommendations: vec![],
            needs_more_info: None,
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["message"]["agentId"], "cardiology");
        assert_eq!(json["data"]["alerts"][0], "EMERGENCY INDICATORS DETECTED");
        assert!(json["data"].get("needsMoreInfo").is_none());
    }

    #[test]
    fn needs_more_info_appears_only_when_set() {
        let message =
            AgentMessage::new("neurology", "Neurology Specialist", DiscussionPhase::Analysis, "x");
        let event = DiscussionEvent::AgentMessage {
            message,
            alerts: vec![],
            recommendations: vec![],
            needs_more_info: Some(vec!["LP results".to_string()]),
        };
        let json = serde_json::to_value(&event).unwrap();
        assert_eq!(json["data"]["needsMoreInfo"][0], "LP results");
    }

    #[test]
    fn terminal_events_are_exactly_complete_and_error() {
        let complete = DiscussionEvent::Complete {
            total_messages: 7,
            agents_consulted: vec!["cardiology".to_string()],
            consensus_reached: true,
            consensus: sample_consensus(),
        };
        let error = DiscussionEvent::Error {
            message: "consensus failed".to_string(),
        };
        let progress = DiscussionEvent::ConsensusBuilding { progress: 100 };
        assert!(complete.is_terminal());
        assert!(error.is_terminal());
        assert!(!progress.is_terminal());
    }

    #[test]
    fn events_round_trip_through_serde() {
        let events = vec![
            DiscussionEvent::OrchestrationComplete {
                relevant_agents: vec!["cardiology".to_string(), "infectious".to_string()],
                urgency_level: Urgency::Urgent,
                key_findings: vec!["elevated troponin".to_string()],
                initial_assessment: "Concerning for ACS".to_string(),
            },
            DiscussionEvent::AgentThinking {
                agent_id: "cardiology".to_string(),
                agent_name: "Cardiology Specialist".to_string(),
            },
            DiscussionEvent::ConflictDetected {
                agent_id: "infectious".to_string(),
                agent_name: "Infectious Disease Specialist".to_string(),
                message_id: MessageId::from_raw("msg_1"),
            },
            DiscussionEvent::ConsensusComplete {
                consensus: sample_consensus(),
            },
            DiscussionEvent::Error {
                message: "boom".to_string(),
            },
        ];
        for event in events {
            let json = serde_json::to_string(&event).unwrap();
            let back: DiscussionEvent = serde_json::from_str(&json).unwrap();
            let json2 = serde_json::to_string(&back).unwrap();
            assert_eq!(json, json2);
        }
    }

    #[test]
    fn envelope_round_trips() {
        let envelope = EventEnvelope::now(DiscussionEvent::Error {
            message: "remote went away".to_string(),
        });
        let json = serde_json::to_string(&envelope).unwrap();
        let back: EventEnvelope = serde_json::from_str(&json).unwrap();
        assert_eq!(back.event_type(), "error");
        assert_eq!(back.timestamp, envelope.timestamp);
    }
}
