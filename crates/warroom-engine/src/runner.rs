//! The discussion runner: drives one case through triage, the speaking
//! phases, and consensus, emitting events in a fixed order.
//!
//! Failure containment: a failed specialist turn is logged and skipped;
//! a failed triage call degrades to the default panel; only a failed
//! consensus call ends the run with a terminal `error` event.

use std::sync::Arc;
use std::time::{Duration, Instant};

use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, instrument, warn};
use warroom_core::case::{DiscussionRequest, PatientCase, Urgency};
use warroom_core::errors::ResponderError;
use warroom_core::events::{DiscussionEvent, TriageSummary};
use warroom_core::ids::RunId;
use warroom_core::messages::{AgentMessage, Transcript};
use warroom_core::phases::{DiscussionPhase, SPEAKING_PHASES};
use warroom_core::registry::Specialist;
use warroom_core::responder::{AgentReply, AgentResponder, ResponderCall, ResponderRole};
use warroom_telemetry::MetricsRecorder;

use crate::conflict::{ConflictDetector, LexicalConflictDetector, CONFLICT_WINDOW};
use crate::consensus::consensus_from_text;
use crate::error::EngineError;
use crate::pacing::{FixedPacing, PacingStrategy};
use crate::selector::select_panel;
use crate::stream::DiscussionStream;
use crate::triage::parse_triage;

pub const DEFAULT_CALL_TIMEOUT: Duration = Duration::from_secs(60);

/// Shown to clients when triage produced no usable assessment text.
const FALLBACK_ASSESSMENT: &str = "Analyzing case...";

#[derive(Clone, Debug)]
pub struct RunnerConfig {
    /// Applied to every responder call individually.
    pub call_timeout: Duration,
    /// How many preceding messages the conflict detector sees.
    pub conflict_window: usize,
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            call_timeout: DEFAULT_CALL_TIMEOUT,
            conflict_window: CONFLICT_WINDOW,
        }
    }
}

/// What a finished run looked like, for logs and the hosting layer.
#[derive(Clone, Debug)]
pub struct RunSummary {
    pub run_id: RunId,
    pub total_messages: usize,
    pub agents_consulted: Vec<String>,
    pub consensus_reached: bool,
}

pub struct DiscussionRunner {
    responder: Arc<dyn AgentResponder>,
    conflicts: Arc<dyn ConflictDetector>,
    pacing: Arc<dyn PacingStrategy>,
    metrics: Option<Arc<MetricsRecorder>>,
    config: RunnerConfig,
}

impl DiscussionRunner {
    pub fn new(responder: Arc<dyn AgentResponder>) -> Self {
        Self {
            responder,
            conflicts: Arc::new(LexicalConflictDetector::default()),
            pacing: Arc::new(FixedPacing::default()),
            metrics: None,
            config: RunnerConfig::default(),
        }
    }

    pub fn with_conflict_detector(mut self, conflicts: Arc<dyn ConflictDetector>) -> Self {
        self.conflicts = conflicts;
        self
    }

    pub fn with_pacing(mut self, pacing: Arc<dyn PacingStrategy>) -> Self {
        self.pacing = pacing;
        self
    }

    pub fn with_metrics(mut self, metrics: Arc<MetricsRecorder>) -> Self {
        self.metrics = Some(metrics);
        self
    }

    pub fn with_config(mut self, config: RunnerConfig) -> Self {
        self.config = config;
        self
    }

    /// Drive one discussion to completion. Emits every event through
    /// `stream`; the terminal event (`complete` or `error`) is always
    /// the last one sent. Returns `Aborted` without emitting anything
    /// further once `cancel` fires or the consumer disconnects.
    #[instrument(skip(self, request, stream, cancel), fields(run_id = %run_id, urgency = %request.urgency))]
    pub async fn run(
        &self,
        run_id: RunId,
        request: &DiscussionRequest,
        stream: &DiscussionStream,
        cancel: &CancellationToken,
    ) -> Result<RunSummary, EngineError> {
        let case = &request.case;
        let urgency = request.urgency;
        info!(backend = self.responder.name(), "discussion started");
        self.count("runs.started", &[]);

        // Triage: one orchestrator call, then panel selection. A failed
        // call falls through to the default panel rather than ending
        // the run.
        self.ensure_live(stream, cancel)?;
        self.emit_phase(stream, DiscussionPhase::Triage).await;
        let triage_started = Instant::now();
        let triage = match self
            .call_responder(ResponderRole::Orchestrator, case, urgency, &[], DiscussionPhase::Triage)
            .await
        {
            Ok(reply) => parse_triage(&reply.content, urgency),
            Err(err) => {
                warn!(
                    error = %err,
                    kind = err.error_kind(),
                    "triage call failed, continuing with defaults"
                );
                self.count("responder.calls.failed", &[("role", "orchestrator")]);
                TriageSummary {
                    urgency_level: urgency,
                    ..TriageSummary::default()
                }
            }
        };
        self.observe_phase(DiscussionPhase::Triage, triage_started);

        let panel = select_panel(&triage, &request.exclude_agents);
        let initial_assessment = if triage.initial_assessment.is_empty() {
            FALLBACK_ASSESSMENT.to_string()
        } else {
            triage.initial_assessment
        };
        stream
            .emit(DiscussionEvent::OrchestrationComplete {
                relevant_agents: panel.iter().map(|s| s.id.to_string()).collect(),
                urgency_level: triage.urgency_level,
                key_findings: triage.key_findings,
                initial_assessment,
            })
            .await;

        // Speaking phases: opening hears the whole panel, analysis and
        // debate narrow to the front of it.
        let mut transcript = Transcript::new();
        for phase in SPEAKING_PHASES {
            self.ensure_live(stream, cancel)?;
            self.emit_phase(stream, phase).await;
            let phase_started = Instant::now();
            let speakers = &panel[..phase.speaker_limit().min(panel.len())];
            for &specialist in speakers {
                self.ensure_live(stream, cancel)?;
                self.speak(specialist, phase, case, urgency, &mut transcript, stream)
                    .await;
                self.pacing.pause().await;
            }
            self.observe_phase(phase, phase_started);
        }

        // Consensus: the one step that is fatal on failure.
        self.ensure_live(stream, cancel)?;
        self.emit_phase(stream, DiscussionPhase::Consensus).await;
        stream
            .emit(DiscussionEvent::ConsensusBuilding { progress: 50 })
            .await;
        let consensus_started = Instant::now();
        let consensus = match self
            .call_responder(
                ResponderRole::Synthesizer,
                case,
                urgency,
                transcript.messages(),
                DiscussionPhase::Consensus,
            )
            .await
        {
            Ok(reply) => consensus_from_text(reply.content, &transcript, &panel),
            Err(err) => {
                error!(error = %err, kind = err.error_kind(), "consensus synthesis failed");
                self.count("runs.failed", &[]);
                stream
                    .emit(DiscussionEvent::Error {
                        message: format!("Consensus synthesis failed: {err}"),
                    })
                    .await;
                return Err(EngineError::Consensus(err));
            }
        };
        self.observe_phase(DiscussionPhase::Consensus, consensus_started);
        stream
            .emit(DiscussionEvent::ConsensusBuilding { progress: 100 })
            .await;
        stream
            .emit(DiscussionEvent::ConsensusComplete {
                consensus: consensus.clone(),
            })
            .await;

        let agents_consulted: Vec<String> = panel.iter().map(|s| s.id.to_string()).collect();
        let summary = RunSummary {
            run_id,
            total_messages: transcript.len(),
            agents_consulted: agents_consulted.clone(),
            consensus_reached: true,
        };
        stream
            .emit(DiscussionEvent::Complete {
                total_messages: transcript.len(),
                agents_consulted,
                consensus_reached: true,
                consensus,
            })
            .await;
        info!(messages = summary.total_messages, "discussion complete");
        self.count("runs.completed", &[]);
        Ok(summary)
    }

    /// One specialist turn. Failures are contained here: the turn is
    /// skipped and the discussion moves on.
    async fn speak(
        &self,
        specialist: &'static Specialist,
        phase: DiscussionPhase,
        case: &PatientCase,
        urgency: Urgency,
        transcript: &mut Transcript,
        stream: &DiscussionStream,
    ) {
        stream
            .emit(DiscussionEvent::AgentThinking {
                agent_id: specialist.id.to_string(),
                agent_name: specialist.name.to_string(),
            })
            .await;

        let reply = match self
            .call_responder(
                ResponderRole::Specialist(specialist),
                case,
                urgency,
                transcript.messages(),
                phase,
            )
            .await
        {
            Ok(reply) => reply,
            Err(err) => {
                warn!(
                    agent_id = specialist.id,
                    error = %err,
                    kind = err.error_kind(),
                    "specialist turn failed, skipping"
                );
                self.count("responder.calls.failed", &[("role", specialist.id)]);
                return;
            }
        };

        let AgentReply {
            content,
            confidence,
            reasoning,
            alerts,
            recommendations,
            needs_more_info,
        } = reply;

        let mut message = AgentMessage::new(specialist.id, specialist.name, phase, content);
        if let Some(confidence) = confidence {
            message = message.with_confidence(confidence);
        }
        if let Some(reasoning) = reasoning {
            message = message.with_reasoning(reasoning);
        }

        // The window is the transcript tail before this message lands.
        let conflicting = phase == DiscussionPhase::Debate
            && self
                .conflicts
                .is_conflict(&message, transcript.recent(self.config.conflict_window));
        if conflicting {
            message = message.flag_conflict();
        }

        let needs_more_info = (phase == DiscussionPhase::Analysis && !needs_more_info.is_empty())
            .then_some(needs_more_info);

        transcript.push(message.clone());
        stream
            .emit(DiscussionEvent::AgentMessage {
                message: message.clone(),
                alerts,
                recommendations,
                needs_more_info,
            })
            .await;

        if conflicting {
            info!(agent_id = specialist.id, "conflict detected in debate");
            self.count("conflicts.detected", &[]);
            stream
                .emit(DiscussionEvent::ConflictDetected {
                    agent_id: specialist.id.to_string(),
                    agent_name: specialist.name.to_string(),
                    message_id: message.id.clone(),
                })
                .await;
        }
    }

    async fn call_responder(
        &self,
        role: ResponderRole,
        case: &PatientCase,
        urgency: Urgency,
        transcript: &[AgentMessage],
        phase: DiscussionPhase,
    ) -> Result<AgentReply, ResponderError> {
        let call = ResponderCall {
            role,
            case,
            urgency,
            transcript,
            phase,
        };
        match tokio::time::timeout(self.config.call_timeout, self.responder.respond(call)).await {
            Ok(result) => result,
            Err(_) => Err(ResponderError::Timeout(self.config.call_timeout)),
        }
    }

    /// Cancellation is cooperative: checked between steps, never
    /// preempting a responder call in flight.
    fn ensure_live(
        &self,
        stream: &DiscussionStream,
        cancel: &CancellationToken,
    ) -> Result<(), EngineError> {
        if cancel.is_cancelled() || stream.is_closed() {
            debug!("caller gone, stopping run");
            self.count("runs.aborted", &[]);
            return Err(EngineError::Aborted);
        }
        Ok(())
    }

    async fn emit_phase(&self, stream: &DiscussionStream, phase: DiscussionPhase) {
        stream
            .emit(DiscussionEvent::PhaseChange {
                phase,
                message: phase.announcement().to_string(),
            })
            .await;
    }

    fn count(&self, name: &str, labels: &[(&str, &str)]) {
        if let Some(metrics) = &self.metrics {
            metrics.counter_inc(name, labels, 1);
        }
    }

    fn observe_phase(&self, phase: DiscussionPhase, started: Instant) {
        if let Some(metrics) = &self.metrics {
            metrics.histogram_observe(
                "phase.duration_ms",
                &[("phase", phase.as_str())],
                started.elapsed().as_secs_f64() * 1000.0,
            );
        }
    }
}
