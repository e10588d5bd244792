//! Chat-completions responder backed by the Cerebras inference API.
//!
//! One POST per specialist turn. The reply text is scanned for the
//! structured hints the engine surfaces (confidence, emergency alerts,
//! recommendation lists); everything else stays opaque.

use std::time::Duration;

use async_trait::async_trait;
use secrecy::{ExposeSecret, SecretString};
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

use warroom_core::phases::DiscussionPhase;
use warroom_core::responder::{AgentReply, AgentResponder, ResponderCall, ResponderRole};
use warroom_core::ResponderError;

pub const DEFAULT_API_URL: &str = "https://api.cerebras.ai/v1/chat/completions";
pub const DEFAULT_MODEL: &str = "llama-3.3-70b";

const CONNECT_TIMEOUT: Duration = Duration::from_secs(30);
const MAX_TOKENS: u32 = 2000;
const TEMPERATURE: f64 = 0.7;
/// Transcript messages included in a specialist prompt.
const TRANSCRIPT_TAIL: usize = 6;

#[derive(Clone)]
pub struct CerebrasConfig {
    pub api_url: String,
    pub model: String,
    pub api_key: SecretString,
    pub max_tokens: u32,
    pub temperature: f64,
}

impl CerebrasConfig {
    pub fn new(api_key: SecretString) -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            model: DEFAULT_MODEL.to_string(),
            api_key,
            max_tokens: MAX_TOKENS,
            temperature: TEMPERATURE,
        }
    }

    pub fn with_api_url(mut self, api_url: impl Into<String>) -> Self {
        self.api_url = api_url.into();
        self
    }

    pub fn with_model(mut self, model: impl Into<String>) -> Self {
        self.model = model.into();
        self
    }
}

pub struct CerebrasResponder {
    client: reqwest::Client,
    config: CerebrasConfig,
}

impl CerebrasResponder {
    pub fn new(config: CerebrasConfig) -> Result<Self, ResponderError> {
        let client = reqwest::Client::builder()
            .connect_timeout(CONNECT_TIMEOUT)
            .build()
            .map_err(|e| ResponderError::NetworkError(e.to_string()))?;
        Ok(Self { client, config })
    }

    pub fn model(&self) -> &str {
        &self.config.model
    }
}

#[derive(Serialize)]
struct ChatRequest<'a> {
    model: &'a str,
    messages: [ChatMessage<'a>; 1],
    max_tokens: u32,
    temperature: f64,
}

#[derive(Serialize)]
struct ChatMessage<'a> {
    role: &'a str,
    content: &'a str,
}

#[derive(Deserialize)]
struct ChatResponse {
    #[serde(default)]
    choices: Vec<ChatChoice>,
}

#[derive(Deserialize)]
struct ChatChoice {
    message: ChatChoiceMessage,
}

#[derive(Deserialize)]
struct ChatChoiceMessage {
    #[serde(default)]
    content: String,
}

#[async_trait]
impl AgentResponder for CerebrasResponder {
    fn name(&self) -> &str {
        "cerebras"
    }

    #[instrument(skip(self, call), fields(role = call.role.id(), phase = %call.phase))]
    async fn respond(&self, call: ResponderCall<'_>) -> Result<AgentReply, ResponderError> {
        let prompt = build_prompt(&call);
        let request = ChatRequest {
            model: &self.config.model,
            messages: [ChatMessage {
                role: "user",
                content: &prompt,
            }],
            max_tokens: self.config.max_tokens,
            temperature: self.config.temperature,
        };

        let response = self
            .client
            .post(&self.config.api_url)
            .bearer_auth(self.config.api_key.expose_secret())
            .json(&request)
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    ResponderError::Timeout(CONNECT_TIMEOUT)
                } else {
                    ResponderError::NetworkError(e.to_string())
                }
            })?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(ResponderError::from_status(status.as_u16(), body));
        }

        let parsed: ChatResponse = response
            .json()
            .await
            .map_err(|e| ResponderError::MalformedResponse(e.to_string()))?;
        let content = parsed
            .choices
            .into_iter()
            .next()
            .map(|choice| choice.message.content)
            .filter(|content| !content.trim().is_empty())
            .ok_or_else(|| ResponderError::MalformedResponse("completion had no choices".into()))?;

        debug!(chars = content.len(), "completion received");
        Ok(reply_from_content(content))
    }
}

fn reply_from_content(content: String) -> AgentReply {
    let confidence = extract_confidence(&content);
    let alerts = detect_alerts(&content);
    let recommendations = extract_section(&content, &["RECOMMENDATIONS"]);
    let needs_more_info = extract_section(
        &content,
        &["ADDITIONAL INFORMATION NEEDED", "FURTHER TESTING"],
    );
    AgentReply {
        content,
        confidence,
        reasoning: None,
        alerts,
        recommendations,
        needs_more_info,
    }
}

fn build_prompt(call: &ResponderCall<'_>) -> String {
    let case_block = call.case.summary();
    match call.role {
        ResponderRole::Orchestrator => format!(
            "You are the triage coordinator of a hospital war room.\n\n{}\n\nUrgency: {}\n\n\
             Name the medical specialties most relevant to this case and give a brief \
             initial assessment. List the key findings as bullet points.",
            case_block, call.urgency,
        ),
        ResponderRole::Synthesizer => {
            let opinions: Vec<String> = call
                .transcript
                .iter()
                .map(|m| format!("**{}:**\n{}", m.agent_name, m.content))
                .collect();
            format!(
                "You are the Chief Medical Officer synthesizing a multidisciplinary case review.\n\n\
                 {}\n\nSPECIALIST OPINIONS:\n{}\n\nProvide a structured consensus:\n\n\
                 1. **PRIMARY DIAGNOSIS** (most likely diagnosis with probability estimate)\n\
                 2. **DIFFERENTIAL DIAGNOSES** (2-3 alternatives with reasoning)\n\
                 3. **RISK ASSESSMENT** (Low/Moderate/High/Critical and why)\n\
                 4. **IMMEDIATE ACTIONS** (prioritized next steps)\n\n\
                 Be specific and actionable for the clinical team.",
                case_block,
                opinions.join("\n\n"),
            )
        }
        ResponderRole::Specialist(specialist) => {
            let mut prompt = format!(
                "You are the {}, an expert in {}.\n\n{}\n\nUrgency: {}",
                specialist.name, specialist.focus, case_block, call.urgency,
            );
            let tail_start = call.transcript.len().saturating_sub(TRANSCRIPT_TAIL);
            let tail = &call.transcript[tail_start..];
            if !tail.is_empty() {
                let lines: Vec<String> = tail
                    .iter()
                    .map(|m| format!("{}: {}", m.agent_name, m.content))
                    .collect();
                prompt.push_str(&format!("\n\nDISCUSSION SO FAR:\n{}", lines.join("\n")));
            }
            prompt.push_str("\n\n");
            prompt.push_str(phase_directive(call.phase));
            prompt
        }
    }
}

fn phase_directive(phase: DiscussionPhase) -> &'static str {
    match phase {
        DiscussionPhase::Opening => {
            "Give your initial assessment of this case from your specialty's perspective. \
             Be concise and specific. State your confidence as a number between 0 and 1."
        }
        DiscussionPhase::Analysis => {
            "Analyze the findings in depth. List anything the team still needs under a \
             heading ADDITIONAL INFORMATION NEEDED."
        }
        DiscussionPhase::Debate => {
            "Review the other specialists' assessments. If you disagree with any of them, \
             say so directly and explain the alternative you favor."
        }
        _ => "Contribute your assessment of this case.",
    }
}

fn extract_confidence(content: &str) -> Option<f64> {
    for line in content.lines() {
        if !line.to_lowercase().contains("confidence") {
            continue;
        }
        for token in line.split(|c: char| !(c.is_ascii_digit() || c == '.')) {
            if token.is_empty() {
                continue;
            }
            if let Ok(value) = token.parse::<f64>() {
                let value = if value > 1.0 { value / 100.0 } else { value };
                if (0.0..=1.0).contains(&value) {
                    return Some(value);
                }
            }
        }
    }
    None
}

const EMERGENCY_MARKERS: [&str; 5] = ["critical", "emergency", "immediately", "stat", "unstable"];

fn detect_alerts(content: &str) -> Vec<String> {
    let lower = content.to_lowercase();
    if EMERGENCY_MARKERS.iter().any(|marker| lower.contains(marker)) {
        vec!["EMERGENCY INDICATORS DETECTED".to_string()]
    } else {
        Vec::new()
    }
}

/// Collect list items following any of the given headings: strip list
/// markers, keep lines longer than 10 chars, cap at 5.
fn extract_section(content: &str, headings: &[&str]) -> Vec<String> {
    let mut items = Vec::new();
    let mut in_section = false;
    for line in content.lines() {
        let upper = line.to_uppercase();
        if headings.iter().any(|heading| upper.contains(heading)) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        let trimmed = line.trim();
        if trimmed.is_empty() {
            if !items.is_empty() {
                break;
            }
            continue;
        }
        let cleaned = trimmed
            .trim_start_matches(|c: char| {
                c.is_ascii_digit() || matches!(c, '.' | '-' | '*' | '•' | ')' | ' ')
            })
            .trim_end_matches('*')
            .trim();
        if cleaned.len() > 10 {
            items.push(cleaned.to_string());
        }
        if items.len() >= 5 {
            break;
        }
    }
    items
}

#[cfg(test)]
mod tests {
    use super::*;
    use warroom_core::case::{PatientCase, Urgency};
    use warroom_core::messages::AgentMessage;

    fn chest_pain_case() -> PatientCase {
        PatientCase {
            chief_complaint: "crushing chest pain".to_string(),
            history: Some("hypertension".to_string()),
            vitals: None,
            labs: Vec::new(),
            imaging: None,
            medications: None,
            allergies: None,
            pmh: None,
            narrative: None,
        }
    }

    #[test]
    fn specialist_prompt_carries_persona_case_and_directive() {
        let case = chest_pain_case();
        let specialist = warroom_core::registry::get("cardiology").unwrap();
        let call = ResponderCall {
            role: ResponderRole::Specialist(specialist),
            case: &case,
            urgency: Urgency::Urgent,
            transcript: &[],
            phase: DiscussionPhase::Opening,
        };
        let prompt = build_prompt(&call);
        assert!(prompt.contains("Cardiology Specialist"));
        assert!(prompt.contains("cardiovascular medicine"));
        assert!(prompt.contains("CHIEF COMPLAINT: crushing chest pain"));
        assert!(prompt.contains("Urgency: urgent"));
        assert!(prompt.contains("initial assessment"));
        assert!(!prompt.contains("DISCUSSION SO FAR"));
    }

    #[test]
    fn specialist_prompt_includes_only_the_transcript_tail() {
        let case = chest_pain_case();
        let specialist = warroom_core::registry::get("infectious").unwrap();
        let transcript: Vec<AgentMessage> = (0..10)
            .map(|i| {
                AgentMessage::new(
                    "cardiology",
                    "Cardiology Specialist",
                    DiscussionPhase::Opening,
                    format!("opinion {i}"),
                )
            })
            .collect();
        let call = ResponderCall {
            role: ResponderRole::Specialist(specialist),
            case: &case,
            urgency: Urgency::Routine,
            transcript: &transcript,
            phase: DiscussionPhase::Debate,
        };
        let prompt = build_prompt(&call);
        assert!(prompt.contains("opinion 9"));
        assert!(prompt.contains("opinion 4"));
        assert!(!prompt.contains("opinion 3"));
        assert!(prompt.contains("disagree"));
    }

    #[test]
    fn synthesizer_prompt_lists_every_opinion() {
        let case = chest_pain_case();
        let transcript = vec![
            AgentMessage::new("cardiology", "Cardiology Specialist", DiscussionPhase::Opening, "ACS likely"),
            AgentMessage::new("infectious", "Infectious Disease Specialist", DiscussionPhase::Opening, "no infectious source"),
        ];
        let call = ResponderCall {
            role: ResponderRole::Synthesizer,
            case: &case,
            urgency: Urgency::Routine,
            transcript: &transcript,
            phase: DiscussionPhase::Consensus,
        };
        let prompt = build_prompt(&call);
        assert!(prompt.contains("PRIMARY DIAGNOSIS"));
        assert!(prompt.contains("IMMEDIATE ACTIONS"));
        assert!(prompt.contains("ACS likely"));
        assert!(prompt.contains("no infectious source"));
    }

    #[test]
    fn confidence_is_parsed_from_fractions_and_percentages() {
        assert_eq!(extract_confidence("Confidence: 0.85"), Some(0.85));
        assert_eq!(extract_confidence("My confidence is 85%"), Some(0.85));
        assert_eq!(extract_confidence("no number here"), None);
        assert_eq!(extract_confidence("confidence high"), None);
    }

    #[test]
    fn emergency_wording_raises_an_alert() {
        assert_eq!(
            detect_alerts("Patient is in critical condition"),
            vec!["EMERGENCY INDICATORS DETECTED".to_string()]
        );
        assert!(detect_alerts("Stable, follow up in clinic").is_empty());
    }

    #[test]
    fn section_extraction_strips_markers_and_caps_at_five() {
        let content = "Assessment text.\n\nRECOMMENDATIONS:\n\
                       1. Obtain serial troponins now\n\
                       2. Start aspirin and heparin drip\n\
                       3. Urgent cardiology consult today\n\
                       4. Continuous telemetry monitoring\n\
                       5. Repeat ECG in thirty minutes\n\
                       6. Echo in the morning as well\n";
        let items = extract_section(content, &["RECOMMENDATIONS"]);
        assert_eq!(items.len(), 5);
        assert_eq!(items[0], "Obtain serial troponins now");
        assert_eq!(items[4], "Repeat ECG in thirty minutes");
    }

    #[test]
    fn short_lines_are_not_recommendations() {
        let content = "RECOMMENDATIONS:\n- ECG\n- Obtain serial troponins now\n";
        let items = extract_section(content, &["RECOMMENDATIONS"]);
        assert_eq!(items, vec!["Obtain serial troponins now".to_string()]);
    }

    #[test]
    fn reply_carries_the_scanned_structure() {
        let content = "Likely ACS. Confidence: 0.9\n\nThis is an emergency.\n\n\
                       RECOMMENDATIONS:\n- Activate the cath lab immediately\n";
        let reply = reply_from_content(content.to_string());
        assert_eq!(reply.confidence, Some(0.9));
        assert_eq!(reply.alerts, vec!["EMERGENCY INDICATORS DETECTED".to_string()]);
        assert_eq!(reply.recommendations, vec!["Activate the cath lab immediately".to_string()]);
        assert!(reply.needs_more_info.is_empty());
    }

    #[test]
    fn config_defaults_point_at_cerebras() {
        let config = CerebrasConfig::new(SecretString::from("key".to_string()));
        assert_eq!(config.api_url, DEFAULT_API_URL);
        assert_eq!(config.model, DEFAULT_MODEL);
        assert_eq!(config.max_tokens, 2000);
        let config = config.with_model("llama-4-test");
        assert_eq!(config.model, "llama-4-test");
    }
}

#[cfg(all(test, feature = "integration"))]
mod integration_tests {
    use super::*;
    use warroom_core::case::{PatientCase, Urgency};

    // Requires CEREBRAS_API_KEY. Run with: cargo test --features integration
    #[tokio::test]
    async fn live_completion_round_trip() {
        let key = std::env::var("CEREBRAS_API_KEY").expect("CEREBRAS_API_KEY not set");
        let responder =
            CerebrasResponder::new(CerebrasConfig::new(SecretString::from(key))).unwrap();
        let case = PatientCase {
            chief_complaint: "fever and productive cough".to_string(),
            history: None,
            vitals: None,
            labs: Vec::new(),
            imaging: None,
            medications: None,
            allergies: None,
            pmh: None,
            narrative: None,
        };
        let call = ResponderCall {
            role: ResponderRole::Orchestrator,
            case: &case,
            urgency: Urgency::Routine,
            transcript: &[],
            phase: warroom_core::phases::DiscussionPhase::Triage,
        };
        let reply = responder.respond(call).await.unwrap();
        assert!(!reply.content.is_empty());
    }
}
