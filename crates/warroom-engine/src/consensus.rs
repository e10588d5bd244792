//! Consensus post-processing: turns the synthesizer's free-text reply
//! plus the transcript into the structured [`Consensus`] payload.

use std::cmp::Ordering;

use warroom_core::events::{Consensus, Differential, RiskLevel};
use warroom_core::messages::{AgentMessage, Transcript};
use warroom_core::registry::Specialist;

const CRITICAL_MARKERS: [&str; 5] = ["critical", "emergency", "immediate", "sepsis", "code"];
const HIGH_MARKERS: [&str; 3] = ["high risk", "urgent", "serious"];
const LOW_MARKERS: [&str; 3] = ["low risk", "stable", "benign"];

const ACTION_HEADINGS: [&str; 2] = ["IMMEDIATE ACTIONS", "TREATMENT PLAN"];
const MAX_ACTIONS: usize = 5;
const MIN_ACTION_LEN: usize = 10;

const DIFFERENTIAL_CONFIDENCE_FLOOR: f64 = 0.7;
const MAX_DIFFERENTIALS: usize = 3;
const SNIPPET_LEN: usize = 200;

const DEFAULT_CONFIDENCE: f64 = 0.75;

const FALLBACK_ACTIONS: [&str; 4] = [
    "Review detailed consensus above",
    "Initiate immediate diagnostic workup",
    "Monitor vital signs closely",
    "Consult appropriate specialists",
];

/// Build the structured consensus from the synthesizer's reply. The
/// reply text becomes the summary verbatim; everything else is
/// extracted deterministically from it or from the transcript.
pub fn consensus_from_text(
    text: String,
    transcript: &Transcript,
    panel: &[&'static Specialist],
) -> Consensus {
    Consensus {
        primary_diagnosis: extract_primary_diagnosis(&text),
        differential_diagnoses: differentials_from(transcript),
        risk_level: extract_risk(&text),
        recommended_actions: extract_actions(&text),
        confidence: transcript.mean_confidence().unwrap_or(DEFAULT_CONFIDENCE),
        participating_agents: panel.iter().map(|s| s.id.to_string()).collect(),
        summary: text,
    }
}

fn extract_risk(text: &str) -> RiskLevel {
    let lower = text.to_lowercase();
    if CRITICAL_MARKERS.iter().any(|m| lower.contains(m)) {
        RiskLevel::Critical
    } else if HIGH_MARKERS.iter().any(|m| lower.contains(m)) {
        RiskLevel::High
    } else if LOW_MARKERS.iter().any(|m| lower.contains(m)) {
        RiskLevel::Low
    } else {
        RiskLevel::Moderate
    }
}

/// Collect list items under an actions heading. Blank lines inside the
/// section are skipped, not terminating, so loosely formatted replies
/// still parse.
fn extract_actions(text: &str) -> Vec<String> {
    let mut actions = Vec::new();
    let mut in_section = false;
    for line in text.lines() {
        let upper = line.to_uppercase();
        if ACTION_HEADINGS.iter().any(|h| upper.contains(h)) {
            in_section = true;
            continue;
        }
        if !in_section {
            continue;
        }
        let cleaned = clean_list_item(line);
        if cleaned.len() > MIN_ACTION_LEN {
            actions.push(cleaned.to_string());
        }
        if actions.len() >= MAX_ACTIONS {
            break;
        }
    }
    if actions.is_empty() {
        FALLBACK_ACTIONS.iter().map(|s| s.to_string()).collect()
    } else {
        actions
    }
}

/// Prefers the text on the heading line itself (after a colon), falls
/// back to the following line, then to the reply's first line.
fn extract_primary_diagnosis(text: &str) -> String {
    let lines: Vec<&str> = text.lines().collect();
    for (idx, line) in lines.iter().enumerate() {
        if !line.to_uppercase().contains("PRIMARY DIAGNOSIS") {
            continue;
        }
        if let Some((_, rest)) = line.split_once(':') {
            let inline = clean_list_item(rest);
            if inline.len() >= MIN_ACTION_LEN {
                return inline.to_string();
            }
        }
        if let Some(next) = lines.get(idx + 1) {
            let cleaned = clean_list_item(next);
            if cleaned.len() >= MIN_ACTION_LEN {
                return cleaned.to_string();
            }
        }
        return snippet(lines.first().unwrap_or(&""), SNIPPET_LEN);
    }
    "See detailed analysis".to_string()
}

/// High-confidence specialist assessments become the differential
/// list, strongest first.
fn differentials_from(transcript: &Transcript) -> Vec<Differential> {
    let mut candidates: Vec<&AgentMessage> = transcript
        .messages()
        .iter()
        .filter(|m| m.confidence.map_or(false, |c| c > DIFFERENTIAL_CONFIDENCE_FLOOR))
        .collect();
    candidates.sort_by(|a, b| {
        b.confidence
            .partial_cmp(&a.confidence)
            .unwrap_or(Ordering::Equal)
    });
    candidates
        .into_iter()
        .take(MAX_DIFFERENTIALS)
        .map(|m| Differential {
            diagnosis: snippet(&m.content, SNIPPET_LEN),
            probability: m.confidence.unwrap_or(DEFAULT_CONFIDENCE),
            reasoning: format!("Assessment from {}", m.agent_name),
        })
        .collect()
}

fn clean_list_item(line: &str) -> &str {
    line.trim()
        .trim_start_matches(|c: char| {
            c.is_ascii_digit() || matches!(c, '.' | '-' | '*' | '•' | ')' | ' ')
        })
        .trim_end_matches('*')
        .trim()
}

fn snippet(text: &str, max_chars: usize) -> String {
    text.trim().chars().take(max_chars).collect()
}

#[cfg(test)]
mod tests {
    use super::*;
    use warroom_core::phases::DiscussionPhase;
    use warroom_core::registry;

    fn transcript_with(entries: &[(&str, &str, Option<f64>)]) -> Transcript {
        let mut transcript = Transcript::new();
        for (agent_id, content, confidence) in entries {
            let mut message = AgentMessage::new(
                *agent_id,
                format!("{agent_id} name"),
                DiscussionPhase::Opening,
                *content,
            );
            if let Some(c) = confidence {
                message = message.with_confidence(*c);
            }
            transcript.push(message);
        }
        transcript
    }

    fn panel() -> Vec<&'static Specialist> {
        ["cardiology", "pulmonology"]
            .iter()
            .filter_map(|id| registry::get(id))
            .collect()
    }

    #[test]
    fn risk_tiers_resolve_in_priority_order() {
        assert_eq!(extract_risk("Possible sepsis, start antibiotics"), RiskLevel::Critical);
        assert_eq!(extract_risk("This is a high risk presentation"), RiskLevel::High);
        assert_eq!(extract_risk("Patient is stable for discharge"), RiskLevel::Low);
        assert_eq!(extract_risk("Unremarkable workup so far"), RiskLevel::Moderate);
        // Critical markers outrank the rest even when both appear.
        assert_eq!(extract_risk("Serious but not an emergency"), RiskLevel::Critical);
    }

    #[test]
    fn actions_parsed_from_the_heading_section() {
        let text = "RISK ASSESSMENT: moderate\n\
                    IMMEDIATE ACTIONS:\n\
                    1. Obtain serial troponins every 3 hours\n\
                    \n\
                    2. Start continuous telemetry monitoring\n\
                    - tiny\n\
                    3. Repeat ECG in 30 minutes for comparison";
        let actions = extract_actions(text);
        assert_eq!(
            actions,
            vec![
                "Obtain serial troponins every 3 hours",
                "Start continuous telemetry monitoring",
                "Repeat ECG in 30 minutes for comparison",
            ]
        );
    }

    #[test]
    fn actions_capped_at_five() {
        let items: Vec<String> = (0..8)
            .map(|i| format!("{i}. Perform follow-up intervention number {i}"))
            .collect();
        let text = format!("TREATMENT PLAN:\n{}", items.join("\n"));
        assert_eq!(extract_actions(&text).len(), MAX_ACTIONS);
    }

    #[test]
    fn missing_actions_fall_back_to_generics() {
        let actions = extract_actions("No structured sections in this reply.");
        assert_eq!(actions.len(), FALLBACK_ACTIONS.len());
        assert_eq!(actions[0], "Review detailed consensus above");
    }

    #[test]
    fn primary_diagnosis_from_the_heading_line() {
        let text = "1. **PRIMARY DIAGNOSIS**: Acute coronary syndrome (70%)\n\
                    2. **DIFFERENTIAL DIAGNOSES**";
        assert_eq!(
            extract_primary_diagnosis(text),
            "Acute coronary syndrome (70%)"
        );
    }

    #[test]
    fn primary_diagnosis_from_the_following_line() {
        let text = "PRIMARY DIAGNOSIS\n- Community acquired pneumonia with early sepsis";
        assert_eq!(
            extract_primary_diagnosis(text),
            "Community acquired pneumonia with early sepsis"
        );
    }

    #[test]
    fn unusable_diagnosis_lines_fall_back_to_the_first_line() {
        let text = "Team review of a complex febrile presentation\n\
                    PRIMARY DIAGNOSIS\n\
                    - TBD";
        assert_eq!(
            extract_primary_diagnosis(text),
            "Team review of a complex febrile presentation"
        );
        assert_eq!(
            extract_primary_diagnosis("no headings at all"),
            "See detailed analysis"
        );
    }

    #[test]
    fn differentials_ranked_by_confidence() {
        let transcript = transcript_with(&[
            ("cardiology", "ACS most likely given troponin trend", Some(0.8)),
            ("pulmonology", "PE cannot be excluded", Some(0.95)),
            ("infectious", "Low suspicion for infection", Some(0.4)),
            ("nephrology", "No renal involvement", None),
        ]);
        let differentials = differentials_from(&transcript);
        assert_eq!(differentials.len(), 2);
        assert_eq!(differentials[0].diagnosis, "PE cannot be excluded");
        assert!((differentials[0].probability - 0.95).abs() < f64::EPSILON);
        assert_eq!(differentials[1].reasoning, "Assessment from cardiology name");
    }

    #[test]
    fn consensus_assembles_all_parts() {
        let transcript = transcript_with(&[
            ("cardiology", "ACS with ongoing ischemia", Some(0.9)),
            ("pulmonology", "Secondary hypoxia", Some(0.6)),
        ]);
        let text = "PRIMARY DIAGNOSIS: Acute coronary syndrome, evolving\n\
                    IMMEDIATE ACTIONS:\n\
                    1. Activate the cath lab immediately"
            .to_string();
        let consensus = consensus_from_text(text.clone(), &transcript, &panel());

        assert_eq!(consensus.summary, text);
        assert_eq!(consensus.primary_diagnosis, "Acute coronary syndrome, evolving");
        assert_eq!(consensus.risk_level, RiskLevel::Critical);
        assert_eq!(consensus.recommended_actions, vec!["Activate the cath lab immediately"]);
        assert_eq!(consensus.differential_diagnoses.len(), 1);
        assert!((consensus.confidence - 0.75).abs() < f64::EPSILON);
        assert_eq!(consensus.participating_agents, vec!["cardiology", "pulmonology"]);
    }

    #[test]
    fn empty_transcript_uses_default_confidence() {
        let consensus = consensus_from_text("plain".to_string(), &Transcript::new(), &panel());
        assert!((consensus.confidence - DEFAULT_CONFIDENCE).abs() < f64::EPSILON);
        assert!(consensus.differential_diagnoses.is_empty());
    }
}
