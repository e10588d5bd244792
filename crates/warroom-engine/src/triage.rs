//! Turns the orchestrator's free-text triage reply into a structured
//! summary the selector can act on.

use warroom_core::case::Urgency;
use warroom_core::events::TriageSummary;

const MAX_KEY_FINDINGS: usize = 5;

/// Keyword to specialist id. Multiple keywords may map to the same
/// specialist; the earliest mention wins for ordering.
const SPECIALTY_KEYWORDS: [(&str, &str); 49] = [
    ("cardiology", "cardiology"),
    ("cardiac", "cardiology"),
    ("heart", "cardiology"),
    ("neurology", "neurology"),
    ("neuro", "neurology"),
    ("brain", "neurology"),
    ("stroke", "neurology"),
    ("pulmonology", "pulmonology"),
    ("pulmonary", "pulmonology"),
    ("lung", "pulmonology"),
    ("respiratory", "pulmonology"),
    ("pneumonia", "pulmonology"),
    ("hepatology", "hepatology"),
    ("liver", "hepatology"),
    ("hepatic", "hepatology"),
    ("gastroenterology", "gastroenterology"),
    ("gi", "gastroenterology"),
    ("digestive", "gastroenterology"),
    ("abdominal", "gastroenterology"),
    ("nephrology", "nephrology"),
    ("kidney", "nephrology"),
    ("renal", "nephrology"),
    ("infectious", "infectious"),
    ("infection", "infectious"),
    ("sepsis", "infectious"),
    ("endocrinology", "endocrinology"),
    ("endocrine", "endocrinology"),
    ("thyroid", "endocrinology"),
    ("diabetes", "endocrinology"),
    ("hematology", "hematology"),
    ("anemia", "hematology"),
    ("coagulation", "hematology"),
    ("bleeding", "hematology"),
    ("oncology", "oncology"),
    ("cancer", "oncology"),
    ("malignancy", "oncology"),
    ("tumor", "oncology"),
    ("orthopedics", "orthopedics"),
    ("orthopedic", "orthopedics"),
    ("fracture", "orthopedics"),
    ("differential", "differential_dx"),
    ("drug interaction", "drug_interaction"),
    ("polypharmacy", "drug_interaction"),
    ("lab", "lab_interpreter"),
    ("laboratory", "lab_interpreter"),
    ("radiology", "radiology"),
    ("imaging", "radiology"),
    ("x-ray", "radiology"),
    ("ct", "radiology"),
];

/// Parse the orchestrator's reply. Specialists are ordered by their
/// first mention in the text so panel selection stays deterministic.
/// The urgency is carried through from the request, never inferred.
pub fn parse_triage(content: &str, urgency: Urgency) -> TriageSummary {
    let lower = content.to_lowercase();
    let mut hits: Vec<(usize, &str)> = Vec::new();
    for (keyword, agent_id) in SPECIALTY_KEYWORDS {
        if let Some(pos) = keyword_position(&lower, keyword) {
            match hits.iter_mut().find(|(_, id)| *id == agent_id) {
                Some(entry) => entry.0 = entry.0.min(pos),
                None => hits.push((pos, agent_id)),
            }
        }
    }
    hits.sort_by_key(|(pos, _)| *pos);

    TriageSummary {
        relevant_agents: hits.into_iter().map(|(_, id)| id.to_string()).collect(),
        urgency_level: urgency,
        key_findings: extract_key_findings(content),
        initial_assessment: content.trim().to_string(),
    }
}

/// Short tokens like "gi" or "ct" only count as standalone words,
/// otherwise "imaging" would select gastroenterology.
fn keyword_position(lower: &str, keyword: &str) -> Option<usize> {
    if keyword.len() > 3 {
        return lower.find(keyword);
    }
    lower.match_indices(keyword).find_map(|(idx, matched)| {
        let before = lower[..idx].chars().next_back();
        let after = lower[idx + matched.len()..].chars().next();
        let bounded = |c: Option<char>| c.map_or(true, |c| !c.is_ascii_alphanumeric());
        (bounded(before) && bounded(after)).then_some(idx)
    })
}

fn extract_key_findings(content: &str) -> Vec<String> {
    content
        .lines()
        .map(str::trim)
        .filter_map(|line| {
            let stripped = line.strip_prefix(['-', '*', '•'])?;
            let finding = stripped.trim_start_matches(['-', '*', '•', ' ']).trim();
            (!finding.is_empty()).then(|| finding.to_string())
        })
        .take(MAX_KEY_FINDINGS)
        .collect()
}
