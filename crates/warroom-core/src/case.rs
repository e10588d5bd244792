//! Patient case model and request validation.
//!
//! Wire field names are camelCase to match the discussion protocol. A
//! request is validated and lightly structured before a run starts, so
//! bad input is rejected with a plain client error rather than a broken
//! event stream.

use serde::{Deserialize, Serialize};

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
pub struct Vitals {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub bp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub hr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub temp: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub rr: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub spo2: Option<String>,
}

impl Vitals {
    fn pairs(&self) -> Vec<(&'static str, &str)> {
        [
            ("bp", &self.bp),
            ("hr", &self.hr),
            ("temp", &self.temp),
            ("rr", &self.rr),
            ("spo2", &self.spo2),
        ]
        .into_iter()
        .filter_map(|(k, v)| v.as_deref().map(|v| (k, v)))
        .collect()
    }
}

#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LabResult {
    pub name: String,
    pub value: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub unit: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub flag: Option<String>,
}

#[derive(Clone, Debug, Default, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PatientCase {
    pub chief_complaint: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub history: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub vitals: Option<Vitals>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub labs: Vec<LabResult>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub imaging: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub medications: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub allergies: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub pmh: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub narrative: Option<String>,
}

impl PatientCase {
    /// Compact text block used in responder prompts.
    pub fn summary(&self) -> String {
        let mut parts = vec![format!("CHIEF COMPLAINT: {}", self.chief_complaint)];
        if let Some(history) = &self.history {
            parts.push(format!("HISTORY: {history}"));
        }
        if let Some(vitals) = &self.vitals {
            let pairs = vitals.pairs();
            if !pairs.is_empty() {
                let rendered: Vec<String> =
                    pairs.iter().map(|(k, v)| format!("{k}: {v}")).collect();
                parts.push(format!("VITALS: {}", rendered.join(", ")));
            }
        }
        if !self.labs.is_empty() {
            let rows: Vec<String> = self
                .labs
                .iter()
                .map(|lab| {
                    format!(
                        "  - {}: {} {} [{}]",
                        lab.name,
                        lab.value,
                        lab.unit.as_deref().unwrap_or(""),
                        lab.flag.as_deref().unwrap_or("normal"),
                    )
                })
                .collect();
            parts.push(format!("LABS:\n{}", rows.join("\n")));
        }
        if let Some(imaging) = &self.imaging {
            parts.push(format!("IMAGING: {imaging}"));
        }
        if let Some(medications) = &self.medications {
            parts.push(format!("MEDICATIONS: {medications}"));
        }
        if let Some(allergies) = &self.allergies {
            parts.push(format!("ALLERGIES: {allergies}"));
        }
        if let Some(pmh) = &self.pmh {
            parts.push(format!("PAST MEDICAL HISTORY: {pmh}"));
        }
        if let Some(narrative) = &self.narrative {
            parts.push(format!("NOTES: {narrative}"));
        }
        parts.join("\n\n")
    }
}

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Urgency {
    #[default]
    Routine,
    Urgent,
    Emergent,
}

impl Urgency {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Routine => "routine",
            Self::Urgent => "urgent",
            Self::Emergent => "emergent",
        }
    }
}

impl std::fmt::Display for Urgency {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, thiserror::Error, PartialEq, Eq)]
pub enum CaseError {
    #[error("chief complaint is required")]
    MissingChiefComplaint,
}

/// Inbound discussion request.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DiscussionRequest {
    pub case: PatientCase,
    #[serde(default)]
    pub urgency: Urgency,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub focus_area: Option<String>,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub exclude_agents: Vec<String>,
}

impl DiscussionRequest {
    /// Validate and lightly structure the request. Text fields are
    /// trimmed, empty optionals collapse to `None`, lab rows without a
    /// name are dropped, exclusion ids are lowercased. A request without
    /// a chief complaint is rejected here, before any stream output.
    pub fn normalize(mut self) -> Result<Self, CaseError> {
        self.case.chief_complaint = self.case.chief_complaint.trim().to_string();
        if self.case.chief_complaint.is_empty() {
            return Err(CaseError::MissingChiefComplaint);
        }

        for field in [
            &mut self.case.history,
            &mut self.case.imaging,
            &mut self.case.medications,
            &mut self.case.allergies,
            &mut self.case.pmh,
            &mut self.case.narrative,
            &mut self.focus_area,
        ] {
            if let Some(value) = field {
                let trimmed = value.trim();
                *field = if trimmed.is_empty() {
                    None
                } else {
                    Some(trimmed.to_string())
                };
            }
        }

        self.case.labs.retain(|lab| !lab.name.trim().is_empty());
        for lab in &mut self.case.labs {
            lab.name = lab.name.trim().to_string();
        }

        self.exclude_agents = self
            .exclude_agents
            .iter()
            .map(|id| id.trim().to_lowercase())
            .filter(|id| !id.is_empty())
            .collect();

        Ok(self)
    }
}
