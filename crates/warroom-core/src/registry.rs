//! Static specialist catalog.
//!
//! Fifteen consultable specialists across three domains. Ids are the
//! stable wire identifiers; display names appear in events; the focus
//! line seeds the responder persona.

use serde::{Deserialize, Serialize};

#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Domain {
    /// Single organ-system specialties.
    Organ,
    /// Cross-cutting clinical systems.
    System,
    /// Diagnostic and interpretive services.
    Diagnostic,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct Specialist {
    pub id: &'static str,
    pub name: &'static str,
    pub domain: Domain,
    pub focus: &'static str,
}

pub static SPECIALISTS: [Specialist; 15] = [
    Specialist {
        id: "cardiology",
        name: "Cardiology Specialist",
        domain: Domain::Organ,
        focus: "cardiovascular medicine, heart conditions, and cardiac emergencies",
    },
    Specialist {
        id: "pulmonology",
        name: "Pulmonology Specialist",
        domain: Domain::Organ,
        focus: "respiratory conditions, lung disease, and critical care",
    },
    Specialist {
        id: "neurology",
        name: "Neurology Specialist",
        domain: Domain::Organ,
        focus: "neurological disorders, stroke, and CNS conditions",
    },
    Specialist {
        id: "nephrology",
        name: "Nephrology Specialist",
        domain: Domain::Organ,
        focus: "kidney disease and electrolyte disorders",
    },
    Specialist {
        id: "gastroenterology",
        name: "Gastroenterology Specialist",
        domain: Domain::Organ,
        focus: "digestive system and GI disorders",
    },
    Specialist {
        id: "hepatology",
        name: "Hepatology Specialist",
        domain: Domain::Organ,
        focus: "liver diseases and transplantation",
    },
    Specialist {
        id: "endocrinology",
        name: "Endocrinology Specialist",
        domain: Domain::System,
        focus: "diabetes, thyroid, and hormonal disorders",
    },
    Specialist {
        id: "hematology",
        name: "Hematology Specialist",
        domain: Domain::System,
        focus: "blood disorders and malignancies",
    },
    Specialist {
        id: "infectious",
        name: "Infectious Disease Specialist",
        domain: Domain::System,
        focus: "sepsis, infections, and antimicrobial therapy",
    },
    Specialist {
        id: "oncology",
        name: "Oncology Specialist",
        domain: Domain::System,
        focus: "cancer diagnosis and treatment",
    },
    Specialist {
        id: "orthopedics",
        name: "Orthopedics Specialist",
        domain: Domain::System,
        focus: "musculoskeletal disorders",
    },
    Specialist {
        id: "differential_dx",
        name: "Differential Diagnosis Specialist",
        domain: Domain::Diagnostic,
        focus: "comprehensive differential diagnosis",
    },
    Specialist {
        id: "drug_interaction",
        name: "Drug Interaction Specialist",
        domain: Domain::Diagnostic,
        focus: "drug interactions and medication safety",
    },
    Specialist {
        id: "lab_interpreter",
        name: "Laboratory Medicine Specialist",
        domain: Domain::Diagnostic,
        focus: "laboratory medicine and diagnostic test interpretation",
    },
    Specialist {
        id: "radiology",
        name: "Radiology Specialist",
        domain: Domain::Diagnostic,
        focus: "imaging interpretation and recommendations",
    },
];

pub fn all() -> &'static [Specialist] {
    &SPECIALISTS
}

pub fn get(id: &str) -> Option<&'static Specialist> {
    SPECIALISTS.iter().find(|s| s.id == id)
}

pub fn is_known(id: &str) -> bool {
    get(id).is_some()
}
