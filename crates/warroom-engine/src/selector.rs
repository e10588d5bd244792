//! Panel selection: maps the triage summary to concrete specialists,
//! applies caller exclusions, and enforces panel size bounds.

use tracing::{debug, warn};
use warroom_core::events::TriageSummary;
use warroom_core::registry::{self, Specialist};

/// Substituted whenever triage plus exclusions leave fewer than
/// [`MIN_PANEL`] specialists. Order is fixed.
pub const DEFAULT_PANEL: [&str; 3] = ["lab_interpreter", "cardiology", "infectious"];

pub const MIN_PANEL: usize = 2;
pub const MAX_PANEL: usize = 5;

/// Build the speaking panel from triage output. Preserves first-seen
/// order, drops ids the registry does not know, and drops excluded
/// ids. A panel that ends up below [`MIN_PANEL`] is replaced by
/// [`DEFAULT_PANEL`] wholesale so the debate phase always has at
/// least two viewpoints.
pub fn select_panel(triage: &TriageSummary, exclude: &[String]) -> Vec<&'static Specialist> {
    let mut panel: Vec<&'static Specialist> = Vec::new();
    for agent_id in &triage.relevant_agents {
        let Some(specialist) = registry::get(agent_id) else {
            debug!(agent_id = %agent_id, "triage named an unknown specialist, skipping");
            continue;
        };
        if exclude.iter().any(|e| e == specialist.id) {
            continue;
        }
        if panel.iter().any(|s| s.id == specialist.id) {
            continue;
        }
        panel.push(specialist);
    }

    if panel.len() < MIN_PANEL {
        warn!(
            candidates = panel.len(),
            "too few specialists after triage, substituting default panel"
        );
        panel = DEFAULT_PANEL.iter().filter_map(|id| registry::get(id)).collect();
    }

    panel.truncate(MAX_PANEL);
    panel
}
