//! Append-only log of match-state transitions.
//!
//! The history exists so manual corrections survive a plan reload: after the
//! plan is re-parsed, automatic matching runs again and the operator's
//! recorded decisions are replayed on top, in original order.

use serde::{Deserialize, Serialize};

use dvh_match::{PlanReference, ReferenceMatcher};
use dvh_model::Plan;

use crate::report::{MatchSummary, Report};

/// Who caused a transition: the matching engine or the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum ChangeOrigin {
    Automatic,
    Operator,
}

/// One recorded transition of a report element's reference.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MatchHistoryEntry {
    /// Name of the report element the reference belongs to.
    pub element: String,
    pub origin: ChangeOrigin,
    pub old: PlanReference,
    pub new: PlanReference,
}

/// Append-only match history.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchHistory {
    entries: Vec<MatchHistoryEntry>,
}

impl MatchHistory {
    pub fn push(&mut self, entry: MatchHistoryEntry) {
        self.entries.push(entry);
    }

    pub fn entries(&self) -> &[MatchHistoryEntry] {
        &self.entries
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entries that actually changed the reference.
    pub fn changed(&self) -> impl Iterator<Item = &MatchHistoryEntry> {
        self.entries.iter().filter(|entry| entry.old != entry.new)
    }

    /// The operator decisions to replay after a plan reload, in original
    /// order.
    pub fn operator_changes(&self) -> Vec<(String, PlanReference)> {
        self.changed()
            .filter(|entry| entry.origin == ChangeOrigin::Operator)
            .map(|entry| (entry.element.clone(), entry.new.clone()))
            .collect()
    }
}

/// Re-runs automatic matching against a freshly loaded plan, then replays
/// every recorded operator change through [`Report::update_ref`]. This is the
/// recovery path for loading a corrected export after manual matching has
/// already been done once.
pub fn rerun_matching(
    report: &mut Report,
    matcher: &ReferenceMatcher,
    plan: &Plan,
) -> MatchSummary {
    let replay = report.history().operator_changes();
    report.match_elements(matcher, plan);
    for (element, reference) in replay {
        report.update_ref(&element, reference, plan);
    }
    report.summary()
}
