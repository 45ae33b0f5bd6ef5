//! The ordered collection of report items and its batch operations.

use serde::{Deserialize, Serialize};

use tracing::warn;

use dvh_match::{MatchMethod, PlanReference, ReferenceMatcher};
use dvh_model::{Plan, Unit};

use crate::history::{ChangeOrigin, MatchHistory, MatchHistoryEntry};
use crate::values::{ResolvedValue, resolve_value};

/// Where a resolved value lands in the spreadsheet, written by an external
/// collaborator.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CellTarget {
    /// Cell address, e.g. `"C12"`.
    pub address: String,
    /// Number format of the cell; a percent format makes the writer divide
    /// the value by 100.
    #[serde(default)]
    pub number_format: Option<String>,
}

/// One report item: its reference into the plan, an optional spreadsheet
/// target, and the value resolved by [`Report::get_values`].
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ReportElement {
    pub name: String,
    #[serde(default)]
    pub label: String,
    #[serde(default)]
    pub category: String,
    pub reference: PlanReference,
    #[serde(default)]
    pub target: Option<CellTarget>,
    /// Unit the report wants the value in; `None` keeps the plan's unit.
    #[serde(default)]
    pub unit: Option<Unit>,
    #[serde(default)]
    pub value: Option<ResolvedValue>,
}

impl ReportElement {
    pub fn new(name: impl Into<String>, reference: PlanReference) -> Self {
        Self {
            name: name.into(),
            label: String::new(),
            category: String::new(),
            reference,
            target: None,
            unit: None,
            value: None,
        }
    }

    /// Whether this element is settled: bound to a plan element or carrying
    /// a directly entered value.
    pub fn is_resolved(&self) -> bool {
        self.reference.is_matched() || self.reference.match_method == MatchMethod::DirectEntry
    }
}

/// Matched/unmatched element names after a batch match, for operator display.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct MatchSummary {
    pub matched: Vec<String>,
    pub unmatched: Vec<String>,
}

/// An ordered report bound to plans one at a time.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Report {
    pub name: String,
    pub elements: Vec<ReportElement>,
    #[serde(default)]
    history: MatchHistory,
}

impl Report {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            elements: Vec::new(),
            history: MatchHistory::default(),
        }
    }

    pub fn push_element(&mut self, element: ReportElement) {
        self.elements.push(element);
    }

    pub fn element(&self, name: &str) -> Option<&ReportElement> {
        self.elements.iter().find(|element| element.name == name)
    }

    pub fn history(&self) -> &MatchHistory {
        &self.history
    }

    /// Current matched/unmatched partition without re-matching.
    pub fn summary(&self) -> MatchSummary {
        let mut summary = MatchSummary::default();
        for element in &self.elements {
            if element.is_resolved() {
                summary.matched.push(element.name.clone());
            } else {
                summary.unmatched.push(element.name.clone());
            }
        }
        summary
    }

    /// Runs the matcher over every element's reference, recording each
    /// transition in the history. Unmatched references are reported, not
    /// errors; processing never stops early.
    pub fn match_elements(&mut self, matcher: &ReferenceMatcher, plan: &Plan) -> MatchSummary {
        let mut summary = MatchSummary::default();
        for element in &mut self.elements {
            let old = element.reference.clone();
            let matched = matcher.apply(&mut element.reference, plan);
            if element.reference != old {
                self.history.push(MatchHistoryEntry {
                    element: element.name.clone(),
                    origin: ChangeOrigin::Automatic,
                    old,
                    new: element.reference.clone(),
                });
            }
            if matched {
                summary.matched.push(element.name.clone());
            } else {
                summary.unmatched.push(element.name.clone());
            }
        }
        summary
    }

    /// Resolves values for every settled element against the current plan.
    /// Per-element failures become `Unconvertible`/`Undefined` markers; the
    /// rest of the report is always processed.
    pub fn get_values(&mut self, plan: &Plan) {
        for element in &mut self.elements {
            element.value = resolve_value(&element.reference, element.unit, plan);
        }
    }

    /// Applies a manual override to one element's reference: clearing the
    /// match, entering a value directly, or binding an explicitly chosen
    /// plan element by type and name. This is the only producer of the
    /// `Manual`, `DirectEntry` and operator-cleared `None` states. Every
    /// call is appended to the history.
    ///
    /// Returns `false` when no element has that name.
    pub fn update_ref(
        &mut self,
        element_name: &str,
        new_reference: PlanReference,
        plan: &Plan,
    ) -> bool {
        let Some(element) = self
            .elements
            .iter_mut()
            .find(|element| element.name == element_name)
        else {
            warn!(element = element_name, "update_ref for unknown element");
            return false;
        };
        let old = element.reference.clone();
        let mut applied = new_reference;
        match applied.match_method {
            MatchMethod::Manual => {
                // Re-resolve the chosen element against the current plan.
                let exists = applied
                    .matched
                    .as_ref()
                    .is_some_and(|matched| plan.contains(matched.element_type, &matched.name));
                if !exists {
                    if let Some(matched) = &applied.matched {
                        warn!(name = %matched.name, "manually chosen element not in plan");
                    }
                    applied.clear_match();
                }
            }
            MatchMethod::DirectEntry => {
                applied.matched = None;
            }
            MatchMethod::None => {
                applied.clear_match();
            }
            MatchMethod::Auto => {}
        }
        element.reference = applied.clone();
        element.value = None;
        self.history.push(MatchHistoryEntry {
            element: element_name.to_string(),
            origin: ChangeOrigin::Operator,
            old,
            new: applied,
        });
        true
    }
}
