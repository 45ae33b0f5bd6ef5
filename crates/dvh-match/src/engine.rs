//! The reference matching engine.
//!
//! Resolution precedence, stopping at the first success:
//!
//! 1. exact name lookup in the plan's elements of the reference's type;
//! 2. laterality-pattern lookup with the reference name as base, only when
//!    the reference carries a laterality;
//! 3. alias lookup over the combined inline and global alias sets.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};

use tracing::debug;

use dvh_model::{ElementType, Plan};

use crate::laterality::{ItemLaterality, LateralityTables, format_pattern};
use crate::types::{Alias, MatchMethod, MatchedElement, PlanReference};

/// Key into the global alias table.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct AliasKey {
    pub element_type: ElementType,
    pub name: String,
    pub laterality: Option<ItemLaterality>,
}

/// Global alias table: aliases shared by every report that binds the same
/// `(type, name, laterality)` reference.
pub type AliasTable = BTreeMap<AliasKey, Vec<Alias>>;

/// Serde-friendly form of one global alias table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AliasTableEntry {
    pub element_type: ElementType,
    pub name: String,
    #[serde(default)]
    pub laterality: Option<ItemLaterality>,
    pub aliases: Vec<Alias>,
}

/// Builds the runtime alias table from its on-disk rows.
pub fn build_alias_table(entries: Vec<AliasTableEntry>) -> AliasTable {
    let mut table = AliasTable::new();
    for entry in entries {
        let key = AliasKey {
            element_type: entry.element_type,
            name: entry.name,
            laterality: entry.laterality,
        };
        table.entry(key).or_default().extend(entry.aliases);
    }
    table
}

/// Resolves report references against a plan's element collections.
pub struct ReferenceMatcher {
    aliases: AliasTable,
    laterality: LateralityTables,
}

impl ReferenceMatcher {
    pub fn new(aliases: AliasTable, laterality: LateralityTables) -> Self {
        Self { aliases, laterality }
    }

    pub fn laterality_tables(&self) -> &LateralityTables {
        &self.laterality
    }

    /// Resolves one reference; returns the matched element or `None` when
    /// every step is exhausted. An unmatched reference is a first-class
    /// outcome for operator review, not an error.
    pub fn match_reference(
        &self,
        reference: &PlanReference,
        plan: &Plan,
    ) -> Option<MatchedElement> {
        let element_type = reference.reference_type;

        // Step 1: exact name.
        if plan.contains(element_type, &reference.reference_name) {
            debug!(name = %reference.reference_name, "matched by exact name");
            return Some(MatchedElement::new(element_type, &reference.reference_name));
        }

        // Step 2: laterality pattern, only for lateralized references.
        if let Some(item_laterality) = reference.reference_laterality
            && let Some(name) = self.laterality.resolve(
                &reference.reference_name,
                item_laterality,
                element_type,
                plan,
            )
        {
            debug!(base = %reference.reference_name, %name, "matched by laterality pattern");
            return Some(MatchedElement::new(element_type, name));
        }

        // Step 3: aliases, exhaustively in insertion order.
        for alias in self.collect_aliases(reference) {
            if let Some(name) = self.try_alias(&alias, reference, plan) {
                debug!(pattern = %alias.pattern, %name, "matched by alias");
                return Some(MatchedElement::new(element_type, name));
            }
        }
        None
    }

    /// Resolves the reference and writes the outcome back: a hit sets the
    /// binding with [`MatchMethod::Auto`], a miss leaves it unmatched.
    /// Returns whether the reference is now matched.
    pub fn apply(&self, reference: &mut PlanReference, plan: &Plan) -> bool {
        match self.match_reference(reference, plan) {
            Some(matched) => {
                reference.matched = Some(matched);
                reference.match_method = MatchMethod::Auto;
                true
            }
            None => {
                reference.matched = None;
                reference.match_method = MatchMethod::None;
                false
            }
        }
    }

    fn try_alias(
        &self,
        alias: &Alias,
        reference: &PlanReference,
        plan: &Plan,
    ) -> Option<String> {
        let element_type = reference.reference_type;
        match alias.indicator_size {
            // Unsized: direct lookup, then laterality resolution over the
            // alias text as base.
            None => {
                if plan.contains(element_type, &alias.pattern) {
                    return Some(alias.pattern.clone());
                }
                let item_laterality = reference.reference_laterality?;
                self.laterality
                    .resolve(&alias.pattern, item_laterality, element_type, plan)
            }
            // Sized: resolved through the indicator table directly. A pair
            // with no table entry silently yields no match.
            Some(size) => {
                let item_laterality = reference.reference_laterality?;
                let indicator =
                    self.laterality
                        .indicator(plan.laterality, item_laterality, size)?;
                let candidate =
                    format_pattern(&alias.pattern, &reference.reference_name, indicator);
                plan.contains(element_type, &candidate).then_some(candidate)
            }
        }
    }

    /// Inline aliases plus the global table entry for this reference's key,
    /// unless the inline list replaces the global one. Duplicate-insensitive,
    /// insertion order preserved.
    fn collect_aliases(&self, reference: &PlanReference) -> Vec<Alias> {
        let mut seen = BTreeSet::new();
        let mut combined = Vec::new();
        let mut push = |alias: &Alias| {
            if seen.insert(alias.clone()) {
                combined.push(alias.clone());
            }
        };
        for alias in &reference.aliases {
            push(alias);
        }
        if !reference.replace_global_aliases {
            let key = AliasKey {
                element_type: reference.reference_type,
                name: reference.reference_name.clone(),
                laterality: reference.reference_laterality,
            };
            if let Some(global) = self.aliases.get(&key) {
                for alias in global {
                    push(alias);
                }
            }
        }
        combined
    }
}

impl Default for ReferenceMatcher {
    fn default() -> Self {
        Self::new(AliasTable::new(), LateralityTables::default())
    }
}
