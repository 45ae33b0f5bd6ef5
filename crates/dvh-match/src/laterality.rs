//! Laterality resolution: turning a body-side-relative reference into the
//! decorated element name a plan actually uses.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use dvh_model::{ElementType, Laterality, Plan};

/// A report item's laterality, relative to the plan where needed.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ItemLaterality {
    Left,
    Right,
    Both,
    /// Same side as the plan.
    Ipsilateral,
    /// Opposite side from the plan.
    Contralateral,
}

impl fmt::Display for ItemLaterality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            ItemLaterality::Left => "Left",
            ItemLaterality::Right => "Right",
            ItemLaterality::Both => "Both",
            ItemLaterality::Ipsilateral => "Ipsilateral",
            ItemLaterality::Contralateral => "Contralateral",
        };
        write!(f, "{text}")
    }
}

/// One naming pattern tried during resolution, e.g. `"{base}_{indicator}"`
/// with indicator size 1 producing `"Lung_R"`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LateralityPattern {
    pub pattern: String,
    pub indicator_size: u8,
}

/// Formats a name pattern with the base name and side indicator.
pub fn format_pattern(pattern: &str, base: &str, indicator: &str) -> String {
    pattern
        .replace("{base}", base)
        .replace("{indicator}", indicator)
}

/// Serde-friendly form of one indicator table row.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndicatorEntry {
    pub plan: Laterality,
    pub item: ItemLaterality,
    pub size: u8,
    pub indicator: String,
}

/// On-disk form of the laterality configuration.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct LateralityDefinition {
    pub patterns: Vec<LateralityPattern>,
    pub indicators: Vec<IndicatorEntry>,
    #[serde(default)]
    pub region_exceptions: Vec<String>,
}

/// The lookup tables driving laterality resolution.
///
/// Missing-key behavior is part of the contract: an absent indicator entry
/// means "skip this pattern", never an error.
#[derive(Debug, Clone)]
pub struct LateralityTables {
    /// Ordered default patterns; resolution stops at the first hit.
    patterns: Vec<LateralityPattern>,
    /// `(plan laterality, item laterality, indicator size) -> indicator`.
    indicators: BTreeMap<(Laterality, ItemLaterality, u8), String>,
    /// Body-region codes whose trailing `L`/`R`/`B` does not indicate a side.
    region_exceptions: BTreeSet<String>,
}

impl LateralityTables {
    pub fn new(
        patterns: Vec<LateralityPattern>,
        indicators: BTreeMap<(Laterality, ItemLaterality, u8), String>,
        region_exceptions: BTreeSet<String>,
    ) -> Self {
        Self {
            patterns,
            indicators,
            region_exceptions,
        }
    }

    pub fn region_exceptions(&self) -> &BTreeSet<String> {
        &self.region_exceptions
    }

    /// Looks up the side indicator for a laterality pair and indicator size.
    pub fn indicator(
        &self,
        plan: Laterality,
        item: ItemLaterality,
        size: u8,
    ) -> Option<&str> {
        self.indicators
            .get(&(plan, item, size))
            .map(String::as_str)
    }

    /// Resolves `base` to a decorated name present in the plan.
    ///
    /// Each default pattern is tried in order; patterns whose size has no
    /// indicator entry for the `(plan, item)` pair are skipped without
    /// consulting the plan. The first formatted candidate found in the
    /// plan's element collection wins; no hit means no match yet, not an
    /// error.
    pub fn resolve(
        &self,
        base: &str,
        item: ItemLaterality,
        element_type: ElementType,
        plan: &Plan,
    ) -> Option<String> {
        for pattern in &self.patterns {
            let Some(indicator) = self.indicator(plan.laterality, item, pattern.indicator_size)
            else {
                continue;
            };
            let candidate = format_pattern(&pattern.pattern, base, indicator);
            if plan.contains(element_type, &candidate) {
                return Some(candidate);
            }
        }
        None
    }
}

impl Default for LateralityTables {
    /// Clinic-neutral defaults: underscore and space suffix patterns with
    /// single-letter indicators. Absolute sides resolve under any plan
    /// laterality; relative sides only under a lateralized plan.
    fn default() -> Self {
        let patterns = vec![
            LateralityPattern {
                pattern: "{base}_{indicator}".to_string(),
                indicator_size: 1,
            },
            LateralityPattern {
                pattern: "{base} {indicator}".to_string(),
                indicator_size: 1,
            },
        ];
        let mut indicators = BTreeMap::new();
        for plan in [
            Laterality::Left,
            Laterality::Right,
            Laterality::Both,
            Laterality::None,
        ] {
            indicators.insert((plan, ItemLaterality::Left, 1), "L".to_string());
            indicators.insert((plan, ItemLaterality::Right, 1), "R".to_string());
            indicators.insert((plan, ItemLaterality::Both, 1), "B".to_string());
        }
        indicators.insert((Laterality::Left, ItemLaterality::Ipsilateral, 1), "L".to_string());
        indicators.insert((Laterality::Left, ItemLaterality::Contralateral, 1), "R".to_string());
        indicators.insert((Laterality::Right, ItemLaterality::Ipsilateral, 1), "R".to_string());
        indicators.insert((Laterality::Right, ItemLaterality::Contralateral, 1), "L".to_string());
        Self::new(patterns, indicators, BTreeSet::new())
    }
}

impl From<LateralityDefinition> for LateralityTables {
    fn from(definition: LateralityDefinition) -> Self {
        let indicators = definition
            .indicators
            .into_iter()
            .map(|entry| ((entry.plan, entry.item, entry.size), entry.indicator))
            .collect();
        Self::new(
            definition.patterns,
            indicators,
            definition.region_exceptions.into_iter().collect(),
        )
    }
}
