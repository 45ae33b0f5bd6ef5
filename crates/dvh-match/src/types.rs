//! Reference and alias types binding report items to plan elements.

use serde::{Deserialize, Serialize};

use dvh_model::{ElementType, Value};

use crate::laterality::ItemLaterality;

/// An alternate name pattern for finding a plan element when the primary
/// expected name is absent.
///
/// An unsized alias is a plain candidate name (optionally re-run through
/// laterality resolution). A sized alias is a pattern resolved through the
/// laterality indicator table with the given indicator size.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub struct Alias {
    pub pattern: String,
    #[serde(default)]
    pub indicator_size: Option<u8>,
}

impl Alias {
    pub fn plain(pattern: impl Into<String>) -> Self {
        Self {
            pattern: pattern.into(),
            indicator_size: None,
        }
    }

    pub fn sized(pattern: impl Into<String>, indicator_size: u8) -> Self {
        Self {
            pattern: pattern.into(),
            indicator_size: Some(indicator_size),
        }
    }
}

/// How the current binding of a reference came to be.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum MatchMethod {
    /// Resolved by the matching engine.
    Auto,
    /// An operator picked the plan element by hand.
    Manual,
    /// An operator typed the value in directly; no plan element involved.
    DirectEntry,
    /// Unmatched.
    #[default]
    None,
}

/// The resolved binding: an explicit `(element type, name)` index pair,
/// re-resolved against the current plan on demand. Never a live handle into a
/// specific plan instance, so a plan reload cannot leave it dangling.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MatchedElement {
    pub element_type: ElementType,
    pub name: String,
}

impl MatchedElement {
    pub fn new(element_type: ElementType, name: impl Into<String>) -> Self {
        Self {
            element_type,
            name: name.into(),
        }
    }
}

/// A report item's binding spec against a plan.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanReference {
    pub reference_name: String,
    pub reference_type: ElementType,
    #[serde(default)]
    pub reference_laterality: Option<ItemLaterality>,
    /// Inline aliases, combined with the global alias table unless
    /// `replace_global_aliases` is set.
    #[serde(default)]
    pub aliases: Vec<Alias>,
    #[serde(default)]
    pub replace_global_aliases: bool,
    /// Value-extraction spec, e.g. a DVH point such as `"V20Gy"`.
    #[serde(default)]
    pub constructor: Option<String>,
    #[serde(default)]
    pub matched: Option<MatchedElement>,
    #[serde(default)]
    pub match_method: MatchMethod,
    /// Operator-entered value, present only for `DirectEntry`.
    #[serde(default)]
    pub direct_value: Option<Value>,
}

impl PlanReference {
    pub fn new(reference_name: impl Into<String>, reference_type: ElementType) -> Self {
        Self {
            reference_name: reference_name.into(),
            reference_type,
            reference_laterality: None,
            aliases: Vec::new(),
            replace_global_aliases: false,
            constructor: None,
            matched: None,
            match_method: MatchMethod::None,
            direct_value: None,
        }
    }

    pub fn with_laterality(mut self, laterality: ItemLaterality) -> Self {
        self.reference_laterality = Some(laterality);
        self
    }

    pub fn with_alias(mut self, alias: Alias) -> Self {
        self.aliases.push(alias);
        self
    }

    pub fn with_constructor(mut self, constructor: impl Into<String>) -> Self {
        self.constructor = Some(constructor.into());
        self
    }

    pub fn is_matched(&self) -> bool {
        self.matched.is_some()
    }

    /// Drops the binding and any direct value, back to the unmatched state.
    pub fn clear_match(&mut self) {
        self.matched = None;
        self.match_method = MatchMethod::None;
        self.direct_value = None;
    }
}
