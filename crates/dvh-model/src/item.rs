use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

use crate::error::Result;
use crate::units::{Unit, convert};

/// The three element groups a plan partitions its data into.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum ElementType {
    PlanProperty,
    Structure,
    ReferencePoint,
}

impl ElementType {
    pub fn as_str(&self) -> &'static str {
        match self {
            ElementType::PlanProperty => "Plan Property",
            ElementType::Structure => "Structure",
            ElementType::ReferencePoint => "Reference Point",
        }
    }
}

impl fmt::Display for ElementType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

impl FromStr for ElementType {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        let normalized = s.trim().to_uppercase().replace('-', " ");
        match normalized.as_str() {
            "PLAN PROPERTY" | "PLANPROPERTY" => Ok(ElementType::PlanProperty),
            "STRUCTURE" => Ok(ElementType::Structure),
            "REFERENCE POINT" | "REFERENCEPOINT" => Ok(ElementType::ReferencePoint),
            _ => Err(format!("Unknown element type: {s}")),
        }
    }
}

/// A numeric or textual value extracted from the export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum Value {
    Number(f64),
    Text(String),
}

impl Value {
    pub fn as_number(&self) -> Option<f64> {
        match self {
            Value::Number(n) => Some(*n),
            Value::Text(_) => None,
        }
    }

    pub fn as_text(&self) -> Option<&str> {
        match self {
            Value::Number(_) => None,
            Value::Text(t) => Some(t),
        }
    }
}

impl fmt::Display for Value {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Value::Number(n) => write!(f, "{n}"),
            Value::Text(t) => write!(f, "{t}"),
        }
    }
}

/// One named `name [unit]: value` record from the export.
///
/// A numeric value that is convertible always carries a unit from the closed
/// vocabulary; textual values and unitless counts carry `unit = None`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DataItem {
    pub name: String,
    pub element_type: ElementType,
    pub value: Value,
    pub unit: Option<Unit>,
}

impl DataItem {
    pub fn new(
        name: impl Into<String>,
        element_type: ElementType,
        value: Value,
        unit: Option<Unit>,
    ) -> Self {
        Self {
            name: name.into(),
            element_type,
            value,
            unit,
        }
    }

    /// Shorthand for a numeric item.
    pub fn number(
        name: impl Into<String>,
        element_type: ElementType,
        value: f64,
        unit: Option<Unit>,
    ) -> Self {
        Self::new(name, element_type, Value::Number(value), unit)
    }

    /// Shorthand for a textual item.
    pub fn text(name: impl Into<String>, element_type: ElementType, value: impl Into<String>) -> Self {
        Self::new(name, element_type, Value::Text(value.into()), None)
    }

    pub fn numeric(&self) -> Option<f64> {
        self.value.as_number()
    }

    /// Converts this item's numeric value into `to`.
    ///
    /// Items without a unit pass through unchanged when `to` equals their
    /// (absent) unit; otherwise the conversion table decides. Returns the
    /// unconverted value when the item already carries the requested unit.
    pub fn converted_to(
        &self,
        to: Unit,
        reference_dose: Option<f64>,
        reference_volume: Option<f64>,
    ) -> Result<Option<f64>> {
        let Some(value) = self.numeric() else {
            return Ok(None);
        };
        match self.unit {
            Some(from) => Ok(Some(convert(
                value,
                from,
                to,
                reference_dose,
                reference_volume,
            )?)),
            None => Ok(Some(value)),
        }
    }
}
