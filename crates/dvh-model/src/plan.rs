//! In-memory representation of one loaded treatment plan.

use serde::{Deserialize, Serialize};
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;

use crate::curve::DoseVolumeCurve;
use crate::item::{DataItem, ElementType};

/// Which body side a plan or structure concerns.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Laterality {
    Left,
    Right,
    Both,
    None,
}

impl Laterality {
    /// Derives plan laterality from a body-region code.
    ///
    /// The code is the leading 4-character region token of the plan name; a
    /// trailing `L`/`R`/`B` indicates the side unless the code is on the
    /// configured exception list of regions that merely end in one of those
    /// letters.
    pub fn from_region_code(plan_name: &str, exceptions: &BTreeSet<String>) -> Self {
        let code: String = plan_name
            .trim()
            .chars()
            .take(4)
            .collect::<String>()
            .to_uppercase();
        if code.len() < 4 || exceptions.contains(&code) {
            return Laterality::None;
        }
        match code.chars().last() {
            Some('L') => Laterality::Left,
            Some('R') => Laterality::Right,
            Some('B') => Laterality::Both,
            _ => Laterality::None,
        }
    }
}

impl fmt::Display for Laterality {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let text = match self {
            Laterality::Left => "Left",
            Laterality::Right => "Right",
            Laterality::Both => "Both",
            Laterality::None => "None",
        };
        write!(f, "{text}")
    }
}

/// A contoured structure: its property records plus the DVH curve read for it.
///
/// Immutable after load apart from property additions while the parser is
/// still filling it in.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlanStructure {
    pub name: String,
    pub properties: BTreeMap<String, DataItem>,
    pub curve: Option<DoseVolumeCurve>,
}

impl PlanStructure {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            properties: BTreeMap::new(),
            curve: None,
        }
    }

    pub fn insert_property(&mut self, item: DataItem) {
        self.properties.insert(item.name.clone(), item);
    }

    /// The structure's total volume record, when the export carried one.
    pub fn volume(&self) -> Option<&DataItem> {
        self.properties.get("Volume")
    }

    /// Total volume in `cc`, used as the reference for percent-volume
    /// conversions.
    pub fn volume_cc(&self) -> Option<f64> {
        let item = self.volume()?;
        item.converted_to(crate::units::Unit::CubicCentimeter, None, None)
            .ok()
            .flatten()
    }
}

/// A read-only view of one plan element, whatever group it lives in.
#[derive(Debug, Clone, Copy)]
pub enum PlanElement<'a> {
    Property(&'a DataItem),
    Structure(&'a PlanStructure),
    ReferencePoint(&'a DataItem),
}

impl<'a> PlanElement<'a> {
    pub fn name(&self) -> &'a str {
        match self {
            PlanElement::Property(item) | PlanElement::ReferencePoint(item) => &item.name,
            PlanElement::Structure(structure) => &structure.name,
        }
    }

    pub fn as_item(&self) -> Option<&'a DataItem> {
        match self {
            PlanElement::Property(item) | PlanElement::ReferencePoint(item) => Some(item),
            PlanElement::Structure(_) => None,
        }
    }

    pub fn as_structure(&self) -> Option<&'a PlanStructure> {
        match self {
            PlanElement::Structure(structure) => Some(structure),
            _ => None,
        }
    }
}

/// One loaded plan: properties, structures and reference points, the derived
/// laterality, and the prescription dose cached in the plan's default dose
/// unit (`cGy`).
///
/// Built by the parser during the load phase; read-only afterwards.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Plan {
    pub name: String,
    pub laterality: Laterality,
    plan_properties: BTreeMap<String, DataItem>,
    structures: BTreeMap<String, PlanStructure>,
    reference_points: BTreeMap<String, DataItem>,
    prescription_dose: Option<DataItem>,
}

impl Plan {
    pub fn new(name: impl Into<String>, laterality: Laterality) -> Self {
        Self {
            name: name.into(),
            laterality,
            plan_properties: BTreeMap::new(),
            structures: BTreeMap::new(),
            reference_points: BTreeMap::new(),
            prescription_dose: None,
        }
    }

    pub fn insert_property(&mut self, item: DataItem) {
        self.plan_properties.insert(item.name.clone(), item);
    }

    pub fn insert_structure(&mut self, structure: PlanStructure) {
        self.structures.insert(structure.name.clone(), structure);
    }

    pub fn insert_reference_point(&mut self, item: DataItem) {
        self.reference_points.insert(item.name.clone(), item);
    }

    pub fn set_prescription_dose(&mut self, item: DataItem) {
        self.prescription_dose = Some(item);
    }

    /// The cached prescription dose record, in `cGy`.
    pub fn prescription_dose(&self) -> Option<&DataItem> {
        self.prescription_dose.as_ref()
    }

    /// Prescription dose value in `cGy`, for percent-dose conversions.
    pub fn prescription_dose_cgy(&self) -> Option<f64> {
        self.prescription_dose.as_ref().and_then(DataItem::numeric)
    }

    pub fn properties(&self) -> impl Iterator<Item = &DataItem> {
        self.plan_properties.values()
    }

    pub fn structures(&self) -> impl Iterator<Item = &PlanStructure> {
        self.structures.values()
    }

    pub fn structure(&self, name: &str) -> Option<&PlanStructure> {
        self.structures.get(name)
    }

    /// Looks up one element by group and name.
    pub fn element(&self, element_type: ElementType, name: &str) -> Option<PlanElement<'_>> {
        match element_type {
            ElementType::PlanProperty => self.plan_properties.get(name).map(PlanElement::Property),
            ElementType::Structure => self.structures.get(name).map(PlanElement::Structure),
            ElementType::ReferencePoint => self
                .reference_points
                .get(name)
                .map(PlanElement::ReferencePoint),
        }
    }

    pub fn contains(&self, element_type: ElementType, name: &str) -> bool {
        self.element(element_type, name).is_some()
    }

    /// Names of all elements in one group, in stable order.
    pub fn element_names(&self, element_type: ElementType) -> Vec<&str> {
        match element_type {
            ElementType::PlanProperty => {
                self.plan_properties.keys().map(String::as_str).collect()
            }
            ElementType::Structure => self.structures.keys().map(String::as_str).collect(),
            ElementType::ReferencePoint => {
                self.reference_points.keys().map(String::as_str).collect()
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::item::Value;
    use crate::units::Unit;

    #[test]
    fn laterality_derives_from_region_code() {
        let exceptions = BTreeSet::from(["GALL".to_string()]);
        assert_eq!(
            Laterality::from_region_code("LUNR pulm", &exceptions),
            Laterality::Right
        );
        assert_eq!(
            Laterality::from_region_code("LUNL pulm", &exceptions),
            Laterality::Left
        );
        assert_eq!(
            Laterality::from_region_code("MAMB bilateral", &exceptions),
            Laterality::Both
        );
        // Exception list forces None even though the code ends in L.
        assert_eq!(
            Laterality::from_region_code("GALL bladder", &exceptions),
            Laterality::None
        );
        assert_eq!(Laterality::from_region_code("X", &exceptions), Laterality::None);
    }

    #[test]
    fn element_lookup_respects_groups() {
        let mut plan = Plan::new("LUNR1", Laterality::Right);
        plan.insert_property(DataItem::text("Plan", ElementType::PlanProperty, "LUNR1"));
        plan.insert_structure(PlanStructure::new("Lung_R"));
        assert!(plan.contains(ElementType::Structure, "Lung_R"));
        assert!(!plan.contains(ElementType::PlanProperty, "Lung_R"));
        assert!(plan.contains(ElementType::PlanProperty, "Plan"));
    }

    #[test]
    fn structure_volume_reference() {
        let mut structure = PlanStructure::new("PTV");
        structure.insert_property(DataItem::new(
            "Volume",
            ElementType::Structure,
            Value::Number(45.3),
            Some(Unit::CubicCentimeter),
        ));
        assert_eq!(structure.volume_cc(), Some(45.3));
    }
}
