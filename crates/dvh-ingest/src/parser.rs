//! Stateful parser turning the DVH export dialect into a [`Plan`].
//!
//! The dialect is a sequence of `Name [Unit]: Value` plan properties, then one
//! block per structure: property lines, a blank separator, a curve header of
//! bracket-delimited `Name [Unit]` columns, and whitespace-separated numeric
//! rows up to the next blank line.

use std::collections::BTreeSet;
use std::fs::File;
use std::io::{BufRead, BufReader};
use std::path::Path;

use tracing::{debug, warn};

use dvh_model::{
    CurveAxis, CurveColumn, DataItem, DoseVolumeCurve, DvhError, ElementType, Laterality, Plan,
    PlanStructure, Result, Unit, Value,
};

use crate::cursor::LineCursor;

/// Marker introducing the first structure block, ending the plan-property
/// section.
const STRUCTURE_MARKER: &str = "Structure";

/// Configuration passed into the parser; no module-level state.
#[derive(Debug, Clone, Default)]
pub struct ParseOptions {
    /// 4-character body-region codes that end in `L`/`R`/`B` without
    /// indicating a side; plans in these regions get `Laterality::None`.
    pub laterality_exceptions: BTreeSet<String>,
}

/// Splits a `Name [Unit]: Value` line into a [`DataItem`].
///
/// Lines without a colon yield `None`. A missing bracketed unit, or a unit
/// outside the closed vocabulary, yields `unit = None`; values that parse as
/// floats become numbers, everything else stays text.
fn parse_data_element(line: &str, element_type: ElementType) -> Option<DataItem> {
    let (name_segment, value_segment) = line.split_once(':')?;
    let (name, unit) = match (name_segment.find('['), name_segment.rfind(']')) {
        (Some(open), Some(close)) if close > open => {
            let raw_unit = name_segment[open + 1..close].trim();
            let unit = raw_unit.parse::<Unit>().ok();
            if unit.is_none() {
                debug!(unit = raw_unit, "unit outside vocabulary, kept as unitless");
            }
            (name_segment[..open].trim(), unit)
        }
        _ => (name_segment.trim(), None),
    };
    if name.is_empty() {
        return None;
    }
    let raw_value = value_segment.trim();
    let value = raw_value
        .parse::<f64>()
        .map(Value::Number)
        .unwrap_or_else(|_| Value::Text(raw_value.to_string()));
    Some(DataItem::new(name, element_type, value, unit))
}

/// Extracts `(name, unit)` column pairs from a curve header line and
/// classifies each as dose or volume by substring on the column name.
fn parse_curve_header(header: &str, line_number: usize) -> Result<Vec<CurveColumn>> {
    let mut columns = Vec::new();
    let mut rest = header;
    while let Some(open) = rest.find('[') {
        let Some(close) = rest[open..].find(']').map(|idx| open + idx) else {
            break;
        };
        let name = rest[..open].trim();
        let unit = rest[open + 1..close].trim().parse::<Unit>().ok();
        let lowered = name.to_ascii_lowercase();
        let axis = if lowered.contains("dose") {
            CurveAxis::Dose
        } else if lowered.contains("volume") {
            CurveAxis::Volume
        } else {
            return Err(DvhError::parse(
                line_number,
                format!("curve column '{name}' is neither dose nor volume"),
            ));
        };
        columns.push(CurveColumn {
            name: name.to_string(),
            axis,
            unit,
        });
        rest = &rest[close + 1..];
    }
    if columns.is_empty() {
        return Err(DvhError::parse(line_number, "curve header has no columns"));
    }
    Ok(columns)
}

/// Stateful reader over one export.
pub struct DvhParser<R: BufRead> {
    cursor: LineCursor<R>,
    options: ParseOptions,
}

impl<R: BufRead> DvhParser<R> {
    pub fn new(reader: R, options: ParseOptions) -> Self {
        Self {
            cursor: LineCursor::new(reader),
            options,
        }
    }

    /// Top-level entry: plan properties up to the first structure marker,
    /// then every structure block until end of input.
    pub fn load_data(&mut self) -> Result<Plan> {
        let properties =
            self.read_data_elements(ElementType::PlanProperty, Some(STRUCTURE_MARKER))?;
        let plan_name = properties
            .iter()
            .find(|item| item.name.eq_ignore_ascii_case("Plan"))
            .and_then(|item| item.value.as_text())
            .unwrap_or_default()
            .to_string();
        let laterality =
            Laterality::from_region_code(&plan_name, &self.options.laterality_exceptions);
        let mut plan = Plan::new(plan_name, laterality);
        if let Some(dose) = cache_prescription_dose(&properties) {
            plan.set_prescription_dose(dose);
        }
        for item in properties {
            plan.insert_property(item);
        }
        self.load_structures(&mut plan)?;
        debug!(
            plan = %plan.name,
            laterality = %plan.laterality,
            structures = plan.structures().count(),
            "plan loaded"
        );
        Ok(plan)
    }

    /// Filters lines containing a colon into data items until the stop
    /// condition of [`LineCursor::read_lines`].
    fn read_data_elements(
        &mut self,
        element_type: ElementType,
        break_condition: Option<&str>,
    ) -> Result<Vec<DataItem>> {
        let lines = self.cursor.read_lines(break_condition)?;
        Ok(lines
            .iter()
            .filter_map(|line| parse_data_element(line, element_type))
            .collect())
    }

    /// Reads structure blocks until end of input. A line containing a colon
    /// introduces a structure named by everything after the colon.
    fn load_structures(&mut self, plan: &mut Plan) -> Result<()> {
        while let Some(line) = self.cursor.next_line()? {
            let Some((_, name)) = line.split_once(':') else {
                continue;
            };
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            let structure = self.load_structure(name)?;
            plan.insert_structure(structure);
        }
        Ok(())
    }

    /// One structure block: properties to the first blank line, exactly one
    /// blank separator, then the curve.
    fn load_structure(&mut self, name: &str) -> Result<PlanStructure> {
        let mut structure = PlanStructure::new(name);
        for item in self.read_data_elements(ElementType::Structure, None)? {
            structure.insert_property(item);
        }
        self.skip_blank_line()?;
        structure.curve = Some(self.load_dose_volume_curve()?);
        Ok(structure)
    }

    /// Consumes the single blank separator line; tolerates its absence by
    /// pushing a non-blank line back.
    fn skip_blank_line(&mut self) -> Result<()> {
        if let Some(line) = self.cursor.next_line()?
            && !line.trim().is_empty()
        {
            self.cursor.backstep();
        }
        Ok(())
    }

    /// Header line, then whitespace-separated float rows until a blank line
    /// or end of input. A malformed number aborts the load.
    fn load_dose_volume_curve(&mut self) -> Result<DoseVolumeCurve> {
        let Some(header) = self.cursor.next_line()? else {
            return Err(DvhError::parse(
                self.cursor.line_number(),
                "expected curve header, found end of input",
            ));
        };
        let columns = parse_curve_header(&header, self.cursor.line_number())?;
        let mut curve = DoseVolumeCurve::new(columns)?;
        while let Some(line) = self.cursor.next_line()? {
            if line.trim().is_empty() {
                break;
            }
            let row = self.parse_curve_row(&line)?;
            curve.push_row(&row)?;
        }
        Ok(curve)
    }

    fn parse_curve_row(&self, line: &str) -> Result<Vec<f64>> {
        line.split_whitespace()
            .map(|token| {
                token.parse::<f64>().map_err(|_| {
                    DvhError::parse(
                        self.cursor.line_number(),
                        format!("malformed numeric value '{token}' in curve row"),
                    )
                })
            })
            .collect()
    }
}

/// Finds the prescribed-dose property and converts it into the plan's default
/// dose unit (`cGy`) for caching on the plan.
fn cache_prescription_dose(properties: &[DataItem]) -> Option<DataItem> {
    let item = properties.iter().find(|item| {
        item.name.to_ascii_lowercase().contains("prescribed dose") && item.numeric().is_some()
    })?;
    match item.converted_to(Unit::CentiGray, None, None) {
        Ok(Some(cgy)) => Some(DataItem::number(
            item.name.clone(),
            ElementType::PlanProperty,
            cgy,
            Some(Unit::CentiGray),
        )),
        Ok(None) => None,
        Err(err) => {
            // A relative prescribed dose cannot seed percent conversions.
            warn!(name = %item.name, %err, "prescribed dose not cached");
            None
        }
    }
}

/// Loads one plan from an export file.
///
/// The read handle lives only for the duration of the load and is closed on
/// every exit path, including parse failure.
pub fn load_plan(path: &Path, options: ParseOptions) -> Result<Plan> {
    let file = File::open(path)?;
    let mut parser = DvhParser::new(BufReader::new(file), options);
    parser.load_data()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn splits_name_unit_value() {
        let item = parse_data_element("Volume [cc]: 45.3", ElementType::Structure).unwrap();
        assert_eq!(item.name, "Volume");
        assert_eq!(item.unit, Some(Unit::CubicCentimeter));
        assert_eq!(item.numeric(), Some(45.3));
    }

    #[test]
    fn missing_unit_yields_none() {
        let item = parse_data_element("Approval Status: Approved", ElementType::PlanProperty)
            .unwrap();
        assert_eq!(item.unit, None);
        assert_eq!(item.value.as_text(), Some("Approved"));
    }

    #[test]
    fn lines_without_colon_are_skipped() {
        assert!(parse_data_element("no separator here", ElementType::PlanProperty).is_none());
    }

    #[test]
    fn curve_header_classifies_columns() {
        let columns = parse_curve_header("Dose [cGy] Ratio of Total Structure Volume [%]", 1)
            .unwrap();
        assert_eq!(columns.len(), 2);
        assert_eq!(columns[0].axis, CurveAxis::Dose);
        assert_eq!(columns[0].unit, Some(Unit::CentiGray));
        assert_eq!(columns[1].axis, CurveAxis::Volume);
        assert_eq!(columns[1].unit, Some(Unit::Percent));
    }

    #[test]
    fn unclassifiable_column_is_a_parse_error() {
        let err = parse_curve_header("Time [cm]", 7).unwrap_err();
        assert!(matches!(err, DvhError::Parse { line: 7, .. }));
    }
}
