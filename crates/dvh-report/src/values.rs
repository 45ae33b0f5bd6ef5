//! Value extraction: DVH-point constructors and unit-converted pass-through.

use serde::{Deserialize, Serialize};

use tracing::warn;

use dvh_match::{MatchMethod, PlanReference};
use dvh_model::{
    CurveAxis, DataItem, ElementType, Plan, PlanStructure, Result, Unit, Value, convert,
};

/// A parsed DVH-point constructor.
///
/// `"D50%"` asks for the dose at 50% volume; `"V20Gy"` asks for the volume
/// receiving at least 20 Gy. The letter names the result axis, the number and
/// unit give the threshold on the opposite axis.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct DvhPoint {
    pub result_axis: CurveAxis,
    pub threshold: f64,
    pub unit: Unit,
}

/// Parses a constructor string; anything but `D`/`V` + number + unit yields
/// `None`.
pub fn parse_constructor(spec: &str) -> Option<DvhPoint> {
    let spec = spec.trim();
    let mut chars = spec.chars();
    let result_axis = match chars.next()?.to_ascii_uppercase() {
        'D' => CurveAxis::Dose,
        'V' => CurveAxis::Volume,
        _ => return None,
    };
    let rest = chars.as_str();
    let number_end = rest
        .find(|ch: char| !ch.is_ascii_digit() && ch != '.')
        .unwrap_or(rest.len());
    let threshold: f64 = rest[..number_end].parse().ok()?;
    let unit: Unit = rest[number_end..].trim().parse().ok()?;
    Some(DvhPoint {
        result_axis,
        threshold,
        unit,
    })
}

fn opposite(axis: CurveAxis) -> CurveAxis {
    match axis {
        CurveAxis::Dose => CurveAxis::Volume,
        CurveAxis::Volume => CurveAxis::Dose,
    }
}

/// A report item's resolved value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ResolvedValue {
    Number { value: f64, unit: Option<Unit> },
    Text(String),
    /// The conversion table had no answer for this value; shown to the
    /// operator instead of crashing the report.
    Unconvertible,
    /// A DVH point outside the curve's sampled range; distinguishable from
    /// zero, never extrapolated.
    Undefined,
}

impl ResolvedValue {
    /// The value as it should be written to a spreadsheet cell.
    ///
    /// Percent-formatted cells receive the value divided by 100; undefined
    /// and unconvertible values write nothing.
    pub fn cell_value(&self, number_format: Option<&str>) -> Option<Value> {
        match self {
            ResolvedValue::Number { value, .. } => {
                let scaled = if number_format.is_some_and(|format| format.contains('%')) {
                    value / 100.0
                } else {
                    *value
                };
                Some(Value::Number(scaled))
            }
            ResolvedValue::Text(text) => Some(Value::Text(text.clone())),
            ResolvedValue::Unconvertible | ResolvedValue::Undefined => None,
        }
    }
}

/// Interpolates a DVH point on a structure's curve.
///
/// The input-axis column is chosen preferring the constructor's unit; when no
/// column carries that unit exactly, the threshold is converted into the
/// column's native unit instead. Returns `Ok(None)` when the point lies
/// outside the sampled range.
pub fn extract_dvh_point(
    structure: &PlanStructure,
    point: DvhPoint,
    plan: &Plan,
) -> Result<Option<f64>> {
    let Some(curve) = structure.curve.as_ref() else {
        return Ok(None);
    };
    let input_axis = opposite(point.result_axis);
    let (Some(input), Some(output)) = (
        curve.column_preferring(input_axis, Some(point.unit)),
        curve.column_preferring(point.result_axis, None),
    ) else {
        return Ok(None);
    };
    let input_unit = curve.columns()[input].unit;
    let at = match input_unit {
        Some(native) if native != point.unit => convert(
            point.threshold,
            point.unit,
            native,
            plan.prescription_dose_cgy(),
            structure.volume_cc(),
        )?,
        _ => point.threshold,
    };
    Ok(curve.interpolate(input, output, at))
}

/// Unit of the result column a DVH point reads from.
fn dvh_result_unit(structure: &PlanStructure, point: DvhPoint) -> Option<Unit> {
    let curve = structure.curve.as_ref()?;
    let output = curve.column_preferring(point.result_axis, None)?;
    curve.columns()[output].unit
}

fn converted_number(
    value: f64,
    from: Option<Unit>,
    to: Option<Unit>,
    plan: &Plan,
    reference_volume: Option<f64>,
) -> ResolvedValue {
    let (Some(from), Some(to)) = (from, to) else {
        return ResolvedValue::Number { value, unit: from };
    };
    match convert(value, from, to, plan.prescription_dose_cgy(), reference_volume) {
        Ok(converted) => ResolvedValue::Number {
            value: converted,
            unit: Some(to),
        },
        Err(err) => {
            warn!(%err, "value not convertible to requested unit");
            ResolvedValue::Unconvertible
        }
    }
}

fn item_value(item: &DataItem, target_unit: Option<Unit>, plan: &Plan) -> ResolvedValue {
    match &item.value {
        Value::Number(value) => converted_number(*value, item.unit, target_unit, plan, None),
        Value::Text(text) => ResolvedValue::Text(text.clone()),
    }
}

fn structure_value(
    structure: &PlanStructure,
    reference: &PlanReference,
    target_unit: Option<Unit>,
    plan: &Plan,
) -> ResolvedValue {
    let Some(spec) = reference.constructor.as_deref() else {
        // A structure reference without a constructor reads the structure's
        // volume record.
        return match structure.volume() {
            Some(item) => {
                let (value, from) = (item.numeric(), item.unit);
                match value {
                    Some(value) => {
                        converted_number(value, from, target_unit, plan, structure.volume_cc())
                    }
                    None => ResolvedValue::Undefined,
                }
            }
            None => ResolvedValue::Undefined,
        };
    };
    let Some(point) = parse_constructor(spec) else {
        warn!(constructor = spec, "unparseable value constructor");
        return ResolvedValue::Unconvertible;
    };
    match extract_dvh_point(structure, point, plan) {
        Ok(Some(value)) => converted_number(
            value,
            dvh_result_unit(structure, point),
            target_unit,
            plan,
            structure.volume_cc(),
        ),
        Ok(None) => ResolvedValue::Undefined,
        Err(err) => {
            warn!(constructor = spec, %err, "DVH point not extractable");
            ResolvedValue::Unconvertible
        }
    }
}

/// Resolves the value for one reference against the current plan.
///
/// Returns `None` when the reference is unmatched (nothing to extract) or its
/// binding no longer exists in the plan.
pub fn resolve_value(
    reference: &PlanReference,
    target_unit: Option<Unit>,
    plan: &Plan,
) -> Option<ResolvedValue> {
    if reference.match_method == MatchMethod::DirectEntry {
        return reference.direct_value.as_ref().map(|value| match value {
            Value::Number(number) => ResolvedValue::Number {
                value: *number,
                unit: target_unit,
            },
            Value::Text(text) => ResolvedValue::Text(text.clone()),
        });
    }
    let matched = reference.matched.as_ref()?;
    let Some(element) = plan.element(matched.element_type, &matched.name) else {
        warn!(
            name = %matched.name,
            "matched element missing from current plan; re-match required"
        );
        return None;
    };
    match matched.element_type {
        ElementType::Structure => element
            .as_structure()
            .map(|structure| structure_value(structure, reference, target_unit, plan)),
        ElementType::PlanProperty | ElementType::ReferencePoint => element
            .as_item()
            .map(|item| item_value(item, target_unit, plan)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_dose_and_volume_constructors() {
        let point = parse_constructor("D50%").unwrap();
        assert_eq!(point.result_axis, CurveAxis::Dose);
        assert_eq!(point.threshold, 50.0);
        assert_eq!(point.unit, Unit::Percent);

        let point = parse_constructor("V20Gy").unwrap();
        assert_eq!(point.result_axis, CurveAxis::Volume);
        assert_eq!(point.threshold, 20.0);
        assert_eq!(point.unit, Unit::Gray);

        let point = parse_constructor("v95.5cGy").unwrap();
        assert_eq!(point.threshold, 95.5);
        assert_eq!(point.unit, Unit::CentiGray);
    }

    #[test]
    fn rejects_malformed_constructors() {
        assert!(parse_constructor("X50%").is_none());
        assert!(parse_constructor("D%").is_none());
        assert!(parse_constructor("D50").is_none());
        assert!(parse_constructor("D50furlong").is_none());
    }

    #[test]
    fn percent_cells_scale_down() {
        let value = ResolvedValue::Number {
            value: 42.0,
            unit: Some(Unit::Percent),
        };
        assert_eq!(value.cell_value(Some("0.0%")), Some(Value::Number(0.42)));
        assert_eq!(value.cell_value(Some("0.0")), Some(Value::Number(42.0)));
        assert_eq!(value.cell_value(None), Some(Value::Number(42.0)));
    }

    #[test]
    fn undefined_writes_nothing() {
        assert_eq!(ResolvedValue::Undefined.cell_value(None), None);
        assert_eq!(ResolvedValue::Unconvertible.cell_value(Some("0.0%")), None);
    }
}
