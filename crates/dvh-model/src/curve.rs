//! Dose-volume curves and linear interpolation over them.

use serde::{Deserialize, Serialize};

use crate::error::{DvhError, Result};
use crate::units::Unit;

/// Which physical axis a curve column carries.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum CurveAxis {
    Dose,
    Volume,
}

/// One column of a dose-volume curve, as declared by the export header.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CurveColumn {
    pub name: String,
    pub axis: CurveAxis,
    pub unit: Option<Unit>,
}

/// An ordered dose-volume curve.
///
/// `samples[i]` holds the sample values of `columns[i]`; all sample vectors
/// have equal length. Samples are kept in the order read from the source; the
/// interpolation walks consecutive sample pairs, so monotonicity is the
/// source's contract, not re-enforced here.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DoseVolumeCurve {
    columns: Vec<CurveColumn>,
    samples: Vec<Vec<f64>>,
}

impl DoseVolumeCurve {
    /// Creates an empty curve over the given columns.
    ///
    /// The column set must contain at least one dose and one volume column.
    pub fn new(columns: Vec<CurveColumn>) -> Result<Self> {
        let has_dose = columns.iter().any(|c| c.axis == CurveAxis::Dose);
        let has_volume = columns.iter().any(|c| c.axis == CurveAxis::Volume);
        if !has_dose || !has_volume {
            return Err(DvhError::Message(format!(
                "curve needs a dose and a volume column, got {} column(s)",
                columns.len()
            )));
        }
        let samples = vec![Vec::new(); columns.len()];
        Ok(Self { columns, samples })
    }

    /// Appends one sample row; the row must have one value per column.
    pub fn push_row(&mut self, row: &[f64]) -> Result<()> {
        if row.len() != self.columns.len() {
            return Err(DvhError::Message(format!(
                "curve row has {} values, expected {}",
                row.len(),
                self.columns.len()
            )));
        }
        for (column, value) in self.samples.iter_mut().zip(row) {
            column.push(*value);
        }
        Ok(())
    }

    pub fn columns(&self) -> &[CurveColumn] {
        &self.columns
    }

    /// Number of sample rows.
    pub fn len(&self) -> usize {
        self.samples.first().map_or(0, Vec::len)
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Index of the column on `axis` whose unit equals `unit`, falling back
    /// to the first column on that axis.
    pub fn column_preferring(&self, axis: CurveAxis, unit: Option<Unit>) -> Option<usize> {
        let mut fallback = None;
        for (idx, column) in self.columns.iter().enumerate() {
            if column.axis != axis {
                continue;
            }
            if unit.is_some() && column.unit == unit {
                return Some(idx);
            }
            fallback.get_or_insert(idx);
        }
        fallback
    }

    /// Linearly interpolates the value of `output` at the point where the
    /// `input` column equals `at`.
    ///
    /// Works for ascending and descending input columns. A requested point
    /// outside the sampled range is undefined and yields `None`; there is no
    /// extrapolation.
    pub fn interpolate(&self, input: usize, output: usize, at: f64) -> Option<f64> {
        let xs = self.samples.get(input)?;
        let ys = self.samples.get(output)?;
        for (pair_x, pair_y) in xs.windows(2).zip(ys.windows(2)) {
            let (x0, x1) = (pair_x[0], pair_x[1]);
            let within = if x0 <= x1 {
                x0 <= at && at <= x1
            } else {
                x1 <= at && at <= x0
            };
            if !within {
                continue;
            }
            if (x1 - x0).abs() < f64::EPSILON {
                return Some(pair_y[0]);
            }
            let t = (at - x0) / (x1 - x0);
            return Some(pair_y[0] + t * (pair_y[1] - pair_y[0]));
        }
        None
    }
}
