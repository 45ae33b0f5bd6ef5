pub mod curve;
pub mod error;
pub mod item;
pub mod plan;
pub mod units;

pub use curve::{CurveAxis, CurveColumn, DoseVolumeCurve};
pub use error::{DvhError, Result};
pub use item::{DataItem, ElementType, Value};
pub use plan::{Laterality, Plan, PlanElement, PlanStructure};
pub use units::{Unit, UnitFamily, convert};
