//! Report model over a loaded plan.
//!
//! A report is an ordered list of items, each bound to a plan element through
//! a [`dvh_match::PlanReference`]. This crate runs batch matching, extracts
//! values (DVH points via curve interpolation, plain values via unit
//! conversion), and keeps the append-only match history that lets manual
//! corrections survive a plan reload.

pub mod history;
pub mod report;
pub mod repository;
pub mod values;

pub use history::{ChangeOrigin, MatchHistory, MatchHistoryEntry, rerun_matching};
pub use report::{CellTarget, MatchSummary, Report, ReportElement};
pub use repository::DefinitionRepository;
pub use values::{DvhPoint, ResolvedValue, extract_dvh_point, parse_constructor, resolve_value};
