pub mod engine;
pub mod laterality;
pub mod types;

pub use engine::{AliasKey, AliasTable, AliasTableEntry, ReferenceMatcher, build_alias_table};
pub use laterality::{
    IndicatorEntry, ItemLaterality, LateralityDefinition, LateralityPattern, LateralityTables,
    format_pattern,
};
pub use types::{Alias, MatchMethod, MatchedElement, PlanReference};
