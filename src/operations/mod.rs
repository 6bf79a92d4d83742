pub mod bevel;
pub mod offset;

pub use bevel::{
    detect_regions, BevelOptions, BevelOutcome, BevelSelection, Region, RegionDiagnostic,
};
pub use offset::{OffsetEngine, OffsetNode, OffsetNodeId, OffsetResult, OffsetTree, Spoke};
