//! Recording observations into the forest and aggregating them into
//! coverage numbers.

mod aggregator;
mod recorder;
mod store;
mod values;

pub use aggregator::Aggregator;
pub use recorder::{RecordError, RecordOutcome, Recorder};
pub use store::CoverageStore;
pub use values::{
    percent, CoveragePercentages, CoverageValues, FieldCoverage, ResourceCoverage, TypeCoverage,
    OVERALL,
};
