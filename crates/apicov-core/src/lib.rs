//! API type-coverage engine for Kubernetes admission traffic.
//!
//! Observed resource instances are walked against a schema forest built from
//! a declarative catalog; populated leaves are recorded, and coverage is
//! aggregated per kind on demand.

pub mod admission;
pub mod config;
pub mod coverage;
pub mod engine;
pub mod forest;
pub mod report;
pub mod rules;
pub mod schema;

pub use admission::{AdmissionIntake, IntakeQueue, OverflowPolicy, RecordRequest};
pub use config::Config;
pub use coverage::{
    Aggregator, CoveragePercentages, CoverageStore, CoverageValues, RecordOutcome, Recorder,
    ResourceCoverage,
};
pub use engine::{Engine, EngineError};
pub use forest::ResourceForest;
pub use rules::{IgnoredFields, RuleSet};
pub use schema::{Catalog, ResourceKey};
