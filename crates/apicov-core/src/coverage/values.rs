use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};

use crate::schema::ResourceKey;

/// Key under which the field-weighted aggregate is reported.
pub const OVERALL: &str = "Overall";

/// Covered and total field counts, with the derived percentage.
#[derive(Debug, Clone, Copy, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoverageValues {
    pub total_fields: usize,
    pub covered_fields: usize,
    pub percent_coverage: f64,
}

impl CoverageValues {
    pub fn new(covered_fields: usize, total_fields: usize) -> Self {
        Self {
            total_fields,
            covered_fields,
            percent_coverage: percent(covered_fields, total_fields),
        }
    }

    /// Adds another set of counts. The percentage stays field-weighted.
    pub fn accumulate(&mut self, other: &CoverageValues) {
        self.total_fields += other.total_fields;
        self.covered_fields += other.covered_fields;
        self.percent_coverage = percent(self.covered_fields, self.total_fields);
    }
}

/// `100 * covered / total`; zero when there is nothing to cover.
pub fn percent(covered: usize, total: usize) -> f64 {
    if total == 0 {
        0.0
    } else {
        100.0 * covered as f64 / total as f64
    }
}

/// Percent coverage per kind, plus [`OVERALL`].
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "PascalCase")]
pub struct CoveragePercentages {
    pub resource_coverages: BTreeMap<String, f64>,
}

impl CoveragePercentages {
    /// Every kind, and the aggregate, at 0%.
    pub fn zeroed<'a>(kinds: impl IntoIterator<Item = &'a str>) -> Self {
        let mut resource_coverages: BTreeMap<String, f64> =
            kinds.into_iter().map(|kind| (kind.to_string(), 0.0)).collect();
        resource_coverages.insert(OVERALL.to_string(), 0.0);
        Self { resource_coverages }
    }

    pub fn get(&self, kind: &str) -> Option<f64> {
        self.resource_coverages.get(kind).copied()
    }

    pub fn overall(&self) -> Option<f64> {
        self.get(OVERALL)
    }
}

/// One row of a type's coverage detail.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldCoverage {
    pub path: String,
    pub label: String,
    /// Distinct values seen; empty for presence-only leaves.
    pub observed: Vec<String>,
    /// Value domain when the leaf is enumerated.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expected: Option<Vec<String>>,
    pub covered: usize,
    pub total: usize,
    pub ignored: bool,
}

impl FieldCoverage {
    pub fn is_covered(&self) -> bool {
        !self.ignored && self.total > 0 && self.covered == self.total
    }
}

/// Coverage detail for one named struct type.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TypeCoverage {
    pub type_name: String,
    pub fields: Vec<FieldCoverage>,
}

impl TypeCoverage {
    pub fn values(&self) -> CoverageValues {
        let (covered, total) = self
            .fields
            .iter()
            .filter(|f| !f.ignored)
            .fold((0, 0), |(c, t), f| (c + f.covered, t + f.total));
        CoverageValues::new(covered, total)
    }
}

/// Everything the query API reports for one resource kind.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResourceCoverage {
    pub resource: ResourceKey,
    pub values: CoverageValues,
    pub types: Vec<TypeCoverage>,
}
