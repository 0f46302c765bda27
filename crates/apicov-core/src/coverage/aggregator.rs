use std::collections::HashSet;
use std::sync::Arc;

use super::{
    CoveragePercentages, CoverageStore, CoverageValues, FieldCoverage, ResourceCoverage,
    TypeCoverage, OVERALL,
};
use crate::forest::{LeafMode, NodeId, NodeKind, ObservedValueSet, ResourceForest};
use crate::rules::{DisplayRules, IgnoredFields};
use crate::schema::ResourceKey;

/// Computes coverage from the store on demand.
///
/// Every query takes one read of the observation table, so all numbers in a
/// single response describe the same moment.
#[derive(Debug, Clone)]
pub struct Aggregator {
    store: Arc<CoverageStore>,
    ignored: Arc<IgnoredFields>,
    display: Arc<DisplayRules>,
}

impl Aggregator {
    pub fn new(store: Arc<CoverageStore>, ignored: IgnoredFields, display: DisplayRules) -> Self {
        Self {
            store,
            ignored: Arc::new(ignored),
            display: Arc::new(display),
        }
    }

    pub fn forest(&self) -> &ResourceForest {
        self.store.forest()
    }

    /// Coverage values and per-type detail for one resource kind.
    pub fn coverage(&self, key: &ResourceKey) -> Option<ResourceCoverage> {
        let tree = self.forest().tree(key)?;
        Some(self.store.read(|table| {
            let (values, types) = self.walk(table, tree.root);
            ResourceCoverage {
                resource: tree.key.clone(),
                values,
                types,
            }
        }))
    }

    /// Like [`Aggregator::coverage`], addressed by kind name.
    pub fn coverage_by_kind(&self, kind: &str) -> Option<ResourceCoverage> {
        let key = self.forest().resolve_kind(kind)?;
        self.coverage(key)
    }

    /// Field-weighted sum over every registered kind.
    pub fn total_coverage(&self) -> CoverageValues {
        self.store.read(|table| {
            let mut total = CoverageValues::default();
            for tree in self.forest().trees() {
                let (values, _) = self.walk(table, tree.root);
                total.accumulate(&values);
            }
            total
        })
    }

    /// Percent per kind plus the field-weighted `Overall`.
    pub fn percentages_by_kind(&self) -> CoveragePercentages {
        self.store.read(|table| {
            let mut percentages = CoveragePercentages::default();
            let mut total = CoverageValues::default();
            for tree in self.forest().trees() {
                let (values, _) = self.walk(table, tree.root);
                percentages
                    .resource_coverages
                    .insert(tree.key.kind.clone(), values.percent_coverage);
                total.accumulate(&values);
            }
            percentages
                .resource_coverages
                .insert(OVERALL.to_string(), total.percent_coverage);
            percentages
        })
    }

    fn walk(&self, table: &[ObservedValueSet], root: NodeId) -> (CoverageValues, Vec<TypeCoverage>) {
        let mut tally = Tally {
            forest: self.forest(),
            table,
            ignored: &self.ignored,
            display: &self.display,
            visited: HashSet::new(),
            types: Vec::new(),
        };
        let (covered, total) = tally.named(root);
        (CoverageValues::new(covered, total), tally.types)
    }
}

/// One resource walk. Shared nodes are counted once.
struct Tally<'a> {
    forest: &'a ResourceForest,
    table: &'a [ObservedValueSet],
    ignored: &'a IgnoredFields,
    display: &'a DisplayRules,
    visited: HashSet<NodeId>,
    types: Vec<TypeCoverage>,
}

impl Tally<'_> {
    fn named(&mut self, id: NodeId) -> (usize, usize) {
        if !self.visited.insert(id) {
            return (0, 0);
        }

        let forest = self.forest;
        let node = forest.node(id);
        match &node.kind {
            NodeKind::Struct { fields } => {
                let slot = self.types.len();
                self.types.push(TypeCoverage {
                    type_name: node.type_name.clone(),
                    fields: Vec::new(),
                });

                let mut sum = (0, 0);
                for (name, child) in fields {
                    let path = format!("{}.{}", node.path, name);
                    if self.ignored.contains(&path) {
                        let row = FieldCoverage {
                            label: self.label(None, &path, name),
                            path,
                            observed: Vec::new(),
                            expected: None,
                            covered: 0,
                            total: 0,
                            ignored: true,
                        };
                        self.types[slot].fields.push(row);
                        continue;
                    }
                    let (covered, total) = self.position(*child, &path, name, slot);
                    sum.0 += covered;
                    sum.1 += total;
                }
                sum
            }
            NodeKind::Polymorphic { alternatives } => {
                alternatives.iter().fold((0, 0), |sum, alt| {
                    let (covered, total) = self.named(*alt);
                    (sum.0 + covered, sum.1 + total)
                })
            }
            _ => (0, 0),
        }
    }

    fn position(&mut self, id: NodeId, path: &str, field: &str, owner: usize) -> (usize, usize) {
        let forest = self.forest;
        match &forest.node(id).kind {
            NodeKind::Struct { .. } | NodeKind::Polymorphic { .. } => self.named(id),
            NodeKind::Sequence { element } => self.position(*element, path, field, owner),
            NodeKind::Mapping { value } => self.position(*value, path, field, owner),
            NodeKind::Reference { target } => self.position(*target, path, field, owner),
            NodeKind::Leaf { scalar, leaf, mode } => {
                let observed = &self.table[leaf.index()];
                let values: Vec<String> = observed
                    .values()
                    .map(|set| set.iter().cloned().collect())
                    .unwrap_or_default();

                let (covered, total, expected) = match mode {
                    LeafMode::Enumerated(domain) => {
                        let covered = observed
                            .values()
                            .map(|set| domain.intersection(set).count())
                            .unwrap_or(0);
                        (covered, domain.len(), Some(domain.iter().cloned().collect()))
                    }
                    LeafMode::Values | LeafMode::Presence => {
                        (usize::from(observed.is_observed()), 1, None)
                    }
                };

                let row = FieldCoverage {
                    path: path.to_string(),
                    label: self.label(Some(scalar.keyword()), path, field),
                    observed: values,
                    expected,
                    covered,
                    total,
                    ignored: false,
                };
                self.types[owner].fields.push(row);
                (covered, total)
            }
        }
    }

    fn label(&self, type_name: Option<&str>, path: &str, field: &str) -> String {
        self.display
            .label(type_name, path)
            .unwrap_or(field)
            .to_string()
    }
}
