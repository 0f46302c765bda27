use parking_lot::RwLock;

use crate::forest::{LeafId, Observation, ObservedValueSet, ResourceForest};

/// The forest plus its observation table.
///
/// The graph shape never changes after build. The table is guarded by one
/// reader/writer lock: an instance's updates land under a single write, and
/// every aggregator walk reads under a single read.
#[derive(Debug)]
pub struct CoverageStore {
    forest: ResourceForest,
    observations: RwLock<Vec<ObservedValueSet>>,
}

impl CoverageStore {
    pub fn new(forest: ResourceForest) -> Self {
        let observations = RwLock::new(forest.empty_observations());
        Self {
            forest,
            observations,
        }
    }

    pub fn forest(&self) -> &ResourceForest {
        &self.forest
    }

    /// Applies one instance's observations atomically.
    pub fn merge(&self, updates: Vec<(LeafId, Observation)>) {
        if updates.is_empty() {
            return;
        }
        let mut table = self.observations.write();
        for (leaf, observation) in updates {
            if let Some(slot) = table.get_mut(leaf.index()) {
                slot.apply(observation);
            }
        }
    }

    /// Runs `f` against a consistent view of the table.
    pub fn read<R>(&self, f: impl FnOnce(&[ObservedValueSet]) -> R) -> R {
        let table = self.observations.read();
        f(&table)
    }

    pub fn observed(&self, leaf: LeafId) -> Option<ObservedValueSet> {
        self.read(|table| table.get(leaf.index()).cloned())
    }
}
