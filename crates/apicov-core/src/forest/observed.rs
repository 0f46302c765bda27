use std::collections::BTreeSet;

use super::LeafMode;

/// A single fact recorded at a leaf.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Observation {
    Value(String),
    Present,
}

/// What has been observed at one leaf so far.
///
/// Only ever grows. Merging is set union, so it is idempotent and
/// commutative.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ObservedValueSet {
    Values(BTreeSet<String>),
    Presence(bool),
}

impl ObservedValueSet {
    /// Empty set shaped for a leaf mode.
    pub fn for_mode(mode: &LeafMode) -> Self {
        match mode {
            LeafMode::Presence => ObservedValueSet::Presence(false),
            LeafMode::Values | LeafMode::Enumerated(_) => ObservedValueSet::Values(BTreeSet::new()),
        }
    }

    pub fn is_observed(&self) -> bool {
        match self {
            ObservedValueSet::Values(values) => !values.is_empty(),
            ObservedValueSet::Presence(present) => *present,
        }
    }

    /// Distinct values seen, or `None` for a presence flag.
    pub fn values(&self) -> Option<&BTreeSet<String>> {
        match self {
            ObservedValueSet::Values(values) => Some(values),
            ObservedValueSet::Presence(_) => None,
        }
    }

    pub fn apply(&mut self, observation: Observation) {
        match (self, observation) {
            (ObservedValueSet::Values(values), Observation::Value(value)) => {
                values.insert(value);
            }
            (ObservedValueSet::Presence(present), _) => *present = true,
            // A bare presence mark carries no value to keep.
            (ObservedValueSet::Values(_), Observation::Present) => {}
        }
    }

    /// Union `other` into this set. Observations of the other shape are
    /// reduced to this set's shape.
    pub fn merge(&mut self, other: &ObservedValueSet) {
        match (self, other) {
            (ObservedValueSet::Values(values), ObservedValueSet::Values(more)) => {
                values.extend(more.iter().cloned());
            }
            (ObservedValueSet::Presence(present), other) => {
                *present = *present || other.is_observed();
            }
            (ObservedValueSet::Values(_), ObservedValueSet::Presence(_)) => {}
        }
    }
}
