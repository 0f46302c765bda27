use std::collections::HashSet;
use std::sync::Arc;

use serde_json::{Map, Value};
use thiserror::Error;

use super::CoverageStore;
use crate::forest::{LeafId, LeafMode, NodeId, NodeKind, Observation, ResourceForest};
use crate::schema::ResourceKey;

/// Why a single instance could not be recorded. Nothing from the instance
/// is applied when this is returned.
#[derive(Debug, Error)]
pub enum RecordError {
    #[error("Failed to decode instance: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Value at {path} does not match declared type {expected}")]
    Mismatch { path: String, expected: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RecordOutcome {
    /// The instance was walked; `leaves` observations were applied.
    Recorded { leaves: usize },
    /// The key has no tree; nothing was touched.
    Unregistered,
}

/// Walks observed instances against their resource tree and records every
/// populated leaf.
#[derive(Debug, Clone)]
pub struct Recorder {
    store: Arc<CoverageStore>,
}

impl Recorder {
    pub fn new(store: Arc<CoverageStore>) -> Self {
        Self { store }
    }

    pub fn store(&self) -> &Arc<CoverageStore> {
        &self.store
    }

    /// Decodes `raw` as JSON and records it against `key`'s tree.
    pub fn record(&self, key: &ResourceKey, raw: &[u8]) -> Result<RecordOutcome, RecordError> {
        if !self.store.forest().contains(key) {
            return Ok(RecordOutcome::Unregistered);
        }
        let value: Value = serde_json::from_slice(raw)?;
        self.record_value(key, &value)
    }

    /// Records an already decoded instance.
    pub fn record_value(
        &self,
        key: &ResourceKey,
        value: &Value,
    ) -> Result<RecordOutcome, RecordError> {
        let Some(root) = self.store.forest().root(key) else {
            return Ok(RecordOutcome::Unregistered);
        };

        let mut walk = Walk {
            forest: self.store.forest(),
            updates: Vec::new(),
        };
        walk.node(root, value)?;

        let leaves = walk.updates.len();
        self.store.merge(walk.updates);
        Ok(RecordOutcome::Recorded { leaves })
    }
}

/// Collects observations for one instance without touching the store.
struct Walk<'a> {
    forest: &'a ResourceForest,
    updates: Vec<(LeafId, Observation)>,
}

impl Walk<'_> {
    fn node(&mut self, id: NodeId, value: &Value) -> Result<(), RecordError> {
        if value.is_null() {
            return Ok(());
        }

        let forest = self.forest;
        let node = forest.node(id);
        match &node.kind {
            NodeKind::Struct { fields } => {
                let object = value.as_object().ok_or_else(|| mismatch(forest, id))?;
                for (name, child) in fields {
                    if let Some(field_value) = object.get(name) {
                        self.node(*child, field_value)?;
                    }
                }
            }
            NodeKind::Sequence { element } => {
                let items = value.as_array().ok_or_else(|| mismatch(forest, id))?;
                for item in items {
                    self.node(*element, item)?;
                }
            }
            NodeKind::Mapping { value: child } => {
                let object = value.as_object().ok_or_else(|| mismatch(forest, id))?;
                for item in object.values() {
                    self.node(*child, item)?;
                }
            }
            NodeKind::Reference { target } => self.node(*target, value)?,
            NodeKind::Polymorphic { alternatives } => self.polymorphic(id, alternatives, value)?,
            NodeKind::Leaf { scalar, leaf, mode } => {
                let canonical = scalar
                    .canonical(value)
                    .ok_or_else(|| mismatch(forest, id))?;
                let observation = match mode {
                    LeafMode::Presence => Observation::Present,
                    LeafMode::Values | LeafMode::Enumerated(_) => Observation::Value(canonical),
                };
                self.updates.push((*leaf, observation));
            }
        }
        Ok(())
    }

    /// Walks the first candidate shape that fits, best structural match first.
    fn polymorphic(
        &mut self,
        id: NodeId,
        alternatives: &[NodeId],
        value: &Value,
    ) -> Result<(), RecordError> {
        let forest = self.forest;
        let candidates = rank_alternatives(forest, alternatives, value.as_object());
        for candidate in candidates {
            let mark = self.updates.len();
            match self.node(candidate, value) {
                Ok(()) => return Ok(()),
                Err(RecordError::Mismatch { .. }) => self.updates.truncate(mark),
                Err(e) => return Err(e),
            }
        }
        Err(mismatch(forest, id))
    }
}

/// Orders alternatives: an explicit `kind` discriminator first, then shapes
/// whose fields contain every observed key, then by key overlap. Ties keep
/// declaration order.
fn rank_alternatives(
    forest: &ResourceForest,
    alternatives: &[NodeId],
    object: Option<&Map<String, Value>>,
) -> Vec<NodeId> {
    let Some(object) = object else {
        return alternatives.to_vec();
    };
    let discriminator = object.get("kind").and_then(Value::as_str);

    let mut scored: Vec<(NodeId, (bool, bool, usize))> = alternatives
        .iter()
        .map(|&alt| {
            let node = forest.node(alt);
            let names: HashSet<&str> = node.field_names().collect();
            let overlap = object.keys().filter(|k| names.contains(k.as_str())).count();
            let superset = overlap == object.len();
            let named = discriminator == Some(node.type_name.as_str());
            (alt, (named, superset, overlap))
        })
        .collect();

    // Stable sort keeps declaration order among equal scores.
    scored.sort_by(|a, b| b.1.cmp(&a.1));
    scored.into_iter().map(|(alt, _)| alt).collect()
}

fn mismatch(forest: &ResourceForest, id: NodeId) -> RecordError {
    let node = forest.node(id);
    RecordError::Mismatch {
        path: node.path.clone(),
        expected: node.type_name.clone(),
    }
}
