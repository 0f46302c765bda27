//! The schema forest: one graph per registered resource kind, with every
//! named type built once and shared between the trees that use it.
//!
//! Nodes live in an arena and refer to each other by [`NodeId`], so
//! recursive types are plain back edges. The shape is immutable once built;
//! observations are kept separately in the coverage store, indexed by
//! [`LeafId`].

mod builder;
mod node;
mod observed;

pub use builder::ForestBuilder;
pub use node::{LeafId, LeafMode, NodeId, NodeKind, TypeNode};
pub use observed::{Observation, ObservedValueSet};

use std::collections::{BTreeMap, HashMap, HashSet};

use crate::rules::RuleSet;
use crate::schema::{Catalog, ResourceKey, SchemaError};

/// A resource kind's graph: its key and root node.
#[derive(Debug, Clone, Copy)]
pub struct ResourceTree<'a> {
    pub key: &'a ResourceKey,
    pub root: NodeId,
}

#[derive(Debug, Clone)]
pub struct ResourceForest {
    nodes: Vec<TypeNode>,
    trees: BTreeMap<ResourceKey, NodeId>,
    kinds: HashMap<String, ResourceKey>,
    registry: HashMap<String, NodeId>,
    leaf_modes: Vec<LeafMode>,
}

impl ResourceForest {
    /// Builds trees for every resource in the catalog.
    pub fn build(catalog: &Catalog, rules: &RuleSet) -> Result<Self, SchemaError> {
        let mut builder = ForestBuilder::new(catalog, rules);
        for def in &catalog.resources {
            builder.add_resource(def)?;
        }
        let forest = builder.build();
        tracing::info!(
            resources = forest.trees.len(),
            types = forest.registry.len(),
            leaves = forest.leaf_modes.len(),
            "built schema forest"
        );
        Ok(forest)
    }

    pub fn node(&self, id: NodeId) -> &TypeNode {
        &self.nodes[id.0]
    }

    pub fn root(&self, key: &ResourceKey) -> Option<NodeId> {
        self.trees.get(key).copied()
    }

    pub fn tree<'a>(&'a self, key: &ResourceKey) -> Option<ResourceTree<'a>> {
        self.trees
            .get_key_value(key)
            .map(|(key, root)| ResourceTree { key, root: *root })
    }

    /// All trees, ordered by key.
    pub fn trees(&self) -> impl Iterator<Item = ResourceTree<'_>> {
        self.trees
            .iter()
            .map(|(key, root)| ResourceTree { key, root: *root })
    }

    pub fn keys(&self) -> impl Iterator<Item = &ResourceKey> {
        self.trees.keys()
    }

    pub fn contains(&self, key: &ResourceKey) -> bool {
        self.trees.contains_key(key)
    }

    /// Resolves a bare kind name such as `Deployment` to its key.
    pub fn resolve_kind(&self, kind: &str) -> Option<&ResourceKey> {
        self.kinds.get(kind)
    }

    /// The canonical shared node for a named type.
    pub fn shared(&self, type_name: &str) -> Option<NodeId> {
        self.registry.get(type_name).copied()
    }

    pub fn leaf_count(&self) -> usize {
        self.leaf_modes.len()
    }

    pub fn leaf_mode(&self, leaf: LeafId) -> &LeafMode {
        &self.leaf_modes[leaf.0]
    }

    /// Fresh observation table with one empty slot per leaf.
    pub fn empty_observations(&self) -> Vec<ObservedValueSet> {
        self.leaf_modes
            .iter()
            .map(ObservedValueSet::for_mode)
            .collect()
    }

    /// Leaves reachable from `root`, each once, in walk order.
    pub fn reachable_leaves(&self, root: NodeId) -> Vec<LeafId> {
        let mut visited = HashSet::new();
        let mut leaves = Vec::new();
        let mut stack = vec![root];
        while let Some(id) = stack.pop() {
            if !visited.insert(id) {
                continue;
            }
            match &self.node(id).kind {
                NodeKind::Struct { fields } => {
                    stack.extend(fields.iter().rev().map(|(_, child)| *child));
                }
                NodeKind::Sequence { element } => stack.push(*element),
                NodeKind::Mapping { value } => stack.push(*value),
                NodeKind::Reference { target } => stack.push(*target),
                NodeKind::Polymorphic { alternatives } => {
                    stack.extend(alternatives.iter().rev().copied());
                }
                NodeKind::Leaf { leaf, .. } => leaves.push(*leaf),
            }
        }
        leaves
    }

    /// Finds the node reached by following field names from a resource root.
    ///
    /// Wrappers are stepped through transparently, so `["spec", "template"]`
    /// on a Deployment reaches the shared `PodTemplateSpec` node.
    pub fn lookup(&self, key: &ResourceKey, fields: &[&str]) -> Option<NodeId> {
        let mut current = self.root(key)?;
        for field in fields {
            current = self.unwrap(current);
            let NodeKind::Struct { fields: children } = &self.node(current).kind else {
                return None;
            };
            current = children
                .iter()
                .find(|(name, _)| name == field)
                .map(|(_, child)| *child)?;
        }
        Some(self.unwrap(current))
    }

    fn unwrap(&self, mut id: NodeId) -> NodeId {
        loop {
            match &self.node(id).kind {
                NodeKind::Sequence { element } => id = *element,
                NodeKind::Mapping { value } => id = *value,
                NodeKind::Reference { target } => id = *target,
                _ => return id,
            }
        }
    }
}
