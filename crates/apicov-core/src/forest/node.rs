use std::collections::BTreeSet;

use crate::schema::ScalarKind;

/// Index of a node in the forest arena.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NodeId(pub(crate) usize);

impl NodeId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// Index of a leaf's slot in the observation table.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct LeafId(pub(crate) usize);

impl LeafId {
    pub fn index(self) -> usize {
        self.0
    }
}

/// How a leaf records observations and what it counts towards coverage.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum LeafMode {
    /// Track distinct values; one unit of coverage once anything is seen.
    Values,
    /// Track only whether the leaf was ever populated.
    Presence,
    /// Each value of the domain is one unit of coverage.
    Enumerated(BTreeSet<String>),
}

/// One position in a schema graph.
#[derive(Debug, Clone)]
pub struct TypeNode {
    /// Declared type identity: a named type, a scalar keyword, or a wrapper
    /// expression such as `[]Container`.
    pub type_name: String,
    /// Field name of the position that owns this node. `None` for shared
    /// named nodes, which may be reached from many fields.
    pub field: Option<String>,
    /// Stable dot-separated path, e.g. `ObjectMeta` or `ObjectMeta.labels`.
    pub path: String,
    pub kind: NodeKind,
}

#[derive(Debug, Clone)]
pub enum NodeKind {
    /// Fields in declaration order.
    Struct { fields: Vec<(String, NodeId)> },
    Sequence { element: NodeId },
    /// Keys are not tracked.
    Mapping { value: NodeId },
    /// Optional position; absence never lowers coverage.
    Reference { target: NodeId },
    /// Union of the legal concrete shapes.
    Polymorphic { alternatives: Vec<NodeId> },
    Leaf {
        scalar: ScalarKind,
        leaf: LeafId,
        mode: LeafMode,
    },
}

impl TypeNode {
    pub fn is_struct(&self) -> bool {
        matches!(self.kind, NodeKind::Struct { .. })
    }

    /// Field names of a struct node; empty for every other variant.
    pub fn field_names(&self) -> impl Iterator<Item = &str> {
        let fields: &[(String, NodeId)] = match &self.kind {
            NodeKind::Struct { fields } => fields.as_slice(),
            _ => &[],
        };
        fields.iter().map(|(name, _)| name.as_str())
    }
}
