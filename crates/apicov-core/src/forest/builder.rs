use std::collections::{BTreeMap, HashMap};

use tracing::debug;

use super::{LeafId, LeafMode, NodeId, NodeKind, ResourceForest, TypeNode};
use crate::rules::{FieldAction, RuleSet};
use crate::schema::{Catalog, ResourceDef, ResourceKey, ScalarKind, SchemaError, TypeExpr};

/// Builds a [`ResourceForest`] from a catalog, one resource kind at a time.
///
/// Named types are registered before their fields are expanded, so a type
/// that refers back to itself resolves to the node already being built.
pub struct ForestBuilder<'a> {
    catalog: &'a Catalog,
    rules: &'a RuleSet,
    nodes: Vec<TypeNode>,
    registry: HashMap<String, NodeId>,
    leaf_modes: Vec<LeafMode>,
    trees: BTreeMap<ResourceKey, NodeId>,
    kinds: HashMap<String, ResourceKey>,
}

impl<'a> ForestBuilder<'a> {
    pub fn new(catalog: &'a Catalog, rules: &'a RuleSet) -> Self {
        Self {
            catalog,
            rules,
            nodes: Vec::new(),
            registry: HashMap::new(),
            leaf_modes: Vec::new(),
            trees: BTreeMap::new(),
            kinds: HashMap::new(),
        }
    }

    /// Adds a tree for one resource kind.
    pub fn add_resource(&mut self, def: &ResourceDef) -> Result<NodeId, SchemaError> {
        let key = def.key();
        if self.trees.contains_key(&key) {
            return Err(SchemaError::DuplicateResource(key));
        }
        if self.kinds.contains_key(&key.kind) {
            return Err(SchemaError::DuplicateKind(key.kind));
        }

        let root = self.named(def.root_type(), &key.to_string())?;
        if !self.nodes[root.0].is_struct() {
            return Err(SchemaError::RootNotStruct(def.root_type().to_string()));
        }

        debug!(
            resource = %key,
            nodes = self.nodes.len(),
            leaves = self.leaf_modes.len(),
            "registered resource tree"
        );

        self.kinds.insert(key.kind.clone(), key.clone());
        self.trees.insert(key, root);
        Ok(root)
    }

    pub fn build(self) -> ResourceForest {
        ResourceForest {
            nodes: self.nodes,
            trees: self.trees,
            kinds: self.kinds,
            registry: self.registry,
            leaf_modes: self.leaf_modes,
        }
    }

    /// Returns the shared node for a named type, building it on first use.
    fn named(&mut self, name: &str, referenced_from: &str) -> Result<NodeId, SchemaError> {
        if let Some(id) = self.registry.get(name) {
            return Ok(*id);
        }

        let catalog = self.catalog;
        let def = catalog
            .type_def(name)
            .ok_or_else(|| SchemaError::UnknownType {
                name: name.to_string(),
                referenced_from: referenced_from.to_string(),
            })?;

        // Placeholder so recursive references terminate.
        let id = self.push(TypeNode {
            type_name: name.to_string(),
            field: None,
            path: name.to_string(),
            kind: NodeKind::Struct { fields: Vec::new() },
        });
        self.registry.insert(name.to_string(), id);

        let kind = match self.alternatives(name) {
            Some(shapes) => {
                let mut alternatives = Vec::with_capacity(shapes.len());
                for shape in &shapes {
                    // Each alternative must consume a level of the instance.
                    if self.alternatives(shape).is_some() {
                        return Err(SchemaError::NestedPolymorphic {
                            name: name.to_string(),
                            alternative: shape.clone(),
                        });
                    }
                    alternatives.push(self.named(shape, name)?);
                }
                NodeKind::Polymorphic { alternatives }
            }
            None => {
                let mut fields = Vec::with_capacity(def.fields.len());
                for field in &def.fields {
                    let expr = field.type_expr()?;
                    let path = format!("{}.{}", name, field.name);
                    let identity = type_identity(&expr);
                    if self.rules.node.excludes(Some(identity), &path) {
                        debug!(path = %path, "excluded by node rule");
                        continue;
                    }
                    let child = self.position(&expr, &field.name, &path, &field.values)?;
                    fields.push((field.name.clone(), child));
                }
                NodeKind::Struct { fields }
            }
        };

        self.nodes[id.0].kind = kind;
        Ok(id)
    }

    /// Concrete shapes of a polymorphic type: a node rule for the type wins
    /// over the catalog's `oneOf`. `None` for struct types.
    fn alternatives(&self, name: &str) -> Option<Vec<String>> {
        self.rules
            .node
            .alternatives(Some(name), name)
            .map(|shapes| shapes.to_vec())
            .or_else(|| self.catalog.type_def(name).and_then(|def| def.one_of.clone()))
    }

    /// Builds the node for a field position. Wrappers and leaves are owned by
    /// the position; named types are shared.
    fn position(
        &mut self,
        expr: &TypeExpr,
        field: &str,
        path: &str,
        values: &[String],
    ) -> Result<NodeId, SchemaError> {
        let kind = match expr {
            TypeExpr::Named(name) => return self.named(name, path),
            TypeExpr::Scalar(scalar) => self.leaf(*scalar, path, values),
            TypeExpr::Reference(inner) => NodeKind::Reference {
                target: self.position(inner, field, path, values)?,
            },
            TypeExpr::Sequence(inner) => NodeKind::Sequence {
                element: self.position(inner, field, path, values)?,
            },
            TypeExpr::Mapping(inner) => NodeKind::Mapping {
                value: self.position(inner, field, path, values)?,
            },
        };

        Ok(self.push(TypeNode {
            type_name: expr.to_string(),
            field: Some(field.to_string()),
            path: path.to_string(),
            kind,
        }))
    }

    fn leaf(&mut self, scalar: ScalarKind, path: &str, values: &[String]) -> NodeKind {
        let mode = match self.rules.field.find(Some(scalar.keyword()), path) {
            Some(FieldAction::PresenceOnly) => LeafMode::Presence,
            Some(FieldAction::Enumerated(domain)) => {
                LeafMode::Enumerated(domain.iter().cloned().collect())
            }
            Some(FieldAction::TrackValues) => LeafMode::Values,
            None if !values.is_empty() => LeafMode::Enumerated(values.iter().cloned().collect()),
            None => LeafMode::Values,
        };

        let leaf = LeafId(self.leaf_modes.len());
        self.leaf_modes.push(mode.clone());
        NodeKind::Leaf { scalar, leaf, mode }
    }

    fn push(&mut self, node: TypeNode) -> NodeId {
        let id = NodeId(self.nodes.len());
        self.nodes.push(node);
        id
    }
}

/// Type identity used for rule matching at a field position: the named type
/// under any wrappers, or the scalar keyword.
fn type_identity(expr: &TypeExpr) -> &str {
    match expr {
        TypeExpr::Scalar(scalar) => scalar.keyword(),
        TypeExpr::Named(name) => name,
        TypeExpr::Reference(inner) | TypeExpr::Sequence(inner) | TypeExpr::Mapping(inner) => {
            type_identity(inner)
        }
    }
}
