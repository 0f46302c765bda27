//! Declarative schema catalog for the resource kinds whose coverage is measured.
//!
//! A catalog lists the registered resource kinds and the named types they are
//! built from. Field types are written as compact type expressions (see
//! [`TypeExpr`]). The built-in catalog covers a set of common Kubernetes kinds
//! and is embedded at compile time.

mod error;
mod expr;

pub use error::SchemaError;
pub use expr::{ScalarKind, TypeExpr};

use std::collections::HashSet;
use std::fmt;
use std::path::Path;

use serde::{Deserialize, Serialize};

// Embed the built-in catalog at compile time
const BUILTIN_CATALOG: &str = include_str!("catalog.yaml");

/// Identifies a registered resource kind: (group, version, kind).
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub struct ResourceKey {
    /// API group; empty for the core group.
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
}

impl ResourceKey {
    pub fn new(
        group: impl Into<String>,
        version: impl Into<String>,
        kind: impl Into<String>,
    ) -> Self {
        Self {
            group: group.into(),
            version: version.into(),
            kind: kind.into(),
        }
    }

    /// The `apiVersion` string for this key (`group/version`, or `version`
    /// for the core group).
    pub fn api_version(&self) -> String {
        if self.group.is_empty() {
            self.version.clone()
        } else {
            format!("{}/{}", self.group, self.version)
        }
    }

    /// File stem used for per-kind report artifacts: `group_version_kind`,
    /// lowercased.
    pub fn report_file_stem(&self) -> String {
        format!(
            "{}_{}_{}",
            self.group.to_lowercase(),
            self.version.to_lowercase(),
            self.kind.to_lowercase()
        )
    }
}

impl fmt::Display for ResourceKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}, Kind={}", self.api_version(), self.kind)
    }
}

/// A schema catalog: registered kinds plus the types they reference.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Catalog {
    #[serde(default)]
    pub resources: Vec<ResourceDef>,
    #[serde(default)]
    pub types: Vec<TypeDef>,
}

/// A registered resource kind and the name of its root type.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ResourceDef {
    #[serde(default)]
    pub group: String,
    pub version: String,
    pub kind: String,
    /// Root type name; defaults to the kind name.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub root: Option<String>,
}

impl ResourceDef {
    pub fn key(&self) -> ResourceKey {
        ResourceKey::new(&self.group, &self.version, &self.kind)
    }

    pub fn root_type(&self) -> &str {
        self.root.as_deref().unwrap_or(&self.kind)
    }
}

/// A named type: either a struct (`fields`) or a polymorphic interface (`oneOf`).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TypeDef {
    pub name: String,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub fields: Vec<FieldDef>,
    /// Legal concrete shapes of a polymorphic type. Node rules may override.
    #[serde(default, rename = "oneOf", skip_serializing_if = "Option::is_none")]
    pub one_of: Option<Vec<String>>,
}

impl TypeDef {
    pub fn is_polymorphic(&self) -> bool {
        self.one_of.is_some()
    }
}

/// A struct field declaration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FieldDef {
    pub name: String,
    #[serde(rename = "type")]
    pub ty: String,
    /// Enumerated value domain declared by the schema itself.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub values: Vec<String>,
}

impl FieldDef {
    pub fn type_expr(&self) -> Result<TypeExpr, SchemaError> {
        self.ty.parse()
    }
}

impl Catalog {
    /// The catalog embedded in the binary.
    pub fn builtin() -> Result<Self, SchemaError> {
        Self::from_yaml(BUILTIN_CATALOG)
    }

    /// Parse and validate a catalog from YAML.
    pub fn from_yaml(content: &str) -> Result<Self, SchemaError> {
        let catalog: Catalog = serde_yaml::from_str(content)?;
        catalog.validate()?;
        Ok(catalog)
    }

    /// Load a catalog from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| SchemaError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Load the catalog at `path`, or the built-in one when no path is given.
    pub fn load(path: Option<&Path>) -> Result<Self, SchemaError> {
        match path {
            Some(path) => Self::from_file(path),
            None => Self::builtin(),
        }
    }

    /// Keys of all registered resource kinds, in declaration order.
    pub fn keys(&self) -> Vec<ResourceKey> {
        self.resources.iter().map(ResourceDef::key).collect()
    }

    /// Looks up a named type.
    pub fn type_def(&self, name: &str) -> Option<&TypeDef> {
        self.types.iter().find(|t| t.name == name)
    }

    /// Checks for duplicate type names and malformed field expressions.
    ///
    /// References to unknown types are reported by the forest builder, which
    /// knows the path they were reached from.
    fn validate(&self) -> Result<(), SchemaError> {
        let mut seen = HashSet::new();
        for def in &self.types {
            if !seen.insert(def.name.as_str()) {
                return Err(SchemaError::DuplicateType(def.name.clone()));
            }
            for field in &def.fields {
                field.type_expr()?;
            }
        }
        Ok(())
    }
}
