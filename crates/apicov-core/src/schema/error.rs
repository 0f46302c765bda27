use std::path::PathBuf;
use thiserror::Error;

use super::ResourceKey;

/// Errors raised while loading a catalog or building the schema forest.
///
/// All of these are fatal at startup: there is no sensible partial forest.
#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("Unknown type '{name}' referenced from {referenced_from}")]
    UnknownType {
        name: String,
        referenced_from: String,
    },

    #[error("Invalid type expression '{expr}': {reason}")]
    InvalidTypeExpr { expr: String, reason: String },

    #[error("Duplicate type definition: {0}")]
    DuplicateType(String),

    #[error("Duplicate resource: {0}")]
    DuplicateResource(ResourceKey),

    #[error("Kind '{0}' is registered under more than one group/version")]
    DuplicateKind(String),

    #[error("Polymorphic type '{name}' lists polymorphic alternative '{alternative}'")]
    NestedPolymorphic { name: String, alternative: String },

    #[error("Root type '{0}' of a resource must be a struct")]
    RootNotStruct(String),

    #[error("Failed to read catalog at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse catalog: {0}")]
    Parse(#[from] serde_yaml::Error),
}

impl SchemaError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        SchemaError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid_expr(expr: &str, reason: impl Into<String>) -> Self {
        SchemaError::InvalidTypeExpr {
            expr: expr.to_string(),
            reason: reason.into(),
        }
    }
}
