//! Type expressions used by catalog field declarations.
//!
//! The grammar is deliberately small and Go-flavoured, matching how the
//! Kubernetes API types are usually written down:
//!
//! ```text
//! expr   := "*" expr            reference (optional / pointer)
//!         | "[]" expr           sequence
//!         | "map[" key "]" expr mapping, key type is not tracked
//!         | scalar
//!         | Name                named struct or interface type
//! ```

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::SchemaError;

/// Terminal value kinds a leaf can hold.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub enum ScalarKind {
    String,
    Integer,
    Number,
    Boolean,
    /// Either an integer or a string (`IntOrString`, resource quantities).
    IntOrString,
    /// Free-form JSON (raw extensions, arbitrary payloads).
    Any,
}

impl ScalarKind {
    /// Parses a scalar keyword. Returns `None` for anything that is not one.
    pub fn from_keyword(word: &str) -> Option<Self> {
        let kind = match word {
            "string" => ScalarKind::String,
            "int" | "int32" | "int64" | "integer" => ScalarKind::Integer,
            "float" | "float32" | "float64" | "number" => ScalarKind::Number,
            "bool" | "boolean" => ScalarKind::Boolean,
            "int-or-string" | "quantity" => ScalarKind::IntOrString,
            "any" => ScalarKind::Any,
            _ => return None,
        };
        Some(kind)
    }

    /// Canonical keyword, used as the leaf's type identity.
    pub fn keyword(&self) -> &'static str {
        match self {
            ScalarKind::String => "string",
            ScalarKind::Integer => "integer",
            ScalarKind::Number => "number",
            ScalarKind::Boolean => "boolean",
            ScalarKind::IntOrString => "int-or-string",
            ScalarKind::Any => "any",
        }
    }

    /// Canonical string form of a JSON value, or `None` if the value does not
    /// have this scalar's shape.
    pub fn canonical(&self, value: &Value) -> Option<String> {
        match (self, value) {
            (ScalarKind::String, Value::String(s)) => Some(s.clone()),
            (ScalarKind::Integer, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Some(n.to_string())
            }
            (ScalarKind::Number, Value::Number(n)) => Some(n.to_string()),
            (ScalarKind::Boolean, Value::Bool(b)) => Some(b.to_string()),
            (ScalarKind::IntOrString, Value::String(s)) => Some(s.clone()),
            (ScalarKind::IntOrString, Value::Number(n)) if n.is_i64() || n.is_u64() => {
                Some(n.to_string())
            }
            (ScalarKind::Any, Value::String(s)) => Some(s.clone()),
            (ScalarKind::Any, other) => Some(other.to_string()),
            _ => None,
        }
    }
}

impl fmt::Display for ScalarKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.keyword())
    }
}

/// A parsed field type.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum TypeExpr {
    Scalar(ScalarKind),
    Named(String),
    Reference(Box<TypeExpr>),
    Sequence(Box<TypeExpr>),
    Mapping(Box<TypeExpr>),
}

impl TypeExpr {
    /// The named type at the bottom of any wrappers, if there is one.
    pub fn named_type(&self) -> Option<&str> {
        match self {
            TypeExpr::Scalar(_) => None,
            TypeExpr::Named(name) => Some(name),
            TypeExpr::Reference(inner) | TypeExpr::Sequence(inner) | TypeExpr::Mapping(inner) => {
                inner.named_type()
            }
        }
    }
}

impl fmt::Display for TypeExpr {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            TypeExpr::Scalar(scalar) => write!(f, "{}", scalar),
            TypeExpr::Named(name) => f.write_str(name),
            TypeExpr::Reference(inner) => write!(f, "*{}", inner),
            TypeExpr::Sequence(inner) => write!(f, "[]{}", inner),
            TypeExpr::Mapping(inner) => write!(f, "map[string]{}", inner),
        }
    }
}

impl FromStr for TypeExpr {
    type Err = SchemaError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        parse(s.trim(), s)
    }
}

fn parse(rest: &str, whole: &str) -> Result<TypeExpr, SchemaError> {
    if rest.is_empty() {
        return Err(SchemaError::invalid_expr(whole, "missing type"));
    }

    if let Some(inner) = rest.strip_prefix('*') {
        return Ok(TypeExpr::Reference(Box::new(parse(inner, whole)?)));
    }

    if let Some(inner) = rest.strip_prefix("[]") {
        return Ok(TypeExpr::Sequence(Box::new(parse(inner, whole)?)));
    }

    if let Some(after) = rest.strip_prefix("map[") {
        let close = after
            .find(']')
            .ok_or_else(|| SchemaError::invalid_expr(whole, "unterminated map key"))?;
        if after[..close].trim().is_empty() {
            return Err(SchemaError::invalid_expr(whole, "empty map key type"));
        }
        return Ok(TypeExpr::Mapping(Box::new(parse(&after[close + 1..], whole)?)));
    }

    if let Some(scalar) = ScalarKind::from_keyword(rest) {
        return Ok(TypeExpr::Scalar(scalar));
    }

    let starts_alpha = rest.chars().next().is_some_and(|c| c.is_ascii_alphabetic());
    let valid_ident = rest
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_' || c == '.');
    if starts_alpha && valid_ident {
        Ok(TypeExpr::Named(rest.to_string()))
    } else {
        Err(SchemaError::invalid_expr(
            whole,
            format!("'{}' is not a type name", rest),
        ))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_parse_wrappers() {
        let expr: TypeExpr = "*[]map[string]Container".parse().unwrap();
        assert_eq!(
            expr,
            TypeExpr::Reference(Box::new(TypeExpr::Sequence(Box::new(TypeExpr::Mapping(
                Box::new(TypeExpr::Named("Container".to_string()))
            )))))
        );
        assert_eq!(expr.named_type(), Some("Container"));
    }

    #[test]
    fn test_parse_scalars() {
        assert_eq!(
            "int32".parse::<TypeExpr>().unwrap(),
            TypeExpr::Scalar(ScalarKind::Integer)
        );
        assert_eq!(
            "map[string]string".parse::<TypeExpr>().unwrap(),
            TypeExpr::Mapping(Box::new(TypeExpr::Scalar(ScalarKind::String)))
        );
        assert_eq!("bool".parse::<TypeExpr>().unwrap().named_type(), None);
    }

    #[test]
    fn test_parse_errors() {
        assert!("".parse::<TypeExpr>().is_err());
        assert!("[]".parse::<TypeExpr>().is_err());
        assert!("map[string".parse::<TypeExpr>().is_err());
        assert!("map[]string".parse::<TypeExpr>().is_err());
        assert!("9Lives".parse::<TypeExpr>().is_err());
        assert!("Pod Spec".parse::<TypeExpr>().is_err());
    }

    #[test]
    fn test_canonical_forms() {
        assert_eq!(ScalarKind::Integer.canonical(&json!(3)), Some("3".to_string()));
        assert_eq!(ScalarKind::Integer.canonical(&json!(3.5)), None);
        assert_eq!(ScalarKind::Boolean.canonical(&json!(false)), Some("false".to_string()));
        assert_eq!(ScalarKind::String.canonical(&json!(1)), None);
        assert_eq!(ScalarKind::IntOrString.canonical(&json!("50%")), Some("50%".to_string()));
        assert_eq!(ScalarKind::IntOrString.canonical(&json!(8080)), Some("8080".to_string()));
        assert_eq!(ScalarKind::Any.canonical(&json!({"a": 1})), Some(r#"{"a":1}"#.to_string()));
    }
}
