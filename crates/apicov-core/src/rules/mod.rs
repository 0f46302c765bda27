//! Node, field and display rules consulted by the forest builder and the
//! aggregator.
//!
//! Each table is an ordered list of (matcher, action) pairs. The first rule
//! whose matcher accepts a position wins; no match means default behavior
//! (include the node, track observed values with a presence-only domain, no
//! display rename).
//!
//! Named types are shared across every position that references them, so
//! polymorphic alternatives are selected by type alone: an alternatives rule
//! may not carry a path or prefix.

mod builtin;
mod error;
mod ignored;

pub use error::RulesError;
pub use ignored::IgnoredFields;

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::schema::ScalarKind;

/// Selects graph positions by type identity and/or path.
///
/// Every condition that is set must hold. A matcher with no condition set
/// matches nothing.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Matcher {
    /// Declared type identity: a named type, or a scalar keyword. Scalar
    /// spellings are interchangeable, so `int32` matches an `int64` leaf.
    #[serde(default, rename = "type", skip_serializing_if = "Option::is_none")]
    pub type_name: Option<String>,
    /// Exact path, e.g. `ObjectMeta.labels`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub path: Option<String>,
    /// Path prefix on segment boundaries, e.g. `PodSpec` matches `PodSpec.volumes`.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub prefix: Option<String>,
}

impl Matcher {
    pub fn for_type(name: impl Into<String>) -> Self {
        Self {
            type_name: Some(name.into()),
            ..Default::default()
        }
    }

    pub fn for_path(path: impl Into<String>) -> Self {
        Self {
            path: Some(path.into()),
            ..Default::default()
        }
    }

    pub fn for_prefix(prefix: impl Into<String>) -> Self {
        Self {
            prefix: Some(prefix.into()),
            ..Default::default()
        }
    }

    pub fn is_empty(&self) -> bool {
        self.type_name.is_none() && self.path.is_none() && self.prefix.is_none()
    }

    pub fn matches(&self, type_name: Option<&str>, path: &str) -> bool {
        if self.is_empty() {
            return false;
        }
        if let Some(expected) = &self.type_name {
            if type_name.map(canonical_type) != Some(canonical_type(expected)) {
                return false;
            }
        }
        if let Some(expected) = &self.path {
            if path != expected {
                return false;
            }
        }
        if let Some(prefix) = &self.prefix {
            let on_boundary = path
                .strip_prefix(prefix.as_str())
                .is_some_and(|rest| rest.is_empty() || rest.starts_with('.'));
            if !on_boundary {
                return false;
            }
        }
        true
    }
}

/// Scalar keywords collapse to their canonical spelling; type names pass
/// through.
fn canonical_type(name: &str) -> &str {
    ScalarKind::from_keyword(name).map_or(name, |scalar| scalar.keyword())
}

// =============================================================================
// Node Rules
// =============================================================================

/// What to do with a whole sub-node.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum NodeAction {
    /// Omit the node from the graph entirely.
    Exclude,
    /// Legal concrete shapes of a polymorphic type. Matched on type only.
    Alternatives(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct NodeRule {
    pub matcher: Matcher,
    pub action: NodeAction,
}

impl NodeRule {
    pub fn exclude(matcher: Matcher) -> Self {
        Self {
            matcher,
            action: NodeAction::Exclude,
        }
    }

    pub fn alternatives(matcher: Matcher, shapes: &[&str]) -> Self {
        Self {
            matcher,
            action: NodeAction::Alternatives(shapes.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct NodeRules {
    rules: Vec<NodeRule>,
}

impl NodeRules {
    pub fn new(rules: Vec<NodeRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: NodeRule) {
        self.rules.push(rule);
    }

    pub fn find(&self, type_name: Option<&str>, path: &str) -> Option<&NodeAction> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(type_name, path))
            .map(|rule| &rule.action)
    }

    pub fn excludes(&self, type_name: Option<&str>, path: &str) -> bool {
        matches!(self.find(type_name, path), Some(NodeAction::Exclude))
    }

    pub fn alternatives(&self, type_name: Option<&str>, path: &str) -> Option<&[String]> {
        match self.find(type_name, path) {
            Some(NodeAction::Alternatives(shapes)) => Some(shapes),
            _ => None,
        }
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// Field Rules
// =============================================================================

/// Per-leaf recording and accounting behavior.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum FieldAction {
    /// Track distinct values; covered once anything is observed.
    TrackValues,
    /// Record only whether the leaf was ever populated.
    PresenceOnly,
    /// Covered fraction is the share of this value domain observed.
    Enumerated(Vec<String>),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldRule {
    pub matcher: Matcher,
    pub action: FieldAction,
}

impl FieldRule {
    pub fn presence_only(matcher: Matcher) -> Self {
        Self {
            matcher,
            action: FieldAction::PresenceOnly,
        }
    }

    pub fn enumerated(matcher: Matcher, values: &[&str]) -> Self {
        Self {
            matcher,
            action: FieldAction::Enumerated(values.iter().map(|s| s.to_string()).collect()),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct FieldRules {
    rules: Vec<FieldRule>,
}

impl FieldRules {
    pub fn new(rules: Vec<FieldRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: FieldRule) {
        self.rules.push(rule);
    }

    pub fn find(&self, type_name: Option<&str>, path: &str) -> Option<&FieldAction> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(type_name, path))
            .map(|rule| &rule.action)
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// Display Rules
// =============================================================================

/// Cosmetic relabeling of a path in rendered reports.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DisplayRule {
    pub matcher: Matcher,
    pub label: String,
}

impl DisplayRule {
    pub fn new(matcher: Matcher, label: impl Into<String>) -> Self {
        Self {
            matcher,
            label: label.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct DisplayRules {
    rules: Vec<DisplayRule>,
}

impl DisplayRules {
    pub fn new(rules: Vec<DisplayRule>) -> Self {
        Self { rules }
    }

    pub fn push(&mut self, rule: DisplayRule) {
        self.rules.push(rule);
    }

    pub fn label(&self, type_name: Option<&str>, path: &str) -> Option<&str> {
        self.rules
            .iter()
            .find(|rule| rule.matcher.matches(type_name, path))
            .map(|rule| rule.label.as_str())
    }

    pub fn len(&self) -> usize {
        self.rules.len()
    }

    pub fn is_empty(&self) -> bool {
        self.rules.is_empty()
    }
}

// =============================================================================
// Rule Set
// =============================================================================

/// The three rule tables, consulted together.
#[derive(Debug, Clone, Default)]
pub struct RuleSet {
    pub node: NodeRules,
    pub field: FieldRules,
    pub display: DisplayRules,
}

impl RuleSet {
    /// Rules shipped with the engine for the built-in catalog.
    pub fn builtin() -> Self {
        builtin::rules()
    }

    /// Parse a rules file.
    pub fn from_yaml(content: &str) -> Result<Self, RulesError> {
        let file: RuleFile = serde_yaml::from_str(content)?;
        file.into_rule_set()
    }

    /// Load rules from a specific file.
    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RulesError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Built-in rules, preceded by the rules in `path` when one is given so
    /// that custom rules win.
    pub fn load(path: Option<&Path>) -> Result<Self, RulesError> {
        let builtin = Self::builtin();
        match path {
            Some(path) => Ok(Self::from_file(path)?.then(builtin)),
            None => Ok(builtin),
        }
    }

    /// Appends `other`'s rules after this set's rules.
    pub fn then(mut self, other: RuleSet) -> Self {
        self.node.rules.extend(other.node.rules);
        self.field.rules.extend(other.field.rules);
        self.display.rules.extend(other.display.rules);
        self
    }
}

// =============================================================================
// Rules File
// =============================================================================

#[derive(Debug, Deserialize)]
struct RuleFile {
    #[serde(default)]
    node: Vec<NodeRuleEntry>,
    #[serde(default)]
    field: Vec<FieldRuleEntry>,
    #[serde(default)]
    display: Vec<DisplayRuleEntry>,
}

#[derive(Debug, Deserialize)]
struct NodeRuleEntry {
    #[serde(flatten)]
    matcher: Matcher,
    #[serde(default)]
    exclude: bool,
    #[serde(default)]
    alternatives: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct FieldRuleEntry {
    #[serde(flatten)]
    matcher: Matcher,
    #[serde(default)]
    presence: bool,
    #[serde(default)]
    values: Option<Vec<String>>,
}

#[derive(Debug, Deserialize)]
struct DisplayRuleEntry {
    #[serde(flatten)]
    matcher: Matcher,
    label: String,
}

impl RuleFile {
    fn into_rule_set(self) -> Result<RuleSet, RulesError> {
        let mut set = RuleSet::default();

        for (index, entry) in self.node.into_iter().enumerate() {
            check_matcher("node", index, &entry.matcher)?;
            let action = match (entry.exclude, entry.alternatives) {
                (true, None) => NodeAction::Exclude,
                (false, Some(_))
                    if entry.matcher.path.is_some() || entry.matcher.prefix.is_some() =>
                {
                    return Err(RulesError::invalid(
                        "node",
                        index,
                        "alternatives are selected by type only",
                    ))
                }
                (false, Some(shapes)) => NodeAction::Alternatives(shapes),
                (true, Some(_)) => {
                    return Err(RulesError::invalid(
                        "node",
                        index,
                        "exclude and alternatives are mutually exclusive",
                    ))
                }
                (false, None) => {
                    return Err(RulesError::invalid(
                        "node",
                        index,
                        "expected exclude or alternatives",
                    ))
                }
            };
            set.node.push(NodeRule {
                matcher: entry.matcher,
                action,
            });
        }

        for (index, entry) in self.field.into_iter().enumerate() {
            check_matcher("field", index, &entry.matcher)?;
            let action = match (entry.presence, entry.values) {
                (true, Some(_)) => {
                    return Err(RulesError::invalid(
                        "field",
                        index,
                        "presence and values are mutually exclusive",
                    ))
                }
                (true, None) => FieldAction::PresenceOnly,
                (false, Some(values)) => FieldAction::Enumerated(values),
                (false, None) => FieldAction::TrackValues,
            };
            set.field.push(FieldRule {
                matcher: entry.matcher,
                action,
            });
        }

        for (index, entry) in self.display.into_iter().enumerate() {
            check_matcher("display", index, &entry.matcher)?;
            set.display.push(DisplayRule {
                matcher: entry.matcher,
                label: entry.label,
            });
        }

        Ok(set)
    }
}

fn check_matcher(table: &'static str, index: usize, matcher: &Matcher) -> Result<(), RulesError> {
    if matcher.is_empty() {
        return Err(RulesError::invalid(
            table,
            index,
            "matcher needs a type, path or prefix",
        ));
    }
    Ok(())
}
