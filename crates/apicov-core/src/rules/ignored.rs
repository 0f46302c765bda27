use std::collections::HashSet;
use std::path::Path;

use serde::Deserialize;

use super::RulesError;

/// One entry of an ignored-fields file.
#[derive(Debug, Deserialize)]
struct IgnoredEntry {
    #[serde(rename = "type")]
    type_name: String,
    #[serde(default)]
    fields: Vec<String>,
}

/// Field paths excluded from both numerator and denominator.
///
/// Loaded once at startup from a YAML list:
///
/// ```yaml
/// - type: ObjectMeta
///   fields: [uid, resourceVersion]
/// ```
///
/// which ignores `ObjectMeta.uid` and `ObjectMeta.resourceVersion`.
#[derive(Debug, Clone, Default)]
pub struct IgnoredFields {
    paths: HashSet<String>,
}

impl IgnoredFields {
    pub fn from_paths<I, S>(paths: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            paths: paths.into_iter().map(Into::into).collect(),
        }
    }

    pub fn from_yaml(content: &str) -> Result<Self, RulesError> {
        let entries: Option<Vec<IgnoredEntry>> = serde_yaml::from_str(content)?;
        let paths = entries
            .unwrap_or_default()
            .into_iter()
            .flat_map(|entry| {
                let type_name = entry.type_name;
                entry
                    .fields
                    .into_iter()
                    .map(move |field| format!("{}.{}", type_name, field))
            })
            .collect();
        Ok(Self { paths })
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self, RulesError> {
        let path = path.as_ref();
        let content = std::fs::read_to_string(path).map_err(|e| RulesError::io(path, e))?;
        Self::from_yaml(&content)
    }

    /// Load from `path`, degrading to an empty set when the file is missing
    /// or malformed. These only affect reporting precision.
    pub fn load_or_empty(path: impl AsRef<Path>) -> Self {
        let path = path.as_ref();
        match Self::from_file(path) {
            Ok(ignored) => {
                tracing::info!(
                    path = %path.display(),
                    count = ignored.len(),
                    "loaded ignored fields"
                );
                ignored
            }
            Err(e) => {
                tracing::error!(
                    path = %path.display(),
                    error = %e,
                    "failed to load ignored fields, continuing without them"
                );
                Self::default()
            }
        }
    }

    pub fn contains(&self, path: &str) -> bool {
        self.paths.contains(path)
    }

    pub fn len(&self) -> usize {
        self.paths.len()
    }

    pub fn is_empty(&self) -> bool {
        self.paths.is_empty()
    }
}
