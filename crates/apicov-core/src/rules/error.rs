use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading rules or ignored fields.
#[derive(Debug, Error)]
pub enum RulesError {
    #[error("IO error at {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse rules: {0}")]
    Parse(#[from] serde_yaml::Error),

    #[error("Invalid {table} rule #{index}: {reason}")]
    Invalid {
        table: &'static str,
        index: usize,
        reason: String,
    },
}

impl RulesError {
    pub fn io(path: impl Into<PathBuf>, source: std::io::Error) -> Self {
        RulesError::Io {
            path: path.into(),
            source,
        }
    }

    pub(crate) fn invalid(table: &'static str, index: usize, reason: impl Into<String>) -> Self {
        RulesError::Invalid {
            table,
            index,
            reason: reason.into(),
        }
    }
}
