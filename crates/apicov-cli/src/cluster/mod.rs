//! Cluster glue: registering the webhook and finding its query endpoint.
//!
//! Object construction is pure and unit tested; the kube calls around it
//! are kept thin.

mod discovery;
mod registration;

pub use discovery::discover_webhook_uri;
pub use registration::register_webhook;

use std::path::PathBuf;

use thiserror::Error;

#[derive(Debug, Error)]
pub enum ClusterError {
    #[error("Failed to create Kubernetes client: {source}")]
    Client {
        #[source]
        source: Box<kube::Error>,
    },

    #[error("Failed to {action}: {source}")]
    Kube {
        action: String,
        #[source]
        source: Box<kube::Error>,
    },

    #[error("Failed to read CA bundle {}: {source}", path.display())]
    CaBundle {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Deployment {namespace}/{name} has no uid")]
    MissingUid { namespace: String, name: String },

    #[error("Unable to get address for service {namespace}/{name}: {reason}")]
    Unreachable {
        namespace: String,
        name: String,
        reason: String,
    },
}

impl ClusterError {
    pub fn kube(action: impl Into<String>, source: kube::Error) -> Self {
        ClusterError::Kube {
            action: action.into(),
            source: Box::new(source),
        }
    }
}

async fn client() -> Result<kube::Client, ClusterError> {
    kube::Client::try_default()
        .await
        .map_err(|e| ClusterError::Client {
            source: Box::new(e),
        })
}
