//! Admission intake: decode review requests, decide what to forward to the
//! recorder, and build the response.
//!
//! The decision never depends on coverage state. Everything decodable is
//! allowed; only a review that cannot be decoded is denied.

mod queue;
mod review;

pub use queue::{spawn_recorder, EnqueueOutcome, IntakeQueue, IntakeStats, OverflowPolicy};
pub use review::{
    AdmissionRequest, AdmissionResponse, AdmissionReview, GroupVersionKind, Operation,
    ResponseStatus, ADMISSION_API_VERSION, ADMISSION_REVIEW_KIND,
};

use std::collections::HashSet;

use thiserror::Error;

use crate::schema::ResourceKey;

pub const ALLOWED_MESSAGE: &str = "Welcome Aboard";
pub const DENIED_MESSAGE: &str = "Admission Denied";

#[derive(Debug, Error)]
pub enum AdmissionError {
    #[error("Unable to decode review request: {0}")]
    Decode(#[from] serde_json::Error),

    #[error("Review carries no request")]
    MissingRequest,
}

/// Work handed from intake to the recorder.
#[derive(Debug, Clone)]
pub struct RecordRequest {
    pub key: ResourceKey,
    pub raw: Vec<u8>,
}

/// What intake decided for one review.
#[derive(Debug)]
pub struct IntakeResult {
    /// The review to send back.
    pub review: AdmissionReview,
    /// Set when the object should be recorded.
    pub forward: Option<RecordRequest>,
}

impl IntakeResult {
    pub fn allowed(&self) -> bool {
        self.review.response.as_ref().is_some_and(|r| r.allowed)
    }
}

/// Stateless review handler; only knows which kinds are registered.
#[derive(Debug, Clone)]
pub struct AdmissionIntake {
    registered: HashSet<ResourceKey>,
}

impl AdmissionIntake {
    pub fn new(registered: impl IntoIterator<Item = ResourceKey>) -> Self {
        Self {
            registered: registered.into_iter().collect(),
        }
    }

    pub fn is_registered(&self, key: &ResourceKey) -> bool {
        self.registered.contains(key)
    }

    /// Handles a raw review body.
    pub fn handle(&self, body: &[u8]) -> IntakeResult {
        match decode(body) {
            Ok(review) => self.review(review),
            Err(e) => {
                tracing::error!(error = %e, "rejecting undecodable admission review");
                IntakeResult {
                    review: AdmissionReview::respond(
                        ADMISSION_API_VERSION,
                        AdmissionResponse::denied("", format!("{}: {}", DENIED_MESSAGE, e)),
                    ),
                    forward: None,
                }
            }
        }
    }

    fn review(&self, review: AdmissionReview) -> IntakeResult {
        let api_version = review.api_version;
        let Some(request) = review.request else {
            // decode() guarantees a request
            return IntakeResult {
                review: AdmissionReview::respond(
                    &api_version,
                    AdmissionResponse::denied("", DENIED_MESSAGE),
                ),
                forward: None,
            };
        };

        let key = ResourceKey::from(&request.kind);
        let forward = if request.operation == Operation::Delete {
            tracing::debug!(resource = %key, "skipping delete");
            None
        } else if !self.is_registered(&key) {
            tracing::debug!(resource = %key, "bypassing unregistered kind");
            None
        } else {
            match request.object {
                Some(object) => Some(RecordRequest {
                    key,
                    raw: object.get().as_bytes().to_vec(),
                }),
                None => {
                    tracing::debug!(resource = %key, "review carries no object");
                    None
                }
            }
        };

        IntakeResult {
            review: AdmissionReview::respond(
                &api_version,
                AdmissionResponse::allowed(request.uid, ALLOWED_MESSAGE),
            ),
            forward,
        }
    }
}

fn decode(body: &[u8]) -> Result<AdmissionReview, AdmissionError> {
    let review: AdmissionReview = serde_json::from_slice(body)?;
    if review.request.is_none() {
        return Err(AdmissionError::MissingRequest);
    }
    Ok(review)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn intake() -> AdmissionIntake {
        AdmissionIntake::new([ResourceKey::new("apps", "v1", "Deployment")])
    }

    #[test]
    fn test_missing_request_is_denied() {
        let result = intake().handle(br#"{"apiVersion":"admission.k8s.io/v1","kind":"AdmissionReview"}"#);
        assert!(!result.allowed());
        assert!(result.forward.is_none());
    }

    #[test]
    fn test_response_echoes_version_and_uid() {
        let body = br#"{
            "apiVersion": "admission.k8s.io/v1beta1",
            "kind": "AdmissionReview",
            "request": {
                "uid": "abc-123",
                "kind": {"group": "apps", "version": "v1", "kind": "Deployment"},
                "operation": "CREATE",
                "object": {"metadata": {"name": "web"}}
            }
        }"#;
        let result = intake().handle(body);
        assert_eq!(result.review.api_version, "admission.k8s.io/v1beta1");
        let response = result.review.response.as_ref().unwrap();
        assert_eq!(response.uid, "abc-123");
        assert!(response.allowed);

        let forward = result.forward.unwrap();
        assert_eq!(forward.key, ResourceKey::new("apps", "v1", "Deployment"));
        let object: serde_json::Value = serde_json::from_slice(&forward.raw).unwrap();
        assert_eq!(object["metadata"]["name"], "web");
    }
}
