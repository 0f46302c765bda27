use std::time::Duration;

use reqwest::{Client, StatusCode};
use serde::de::DeserializeOwned;

use apicov_core::{CoveragePercentages, CoverageValues};

use super::CollectError;

/// Client for the webhook's query API.
///
/// The webhook serves a self-signed certificate, so certificate checks are
/// turned off.
pub struct CoverageClient {
    base_uri: String,
    client: Client,
}

impl CoverageClient {
    pub fn new(base_uri: impl Into<String>, timeout: Duration) -> Result<Self, CollectError> {
        let client = Client::builder()
            .danger_accept_invalid_certs(true)
            .timeout(timeout)
            .build()
            .map_err(CollectError::Client)?;
        Ok(Self {
            base_uri: base_uri.into().trim_end_matches('/').to_string(),
            client,
        })
    }

    /// HTML report for one kind.
    pub async fn resource_coverage(&self, kind: &str) -> Result<String, CollectError> {
        let uri = format!("{}/resourcecoverage", self.base_uri);
        let response = self
            .client
            .get(&uri)
            .query(&[("resource", kind)])
            .send()
            .await
            .map_err(|source| CollectError::http(&uri, source))?;
        let response = require_ok(&uri, response)?;
        response
            .text()
            .await
            .map_err(|source| CollectError::http(&uri, source))
    }

    pub async fn total_coverage(&self) -> Result<CoverageValues, CollectError> {
        self.get_json("/totalcoverage").await
    }

    pub async fn percentages(&self) -> Result<CoveragePercentages, CollectError> {
        self.get_json("/resourcepercentagecoverage").await
    }

    async fn get_json<T: DeserializeOwned>(&self, path: &str) -> Result<T, CollectError> {
        let uri = format!("{}{}", self.base_uri, path);
        let response = self
            .client
            .get(&uri)
            .send()
            .await
            .map_err(|source| CollectError::http(&uri, source))?;
        require_ok(&uri, response)?
            .json()
            .await
            .map_err(|source| CollectError::http(&uri, source))
    }
}

fn require_ok(uri: &str, response: reqwest::Response) -> Result<reqwest::Response, CollectError> {
    if response.status() != StatusCode::OK {
        return Err(CollectError::Status {
            uri: uri.to_string(),
            status: response.status().as_u16(),
        });
    }
    Ok(response)
}
