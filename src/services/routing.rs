use crate::models::Coordinate;
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when requesting drive distances
#[derive(Debug, Error)]
pub enum RouteProviderError {
    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Router returned status {0}")]
    Status(StatusCode),

    #[error("Router rejected the request: {0}")]
    Api(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Expected {expected} distances, got {actual}")]
    LengthMismatch { expected: usize, actual: usize },

    #[error("Router did not answer within {0:?}")]
    Timeout(Duration),
}

/// Computes drive distances from one origin to many destinations
///
/// The returned vector is in meters and positionally aligned with
/// `destinations`; `None` marks a destination with no route.
#[async_trait]
pub trait RouteDistanceProvider: Send + Sync {
    async fn batch_distance(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<f64>>, RouteProviderError>;
}

/// OSRM table service client
pub struct OsrmRouter {
    base_url: String,
    profile: String,
    client: Client,
}

impl OsrmRouter {
    pub fn new(base_url: String, profile: String, timeout: Duration) -> Result<Self, RouteProviderError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            profile,
            client,
        })
    }

    /// Origin first, so `sources=0` yields a single row
    fn table_url(&self, origin: Coordinate, destinations: &[Coordinate]) -> String {
        let coordinates = std::iter::once(origin)
            .chain(destinations.iter().copied())
            .map(|c| c.to_string())
            .collect::<Vec<_>>()
            .join(";");

        format!(
            "{}/table/v1/{}/{}?sources=0&annotations=distance",
            self.base_url.trim_end_matches('/'),
            self.profile,
            coordinates
        )
    }
}

#[async_trait]
impl RouteDistanceProvider for OsrmRouter {
    async fn batch_distance(
        &self,
        origin: Coordinate,
        destinations: &[Coordinate],
    ) -> Result<Vec<Option<f64>>, RouteProviderError> {
        if destinations.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.table_url(origin, destinations);
        tracing::debug!("Requesting {} distances from {}", destinations.len(), origin);

        let response = self.client.get(&url).send().await?;

        if !response.status().is_success() {
            return Err(RouteProviderError::Status(response.status()));
        }

        let json: Value = response.json().await?;
        parse_table(&json, destinations.len())
    }
}

/// Extract the origin row of an OSRM table response, dropping the self-distance
fn parse_table(json: &Value, expected: usize) -> Result<Vec<Option<f64>>, RouteProviderError> {
    let code = json
        .get("code")
        .and_then(|c| c.as_str())
        .ok_or_else(|| RouteProviderError::InvalidResponse("Missing code".into()))?;

    if code != "Ok" {
        let message = json
            .get("message")
            .and_then(|m| m.as_str())
            .unwrap_or_default();
        return Err(RouteProviderError::Api(format!("{}: {}", code, message)));
    }

    let row = json
        .get("distances")
        .and_then(|d| d.as_array())
        .and_then(|d| d.first())
        .and_then(|r| r.as_array())
        .ok_or_else(|| RouteProviderError::InvalidResponse("Missing distances row".into()))?;

    // First column is origin -> origin
    if row.len() != expected + 1 {
        return Err(RouteProviderError::LengthMismatch {
            expected,
            actual: row.len().saturating_sub(1),
        });
    }

    Ok(row
        .iter()
        .skip(1)
        .map(|v| v.as_f64().filter(|m| m.is_finite() && *m >= 0.0))
        .collect())
}
