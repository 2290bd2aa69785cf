use crate::models::{Coordinate, CoordinateError};
use async_trait::async_trait;
use reqwest::{Client, StatusCode};
use serde_json::Value;
use std::time::Duration;
use thiserror::Error;

/// Errors that can occur when resolving an address
#[derive(Debug, Error)]
pub enum GeocodeError {
    #[error("Address is empty")]
    EmptyAddress,

    #[error("HTTP request failed: {0}")]
    RequestError(#[from] reqwest::Error),

    #[error("Geocoder returned status {0}")]
    Status(StatusCode),

    #[error("No results for address {0:?}")]
    NoResults(String),

    #[error("Invalid response format: {0}")]
    InvalidResponse(String),

    #[error("Geocoder returned an invalid coordinate: {0}")]
    InvalidCoordinate(#[from] CoordinateError),

    #[error("Geocoder did not answer within {0:?}")]
    Timeout(Duration),
}

/// Resolves a free-form address to a coordinate
#[async_trait]
pub trait GeoResolver: Send + Sync {
    async fn resolve(&self, address: &str) -> Result<Coordinate, GeocodeError>;
}

/// MapQuest geocoding API client
///
/// One request per call, no retries.
pub struct MapQuestGeocoder {
    base_url: String,
    api_key: String,
    client: Client,
}

impl MapQuestGeocoder {
    pub fn new(base_url: String, api_key: String, timeout: Duration) -> Result<Self, GeocodeError> {
        let client = Client::builder().timeout(timeout).build()?;

        Ok(Self {
            base_url,
            api_key,
            client,
        })
    }

    fn address_url(&self, address: &str) -> String {
        format!(
            "{}/geocoding/v1/address?key={}&location={}",
            self.base_url.trim_end_matches('/'),
            urlencoding::encode(&self.api_key),
            urlencoding::encode(address)
        )
    }
}

#[async_trait]
impl GeoResolver for MapQuestGeocoder {
    async fn resolve(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        if address.trim().is_empty() {
            return Err(GeocodeError::EmptyAddress);
        }

        tracing::debug!("Geocoding address: {}", address);

        let response = self.client.get(self.address_url(address)).send().await?;

        if !response.status().is_success() {
            return Err(GeocodeError::Status(response.status()));
        }

        let json: Value = response.json().await?;
        parse_mapquest(&json, address)
    }
}

/// Extract `results[0].locations[0].latLng` from a MapQuest response
fn parse_mapquest(json: &Value, address: &str) -> Result<Coordinate, GeocodeError> {
    let results = json
        .get("results")
        .and_then(|r| r.as_array())
        .ok_or_else(|| GeocodeError::InvalidResponse("Missing results array".into()))?;

    let location = results
        .first()
        .and_then(|r| r.get("locations"))
        .and_then(|l| l.as_array())
        .and_then(|l| l.first())
        .ok_or_else(|| GeocodeError::NoResults(address.to_string()))?;

    let lat_lng = location
        .get("latLng")
        .ok_or_else(|| GeocodeError::InvalidResponse("Missing latLng".into()))?;

    let lat = lat_lng
        .get("lat")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| GeocodeError::InvalidResponse("Missing latitude".into()))?;
    let lng = lat_lng
        .get("lng")
        .and_then(|v| v.as_f64())
        .ok_or_else(|| GeocodeError::InvalidResponse("Missing longitude".into()))?;

    Ok(Coordinate::new(lng, lat)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use mockito::Matcher;

    const ADDRESS: &str = "1 Main St,Springfield,IL,62701";

    fn geocoder(url: String) -> MapQuestGeocoder {
        MapQuestGeocoder::new(url, "test_key".to_string(), Duration::from_secs(5)).unwrap()
    }

    #[tokio::test]
    async fn test_resolve_parses_first_location() {
        let mut server = mockito::Server::new_async().await;
        let mock = server
            .mock("GET", "/geocoding/v1/address")
            .match_query(Matcher::AllOf(vec![
                Matcher::UrlEncoded("key".into(), "test_key".into()),
                Matcher::UrlEncoded("location".into(), ADDRESS.into()),
            ]))
            .with_status(200)
            .with_header("content-type", "application/json")
            .with_body(
                r#"{"results":[{"locations":[{"latLng":{"lat":39.7817,"lng":-89.6501}},
                   {"latLng":{"lat":0.0,"lng":0.0}}]}]}"#,
            )
            .create_async()
            .await;

        let coordinate = geocoder(server.url()).resolve(ADDRESS).await.unwrap();

        mock.assert_async().await;
        assert_eq!(coordinate.latitude(), 39.7817);
        assert_eq!(coordinate.longitude(), -89.6501);
    }

    #[tokio::test]
    async fn test_resolve_no_locations() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/geocoding/v1/address")
            .match_query(Matcher::Any)
            .with_status(200)
            .with_body(r#"{"results":[{"locations":[]}]}"#)
            .create_async()
            .await;

        let err = geocoder(server.url()).resolve(ADDRESS).await.unwrap_err();
        assert!(matches!(err, GeocodeError::NoResults(_)));
    }

    #[tokio::test]
    async fn test_resolve_http_error() {
        let mut server = mockito::Server::new_async().await;
        server
            .mock("GET", "/geocoding/v1/address")
            .match_query(Matcher::Any)
            .with_status(403)
            .create_async()
            .await;

        let err = geocoder(server.url()).resolve(ADDRESS).await.unwrap_err();
        assert!(matches!(err, GeocodeError::Status(s) if s == StatusCode::FORBIDDEN));
    }

    #[tokio::test]
    async fn test_resolve_empty_address_makes_no_request() {
        let err = geocoder("http://127.0.0.1:9".to_string())
            .resolve("   ")
            .await
            .unwrap_err();
        assert!(matches!(err, GeocodeError::EmptyAddress));
    }

    #[test]
    fn test_parse_rejects_out_of_range() {
        let json: Value = serde_json::from_str(
            r#"{"results":[{"locations":[{"latLng":{"lat":123.0,"lng":10.0}}]}]}"#,
        )
        .unwrap();
        assert!(matches!(
            parse_mapquest(&json, ADDRESS),
            Err(GeocodeError::InvalidCoordinate(_))
        ));
    }

    #[test]
    fn test_parse_malformed() {
        let json: Value = serde_json::from_str(r#"{"info":{"statuscode":500}}"#).unwrap();
        assert!(matches!(
            parse_mapquest(&json, ADDRESS),
            Err(GeocodeError::InvalidResponse(_))
        ));
    }
}
