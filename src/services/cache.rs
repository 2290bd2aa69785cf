use crate::models::{normalize_address, Coordinate};
use crate::services::geocoding::{GeoResolver, GeocodeError};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;

/// Geocode cache in front of any [`GeoResolver`]
///
/// Keys are normalised addresses, so spellings that differ only in case or
/// spacing share an entry. Only successful lookups are cached.
pub struct CachedGeoResolver {
    inner: Arc<dyn GeoResolver>,
    cache: moka::future::Cache<String, Coordinate>,
}

impl CachedGeoResolver {
    pub fn new(inner: Arc<dyn GeoResolver>, capacity: u64, ttl_secs: u64) -> Self {
        let cache = moka::future::CacheBuilder::new(capacity)
            .time_to_live(Duration::from_secs(ttl_secs))
            .build();

        Self { inner, cache }
    }

    pub fn stats(&self) -> CacheStats {
        CacheStats {
            entries: self.cache.entry_count(),
        }
    }
}

#[async_trait]
impl GeoResolver for CachedGeoResolver {
    async fn resolve(&self, address: &str) -> Result<Coordinate, GeocodeError> {
        let key = normalize_address(address);

        if let Some(coordinate) = self.cache.get(&key).await {
            tracing::trace!("Geocode cache hit: {}", key);
            return Ok(coordinate);
        }

        let coordinate = self.inner.resolve(address).await?;
        self.cache.insert(key, coordinate).await;

        Ok(coordinate)
    }
}

/// Cache statistics
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CacheStats {
    pub entries: u64,
}
