//! Time-bounded cache in front of a [`CountryResolver`]

use async_trait::async_trait;
use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::RwLock;
use tokio::time::Instant;
use tracing::debug;

use super::{CountryResolver, GeoError};

const DEFAULT_MAX_ENTRIES: usize = 10_000;

#[derive(Debug, Clone)]
struct Entry {
    country: String,
    stored_at: Instant,
}

/// Caches successful resolutions per address for a fixed TTL.
///
/// Failures are never cached, so a flaky provider is retried on the next
/// request from the same address.
pub struct CachedResolver {
    inner: Arc<dyn CountryResolver>,
    ttl: Duration,
    max_entries: usize,
    entries: RwLock<HashMap<String, Entry>>,
}

impl CachedResolver {
    pub fn new(inner: Arc<dyn CountryResolver>, ttl: Duration) -> Self {
        Self {
            inner,
            ttl,
            max_entries: DEFAULT_MAX_ENTRIES,
            entries: RwLock::new(HashMap::new()),
        }
    }

    pub fn with_max_entries(mut self, max_entries: usize) -> Self {
        self.max_entries = max_entries.max(1);
        self
    }

    pub async fn len(&self) -> usize {
        self.entries.read().await.len()
    }

    pub async fn is_empty(&self) -> bool {
        self.entries.read().await.is_empty()
    }

    async fn lookup(&self, address: &str) -> Option<String> {
        let entries = self.entries.read().await;
        let entry = entries.get(address)?;
        (entry.stored_at.elapsed() < self.ttl).then(|| entry.country.clone())
    }

    async fn store(&self, address: &str, country: &str) {
        let mut entries = self.entries.write().await;
        let ttl = self.ttl;

        if entries.len() >= self.max_entries {
            entries.retain(|_, e| e.stored_at.elapsed() < ttl);
        }
        if entries.len() >= self.max_entries {
            // Still full of live entries: evict the oldest one
            if let Some(oldest) = entries
                .iter()
                .min_by_key(|(_, e)| e.stored_at)
                .map(|(k, _)| k.clone())
            {
                entries.remove(&oldest);
            }
        }

        entries.insert(
            address.to_string(),
            Entry {
                country: country.to_string(),
                stored_at: Instant::now(),
            },
        );
    }
}

#[async_trait]
impl CountryResolver for CachedResolver {
    async fn resolve(&self, address: &str) -> Result<String, GeoError> {
        if let Some(country) = self.lookup(address).await {
            debug!(address = %address, country = %country, "Geo cache hit");
            return Ok(country);
        }

        let country = self.inner.resolve(address).await?;
        self.store(address, &country).await;
        Ok(country)
    }
}
