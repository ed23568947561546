//! City → weather snapshot cache.
//!
//! Exact-match keys, no expiry, no size bound. Fallback-and-fill logic lives
//! in the weather service; the cache only reports hits and misses.

use std::collections::HashMap;

use async_trait::async_trait;
use tokio::sync::RwLock;

use crate::services::weather::{Weather, WeatherError};

#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherCache: Send + Sync {
    /// Look up `city`. Absence is reported as [`WeatherError::CacheMiss`];
    /// any other error means the cache itself failed.
    async fn get(&self, city: &str) -> Result<Weather, WeatherError>;

    /// Insert or overwrite the snapshot for `city`.
    async fn set(&self, city: &str, weather: Weather) -> Result<(), WeatherError>;
}

#[derive(Debug, Default)]
pub struct InMemoryWeatherCache {
    entries: RwLock<HashMap<String, Weather>>,
}

impl InMemoryWeatherCache {
    pub fn new() -> Self {
        Self::default()
    }
}

#[async_trait]
impl WeatherCache for InMemoryWeatherCache {
    async fn get(&self, city: &str) -> Result<Weather, WeatherError> {
        let entries = self.entries.read().await;
        entries.get(city).cloned().ok_or(WeatherError::CacheMiss)
    }

    async fn set(&self, city: &str, weather: Weather) -> Result<(), WeatherError> {
        let mut entries = self.entries.write().await;
        entries.insert(city.to_string(), weather);
        Ok(())
    }
}
