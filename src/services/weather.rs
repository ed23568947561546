//! Cache-aside weather lookup.
//!
//! 1. Cache hit → return it without touching the provider.
//! 2. `CacheMiss` → fetch from the provider, fill the cache, return the snapshot.
//!    Provider failures (including `CityNotFound`) propagate and nothing is cached.
//!    A failed cache write fails the whole lookup.
//! 3. Any other cache error propagates without calling the provider.

use std::sync::Arc;

use async_trait::async_trait;

use crate::services::cache::WeatherCache;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum WeatherError {
    /// Internal signal from the cache; never surfaced past [`WeatherService`].
    #[error("Weather not cached")]
    CacheMiss,

    #[error("City {0} not found")]
    CityNotFound(String),

    /// Non-404 status, network failure, timeout or undecodable body.
    #[error("Weather fetch failed: {0}")]
    Fetch(String),

    #[error("Weather cache error: {0}")]
    Cache(String),

    #[error("HTTP client error: {0}")]
    Client(String),
}

/// Current conditions for one city, as returned by the provider at fetch time.
#[derive(Debug, Clone, PartialEq)]
pub struct Weather {
    pub icon: String,
    pub temperature: f64,
    pub description: String,
    /// Short condition code (e.g. "Clear", "Rain")
    pub condition: String,
    /// Provider observation time in local time, `YYYY-MM-DD HH:MM:SS`
    pub date_time: String,
    /// Location name as reported by the provider
    pub location: String,
    pub units: String,
    pub lat: f64,
    pub lon: f64,
}

/// Source of current weather conditions.
#[cfg_attr(test, mockall::automock)]
#[async_trait]
pub trait WeatherProvider: Send + Sync {
    async fn fetch_weather(&self, city: &str) -> Result<Weather, WeatherError>;
}

pub struct WeatherService {
    provider: Arc<dyn WeatherProvider>,
    cache: Arc<dyn WeatherCache>,
}

impl WeatherService {
    pub fn new(provider: Arc<dyn WeatherProvider>, cache: Arc<dyn WeatherCache>) -> Self {
        Self { provider, cache }
    }

    pub async fn get_weather(&self, city: &str) -> Result<Weather, WeatherError> {
        match self.cache.get(city).await {
            Ok(weather) => {
                tracing::debug!("Weather cache hit for '{}'", city);
                return Ok(weather);
            }
            Err(WeatherError::CacheMiss) => {}
            Err(e) => return Err(e),
        }

        let weather = self.provider.fetch_weather(city).await?;
        self.cache.set(city, weather.clone()).await?;
        tracing::debug!("Weather cache filled for '{}'", city);

        Ok(weather)
    }
}
