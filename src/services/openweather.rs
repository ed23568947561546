//! OpenWeather current-conditions client.
//!
//! Fetches current weather for a city from the OpenWeather API.
//! See: https://openweathermap.org/current

use std::time::Duration;

use async_trait::async_trait;
use reqwest::StatusCode;
use serde::Deserialize;

use crate::helpers::format_local_datetime;
use crate::services::weather::{Weather, WeatherError, WeatherProvider};

/// Unit system requested from the provider. No conversion is done locally.
const METRIC_UNITS: &str = "metric";

/// Client for the OpenWeather current weather endpoint.
#[derive(Debug, Clone)]
pub struct OpenWeatherClient {
    client: reqwest::Client,
    base_url: String,
    api_key: String,
}

// --- OpenWeather JSON response types ---

#[derive(Debug, Deserialize)]
struct OwResponse {
    main: OwMain,
    weather: Vec<OwCondition>,
    dt: i64,
    name: String,
    coord: OwCoord,
}

#[derive(Debug, Deserialize)]
struct OwMain {
    temp: f64,
}

#[derive(Debug, Deserialize)]
struct OwCondition {
    main: String,
    description: String,
    icon: String,
}

#[derive(Debug, Deserialize)]
struct OwCoord {
    lat: f64,
    lon: f64,
}

impl OpenWeatherClient {
    /// Build a client for `base_url` (e.g. `https://api.openweathermap.org/data/2.5/weather`).
    /// Every request is bounded by `timeout`.
    pub fn new(base_url: &str, api_key: &str, timeout: Duration) -> Result<Self, WeatherError> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .build()
            .map_err(|e| WeatherError::Client(format!("Failed to build HTTP client: {}", e)))?;
        Ok(Self {
            client,
            base_url: base_url.to_string(),
            api_key: api_key.to_string(),
        })
    }

    /// Fetch current conditions for `city` (single attempt, no retry).
    pub async fn fetch_current(&self, city: &str) -> Result<Weather, WeatherError> {
        let response = self
            .client
            .get(&self.base_url)
            .query(&[
                ("q", city),
                ("appid", self.api_key.as_str()),
                ("units", METRIC_UNITS),
            ])
            .send()
            .await
            .map_err(|e| {
                if e.is_timeout() {
                    WeatherError::Fetch(format!("OpenWeather request timed out: {}", e))
                } else {
                    WeatherError::Fetch(format!("OpenWeather request failed: {}", e))
                }
            })?;

        let status = response.status();
        if status == StatusCode::NOT_FOUND {
            return Err(WeatherError::CityNotFound(city.to_string()));
        }
        if !status.is_success() {
            return Err(WeatherError::Fetch(format!(
                "OpenWeather returned HTTP {}",
                status
            )));
        }

        let body: OwResponse = response.json().await.map_err(|e| {
            WeatherError::Fetch(format!("OpenWeather JSON parse error: {}", e))
        })?;

        to_weather(body)
    }
}

#[async_trait]
impl WeatherProvider for OpenWeatherClient {
    async fn fetch_weather(&self, city: &str) -> Result<Weather, WeatherError> {
        tracing::debug!("Fetching weather for '{}' from OpenWeather", city);
        self.fetch_current(city).await
    }
}

/// Map a decoded provider response into the domain snapshot.
fn to_weather(body: OwResponse) -> Result<Weather, WeatherError> {
    let condition = body.weather.into_iter().next().ok_or_else(|| {
        WeatherError::Fetch("OpenWeather returned no weather conditions".to_string())
    })?;

    let date_time = format_local_datetime(body.dt).ok_or_else(|| {
        WeatherError::Fetch(format!("OpenWeather returned invalid timestamp {}", body.dt))
    })?;

    Ok(Weather {
        icon: condition.icon,
        temperature: body.main.temp,
        description: condition.description,
        condition: condition.main,
        date_time,
        location: body.name,
        units: METRIC_UNITS.to_string(),
        lat: body.coord.lat,
        lon: body.coord.lon,
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::matchers::{method, path, query_param};
    use wiremock::{Mock, MockServer, ResponseTemplate};

    const ENDPOINT: &str = "/data/2.5/weather";

    fn london_body() -> serde_json::Value {
        serde_json::json!({
            "main": { "temp": 25.0 },
            "weather": [
                { "description": "clear sky", "icon": "01d", "main": "Clear" }
            ],
            "sys": { "sunrise": 1622520000, "sunset": 1622570400 },
            "dt": 1622548800,
            "timezone": 3600,
            "name": "London",
            "coord": { "lon": -0.1257, "lat": 51.5085 }
        })
    }

    fn client_for(server: &MockServer) -> OpenWeatherClient {
        OpenWeatherClient::new(
            &format!("{}{}", server.uri(), ENDPOINT),
            "test-key",
            Duration::from_secs(2),
        )
        .unwrap()
    }

    #[tokio::test]
    async fn test_fetch_success() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .and(query_param("q", "London"))
            .and(query_param("appid", "test-key"))
            .and(query_param("units", "metric"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        let weather = client_for(&server).fetch_weather("London").await.unwrap();

        assert_eq!(
            weather,
            Weather {
                icon: "01d".to_string(),
                temperature: 25.0,
                description: "clear sky".to_string(),
                condition: "Clear".to_string(),
                date_time: format_local_datetime(1622548800).unwrap(),
                location: "London".to_string(),
                units: "metric".to_string(),
                lat: 51.5085,
                lon: -0.1257,
            }
        );
    }

    #[tokio::test]
    async fn test_fetch_encodes_city_with_spaces() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .and(query_param("q", "New York"))
            .respond_with(ResponseTemplate::new(200).set_body_json(london_body()))
            .expect(1)
            .mount(&server)
            .await;

        assert!(client_for(&server).fetch_weather("New York").await.is_ok());
    }

    #[tokio::test]
    async fn test_fetch_city_not_found() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(404).set_body_json(serde_json::json!({
                "cod": "404",
                "message": "city not found"
            })))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_weather("Nowhere").await;
        assert_eq!(result, Err(WeatherError::CityNotFound("Nowhere".to_string())));
    }

    #[tokio::test]
    async fn test_fetch_server_error() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(500))
            .mount(&server)
            .await;

        match client_for(&server).fetch_weather("London").await {
            Err(WeatherError::Fetch(msg)) => {
                assert!(msg.contains("500"), "Error should mention status: {}", msg)
            }
            other => panic!("Expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_unauthorized_key_is_generic_failure() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(401))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_weather("London").await;
        assert!(matches!(result, Err(WeatherError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_malformed_body() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_string("{not json"))
            .mount(&server)
            .await;

        let result = client_for(&server).fetch_weather("London").await;
        assert!(matches!(result, Err(WeatherError::Fetch(_))));
    }

    #[tokio::test]
    async fn test_fetch_empty_conditions_array() {
        let server = MockServer::start().await;
        let mut body = london_body();
        body["weather"] = serde_json::json!([]);
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(ResponseTemplate::new(200).set_body_json(body))
            .mount(&server)
            .await;

        match client_for(&server).fetch_weather("London").await {
            Err(WeatherError::Fetch(msg)) => assert!(msg.contains("no weather conditions")),
            other => panic!("Expected fetch error, got {:?}", other),
        }
    }

    #[tokio::test]
    async fn test_fetch_times_out() {
        let server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path(ENDPOINT))
            .respond_with(
                ResponseTemplate::new(200)
                    .set_body_json(london_body())
                    .set_delay(Duration::from_secs(2)),
            )
            .mount(&server)
            .await;

        let client = OpenWeatherClient::new(
            &format!("{}{}", server.uri(), ENDPOINT),
            "test-key",
            Duration::from_millis(100),
        )
        .unwrap();

        match client.fetch_weather("London").await {
            Err(WeatherError::Fetch(msg)) => assert!(msg.contains("timed out"), "{}", msg),
            other => panic!("Expected timeout, got {:?}", other),
        }
    }
}
