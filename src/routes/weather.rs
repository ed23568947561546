use axum::extract::{Query, State};
use axum::Json;
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};

use crate::errors::{AppError, ErrorResponse};
use crate::services::weather::Weather;
use crate::routes::AppState;

#[derive(Debug, Deserialize, IntoParams)]
#[into_params(parameter_in = Query)]
pub struct WeatherQuery {
    /// City name as understood by OpenWeather (e.g. "London" or "London,GB")
    pub city: Option<String>,
}

/// Current conditions for a city.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct WeatherResponse {
    /// OpenWeather icon code (e.g. "01d")
    pub icon: String,
    /// Temperature in °C
    pub temperature: f64,
    /// Human-readable description (e.g. "clear sky")
    pub description: String,
    /// Condition group (e.g. "Clear", "Rain")
    pub condition: String,
    /// Observation time, `YYYY-MM-DD HH:MM:SS` in server local time
    pub date_time: String,
    /// Location name reported by the provider
    pub location: String,
    pub units: String,
    pub lat: f64,
    pub lon: f64,
}

impl From<Weather> for WeatherResponse {
    fn from(w: Weather) -> Self {
        Self {
            icon: w.icon,
            temperature: w.temperature,
            description: w.description,
            condition: w.condition,
            date_time: w.date_time,
            location: w.location,
            units: w.units,
            lat: w.lat,
            lon: w.lon,
        }
    }
}

/// Get current weather for a city.
///
/// Served from the cache when the city has been looked up before; otherwise
/// fetched from OpenWeather and cached.
#[utoipa::path(
    get,
    path = "/api/v1/weather",
    tag = "Weather",
    params(WeatherQuery),
    responses(
        (status = 200, description = "Current conditions", body = WeatherResponse),
        (status = 400, description = "Missing or empty city", body = ErrorResponse),
        (status = 404, description = "City not known to the provider", body = ErrorResponse),
        (status = 500, description = "Provider unavailable", body = ErrorResponse),
    )
)]
pub async fn get_weather(
    State(state): State<AppState>,
    Query(query): Query<WeatherQuery>,
) -> Result<Json<WeatherResponse>, AppError> {
    let city = query
        .city
        .as_deref()
        .map(str::trim)
        .filter(|c| !c.is_empty())
        .ok_or_else(|| AppError::BadRequest("Query parameter 'city' is required".to_string()))?;

    let weather = state.weather.get_weather(city).await?;
    Ok(Json(weather.into()))
}
