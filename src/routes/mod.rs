pub mod health;
pub mod locations;
pub mod weather;

use std::sync::Arc;
use std::time::Duration;

use axum::extract::FromRef;
use axum::middleware;
use axum::routing::{get, post};
use axum::Router;
use axum_extra::extract::cookie::Key;

use crate::db::locations::InMemoryLocationStore;
use crate::services::location::LocationService;
use crate::services::weather::WeatherService;
use crate::session;

/// Shared state for all API handlers.
#[derive(Clone)]
pub struct AppState {
    pub locations: Arc<LocationService>,
    pub weather: Arc<WeatherService>,
    /// Concrete store handle, for health reporting and sweeper shutdown.
    pub store: Arc<InMemoryLocationStore>,
    pub cookie_key: Key,
    pub session_max_age: Duration,
}

impl FromRef<AppState> for Key {
    fn from_ref(state: &AppState) -> Self {
        state.cookie_key.clone()
    }
}

/// Build the API router. Location routes run behind the session middleware.
pub fn router(state: AppState) -> Router {
    let location_routes = Router::new()
        .route(
            "/api/v1/locations",
            post(locations::create_location).get(locations::list_locations),
        )
        .route(
            "/api/v1/locations/:id",
            get(locations::get_location)
                .put(locations::update_location)
                .delete(locations::delete_location),
        )
        .route_layer(middleware::from_fn_with_state(
            state.clone(),
            session::user_session,
        ));

    Router::new()
        .route("/api/v1/health", get(health::health_check))
        .route("/api/v1/weather", get(weather::get_weather))
        .merge(location_routes)
        .with_state(state)
}
