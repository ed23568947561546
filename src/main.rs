// Weather Bookmarks API v0.1
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use axum::http::{header, Method};
use tower_http::catch_panic::CatchPanicLayer;
use tower_http::cors::{AllowOrigin, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};
use utoipa::OpenApi;
use utoipa_swagger_ui::SwaggerUi;

mod config;
mod db;
mod errors;
mod helpers;
mod routes;
mod services;
mod session;

use config::{AppConfig, Environment};
use db::locations::InMemoryLocationStore;
use routes::AppState;
use services::cache::InMemoryWeatherCache;
use services::location::LocationService;
use services::openweather::OpenWeatherClient;
use services::weather::WeatherService;

/// How long browsers may cache a CORS preflight response.
const CORS_MAX_AGE: Duration = Duration::from_secs(3600);

/// Weather Bookmarks API OpenAPI document.
#[derive(OpenApi)]
#[openapi(
    info(
        title = "Weather Bookmarks API",
        version = "0.1.0",
        description = "Current weather lookup backed by OpenWeather with a read-through \
            cache, plus per-session saved locations with ownership checks, pagination \
            and automatic expiry.",
        license(name = "MIT"),
    ),
    tags(
        (name = "Health", description = "Service health check"),
        (name = "Weather", description = "Current weather by city"),
        (name = "Locations", description = "Saved locations for the current session"),
    ),
    paths(
        routes::health::health_check,
        routes::weather::get_weather,
        routes::locations::create_location,
        routes::locations::list_locations,
        routes::locations::get_location,
        routes::locations::update_location,
        routes::locations::delete_location,
    ),
    components(
        schemas(
            routes::health::HealthResponse,
            routes::weather::WeatherResponse,
            routes::locations::CoordinatesDto,
            routes::locations::LocationRequest,
            routes::locations::UpdateLocationRequest,
            routes::locations::LocationResponse,
            routes::locations::PageMetaResponse,
            routes::locations::LocationListResponse,
            errors::ErrorResponse,
        )
    )
)]
struct ApiDoc;

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AppConfig::from_env()?;
    init_tracing(&config);

    let store = Arc::new(InMemoryLocationStore::new(config.data_retention));
    let provider = OpenWeatherClient::new(
        &config.open_url,
        &config.open_key,
        config.provider_timeout,
    )?;
    let weather = WeatherService::new(
        Arc::new(provider),
        Arc::new(InMemoryWeatherCache::new()),
    );

    let state = AppState {
        locations: Arc::new(LocationService::new(store.clone())),
        weather: Arc::new(weather),
        store: store.clone(),
        cookie_key: session::signing_key(config.session_secret.as_deref()),
        session_max_age: config.data_retention,
    };

    // Credentialed CORS cannot use `*`; mirror the request origin instead
    let cors = CorsLayer::new()
        .allow_origin(AllowOrigin::mirror_request())
        .allow_credentials(true)
        .allow_methods([
            Method::GET,
            Method::POST,
            Method::PUT,
            Method::DELETE,
            Method::OPTIONS,
        ])
        .allow_headers([header::CONTENT_TYPE, header::ACCEPT, header::AUTHORIZATION])
        .max_age(CORS_MAX_AGE);

    let app = routes::router(state)
        .merge(SwaggerUi::new("/swagger-ui").url("/api-docs/openapi.json", ApiDoc::openapi()))
        .layer(CatchPanicLayer::new())
        .layer(TraceLayer::new_for_http())
        .layer(cors);

    let addr = SocketAddr::from(([0, 0, 0, 0], config.port));
    tracing::info!("API server listening on {}", addr);
    tracing::info!(
        "Swagger UI available at http://localhost:{}/swagger-ui/",
        config.port
    );
    tracing::info!(
        "Locations are kept for {} hours",
        store.retention().as_secs() / 3600
    );

    let listener = tokio::net::TcpListener::bind(addr).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await?;

    store.stop_sweeper();
    tracing::info!("Server stopped");
    Ok(())
}

/// Development gets readable debug output, production gets JSON at the
/// configured level. `RUST_LOG` overrides both.
fn init_tracing(config: &AppConfig) {
    let level = match config.environment {
        Environment::Development => "debug",
        Environment::Production => config.log_level.as_str(),
    };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        format!("weather_bookmarks_api={level},tower_http={level}").into()
    });

    let registry = tracing_subscriber::registry().with(filter);
    match config.environment {
        Environment::Development => registry.with(tracing_subscriber::fmt::layer()).init(),
        Environment::Production => registry
            .with(tracing_subscriber::fmt::layer().json())
            .init(),
    }
}

async fn shutdown_signal() {
    let ctrl_c = async {
        if let Err(e) = tokio::signal::ctrl_c().await {
            tracing::error!("Failed to listen for Ctrl+C: {}", e);
            std::future::pending::<()>().await;
        }
    };

    #[cfg(unix)]
    let terminate = async {
        match tokio::signal::unix::signal(tokio::signal::unix::SignalKind::terminate()) {
            Ok(mut signal) => {
                signal.recv().await;
            }
            Err(e) => {
                tracing::error!("Failed to listen for SIGTERM: {}", e);
                std::future::pending::<()>().await;
            }
        }
    };

    #[cfg(not(unix))]
    let terminate = std::future::pending::<()>();

    tokio::select! {
        _ = ctrl_c => {},
        _ = terminate => {},
    }

    tracing::info!("Shutdown signal received, draining connections");
}
