use std::collections::BTreeMap;

use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use serde::Serialize;
use utoipa::ToSchema;

use crate::db::locations::LocationError;
use crate::services::weather::WeatherError;

/// Standard error response body.
#[derive(Debug, Serialize, ToSchema)]
pub struct ErrorResponse {
    /// Human-readable error message
    pub error: String,
    /// Per-field validation messages, present only on 422 responses
    #[serde(skip_serializing_if = "Option::is_none")]
    pub details: Option<BTreeMap<String, String>>,
}

#[derive(Debug, thiserror::Error)]
pub enum AppError {
    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Forbidden: {0}")]
    Forbidden(String),

    #[error("Bad request: {0}")]
    BadRequest(String),

    #[error("Validation failed")]
    Validation(BTreeMap<String, String>),

    #[error("Internal error: {0}")]
    InternalError(String),
}

impl IntoResponse for AppError {
    fn into_response(self) -> Response {
        let (status, message, details) = match self {
            AppError::NotFound(msg) => (StatusCode::NOT_FOUND, msg, None),
            AppError::Forbidden(msg) => (StatusCode::FORBIDDEN, msg, None),
            AppError::BadRequest(msg) => (StatusCode::BAD_REQUEST, msg, None),
            AppError::Validation(fields) => (
                StatusCode::UNPROCESSABLE_ENTITY,
                "Request failed validation".to_string(),
                Some(fields),
            ),
            AppError::InternalError(msg) => (StatusCode::INTERNAL_SERVER_ERROR, msg, None),
        };

        (
            status,
            axum::Json(ErrorResponse {
                error: message,
                details,
            }),
        )
            .into_response()
    }
}

impl From<LocationError> for AppError {
    fn from(err: LocationError) -> Self {
        match err {
            LocationError::NotFound(_) => AppError::NotFound(err.to_string()),
            LocationError::Unauthorized(_) => {
                AppError::Forbidden("You do not have permission to modify this location".to_string())
            }
        }
    }
}

impl From<WeatherError> for AppError {
    fn from(err: WeatherError) -> Self {
        match err {
            WeatherError::CityNotFound(_) => AppError::NotFound(err.to_string()),
            other => {
                tracing::error!("Weather lookup failed: {}", other);
                AppError::InternalError("Unable to retrieve weather at this time".to_string())
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use uuid::Uuid;

    async fn body_json(response: Response) -> serde_json::Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .unwrap();
        serde_json::from_slice(&bytes).unwrap()
    }

    #[tokio::test]
    async fn test_not_found_response() {
        let response = AppError::NotFound("Location x not found".to_string()).into_response();
        assert_eq!(response.status(), StatusCode::NOT_FOUND);
        assert_eq!(
            body_json(response).await,
            serde_json::json!({ "error": "Location x not found" })
        );
    }

    #[tokio::test]
    async fn test_validation_response_carries_details() {
        let mut fields = BTreeMap::new();
        fields.insert("nickname".to_string(), "must not be empty".to_string());

        let response = AppError::Validation(fields).into_response();
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);

        let body = body_json(response).await;
        assert_eq!(body["details"]["nickname"], "must not be empty");
    }

    #[test]
    fn test_location_error_mapping() {
        let id = Uuid::new_v4();
        assert!(matches!(
            AppError::from(LocationError::NotFound(id)),
            AppError::NotFound(_)
        ));
        assert!(matches!(
            AppError::from(LocationError::Unauthorized(id)),
            AppError::Forbidden(_)
        ));
    }

    #[test]
    fn test_weather_error_mapping() {
        assert!(matches!(
            AppError::from(WeatherError::CityNotFound("Atlantis".to_string())),
            AppError::NotFound(_)
        ));
        for err in [
            WeatherError::CacheMiss,
            WeatherError::Fetch("boom".to_string()),
            WeatherError::Cache("boom".to_string()),
            WeatherError::Client("boom".to_string()),
        ] {
            match AppError::from(err) {
                AppError::InternalError(msg) => assert!(!msg.contains("boom")),
                other => panic!("Expected internal error, got {:?}", other),
            }
        }
    }
}
