use std::collections::BTreeMap;

use axum::extract::rejection::{JsonRejection, PathRejection};
use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::{Extension, Json};
use serde::{Deserialize, Serialize};
use utoipa::{IntoParams, ToSchema};
use uuid::Uuid;

use crate::db::models::{Coordinates, Filter, Location, LocationUpdate, NewLocation, PageMeta};
use crate::errors::{AppError, ErrorResponse};
use crate::helpers::positive_query_int;
use crate::routes::AppState;
use crate::session::UserId;

/// Geographic coordinates (WGS84).
#[derive(Debug, Clone, Copy, Serialize, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct CoordinatesDto {
    /// Latitude in degrees, -90 to 90
    pub lat: f64,
    /// Longitude in degrees, -180 to 180
    pub lon: f64,
}

impl From<Coordinates> for CoordinatesDto {
    fn from(c: Coordinates) -> Self {
        Self {
            lat: c.lat,
            lon: c.lon,
        }
    }
}

/// Request body for POST /api/v1/locations.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct LocationRequest {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub nickname: String,
    #[serde(default)]
    pub city: String,
    pub coordinates: Option<CoordinatesDto>,
}

impl LocationRequest {
    /// Collect every failing field rather than stopping at the first.
    pub fn validate(&self) -> Result<(), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        require_text(&mut errors, "notes", &self.notes);
        require_text(&mut errors, "nickname", &self.nickname);
        require_text(&mut errors, "city", &self.city);

        match &self.coordinates {
            None => {
                errors.insert("coordinates".to_string(), "is required".to_string());
            }
            Some(c) => {
                if !(-90.0..=90.0).contains(&c.lat) {
                    errors.insert(
                        "coordinates.lat".to_string(),
                        "must be between -90 and 90".to_string(),
                    );
                }
                if !(-180.0..=180.0).contains(&c.lon) {
                    errors.insert(
                        "coordinates.lon".to_string(),
                        "must be between -180 and 180".to_string(),
                    );
                }
            }
        }

        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

/// Request body for PUT /api/v1/locations/{id}. Only notes and nickname are mutable.
#[derive(Debug, Deserialize, ToSchema)]
#[serde(deny_unknown_fields)]
pub struct UpdateLocationRequest {
    #[serde(default)]
    pub notes: String,
    #[serde(default)]
    pub nickname: String,
}

impl UpdateLocationRequest {
    pub fn validate(&self) -> Result<(), BTreeMap<String, String>> {
        let mut errors = BTreeMap::new();
        require_text(&mut errors, "notes", &self.notes);
        require_text(&mut errors, "nickname", &self.nickname);
        if errors.is_empty() {
            Ok(())
        } else {
            Err(errors)
        }
    }
}

fn require_text(errors: &mut BTreeMap<String, String>, field: &str, value: &str) {
    if value.trim().is_empty() {
        errors.insert(field.to_string(), "must not be empty".to_string());
    }
}

/// A saved location as returned by the API.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationResponse {
    pub id: Uuid,
    pub notes: String,
    pub nickname: String,
    pub city: String,
    pub coordinates: CoordinatesDto,
    /// Creation time in RFC 3339 format
    pub created_at: String,
}

impl From<Location> for LocationResponse {
    fn from(l: Location) -> Self {
        Self {
            id: l.id,
            notes: l.notes,
            nickname: l.nickname,
            city: l.city,
            coordinates: l.coordinates.into(),
            created_at: l.created_at.to_rfc3339(),
        }
    }
}

/// Pagination metadata for list responses.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
#[serde(rename_all = "camelCase")]
pub struct PageMetaResponse {
    pub current_page: usize,
    pub page_size: usize,
    pub first_page: usize,
    pub last_page: usize,
    pub total_records: usize,
}

impl From<PageMeta> for PageMetaResponse {
    fn from(m: PageMeta) -> Self {
        Self {
            current_page: m.current_page,
            page_size: m.page_size,
            first_page: m.first_page,
            last_page: m.last_page,
            total_records: m.total_records,
        }
    }
}

/// Response type for GET /api/v1/locations.
#[derive(Debug, Serialize, Deserialize, ToSchema)]
pub struct LocationListResponse {
    pub meta: PageMetaResponse,
    pub locations: Vec<LocationResponse>,
}

/// Query parameters for the location list.
///
/// Kept as raw strings so a non-numeric value falls back to the default
/// instead of rejecting the request.
#[derive(Debug, Deserialize, IntoParams)]
#[serde(rename_all = "camelCase")]
#[into_params(parameter_in = Query)]
pub struct ListQuery {
    /// 1-based page number (default 1)
    pub page: Option<String>,
    /// Records per page (default 5)
    pub page_size: Option<String>,
}

impl ListQuery {
    fn filter(&self) -> Filter {
        let defaults = Filter::default();
        Filter {
            page: positive_query_int(self.page.as_deref(), defaults.page),
            page_size: positive_query_int(self.page_size.as_deref(), defaults.page_size),
        }
    }
}

fn location_id(path: Result<Path<Uuid>, PathRejection>) -> Result<Uuid, AppError> {
    path.map(|Path(id)| id)
        .map_err(|_| AppError::BadRequest("Invalid location id".to_string()))
}

fn json_body<T>(body: Result<Json<T>, JsonRejection>) -> Result<T, AppError> {
    body.map(|Json(value)| value)
        .map_err(|e| AppError::BadRequest(format!("Invalid request body: {}", e.body_text())))
}

/// Save a new location for the session user.
#[utoipa::path(
    post,
    path = "/api/v1/locations",
    tag = "Locations",
    request_body = LocationRequest,
    responses(
        (status = 201, description = "Location created", body = LocationResponse),
        (status = 400, description = "Malformed JSON body", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn create_location(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    body: Result<Json<LocationRequest>, JsonRejection>,
) -> Result<(StatusCode, Json<LocationResponse>), AppError> {
    let req = json_body(body)?;
    req.validate().map_err(AppError::Validation)?;

    let coordinates = req
        .coordinates
        .ok_or_else(|| AppError::BadRequest("coordinates are required".to_string()))?;

    let location = state
        .locations
        .create_location(NewLocation {
            user_id,
            notes: req.notes,
            nickname: req.nickname,
            city: req.city,
            coordinates: Coordinates {
                lat: coordinates.lat,
                lon: coordinates.lon,
            },
        })
        .await?;

    Ok((StatusCode::CREATED, Json(location.into())))
}

/// List the session user's locations, one page at a time.
#[utoipa::path(
    get,
    path = "/api/v1/locations",
    tag = "Locations",
    params(ListQuery),
    responses(
        (status = 200, description = "One page of the user's locations", body = LocationListResponse),
    )
)]
pub async fn list_locations(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    Query(query): Query<ListQuery>,
) -> Result<Json<LocationListResponse>, AppError> {
    let (locations, meta) = state
        .locations
        .list_locations(&user_id, query.filter())
        .await?;

    Ok(Json(LocationListResponse {
        meta: meta.into(),
        locations: locations.into_iter().map(LocationResponse::from).collect(),
    }))
}

/// Get a single location by id.
#[utoipa::path(
    get,
    path = "/api/v1/locations/{id}",
    tag = "Locations",
    params(
        ("id" = Uuid, Path, description = "Location UUID"),
    ),
    responses(
        (status = 200, description = "The location", body = LocationResponse),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 404, description = "Location not found", body = ErrorResponse),
    )
)]
pub async fn get_location(
    State(state): State<AppState>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<Json<LocationResponse>, AppError> {
    let id = location_id(path)?;
    let location = state.locations.get_location(id).await?;
    Ok(Json(location.into()))
}

/// Replace the notes and nickname of a location owned by the session user.
#[utoipa::path(
    put,
    path = "/api/v1/locations/{id}",
    tag = "Locations",
    params(
        ("id" = Uuid, Path, description = "Location UUID"),
    ),
    request_body = UpdateLocationRequest,
    responses(
        (status = 200, description = "Updated location", body = LocationResponse),
        (status = 400, description = "Malformed id or body", body = ErrorResponse),
        (status = 403, description = "Location belongs to another user", body = ErrorResponse),
        (status = 404, description = "Location not found", body = ErrorResponse),
        (status = 422, description = "Validation failed", body = ErrorResponse),
    )
)]
pub async fn update_location(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    path: Result<Path<Uuid>, PathRejection>,
    body: Result<Json<UpdateLocationRequest>, JsonRejection>,
) -> Result<Json<LocationResponse>, AppError> {
    let id = location_id(path)?;
    let req = json_body(body)?;
    req.validate().map_err(AppError::Validation)?;

    let location = state
        .locations
        .update_location(LocationUpdate {
            id,
            user_id,
            notes: req.notes,
            nickname: req.nickname,
        })
        .await?;

    Ok(Json(location.into()))
}

/// Delete a location owned by the session user.
#[utoipa::path(
    delete,
    path = "/api/v1/locations/{id}",
    tag = "Locations",
    params(
        ("id" = Uuid, Path, description = "Location UUID"),
    ),
    responses(
        (status = 204, description = "Location deleted"),
        (status = 400, description = "Malformed id", body = ErrorResponse),
        (status = 403, description = "Location belongs to another user", body = ErrorResponse),
        (status = 404, description = "Location not found", body = ErrorResponse),
    )
)]
pub async fn delete_location(
    State(state): State<AppState>,
    Extension(UserId(user_id)): Extension<UserId>,
    path: Result<Path<Uuid>, PathRejection>,
) -> Result<StatusCode, AppError> {
    let id = location_id(path)?;
    state.locations.delete_location(id, &user_id).await?;
    Ok(StatusCode::NO_CONTENT)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn valid_request() -> LocationRequest {
        LocationRequest {
            notes: "Great coffee".to_string(),
            nickname: "Office".to_string(),
            city: "Zurich".to_string(),
            coordinates: Some(CoordinatesDto {
                lat: 47.37,
                lon: 8.54,
            }),
        }
    }

    #[test]
    fn test_valid_request_passes() {
        assert!(valid_request().validate().is_ok());
    }

    #[test]
    fn test_blank_fields_are_reported_together() {
        let mut req = valid_request();
        req.notes = "   ".to_string();
        req.city = String::new();

        let errors = req.validate().unwrap_err();
        assert_eq!(errors.len(), 2);
        assert!(errors.contains_key("notes"));
        assert!(errors.contains_key("city"));
    }

    #[test]
    fn test_coordinates_out_of_range() {
        let mut req = valid_request();
        req.coordinates = Some(CoordinatesDto {
            lat: 91.0,
            lon: -181.0,
        });

        let errors = req.validate().unwrap_err();
        assert!(errors.contains_key("coordinates.lat"));
        assert!(errors.contains_key("coordinates.lon"));
    }

    #[test]
    fn test_missing_coordinates() {
        let mut req = valid_request();
        req.coordinates = None;
        assert!(req.validate().unwrap_err().contains_key("coordinates"));
    }

    #[test]
    fn test_unknown_fields_rejected() {
        let result: Result<LocationRequest, _> = serde_json::from_value(serde_json::json!({
            "notes": "n",
            "nickname": "k",
            "city": "c",
            "coordinates": { "lat": 1.0, "lon": 2.0 },
            "user_id": "someone-else"
        }));
        assert!(result.is_err());
    }

    #[test]
    fn test_update_request_validation() {
        let req = UpdateLocationRequest {
            notes: "n".to_string(),
            nickname: " ".to_string(),
        };
        let errors = req.validate().unwrap_err();
        assert_eq!(errors.keys().collect::<Vec<_>>(), vec!["nickname"]);
    }

    #[test]
    fn test_list_query_defaults() {
        let query = ListQuery {
            page: Some("abc".to_string()),
            page_size: None,
        };
        assert_eq!(query.filter(), Filter { page: 1, page_size: 5 });

        let query = ListQuery {
            page: Some("3".to_string()),
            page_size: Some("20".to_string()),
        };
        assert_eq!(query.filter(), Filter { page: 3, page_size: 20 });
    }
}
