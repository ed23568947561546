//! Location service: ownership checks in front of the location store.
//!
//! Update and delete read the existing record first and compare owners before
//! mutating. The read and the mutation are two separate store calls, so a
//! concurrent delete between them surfaces as `NotFound` from the second call.

use std::sync::Arc;

use uuid::Uuid;

use crate::db::locations::{LocationError, LocationRepository};
use crate::db::models::{Filter, Location, LocationUpdate, NewLocation, PageMeta};

pub struct LocationService {
    repo: Arc<dyn LocationRepository>,
}

impl LocationService {
    pub fn new(repo: Arc<dyn LocationRepository>) -> Self {
        Self { repo }
    }

    pub async fn create_location(&self, location: NewLocation) -> Result<Location, LocationError> {
        self.repo.create(location).await
    }

    pub async fn get_location(&self, id: Uuid) -> Result<Location, LocationError> {
        self.repo.get(id).await
    }

    pub async fn list_locations(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Result<(Vec<Location>, PageMeta), LocationError> {
        self.repo.list(user_id, filter).await
    }

    pub async fn update_location(&self, update: LocationUpdate) -> Result<Location, LocationError> {
        self.ensure_owner(update.id, &update.user_id).await?;
        self.repo.update(update).await
    }

    pub async fn delete_location(&self, id: Uuid, user_id: &str) -> Result<(), LocationError> {
        self.ensure_owner(id, user_id).await?;
        self.repo.delete(id).await
    }

    async fn ensure_owner(&self, id: Uuid, user_id: &str) -> Result<(), LocationError> {
        let existing = self.repo.get(id).await?;
        if existing.user_id != user_id {
            tracing::warn!("User {} denied access to location {}", user_id, id);
            return Err(LocationError::Unauthorized(id));
        }
        Ok(())
    }
}
