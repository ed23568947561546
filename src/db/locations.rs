//! In-memory location store with time-based eviction.
//!
//! A single `RwLock` guards the whole map: `get`/`list` share the read lock,
//! every mutation (including the sweep's delete pass) takes the write lock.
//! All reads hand out clones; nothing outside this module holds a reference
//! into the map.
//!
//! Eviction is coarse: the sweep runs once per retention window, so a record
//! can live for up to almost twice the window before it is removed.

use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use chrono::{DateTime, Utc};
use tokio::sync::RwLock;
use tokio::time::{Instant, MissedTickBehavior};
use tokio_util::sync::CancellationToken;
use uuid::Uuid;

use super::models::{Filter, Location, LocationUpdate, NewLocation, PageMeta};

/// Lower bound on the sweep period (`interval` rejects a zero period).
const MIN_SWEEP_INTERVAL: Duration = Duration::from_millis(1);
/// Upper bound on the sweep period; keeps `Instant` arithmetic in range for long retentions.
const MAX_SWEEP_INTERVAL: Duration = Duration::from_secs(7 * 24 * 3600);

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum LocationError {
    #[error("Location {0} not found")]
    NotFound(Uuid),

    #[error("Location {0} is not owned by the requesting user")]
    Unauthorized(Uuid),
}

/// Storage operations for location records.
#[async_trait]
pub trait LocationRepository: Send + Sync {
    /// Assign a fresh id and creation time, store the record and return it.
    async fn create(&self, location: NewLocation) -> Result<Location, LocationError>;

    async fn get(&self, id: Uuid) -> Result<Location, LocationError>;

    /// One page of `user_id`'s records plus metadata over all of them.
    async fn list(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Result<(Vec<Location>, PageMeta), LocationError>;

    /// Replace notes and nickname, keeping every other stored field.
    async fn update(&self, update: LocationUpdate) -> Result<Location, LocationError>;

    async fn delete(&self, id: Uuid) -> Result<(), LocationError>;
}

type LocationMap = Arc<RwLock<HashMap<Uuid, Location>>>;

/// Process-lifetime location store. Owns a background sweep task that is
/// cancelled by [`InMemoryLocationStore::stop_sweeper`] or when the store is dropped.
pub struct InMemoryLocationStore {
    locations: LocationMap,
    retention: Duration,
    sweeper: CancellationToken,
}

impl InMemoryLocationStore {
    /// Create an empty store and spawn its sweep task.
    ///
    /// Must be called from within a Tokio runtime.
    pub fn new(retention: Duration) -> Self {
        let locations = LocationMap::default();
        let sweeper = CancellationToken::new();
        tokio::spawn(run_sweeper(locations.clone(), retention, sweeper.clone()));
        Self {
            locations,
            retention,
            sweeper,
        }
    }

    pub fn retention(&self) -> Duration {
        self.retention
    }

    /// Stop the background sweep. Records already stored are kept.
    pub fn stop_sweeper(&self) {
        self.sweeper.cancel();
    }

    /// Number of records currently held, across all users.
    pub async fn len(&self) -> usize {
        self.locations.read().await.len()
    }
}

impl Drop for InMemoryLocationStore {
    fn drop(&mut self) {
        self.sweeper.cancel();
    }
}

#[async_trait]
impl LocationRepository for InMemoryLocationStore {
    async fn create(&self, location: NewLocation) -> Result<Location, LocationError> {
        let record = Location {
            id: Uuid::new_v4(),
            user_id: location.user_id,
            notes: location.notes,
            nickname: location.nickname,
            city: location.city,
            coordinates: location.coordinates,
            created_at: Utc::now(),
        };

        let mut map = self.locations.write().await;
        map.insert(record.id, record.clone());
        Ok(record)
    }

    async fn get(&self, id: Uuid) -> Result<Location, LocationError> {
        let map = self.locations.read().await;
        map.get(&id).cloned().ok_or(LocationError::NotFound(id))
    }

    async fn list(
        &self,
        user_id: &str,
        filter: Filter,
    ) -> Result<(Vec<Location>, PageMeta), LocationError> {
        let map = self.locations.read().await;

        let mut owned: Vec<&Location> = map.values().filter(|l| l.user_id == user_id).collect();
        // Oldest first so that consecutive pages are stable between calls
        owned.sort_by(|a, b| {
            a.created_at
                .cmp(&b.created_at)
                .then_with(|| a.id.cmp(&b.id))
        });

        let total = owned.len();
        let (start, end) = filter.bounds(total);
        let page = owned[start..end].iter().map(|l| (*l).clone()).collect();

        Ok((page, PageMeta::calculate(total, filter)))
    }

    async fn update(&self, update: LocationUpdate) -> Result<Location, LocationError> {
        let mut map = self.locations.write().await;
        let existing = map
            .get_mut(&update.id)
            .ok_or(LocationError::NotFound(update.id))?;

        existing.notes = update.notes;
        existing.nickname = update.nickname;
        Ok(existing.clone())
    }

    async fn delete(&self, id: Uuid) -> Result<(), LocationError> {
        let mut map = self.locations.write().await;
        map.remove(&id)
            .map(|_| ())
            .ok_or(LocationError::NotFound(id))
    }
}

/// Periodically evict records older than `retention` until `shutdown` fires.
async fn run_sweeper(locations: LocationMap, retention: Duration, shutdown: CancellationToken) {
    let period = sweep_period(retention);
    let mut ticker = tokio::time::interval_at(Instant::now() + period, period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    tracing::debug!("Location sweeper started (interval {:?})", period);

    loop {
        tokio::select! {
            _ = shutdown.cancelled() => {
                tracing::debug!("Location sweeper stopped");
                return;
            }
            _ = ticker.tick() => {
                let mut map = locations.write().await;
                let removed = sweep_expired(&mut map, retention, Utc::now());
                if removed > 0 {
                    tracing::info!(
                        "Sweeper evicted {} expired location(s), {} remaining",
                        removed,
                        map.len()
                    );
                } else {
                    tracing::debug!("Sweeper found no expired locations");
                }
            }
        }
    }
}

/// Sweep once per retention window, bounded to `MIN_SWEEP_INTERVAL..=MAX_SWEEP_INTERVAL`.
fn sweep_period(retention: Duration) -> Duration {
    retention.clamp(MIN_SWEEP_INTERVAL, MAX_SWEEP_INTERVAL)
}

/// Remove every record whose age at `now` exceeds `retention`.
/// Returns the number of records removed.
fn sweep_expired(
    map: &mut HashMap<Uuid, Location>,
    retention: Duration,
    now: DateTime<Utc>,
) -> usize {
    let before = map.len();
    map.retain(|_, loc| match (now - loc.created_at).to_std() {
        Ok(age) => age <= retention,
        // created_at in the future after a clock step; keep it
        Err(_) => true,
    });
    before - map.len()
}
