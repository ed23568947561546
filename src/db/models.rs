use chrono::{DateTime, Utc};
use uuid::Uuid;

/// Geographic coordinates (WGS84).
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Coordinates {
    pub lat: f64,
    pub lon: f64,
}

/// A saved point of interest owned by one session user.
///
/// `id`, `user_id` and `created_at` are fixed for the lifetime of the record.
#[derive(Debug, Clone, PartialEq)]
pub struct Location {
    pub id: Uuid,
    pub user_id: String,
    pub notes: String,
    pub nickname: String,
    pub city: String,
    pub coordinates: Coordinates,
    pub created_at: DateTime<Utc>,
}

/// Caller-supplied fields for a new location. The store assigns id and timestamp.
#[derive(Debug, Clone, PartialEq)]
pub struct NewLocation {
    pub user_id: String,
    pub notes: String,
    pub nickname: String,
    pub city: String,
    pub coordinates: Coordinates,
}

/// Replacement values for the mutable fields of an existing location.
///
/// `user_id` is the acting user, checked against the stored owner.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationUpdate {
    pub id: Uuid,
    pub user_id: String,
    pub notes: String,
    pub nickname: String,
}

/// Page selection for list queries. Both values are 1-based and at least 1.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Filter {
    pub page: usize,
    pub page_size: usize,
}

impl Default for Filter {
    fn default() -> Self {
        Self {
            page: 1,
            page_size: 5,
        }
    }
}

impl Filter {
    /// Half-open index range `[start, end)` of this page within `total` records,
    /// clamped so that both bounds lie in `0..=total`.
    pub fn bounds(&self, total: usize) -> (usize, usize) {
        let start = self
            .page
            .saturating_sub(1)
            .saturating_mul(self.page_size)
            .min(total);
        let end = start.saturating_add(self.page_size).min(total);
        (start, end)
    }
}

/// Pagination metadata computed over the full matching set, not the page.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct PageMeta {
    pub current_page: usize,
    pub page_size: usize,
    pub first_page: usize,
    pub last_page: usize,
    pub total_records: usize,
}

impl PageMeta {
    pub fn calculate(total_records: usize, filter: Filter) -> Self {
        let last_page = if filter.page_size == 0 {
            0
        } else {
            total_records.div_ceil(filter.page_size)
        };
        Self {
            current_page: filter.page,
            page_size: filter.page_size,
            first_page: 1,
            last_page,
            total_records,
        }
    }
}
