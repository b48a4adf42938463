//! Date-range conflict detection for bookings

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::model::{Listing, Reservation};

/// How a requested stay is compared against an existing reservation's bounds
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum BoundaryPolicy {
    /// Both ends inclusive: a stay starting on another stay's checkout day
    /// conflicts with it.
    #[default]
    Inclusive,

    /// Half-open `[start, end)` ranges: checkout day may be the next
    /// guest's check-in day.
    SameDayTurnover,
}

/// A validated stay, `start < end`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct DateRange {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateRange {
    /// Builds a range from optional dates as they arrive from forms.
    pub fn from_parts(
        start: Option<NaiveDate>,
        end: Option<NaiveDate>,
    ) -> Result<Self, AppError> {
        match (start, end) {
            (Some(start), Some(end)) => Self::new(start, end),
            _ => Err(AppError::Validation(
                "Select a valid date range.".to_string(),
            )),
        }
    }

    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, AppError> {
        if start >= end {
            return Err(AppError::Validation(
                "The start date must be before the end date.".to_string(),
            ));
        }
        Ok(Self { start, end })
    }

    /// Number of nights between check-in and checkout
    pub fn nights(&self) -> u32 {
        u32::try_from((self.end - self.start).num_days()).unwrap_or(u32::MAX)
    }
}

/// True when a requested stay `[start, end]` collides with a reservation
/// spanning `[booked_start, booked_end]`.
pub fn conflicts(
    policy: BoundaryPolicy,
    start: NaiveDate,
    end: NaiveDate,
    booked_start: NaiveDate,
    booked_end: NaiveDate,
) -> bool {
    match policy {
        BoundaryPolicy::Inclusive => {
            let start_inside = booked_start <= start && start <= booked_end;
            let end_inside = booked_start <= end && end <= booked_end;
            let contains = start <= booked_start && end >= booked_end;
            start_inside || end_inside || contains
        }
        BoundaryPolicy::SameDayTurnover => start < booked_end && booked_start < end,
    }
}

/// Decides whether `listing` is free for `[start, end]`.
///
/// Reservations belonging to other listings are ignored. Linear in the
/// number of reservations.
pub fn is_available(
    listing: &Listing,
    reservations: &[Reservation],
    start: NaiveDate,
    end: NaiveDate,
    policy: BoundaryPolicy,
) -> bool {
    !reservations
        .iter()
        .filter(|r| r.listing_id == listing.id)
        .any(|r| conflicts(policy, start, end, r.start_date, r.end_date))
}
