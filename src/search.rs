//! Location + date search and attribute refinement
//!
//! A search keeps the listings whose location matches the (accent- and
//! case-insensitive) needle and that are free for the requested dates. A
//! refinement narrows whatever set it is given with an [`AttributeFilter`];
//! callers pass the latest search result so refinements never resurrect
//! listings the search excluded.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

use crate::availability::{is_available, BoundaryPolicy, DateRange};
use crate::database::Store;
use crate::error::AppError;
use crate::filter::{matches_filter, AttributeFilter};
use crate::model::{Listing, Reservation};
use crate::normalize::location_matches;

/// Shown with an empty search result; an empty result is not an error.
pub const NO_LISTINGS_MESSAGE: &str = "No listings available for this search.";

pub const FETCH_LISTINGS_ERROR: &str = "An error occurred fetching listings.";
pub const FETCH_RESERVATIONS_ERROR: &str = "An error occurred fetching reservations.";

/// Location substring plus the requested stay
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
pub struct SearchQuery {
    #[serde(default)]
    pub location: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

impl SearchQuery {
    /// Both dates must be present and ordered before anything is fetched.
    pub fn date_range(&self) -> Result<DateRange, AppError> {
        DateRange::from_parts(self.start_date, self.end_date)
    }
}

/// Visible listings returned to the client
#[derive(Debug, Clone, Serialize)]
pub struct SearchResults {
    pub count: usize,
    pub data: Vec<Listing>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub message: Option<&'static str>,
}

impl SearchResults {
    /// Wraps a result set; `searched` enables the empty-result message.
    pub fn new(data: Vec<Listing>, searched: bool) -> Self {
        let message = (searched && data.is_empty()).then_some(NO_LISTINGS_MESSAGE);
        Self {
            count: data.len(),
            data,
            message,
        }
    }
}

/// Filters `listings` by location and availability.
///
/// `reservations_for` is asked once per location-matching listing; listings
/// whose location does not match never trigger a fetch.
pub fn search_listings<F, E>(
    listings: &[Listing],
    location: &str,
    range: DateRange,
    policy: BoundaryPolicy,
    mut reservations_for: F,
) -> Result<Vec<Listing>, E>
where
    F: FnMut(&str) -> Result<Vec<Reservation>, E>,
{
    let mut matches = Vec::new();

    for listing in listings {
        if !location_matches(&listing.location, location) {
            continue;
        }
        let reservations = reservations_for(&listing.id)?;
        if is_available(listing, &reservations, range.start, range.end, policy) {
            matches.push(listing.clone());
        }
    }

    Ok(matches)
}

/// Validates `query` and runs it over `listings` with reservations read
/// from `store`.
pub fn run_search(
    store: &Store,
    listings: &[Listing],
    query: &SearchQuery,
    policy: BoundaryPolicy,
) -> Result<Vec<Listing>, AppError> {
    let range = query.date_range()?;

    search_listings(listings, &query.location, range, policy, |listing_id| {
        store.fetch_reservations_for_listing(listing_id)
    })
    .map_err(|err| AppError::from_store(err, FETCH_RESERVATIONS_ERROR))
}

/// Keeps the listings of `base` that satisfy `filter`.
pub fn refine(base: &[Listing], filter: &AttributeFilter) -> Vec<Listing> {
    base.iter()
        .filter(|listing| matches_filter(listing, filter))
        .cloned()
        .collect()
}
