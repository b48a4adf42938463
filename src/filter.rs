//! Attribute thresholds applied on top of a search result

use serde::{Deserialize, Serialize};

use crate::model::{Listing, ListingQueryParams};

/// Minimum/maximum attribute constraints a listing has to satisfy
///
/// Every field has a default that lets any listing through, so a filter can
/// always be applied.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttributeFilter {
    pub min_guests: u32,
    pub min_rooms: u32,
    pub min_bathrooms: u32,
    pub max_price: u64,
    pub require_pets: bool,
    pub require_pool: bool,
    pub require_wifi: bool,
}

impl Default for AttributeFilter {
    fn default() -> Self {
        Self {
            min_guests: 0,
            min_rooms: 0,
            min_bathrooms: 0,
            max_price: u64::MAX,
            require_pets: false,
            require_pool: false,
            require_wifi: false,
        }
    }
}

impl AttributeFilter {
    /// Builds a filter from the attribute part of a listing query string.
    pub fn from_params(params: &ListingQueryParams) -> Self {
        let defaults = Self::default();
        Self {
            min_guests: params.min_guests.unwrap_or(defaults.min_guests),
            min_rooms: params.min_rooms.unwrap_or(defaults.min_rooms),
            min_bathrooms: params.min_bathrooms.unwrap_or(defaults.min_bathrooms),
            max_price: params.max_price.unwrap_or(defaults.max_price),
            require_pets: params.require_pets.unwrap_or(defaults.require_pets),
            require_pool: params.require_pool.unwrap_or(defaults.require_pool),
            require_wifi: params.require_wifi.unwrap_or(defaults.require_wifi),
        }
    }

    /// True when the query string carries any attribute constraint.
    pub fn is_requested(params: &ListingQueryParams) -> bool {
        params.min_guests.is_some()
            || params.min_rooms.is_some()
            || params.min_bathrooms.is_some()
            || params.max_price.is_some()
            || params.require_pets.is_some()
            || params.require_pool.is_some()
            || params.require_wifi.is_some()
    }
}

/// Strict membership test: every threshold and every required amenity must hold.
pub fn matches_filter(listing: &Listing, filter: &AttributeFilter) -> bool {
    listing.max_guests >= filter.min_guests
        && listing.rooms >= filter.min_rooms
        && listing.bathrooms >= filter.min_bathrooms
        && listing.price <= filter.max_price
        && (!filter.require_pets || listing.pets_allowed)
        && (!filter.require_pool || listing.pool)
        && (!filter.require_wifi || listing.wifi)
}
