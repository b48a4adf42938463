//! Data models for the booking service
//!
//! Stored records (listings, reservations, ratings, favorites, availability
//! notifications) plus the request and query payloads accepted by the API.

use chrono::{DateTime, NaiveDate, Utc};
use serde::{Deserialize, Serialize};

/// Image used for favorites when a listing has no pictures
pub const PLACEHOLDER_IMAGE: &str = "https://via.placeholder.com/300x200?text=No+Image";

/// A rentable property
///
/// Listings are created by the seed import or the admin endpoint and are
/// read-only for the search and booking flows.
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Listing {
    /// Opaque identifier, stable for the listing's lifetime
    pub id: String,

    pub title: String,

    #[serde(default)]
    pub description: String,

    /// City/region string used for substring search (e.g. "El Poblado, Medellín")
    pub location: String,

    /// Nightly price
    pub price: u64,

    /// Maximum number of guests
    #[serde(default)]
    pub max_guests: u32,

    #[serde(default)]
    pub rooms: u32,

    #[serde(default)]
    pub bathrooms: u32,

    #[serde(default)]
    pub pets_allowed: bool,

    #[serde(default)]
    pub pool: bool,

    #[serde(default)]
    pub wifi: bool,

    #[serde(default)]
    pub air_conditioning: bool,

    #[serde(default)]
    pub parking: bool,

    /// Ordered image URLs, possibly empty
    #[serde(default)]
    pub images: Vec<String>,

    #[serde(default)]
    pub latitude: Option<f64>,

    #[serde(default)]
    pub longitude: Option<f64>,
}

impl Listing {
    /// First image, or the placeholder when the listing has none
    pub fn cover_image(&self) -> &str {
        self.images
            .first()
            .map(String::as_str)
            .unwrap_or(PLACEHOLDER_IMAGE)
    }
}

/// A confirmed booking of one listing for a date range
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Reservation {
    pub id: String,
    pub listing_id: String,
    pub user_id: String,
    pub user_email: String,

    /// Listing title at booking time
    #[serde(default)]
    pub title: String,

    /// Listing location at booking time
    #[serde(default)]
    pub location: String,

    pub start_date: NaiveDate,
    pub end_date: NaiveDate,

    /// Nightly price at booking time
    pub nightly_price: u64,

    #[serde(default)]
    pub nights: u32,

    /// `nights * nightly_price`
    pub total_price: u64,

    #[serde(default)]
    pub payment_reference: Option<String>,

    pub created_at: DateTime<Utc>,
}

/// A guest's review of a finished stay
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Rating {
    pub id: String,
    pub reservation_id: String,
    pub listing_id: String,
    pub user_id: String,
    pub user_email: String,

    /// 1 to 5
    pub stars: u8,

    pub comment: String,
    pub published_at: DateTime<Utc>,
}

/// A listing saved by a user, with a snapshot of what the card displays
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Favorite {
    pub user_id: String,
    pub user_email: String,
    pub listing_id: String,
    pub title: String,
    pub location: String,
    pub price: u64,
    pub image: String,
    pub added_at: DateTime<Utc>,
}

/// A user's request to be told when a listing is free for some dates
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct AvailabilityNotification {
    pub user_id: String,
    pub user_email: String,
    pub listing_id: String,
    pub title: String,
    pub location: String,
    pub start_date: NaiveDate,
    pub end_date: NaiveDate,
    pub subscribed_at: DateTime<Utc>,

    #[serde(default = "default_true")]
    pub active: bool,
}

fn default_true() -> bool {
    true
}

/// Request payload for adding a listing
///
/// `id` is optional; a random one is generated when missing.
#[derive(Deserialize, Debug, Clone)]
pub struct CreateListingRequest {
    pub id: Option<String>,
    pub title: String,
    #[serde(default)]
    pub description: String,
    pub location: String,
    pub price: u64,
    #[serde(default)]
    pub max_guests: u32,
    #[serde(default)]
    pub rooms: u32,
    #[serde(default)]
    pub bathrooms: u32,
    #[serde(default)]
    pub pets_allowed: bool,
    #[serde(default)]
    pub pool: bool,
    #[serde(default)]
    pub wifi: bool,
    #[serde(default)]
    pub air_conditioning: bool,
    #[serde(default)]
    pub parking: bool,
    #[serde(default)]
    pub images: Vec<String>,
    #[serde(default)]
    pub latitude: Option<f64>,
    #[serde(default)]
    pub longitude: Option<f64>,
}

impl CreateListingRequest {
    pub fn into_listing(self, id: String) -> Listing {
        Listing {
            id,
            title: self.title,
            description: self.description,
            location: self.location,
            price: self.price,
            max_guests: self.max_guests,
            rooms: self.rooms,
            bathrooms: self.bathrooms,
            pets_allowed: self.pets_allowed,
            pool: self.pool,
            wifi: self.wifi,
            air_conditioning: self.air_conditioning,
            parking: self.parking,
            images: self.images,
            latitude: self.latitude,
            longitude: self.longitude,
        }
    }
}

/// Card details typed into the fake payment form
#[derive(Deserialize, Debug, Clone, Default)]
pub struct CardDetails {
    #[serde(default)]
    pub holder: String,
    #[serde(default)]
    pub number: String,
    /// `MM/YY`
    #[serde(default)]
    pub expiry: String,
    #[serde(default)]
    pub cvc: String,
}

/// Request payload for booking a listing
///
/// # Example
/// ```json
/// {
///   "user_id": "u1",
///   "user_email": "ana@example.com",
///   "start_date": "2025-08-28",
///   "end_date": "2025-08-30",
///   "card": { "holder": "Ana", "number": "4242424242424242", "expiry": "12/30", "cvc": "123" }
/// }
/// ```
#[derive(Deserialize, Debug, Clone)]
pub struct CreateReservationRequest {
    pub user_id: String,
    pub user_email: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    #[serde(default)]
    pub card: CardDetails,
}

/// Request payload for rating a finished stay
#[derive(Deserialize, Debug, Clone)]
pub struct CreateRatingRequest {
    #[serde(default)]
    pub stars: u8,
    #[serde(default)]
    pub comment: String,
}

/// Request payload for saving a favorite
#[derive(Deserialize, Debug, Clone)]
pub struct FavoriteRequest {
    pub user_email: String,
}

/// Request payload for subscribing to availability notifications
#[derive(Deserialize, Debug, Clone)]
pub struct NotificationRequest {
    pub listing_id: String,
    pub user_email: String,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for the availability check of one listing
#[derive(Deserialize, Debug, Clone)]
pub struct AvailabilityParams {
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
}

/// Query parameters for listing a user's reservations
#[derive(Deserialize, Debug, Clone)]
pub struct ReservationListParams {
    pub user_email: String,
}

/// Query string of `GET /api/listings`
///
/// Location and dates drive the search step, the remaining fields the
/// attribute filter. Every field is optional.
///
/// # Example
/// Query string: `?location=medellin&start_date=2025-08-28&end_date=2025-08-30&min_guests=2`
#[derive(Deserialize, Debug, Clone, Default)]
pub struct ListingQueryParams {
    pub location: Option<String>,
    pub start_date: Option<NaiveDate>,
    pub end_date: Option<NaiveDate>,
    pub min_guests: Option<u32>,
    pub min_rooms: Option<u32>,
    pub min_bathrooms: Option<u32>,
    pub max_price: Option<u64>,
    pub require_pets: Option<bool>,
    pub require_pool: Option<bool>,
    pub require_wifi: Option<bool>,
}

/// Ids double as key segments in `"{owner}:{id}"` index keys, so they must be
/// non-empty and free of `':'`.
pub fn is_valid_key(id: &str) -> bool {
    !id.trim().is_empty() && !id.contains(':')
}
