//! HTTP request handlers for the booking API
//!
//! This module wires requests to the store and to the search, availability
//! and payment logic:
//! - Browsing listings with location/date search and attribute filters
//! - Stateful browsing sessions
//! - Booking a listing through the fake payment step
//! - Rating finished stays
//! - Favorites and availability notifications
//!
//! Input problems, including bodies and query strings that fail to parse,
//! are rejected before the store is touched. Store failures are logged and
//! answered with a generic message.

use axum::{
    extract::{Path, State},
    http::StatusCode,
    response::{IntoResponse, Response},
    Json,
};
use std::sync::Arc;
use chrono::Utc;
use rand::{distr::Alphanumeric, Rng};
use serde::Serialize;
use serde_json::json;
use tracing::{debug, info, warn};

use crate::availability::{conflicts, is_available, DateRange};
use crate::database::AppState;
use crate::error::{AppError, StoreError};
use crate::extract::{ApiJson, ApiQuery};
use crate::filter::AttributeFilter;
use crate::model::{
    is_valid_key, AvailabilityNotification, AvailabilityParams, CreateListingRequest,
    CreateRatingRequest, CreateReservationRequest, Favorite, FavoriteRequest,
    ListingQueryParams, Listing, NotificationRequest, Rating, Reservation,
    ReservationListParams,
};
use crate::payment::FakePaymentGateway;
use crate::search::{
    refine, run_search, SearchQuery, SearchResults, FETCH_LISTINGS_ERROR,
    FETCH_RESERVATIONS_ERROR,
};
use crate::session::SearchCompletion;

const SAVE_RESERVATION_ERROR: &str = "An error occurred saving the reservation.";
const SAVE_RATING_ERROR: &str = "An error occurred saving the rating.";
const FETCH_RATINGS_ERROR: &str = "An error occurred fetching ratings.";
const FAVORITES_ERROR: &str = "An error occurred updating favorites.";
const NOTIFICATIONS_ERROR: &str = "An error occurred updating notifications.";
const MIN_COMMENT_CHARS: usize = 5;

fn random_id(len: usize) -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(len)
        .map(char::from)
        .collect()
}

fn require_key(field: &str, value: &str) -> Result<(), AppError> {
    if is_valid_key(value) {
        Ok(())
    } else {
        Err(AppError::Validation(format!(
            "{} must be non-empty and must not contain ':'.",
            field
        )))
    }
}

fn require_email(value: &str) -> Result<(), AppError> {
    if value.trim().is_empty() {
        return Err(AppError::Validation("user_email is required.".to_string()));
    }
    Ok(())
}

fn load_listing(state: &AppState, id: &str) -> Result<Listing, AppError> {
    state
        .store
        .get_listing(id)
        .map_err(|err| AppError::from_store(err, FETCH_LISTINGS_ERROR))?
        .ok_or_else(|| AppError::NotFound(format!("listing {} not found", id)))
}

fn is_listing_available(
    state: &AppState,
    listing: &Listing,
    range: DateRange,
) -> Result<bool, AppError> {
    let reservations = state
        .store
        .fetch_reservations_for_listing(&listing.id)
        .map_err(|err| AppError::from_store(err, FETCH_RESERVATIONS_ERROR))?;
    Ok(is_available(
        listing,
        &reservations,
        range.start,
        range.end,
        state.config.boundary_policy,
    ))
}

// ----- listings -----

/// Lists listings, optionally searched and filtered
///
/// # Query Parameters
///
/// - `location`, `start_date`, `end_date` - search step; when any of them is
///   given, both dates are required
/// - `min_guests`, `min_rooms`, `min_bathrooms`, `max_price`, `require_pets`,
///   `require_pool`, `require_wifi` - attribute filter applied to the search result
///
/// # Response
///
/// - **200 OK** - `{"count", "data", "message"?}`; an empty search result
///   carries a "no listings available" message
/// - **400 Bad Request** - missing, inverted or malformed dates
pub async fn list_listings(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ListingQueryParams>,
) -> Result<Response, AppError> {
    let searched =
        params.location.is_some() || params.start_date.is_some() || params.end_date.is_some();

    let query = SearchQuery {
        location: params.location.clone().unwrap_or_default(),
        start_date: params.start_date,
        end_date: params.end_date,
    };
    if searched {
        query.date_range()?;
    }

    let all = state
        .store
        .fetch_all_listings()
        .map_err(|err| AppError::from_store(err, FETCH_LISTINGS_ERROR))?;

    let base = if searched {
        run_search(&state.store, &all, &query, state.config.boundary_policy)?
    } else {
        all
    };

    let visible = if AttributeFilter::is_requested(&params) {
        refine(&base, &AttributeFilter::from_params(&params))
    } else {
        base
    };

    debug!(count = visible.len(), searched, "listings served");
    Ok(Json(SearchResults::new(visible, searched)).into_response())
}

/// Adds a listing
///
/// # Response
///
/// - **201 Created** - the stored listing
/// - **409 Conflict** - the id is taken
pub async fn create_listing(
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateListingRequest>,
) -> Result<Response, AppError> {
    let id = match payload.id.clone().filter(|id| !id.is_empty()) {
        Some(id) => {
            require_key("id", &id)?;
            id
        }
        None => random_id(12),
    };
    if payload.title.trim().is_empty() {
        return Err(AppError::Validation("title is required.".to_string()));
    }

    let listing = payload.into_listing(id);
    state
        .store
        .insert_listing(&listing)
        .map_err(|err| AppError::from_store(err, "An error occurred saving the listing."))?;

    info!(listing_id = %listing.id, "listing created");
    Ok((StatusCode::CREATED, Json(listing)).into_response())
}

/// Fetches one listing by id
///
/// # Response
///
/// - **200 OK** - the listing
/// - **404 Not Found** - unknown id
pub async fn get_listing(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let listing = load_listing(&state, &id)?;
    Ok(Json(listing).into_response())
}

#[derive(Serialize)]
struct AvailabilityResponse {
    listing_id: String,
    start_date: chrono::NaiveDate,
    end_date: chrono::NaiveDate,
    available: bool,
    nights: u32,
    total_price: u64,
}

/// Advisory availability check for one listing
///
/// `GET /api/listings/{id}/availability?start_date=2025-08-28&end_date=2025-08-30`
pub async fn check_availability(
    Path(id): Path<String>,
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<AvailabilityParams>,
) -> Result<Response, AppError> {
    let range = DateRange::from_parts(params.start_date, params.end_date)?;
    let listing = load_listing(&state, &id)?;
    let available = is_listing_available(&state, &listing, range)?;

    Ok(Json(AvailabilityResponse {
        listing_id: listing.id,
        start_date: range.start,
        end_date: range.end,
        available,
        nights: range.nights(),
        total_price: u64::from(range.nights()).saturating_mul(listing.price),
    })
    .into_response())
}

// ----- reservations -----

/// Books a listing
///
/// # Request Body
///
/// ```json
/// {
///   "user_id": "u1",
///   "user_email": "ana@example.com",
///   "start_date": "2025-08-28",
///   "end_date": "2025-08-30",
///   "card": { "holder": "Ana", "number": "4242 4242 4242 4242", "expiry": "12/30", "cvc": "123" }
/// }
/// ```
///
/// # Response
///
/// - **201 Created** - reservation and payment receipt
/// - **400 Bad Request** - missing, inverted or past dates
/// - **402 Payment Required** - the card form was rejected
/// - **404 Not Found** - unknown listing
/// - **409 Conflict** - the dates are already booked; checked before the
///   card is charged and again atomically on insert
pub async fn create_reservation(
    Path(listing_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateReservationRequest>,
) -> Result<Response, AppError> {
    require_key("user_id", &payload.user_id)?;
    require_email(&payload.user_email)?;
    let range = DateRange::from_parts(payload.start_date, payload.end_date)?;
    if range.start < Utc::now().date_naive() {
        return Err(AppError::Validation(
            "The start date cannot be in the past.".to_string(),
        ));
    }

    let listing = load_listing(&state, &listing_id)?;
    let nights = range.nights();
    let total_price = u64::from(nights).saturating_mul(listing.price);

    // Advisory; the store repeats the check atomically on insert.
    if !is_listing_available(&state, &listing, range)? {
        return Err(AppError::from_store(StoreError::Conflict, SAVE_RESERVATION_ERROR));
    }

    let receipt = FakePaymentGateway
        .charge(&payload.card, total_price)
        .map_err(|err| AppError::PaymentDeclined(err.to_string()))?;

    let reservation = Reservation {
        id: random_id(12),
        listing_id: listing.id.clone(),
        user_id: payload.user_id,
        user_email: payload.user_email,
        title: listing.title.clone(),
        location: listing.location.clone(),
        start_date: range.start,
        end_date: range.end,
        nightly_price: listing.price,
        nights,
        total_price,
        payment_reference: Some(receipt.reference.clone()),
        created_at: Utc::now(),
    };

    state
        .store
        .create_reservation(&reservation, state.config.boundary_policy)
        .map_err(|err| AppError::from_store(err, SAVE_RESERVATION_ERROR))?;

    Ok((
        StatusCode::CREATED,
        Json(json!({
            "reservation": reservation,
            "payment": receipt,
        })),
    )
        .into_response())
}

/// Booking history of one user
///
/// `GET /api/reservations?user_email=ana@example.com`
///
/// Stays are ordered by start date. Rated stays no longer appear.
pub async fn list_reservations(
    State(state): State<AppState>,
    ApiQuery(params): ApiQuery<ReservationListParams>,
) -> Result<Response, AppError> {
    require_email(&params.user_email)?;
    let reservations = state
        .store
        .reservations_for_user(&params.user_email)
        .map_err(|err| AppError::from_store(err, FETCH_RESERVATIONS_ERROR))?;

    Ok(Json(json!({
        "count": reservations.len(),
        "data": reservations,
    }))
    .into_response())
}

// ----- ratings -----

/// Rates a finished stay; the reservation is removed once rated
///
/// # Response
///
/// - **201 Created** - the stored rating
/// - **400 Bad Request** - no stars, short comment, or the stay has not ended
/// - **404 Not Found** - unknown reservation
pub async fn rate_reservation(
    Path(reservation_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<CreateRatingRequest>,
) -> Result<Response, AppError> {
    if !(1..=5).contains(&payload.stars) {
        return Err(AppError::Validation(
            "Select a valid star rating.".to_string(),
        ));
    }
    let comment = payload.comment.trim();
    if comment.chars().count() < MIN_COMMENT_CHARS {
        return Err(AppError::Validation(format!(
            "The comment must be at least {} characters long.",
            MIN_COMMENT_CHARS
        )));
    }

    let reservation = state
        .store
        .get_reservation(&reservation_id)
        .map_err(|err| AppError::from_store(err, FETCH_RESERVATIONS_ERROR))?
        .ok_or_else(|| AppError::NotFound(format!("reservation {} not found", reservation_id)))?;

    if Utc::now().date_naive() < reservation.end_date {
        return Err(AppError::Validation(
            "A stay can be rated once it has ended.".to_string(),
        ));
    }

    let rating = Rating {
        id: random_id(12),
        reservation_id: reservation.id,
        listing_id: reservation.listing_id,
        user_id: reservation.user_id,
        user_email: reservation.user_email,
        stars: payload.stars,
        comment: comment.to_string(),
        published_at: Utc::now(),
    };

    state
        .store
        .record_rating(&rating)
        .map_err(|err| AppError::from_store(err, SAVE_RATING_ERROR))?;

    Ok((StatusCode::CREATED, Json(rating)).into_response())
}

/// Ratings of a listing, newest first, with their average
pub async fn listing_ratings(
    Path(listing_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let ratings = state
        .store
        .ratings_for_listing(&listing_id)
        .map_err(|err| AppError::from_store(err, FETCH_RATINGS_ERROR))?;

    let average_stars = if ratings.is_empty() {
        None
    } else {
        let total: u32 = ratings.iter().map(|r| u32::from(r.stars)).sum();
        Some(f64::from(total) / ratings.len() as f64)
    };

    Ok(Json(json!({
        "listing_id": listing_id,
        "count": ratings.len(),
        "average_stars": average_stars,
        "data": ratings,
    }))
    .into_response())
}

// ----- favorites -----

/// Marks a listing as a favorite of the user
///
/// Saving the same listing twice is not an error; the first entry is kept.
///
/// # Request Body
///
/// ```json
/// { "user_email": "ana@example.com" }
/// ```
///
/// # Response
///
/// - **200 OK** - the favorite entry
/// - **404 Not Found** - unknown listing
pub async fn add_favorite(
    Path((user_id, listing_id)): Path<(String, String)>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<FavoriteRequest>,
) -> Result<Response, AppError> {
    require_key("user_id", &user_id)?;
    require_email(&payload.user_email)?;
    let listing = load_listing(&state, &listing_id)?;

    let favorite = Favorite {
        user_id,
        user_email: payload.user_email,
        listing_id: listing.id.clone(),
        title: listing.title.clone(),
        location: listing.location.clone(),
        price: listing.price,
        image: listing.cover_image().to_string(),
        added_at: Utc::now(),
    };

    state
        .store
        .add_favorite(&favorite)
        .map_err(|err| AppError::from_store(err, FAVORITES_ERROR))?;

    Ok(Json(favorite).into_response())
}

/// Removes a favorite
///
/// # Response
///
/// - **200 OK** - removed
/// - **404 Not Found** - the listing was not a favorite
pub async fn remove_favorite(
    Path((user_id, listing_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let removed = state
        .store
        .remove_favorite(&user_id, &listing_id)
        .map_err(|err| AppError::from_store(err, FAVORITES_ERROR))?;

    if !removed {
        return Err(AppError::NotFound("favorite not found".to_string()));
    }
    Ok(Json(json!({
        "message": "Favorite removed",
        "listing_id": listing_id,
    }))
    .into_response())
}

/// A user's favorites as `{"count", "data"}`
pub async fn list_favorites(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    require_key("user_id", &user_id)?;
    let favorites = state
        .store
        .favorites_for_user(&user_id)
        .map_err(|err| AppError::from_store(err, "An error occurred fetching favorites."))?;

    Ok(Json(json!({
        "count": favorites.len(),
        "data": favorites,
    }))
    .into_response())
}

// ----- availability notifications -----

/// Subscribes a user to availability news for a listing and date range
///
/// # Response
///
/// - **201 Created** - the subscription
/// - **400 Bad Request** - missing or inverted dates
/// - **404 Not Found** - unknown listing
pub async fn subscribe_notification(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
    ApiJson(payload): ApiJson<NotificationRequest>,
) -> Result<Response, AppError> {
    require_key("user_id", &user_id)?;
    require_email(&payload.user_email)?;
    let range = DateRange::from_parts(payload.start_date, payload.end_date)?;
    let listing = load_listing(&state, &payload.listing_id)?;

    let notification = AvailabilityNotification {
        user_id,
        user_email: payload.user_email,
        listing_id: listing.id.clone(),
        title: listing.title.clone(),
        location: listing.location.clone(),
        start_date: range.start,
        end_date: range.end,
        subscribed_at: Utc::now(),
        active: true,
    };

    state
        .store
        .subscribe_notification(&notification)
        .map_err(|err| AppError::from_store(err, NOTIFICATIONS_ERROR))?;

    Ok((StatusCode::CREATED, Json(notification)).into_response())
}

/// Cancels the user's subscription for a listing
pub async fn unsubscribe_notification(
    Path((user_id, listing_id)): Path<(String, String)>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let removed = state
        .store
        .unsubscribe_notification(&user_id, &listing_id)
        .map_err(|err| AppError::from_store(err, NOTIFICATIONS_ERROR))?;

    if !removed {
        return Err(AppError::NotFound("notification not found".to_string()));
    }
    Ok(Json(json!({
        "message": "Notification removed",
        "listing_id": listing_id,
    }))
    .into_response())
}

#[derive(Serialize)]
struct NotificationStatus {
    #[serde(flatten)]
    notification: AvailabilityNotification,
    /// Whether the listing is free for the subscribed dates right now
    available: bool,
}

/// A user's subscriptions, each with a fresh availability verdict
pub async fn list_notifications(
    Path(user_id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    require_key("user_id", &user_id)?;
    let notifications = state
        .store
        .notifications_for_user(&user_id)
        .map_err(|err| AppError::from_store(err, "An error occurred fetching notifications."))?;

    let mut data = Vec::with_capacity(notifications.len());
    for notification in notifications {
        let reservations = state
            .store
            .fetch_reservations_for_listing(&notification.listing_id)
            .map_err(|err| AppError::from_store(err, FETCH_RESERVATIONS_ERROR))?;
        let available = !reservations.iter().any(|r| {
            conflicts(
                state.config.boundary_policy,
                notification.start_date,
                notification.end_date,
                r.start_date,
                r.end_date,
            )
        });
        data.push(NotificationStatus {
            notification,
            available,
        });
    }

    Ok(Json(json!({
        "count": data.len(),
        "data": data,
    }))
    .into_response())
}

// ----- browsing sessions -----

fn session_not_found(id: &str) -> AppError {
    AppError::NotFound(format!("session {} not found", id))
}

/// Opens a browsing session over the current listings
pub async fn create_session(State(state): State<AppState>) -> Result<Response, AppError> {
    let all = state
        .store
        .fetch_all_listings()
        .map_err(|err| AppError::from_store(err, FETCH_LISTINGS_ERROR))?;

    let snapshot = state.sessions.create(all);

    debug!(session_id = %snapshot.id, "session opened");
    Ok((StatusCode::CREATED, Json(snapshot)).into_response())
}

/// Current state and visible listings of a session
///
/// # Response
///
/// - **200 OK** - `{"id", "state", "query"?, "filter"?, "results"}`
/// - **404 Not Found** - unknown, closed or expired session
pub async fn get_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    let snapshot = state
        .sessions
        .with_session(&id, |session| session.snapshot(&id))
        .ok_or_else(|| session_not_found(&id))?;
    Ok(Json(snapshot).into_response())
}

/// Runs a location + date search inside a session
///
/// Invalid dates are rejected without touching the session. A search that
/// finishes after a newer one was started is discarded.
pub async fn search_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
    ApiJson(query): ApiJson<SearchQuery>,
) -> Result<Response, AppError> {
    query.date_range()?;

    let (ticket, all) = state
        .sessions
        .with_session(&id, |session| (session.begin_search(), Arc::clone(session.all())))
        .ok_or_else(|| session_not_found(&id))?;

    let results = run_search(&state.store, &all, &query, state.config.boundary_policy)?;

    let snapshot = state
        .sessions
        .with_session(&id, |session| {
            if session.complete_search(ticket, query, results) == SearchCompletion::Stale {
                debug!(session_id = %id, "stale search result discarded");
            }
            session.snapshot(&id)
        })
        .ok_or_else(|| session_not_found(&id))?;

    Ok(Json(snapshot).into_response())
}

/// Applies an attribute filter to the session's latest search result
pub async fn filter_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
    ApiJson(filter): ApiJson<AttributeFilter>,
) -> Result<Response, AppError> {
    let snapshot = state
        .sessions
        .with_session(&id, |session| {
            session.apply_filter(filter);
            session.snapshot(&id)
        })
        .ok_or_else(|| session_not_found(&id))?;
    Ok(Json(snapshot).into_response())
}

/// Closes a session
pub async fn delete_session(
    Path(id): Path<String>,
    State(state): State<AppState>,
) -> Result<Response, AppError> {
    if !state.sessions.remove(&id) {
        warn!(session_id = %id, "unknown session");
        return Err(session_not_found(&id));
    }
    Ok(Json(json!({
        "message": "Session closed",
        "deleted_id": id,
    }))
    .into_response())
}
