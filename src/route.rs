//! Route definitions for the booking API
//!
//! This module configures all HTTP routes and maps them to their handlers.

use axum::middleware;
use axum::routing::{delete, get, post, put};
use axum::Router;

use crate::database::AppState;
use crate::handler::{
    add_favorite, check_availability, create_listing, create_reservation, create_session,
    delete_session, filter_session, get_listing, get_session, list_favorites, list_listings,
    list_notifications, list_reservations, listing_ratings, rate_reservation, remove_favorite,
    search_session, subscribe_notification, unsubscribe_notification,
};
use crate::middleware::auth_middleware;

/// Creates and configures the Axum application router with all routes
///
/// # Route Definitions
///
/// - `GET /health` - liveness probe (public)
/// - `GET|POST /api/listings` - browse (search + filter) / add listings
/// - `GET /api/listings/{id}` - one listing
/// - `GET /api/listings/{id}/availability` - advisory date check
/// - `POST /api/listings/{id}/reservations` - book with the fake payment step
/// - `GET /api/listings/{id}/ratings` - ratings of a listing
/// - `GET /api/reservations?user_email=` - booking history
/// - `POST /api/reservations/{id}/rating` - rate a finished stay
/// - `GET /api/users/{user_id}/favorites`, `PUT|DELETE /api/users/{user_id}/favorites/{listing_id}`
/// - `GET|POST /api/users/{user_id}/notifications`, `DELETE /api/users/{user_id}/notifications/{listing_id}`
/// - `POST /api/sessions`, `GET|DELETE /api/sessions/{id}`,
///   `POST /api/sessions/{id}/search`, `POST /api/sessions/{id}/filter`
///
/// # Example Usage
///
/// ```no_run
/// # use fakebnb::config::Config;
/// # use fakebnb::database::{AppState, Store};
/// # use fakebnb::route::create_app;
/// # let store = Store::open("data.db").unwrap();
/// let state = AppState::new(store, Config::default());
/// let app = create_app(state);
/// // axum::serve(listener, app).await.unwrap();
/// ```
pub fn create_app(state: AppState) -> Router {
    let api_routes = Router::new()
        .route("/listings", get(list_listings).post(create_listing))
        .route("/listings/{id}", get(get_listing))
        .route("/listings/{id}/availability", get(check_availability))
        .route("/listings/{id}/reservations", post(create_reservation))
        .route("/listings/{id}/ratings", get(listing_ratings))
        .route("/reservations", get(list_reservations))
        .route("/reservations/{id}/rating", post(rate_reservation))
        .route("/users/{user_id}/favorites", get(list_favorites))
        .route(
            "/users/{user_id}/favorites/{listing_id}",
            put(add_favorite).delete(remove_favorite),
        )
        .route(
            "/users/{user_id}/notifications",
            get(list_notifications).post(subscribe_notification),
        )
        .route(
            "/users/{user_id}/notifications/{listing_id}",
            delete(unsubscribe_notification),
        )
        .route("/sessions", post(create_session))
        .route("/sessions/{id}", get(get_session).delete(delete_session))
        .route("/sessions/{id}/search", post(search_session))
        .route("/sessions/{id}/filter", post(filter_session))
        .layer(middleware::from_fn_with_state(state.clone(), auth_middleware));

    Router::new()
        .route("/health", get(|| async { "ok" }))
        .nest("/api", api_routes)
        .with_state(state)
}
