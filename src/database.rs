//! Database initialization, table definitions and the store handle
//!
//! This module sets up the embedded redb database and wraps it in [`Store`],
//! the single entry point every handler uses to read and write listings,
//! reservations, ratings, favorites and availability notifications.
//!
//! Values are JSON-serialized records. Secondary tables use composite keys
//! `"{owner}:{id}"` so that everything belonging to one owner can be read with
//! a single range query.

use redb::{Database, ReadableDatabase, ReadableTable, TableDefinition};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::sync::Arc;
use tracing::{debug, info};

use crate::availability::{conflicts, BoundaryPolicy};
use crate::config::Config;
use crate::error::StoreError;
use crate::model::{AvailabilityNotification, Favorite, Listing, Rating, Reservation};
use crate::session::SessionRegistry;

/// Listings by id
pub const TABLE_LISTINGS: TableDefinition<&str, &str> = TableDefinition::new("listings_v1");

/// Reservations by id
pub const TABLE_RESERVATIONS: TableDefinition<&str, &str> =
    TableDefinition::new("reservations_v1");

/// Reservations by listing
///
/// Key: `"{listing_id}:{reservation_id}"`
pub const TABLE_LISTING_RESERVATIONS: TableDefinition<&str, &str> =
    TableDefinition::new("listing_reservations_v1");

/// Ratings by listing
///
/// Key: `"{listing_id}:{rating_id}"`
pub const TABLE_RATINGS: TableDefinition<&str, &str> = TableDefinition::new("ratings_v1");

/// Favorites by user
///
/// Key: `"{user_id}:{listing_id}"`, one entry per pair
pub const TABLE_FAVORITES: TableDefinition<&str, &str> = TableDefinition::new("favorites_v1");

/// Availability notification subscriptions by user
///
/// Key: `"{user_id}:{listing_id}"`, one entry per pair
pub const TABLE_NOTIFICATIONS: TableDefinition<&str, &str> =
    TableDefinition::new("availability_notifications_v1");

/// Application state shared across all request handlers
///
/// Cloned into every handler by axum; the store and the session registry
/// are reference-counted, so clones share the same data.
#[derive(Clone)]
pub struct AppState {
    pub store: Store,
    pub config: Arc<Config>,
    pub sessions: SessionRegistry,
}

impl AppState {
    pub fn new(store: Store, config: Config) -> Self {
        Self {
            store,
            sessions: SessionRegistry::new(config.session_ttl, config.max_sessions),
            config: Arc::new(config),
        }
    }
}

/// Initializes the embedded database and creates required tables
///
/// This function:
/// 1. Creates or opens the database file at the specified path
/// 2. Opens every table so that later read transactions find them
/// 3. Commits the transaction to persist the table structures
///
/// # Arguments
///
/// * `db_path` - File path where the database should be stored (e.g., "data.db")
///
/// # Returns
///
/// * `Ok(Database)` - Successfully initialized database instance
/// * `Err(redb::Error)` - Database initialization error
///
/// # Example
///
/// ```no_run
/// # use fakebnb::database::init_db;
/// let db = init_db("data.db").expect("Failed to initialize database");
/// ```
pub fn init_db(db_path: &str) -> Result<Database, redb::Error> {
    // Create or open the database file
    let db = Database::create(db_path)?;

    // Open (or create if not exists) every table in one write transaction
    let write_txn = db.begin_write()?;
    {
        write_txn.open_table(TABLE_LISTINGS)?;
        write_txn.open_table(TABLE_RESERVATIONS)?;
        write_txn.open_table(TABLE_LISTING_RESERVATIONS)?;
        write_txn.open_table(TABLE_RATINGS)?;
        write_txn.open_table(TABLE_FAVORITES)?;
        write_txn.open_table(TABLE_NOTIFICATIONS)?;
    }
    write_txn.commit()?;

    Ok(db)
}

fn index_key(owner: &str, id: &str) -> String {
    format!("{}:{}", owner, id)
}

/// Decodes every record whose key starts with `"{owner}:"`.
///
/// `';'` is the byte right after `':'`, so `"{owner}:".."{owner};"` covers
/// exactly the owner's keys.
fn scan_owner<T, R>(table: &R, owner: &str) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    let start_key = format!("{}:", owner);
    let end_key = format!("{};", owner);

    let mut records = Vec::new();
    for entry in table.range(start_key.as_str()..end_key.as_str())? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}

fn scan_all<T, R>(table: &R) -> Result<Vec<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    let mut records = Vec::new();
    for entry in table.iter()? {
        let (_, value) = entry?;
        records.push(serde_json::from_str(value.value())?);
    }
    Ok(records)
}

fn lookup<T, R>(table: &R, key: &str) -> Result<Option<T>, StoreError>
where
    T: DeserializeOwned,
    R: ReadableTable<&'static str, &'static str>,
{
    match table.get(key)? {
        Some(guard) => Ok(Some(serde_json::from_str(guard.value())?)),
        None => Ok(None),
    }
}

fn encode<T: Serialize>(record: &T) -> Result<String, StoreError> {
    Ok(serde_json::to_string(record)?)
}

/// Handle to the listing, reservation and user-data collections
///
/// Created once at startup and cloned into every consumer.
#[derive(Clone)]
pub struct Store {
    db: Arc<Database>,
}

impl Store {
    pub fn new(db: Database) -> Self {
        Self { db: Arc::new(db) }
    }

    /// Opens (or creates) the database file at `db_path`.
    pub fn open(db_path: &str) -> Result<Self, StoreError> {
        Ok(Self::new(init_db(db_path)?))
    }

    // ----- listings -----

    /// Every listing in the store, ordered by id
    pub fn fetch_all_listings(&self) -> Result<Vec<Listing>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LISTINGS)?;
        scan_all(&table)
    }

    /// Looks up one listing
    ///
    /// # Returns
    ///
    /// * `Ok(Some(Listing))` - The listing exists
    /// * `Ok(None)` - No listing has this id
    /// * `Err(StoreError)` - Storage or decoding failure
    pub fn get_listing(&self, id: &str) -> Result<Option<Listing>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LISTINGS)?;
        lookup(&table, id)
    }

    /// Inserts a new listing; fails if the id is taken.
    pub fn insert_listing(&self, listing: &Listing) -> Result<(), StoreError> {
        let record_json = encode(listing)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_LISTINGS)?;
            if table.get(listing.id.as_str())?.is_some() {
                return Err(StoreError::AlreadyExists(format!("listing {}", listing.id)));
            }
            table.insert(listing.id.as_str(), record_json.as_str())?;
        }
        write_txn.commit()?;

        debug!(listing_id = %listing.id, "listing inserted");
        Ok(())
    }

    /// Seeds listings, skipping ids that already exist.
    ///
    /// Returns the number of listings written.
    pub fn import_listings(&self, listings: &[Listing]) -> Result<usize, StoreError> {
        let mut written = 0;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_LISTINGS)?;
            for listing in listings {
                if table.get(listing.id.as_str())?.is_some() {
                    continue;
                }
                let record_json = encode(listing)?;
                table.insert(listing.id.as_str(), record_json.as_str())?;
                written += 1;
            }
        }
        write_txn.commit()?;

        info!(written, skipped = listings.len() - written, "listings imported");
        Ok(written)
    }

    // ----- reservations -----

    /// All reservations of one listing, read from the per-listing index
    ///
    /// This is the only reservation fetch used by search and availability
    /// checks. Reservations of other listings are never read.
    ///
    /// # Arguments
    ///
    /// * `listing_id` - Listing whose reservations are wanted; an unknown id
    ///   yields an empty list
    pub fn fetch_reservations_for_listing(
        &self,
        listing_id: &str,
    ) -> Result<Vec<Reservation>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_LISTING_RESERVATIONS)?;
        scan_owner(&table, listing_id)
    }

    /// Looks up one reservation by id
    pub fn get_reservation(&self, id: &str) -> Result<Option<Reservation>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_RESERVATIONS)?;
        lookup(&table, id)
    }

    /// Booking history of one user, oldest stay first
    pub fn reservations_for_user(&self, user_email: &str) -> Result<Vec<Reservation>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_RESERVATIONS)?;
        let mut reservations: Vec<Reservation> = scan_all(&table)?;
        reservations.retain(|r| r.user_email == user_email);
        reservations.sort_by(|a, b| a.start_date.cmp(&b.start_date));
        Ok(reservations)
    }

    /// Writes `reservation` unless its dates collide with an existing one.
    ///
    /// The conflict scan and the insert share one write transaction. redb
    /// admits a single writer at a time, so two overlapping bookings cannot
    /// both pass the check.
    ///
    /// # Arguments
    ///
    /// * `reservation` - The new reservation, id already assigned
    /// * `policy` - How stays that touch on a checkout day are treated
    ///
    /// # Returns
    ///
    /// * `Ok(String)` - The stored reservation id
    /// * `Err(StoreError::NotFound)` - The listing does not exist
    /// * `Err(StoreError::Conflict)` - The dates overlap an existing stay
    pub fn create_reservation(
        &self,
        reservation: &Reservation,
        policy: BoundaryPolicy,
    ) -> Result<String, StoreError> {
        let record_json = encode(reservation)?;
        let key = index_key(&reservation.listing_id, &reservation.id);

        let write_txn = self.db.begin_write()?;

        // The listing must exist
        {
            let listings = write_txn.open_table(TABLE_LISTINGS)?;
            if listings.get(reservation.listing_id.as_str())?.is_none() {
                drop(listings);
                write_txn.abort()?;
                return Err(StoreError::NotFound(format!(
                    "listing {}",
                    reservation.listing_id
                )));
            }
        }

        // Scan the listing's stays and insert into both tables only if none collides
        {
            let mut index = write_txn.open_table(TABLE_LISTING_RESERVATIONS)?;
            let existing: Vec<Reservation> = scan_owner(&index, &reservation.listing_id)?;
            let taken = existing.iter().any(|r| {
                conflicts(
                    policy,
                    reservation.start_date,
                    reservation.end_date,
                    r.start_date,
                    r.end_date,
                )
            });
            if taken {
                drop(index);
                write_txn.abort()?;
                return Err(StoreError::Conflict);
            }
            index.insert(key.as_str(), record_json.as_str())?;

            let mut table = write_txn.open_table(TABLE_RESERVATIONS)?;
            table.insert(reservation.id.as_str(), record_json.as_str())?;
        }
        write_txn.commit()?;

        info!(
            reservation_id = %reservation.id,
            listing_id = %reservation.listing_id,
            start = %reservation.start_date,
            end = %reservation.end_date,
            "reservation created"
        );
        Ok(reservation.id.clone())
    }

    // ----- ratings -----

    /// Stores `rating` and deletes the reservation it rates, atomically.
    pub fn record_rating(&self, rating: &Rating) -> Result<(), StoreError> {
        let record_json = encode(rating)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut reservations = write_txn.open_table(TABLE_RESERVATIONS)?;
            let reservation: Option<Reservation> =
                lookup(&reservations, &rating.reservation_id)?;
            let Some(reservation) = reservation else {
                drop(reservations);
                write_txn.abort()?;
                return Err(StoreError::NotFound(format!(
                    "reservation {}",
                    rating.reservation_id
                )));
            };
            reservations.remove(reservation.id.as_str())?;

            let mut index = write_txn.open_table(TABLE_LISTING_RESERVATIONS)?;
            index.remove(index_key(&reservation.listing_id, &reservation.id).as_str())?;

            let mut ratings = write_txn.open_table(TABLE_RATINGS)?;
            ratings.insert(
                index_key(&rating.listing_id, &rating.id).as_str(),
                record_json.as_str(),
            )?;
        }
        write_txn.commit()?;

        info!(
            rating_id = %rating.id,
            reservation_id = %rating.reservation_id,
            stars = rating.stars,
            "rating recorded, reservation removed"
        );
        Ok(())
    }

    /// Ratings of one listing, newest first
    pub fn ratings_for_listing(&self, listing_id: &str) -> Result<Vec<Rating>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_RATINGS)?;
        let mut ratings: Vec<Rating> = scan_owner(&table, listing_id)?;
        ratings.sort_by(|a, b| b.published_at.cmp(&a.published_at));
        Ok(ratings)
    }

    // ----- favorites -----

    /// Saves a favorite; saving the same listing twice keeps the first entry.
    pub fn add_favorite(&self, favorite: &Favorite) -> Result<(), StoreError> {
        let key = index_key(&favorite.user_id, &favorite.listing_id);
        let record_json = encode(favorite)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_FAVORITES)?;
            if table.get(key.as_str())?.is_none() {
                table.insert(key.as_str(), record_json.as_str())?;
            }
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Returns whether a favorite was removed.
    pub fn remove_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool, StoreError> {
        let key = index_key(user_id, listing_id);

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(TABLE_FAVORITES)?;
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Whether `listing_id` is among the user's favorites
    pub fn is_favorite(&self, user_id: &str, listing_id: &str) -> Result<bool, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_FAVORITES)?;
        let found = table.get(index_key(user_id, listing_id).as_str())?.is_some();
        Ok(found)
    }

    /// Favorites of one user, ordered by listing id
    pub fn favorites_for_user(&self, user_id: &str) -> Result<Vec<Favorite>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_FAVORITES)?;
        scan_owner(&table, user_id)
    }

    // ----- availability notifications -----

    /// Subscribes, replacing an earlier subscription for the same listing.
    pub fn subscribe_notification(
        &self,
        notification: &AvailabilityNotification,
    ) -> Result<(), StoreError> {
        let key = index_key(&notification.user_id, &notification.listing_id);
        let record_json = encode(notification)?;

        let write_txn = self.db.begin_write()?;
        {
            let mut table = write_txn.open_table(TABLE_NOTIFICATIONS)?;
            table.insert(key.as_str(), record_json.as_str())?;
        }
        write_txn.commit()?;
        Ok(())
    }

    /// Returns whether a subscription was removed.
    pub fn unsubscribe_notification(
        &self,
        user_id: &str,
        listing_id: &str,
    ) -> Result<bool, StoreError> {
        let key = index_key(user_id, listing_id);

        let write_txn = self.db.begin_write()?;
        let removed = {
            let mut table = write_txn.open_table(TABLE_NOTIFICATIONS)?;
            let removed = table.remove(key.as_str())?.is_some();
            removed
        };
        write_txn.commit()?;
        Ok(removed)
    }

    /// Subscriptions of one user, ordered by listing id
    pub fn notifications_for_user(
        &self,
        user_id: &str,
    ) -> Result<Vec<AvailabilityNotification>, StoreError> {
        let read_txn = self.db.begin_read()?;
        let table = read_txn.open_table(TABLE_NOTIFICATIONS)?;
        scan_owner(&table, user_id)
    }
}
