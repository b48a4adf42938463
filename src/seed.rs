//! Startup import of listings from a JSON file

use std::path::Path;

use thiserror::Error;
use tracing::info;

use crate::database::Store;
use crate::error::StoreError;
use crate::model::{is_valid_key, Listing};

#[derive(Error, Debug)]
pub enum SeedError {
    #[error("cannot read seed file: {0}")]
    Io(#[from] std::io::Error),

    #[error("invalid seed file: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("invalid listing id {0:?}")]
    InvalidId(String),

    #[error(transparent)]
    Store(#[from] StoreError),
}

/// Parses a JSON array of listings.
pub fn parse_listings(raw: &str) -> Result<Vec<Listing>, SeedError> {
    let listings: Vec<Listing> = serde_json::from_str(raw)?;
    if let Some(bad) = listings.iter().find(|l| !is_valid_key(&l.id)) {
        return Err(SeedError::InvalidId(bad.id.clone()));
    }
    Ok(listings)
}

/// Imports the listings in `path` that the store does not hold yet.
pub async fn import_file(store: &Store, path: impl AsRef<Path>) -> Result<usize, SeedError> {
    let path = path.as_ref();
    let raw = tokio::fs::read_to_string(path).await?;
    let listings = parse_listings(&raw)?;
    info!(path = %path.display(), found = listings.len(), "seeding listings");
    Ok(store.import_listings(&listings)?)
}
