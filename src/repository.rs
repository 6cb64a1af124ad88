//! Typed access to the listings collection
use super::error::{MarketError, StoreError};
use super::listing::{Listing, ListingPatch};
use super::lifecycle::ListingStatus;
use super::store::{Commit, Store};
use std::sync::{Arc, Mutex};
use tracing::debug;

pub struct ListingRepository {
    store: Arc<dyn Store>,
    // the store replaces the whole collection on write; one writer at a time
    write_guard: Mutex<()>,
}

impl ListingRepository {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            write_guard: Mutex::new(()),
        }
    }

    pub fn get(&self, id: &str) -> Result<Listing, MarketError> {
        self.store
            .get_listings()?
            .into_iter()
            .find(|listing| listing.id == id)
            .ok_or_else(|| MarketError::NotFound(id.to_string()))
    }

    /// Insertion order.
    pub fn list(&self) -> Result<Vec<Listing>, MarketError> {
        Ok(self.store.get_listings()?)
    }

    pub fn create(&self, listing: Listing) -> Result<Listing, MarketError> {
        self.create_with(listing, Commit::default())
    }

    /// Creates the listing and applies `extra` in the same store commit.
    pub(crate) fn create_with(
        &self,
        listing: Listing,
        extra: Commit<'_>,
    ) -> Result<Listing, MarketError> {
        listing.validate()?;

        let _guard = self.write_guard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut listings = self.store.get_listings()?;
        if listings.iter().any(|existing| existing.id == listing.id) {
            return Err(MarketError::DuplicateId(listing.id));
        }

        listings.push(listing.clone());
        self.store.commit(&Commit {
            listings: Some(listings.as_slice()),
            ..extra
        })?;

        debug!(listing_id = %listing.id, "listing created");
        Ok(listing)
    }

    /// Applies `patch` and persists the result. A patch may only move the
    /// status one step forward and must leave the claim fields consistent.
    /// Claim fields change only on the move from `Available` to `Claimed`.
    pub fn update(&self, id: &str, patch: &ListingPatch) -> Result<Listing, MarketError> {
        self.update_with(id, patch, Commit::default())
    }

    /// Like [`update`](Self::update), applying `extra` in the same store commit.
    pub(crate) fn update_with(
        &self,
        id: &str,
        patch: &ListingPatch,
        extra: Commit<'_>,
    ) -> Result<Listing, MarketError> {
        let _guard = self.write_guard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut listings = self.store.get_listings()?;

        let index = listings
            .iter()
            .position(|listing| listing.id == id)
            .ok_or_else(|| MarketError::NotFound(id.to_string()))?;
        let current = &listings[index];

        if let Some(target) = patch.status {
            if !current.status.can_advance_to(target) {
                return Err(MarketError::InvalidState {
                    id: id.to_string(),
                    current: current.status,
                    expected: expected_before(target),
                });
            }
        }
        let claiming = current.status == ListingStatus::Available
            && patch.status == Some(ListingStatus::Claimed);
        if patch.touches_claim() && !claiming {
            return Err(MarketError::InvalidState {
                id: id.to_string(),
                current: current.status,
                expected: ListingStatus::Available,
            });
        }

        let updated = patch.apply(current);
        updated.validate()?;

        listings[index] = updated.clone();
        self.store.commit(&Commit {
            listings: Some(listings.as_slice()),
            ..extra
        })?;

        debug!(listing_id = id, status = ?updated.status, "listing updated");
        Ok(updated)
    }
}

// the status a listing must hold to move into `target`
fn expected_before(target: ListingStatus) -> ListingStatus {
    match target {
        ListingStatus::Available | ListingStatus::Claimed => ListingStatus::Available,
        ListingStatus::Expired => ListingStatus::Claimed,
    }
}
