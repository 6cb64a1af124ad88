//! Service layer API for the claim and handover workflow
use super::config::Config;
use super::error::{MarketError, StoreError};
use super::impact::{ImpactLedger, ImpactService};
use super::lifecycle::ListingStatus;
use super::listing::{Listing, ListingPatch};
use super::notification::{Notification, NotificationFeed, NotificationKind, WELCOME_TEXT};
use super::otp::{Otp, codes_equal};
use super::repository::ListingRepository;
use super::review::Review;
use super::store::{Commit, Health, SledStore, Store};
use super::types::{TimeStamp, UserRole};
use super::witness::{Witness, WitnessKind};
use rand::rngs::OsRng;
use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use tracing::{error, info, warn};

/// The party reserving a listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Claimant {
    pub name: String,
    pub role: UserRole,
}

impl Claimant {
    pub fn new(name: &str, role: UserRole) -> Self {
        Self {
            name: name.to_string(),
            role,
        }
    }
}

pub struct HandoverService {
    store: Arc<dyn Store>,
    listings: ListingRepository,
    impact: ImpactService,
    feed: NotificationFeed,
    // one mutex per listing id, held across read-check-write
    locks: Mutex<HashMap<String, Arc<Mutex<()>>>>,
    reviews_guard: Mutex<()>,
    master_override: Option<String>,
}

impl HandoverService {
    pub fn new(store: Arc<dyn Store>, config: &Config) -> Self {
        let feed = NotificationFeed::with_capacity(config.feed_capacity);
        feed.append(WELCOME_TEXT, NotificationKind::Success);

        Self {
            listings: ListingRepository::new(Arc::clone(&store)),
            impact: ImpactService::new(Arc::clone(&store)),
            store,
            feed,
            locks: Mutex::new(HashMap::new()),
            reviews_guard: Mutex::new(()),
            master_override: config.master_override.clone(),
        }
    }

    /// Opens the sled database at `config.db_path`.
    pub fn open(config: &Config) -> Result<Self, MarketError> {
        let store = SledStore::open(&config.db_path)?;
        Ok(Self::new(Arc::new(store), config))
    }

    fn listing_lock(&self, listing_id: &str) -> Result<Arc<Mutex<()>>, MarketError> {
        let mut locks = self.locks.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(Arc::clone(
            locks
                .entry(listing_id.to_string())
                .or_insert_with(|| Arc::new(Mutex::new(()))),
        ))
    }

    // expired listings never change again, so their lock can go
    fn release_lock(&self, listing_id: &str) {
        if let Ok(mut locks) = self.locks.lock() {
            locks.remove(listing_id);
        }
    }

    // a racing caller expired the listing while we waited
    fn release_if_expired(&self, listing_id: &str, err: &MarketError) {
        if matches!(
            err,
            MarketError::InvalidState {
                current: ListingStatus::Expired,
                ..
            }
        ) {
            self.release_lock(listing_id);
        }
    }

    // fetches the listing and checks it holds `expected`
    fn require(&self, listing_id: &str, expected: ListingStatus) -> Result<Listing, MarketError> {
        let listing = self.listings.get(listing_id)?;
        if listing.status != expected {
            warn!(listing_id, status = ?listing.status, ?expected, "operation rejected");
            return Err(MarketError::InvalidState {
                id: listing_id.to_string(),
                current: listing.status,
                expected,
            });
        }
        Ok(listing)
    }

    fn log_commit_failure(listing_id: &str, err: MarketError) -> MarketError {
        if let MarketError::StoreUnavailable(e) = &err {
            error!(listing_id, error = %e, "store commit failed, nothing was written");
        }
        err
    }

    pub fn listing(&self, listing_id: &str) -> Result<Listing, MarketError> {
        self.listings.get(listing_id)
    }

    pub fn listings(&self) -> Result<Vec<Listing>, MarketError> {
        self.listings.list()
    }

    /// Posts a new listing. It must be `Available` with no claim fields set.
    pub fn create_listing(&self, listing: Listing) -> Result<Listing, MarketError> {
        if listing.status != ListingStatus::Available {
            return Err(MarketError::InvalidState {
                id: listing.id,
                current: listing.status,
                expected: ListingStatus::Available,
            });
        }

        let witness = Witness::new(
            listing.id.clone(),
            listing.donor_name.clone(),
            WitnessKind::Create,
        );
        let listing_id = listing.id.clone();
        let listing = self
            .listings
            .create_with(
                listing,
                Commit {
                    witness: Some(&witness),
                    ..Commit::default()
                },
            )
            .map_err(|e| Self::log_commit_failure(&listing_id, e))?;

        self.feed.append(
            format!("Surplus Food Posted: \"{}\" is now live.", listing.name),
            NotificationKind::Success,
        );
        info!(listing_id = %listing.id, donor = %listing.donor_name, "listing posted");
        Ok(listing)
    }

    /// Reserves an available listing for `claimant` and issues its pickup
    /// code. The returned listing carries the code.
    pub fn claim(&self, listing_id: &str, claimant: &Claimant) -> Result<Listing, MarketError> {
        self.require(listing_id, ListingStatus::Available)?;
        let lock = self.listing_lock(listing_id)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
        self.require(listing_id, ListingStatus::Available)
            .inspect_err(|e| self.release_if_expired(listing_id, e))?;

        let otp = Otp::generate(&mut OsRng);
        let patch = ListingPatch::claim(otp.clone(), claimant.name.clone(), TimeStamp::new());
        let witness = Witness::new(
            listing_id.to_string(),
            claimant.name.clone(),
            WitnessKind::Claim,
        );
        let listing = self
            .listings
            .update_with(
                listing_id,
                &patch,
                Commit {
                    witness: Some(&witness),
                    ..Commit::default()
                },
            )
            .map_err(|e| Self::log_commit_failure(listing_id, e))?;

        match claimant.role {
            UserRole::Ngo => self.feed.append(
                format!("Claimed: {}. Use OTP {} at pickup.", listing.name, otp),
                NotificationKind::Alert {
                    listing_id: listing_id.to_string(),
                    otp: otp.to_string(),
                },
            ),
            _ => self.feed.append(
                format!("Claimed: {}.", listing.name),
                NotificationKind::Success,
            ),
        };

        info!(listing_id, claimant = %claimant.name, role = ?claimant.role, "listing claimed");
        Ok(listing)
    }

    /// Completes the handover of a claimed listing when `supplied` matches
    /// its code or the configured override. Credits the listing's meals to
    /// the impact ledger and returns the expired listing. The status change,
    /// the credit and the witness are committed together.
    pub fn verify_handover(
        &self,
        listing_id: &str,
        supplied: &str,
    ) -> Result<Listing, MarketError> {
        self.require(listing_id, ListingStatus::Claimed)?;
        let lock = self.listing_lock(listing_id)?;
        let _guard = lock.lock().map_err(|_| StoreError::Poisoned)?;
        let listing = self
            .require(listing_id, ListingStatus::Claimed)
            .inspect_err(|e| self.release_if_expired(listing_id, e))?;

        let code_matches = listing
            .otp
            .as_ref()
            .is_some_and(|otp| otp.matches(supplied));
        let override_used = !code_matches
            && self
                .master_override
                .as_deref()
                .is_some_and(|master| codes_equal(master, supplied));

        if !code_matches && !override_used {
            warn!(listing_id, "wrong handover code supplied");
            return Err(MarketError::WrongOtp(listing_id.to_string()));
        }

        let meals = listing.meals_value();
        let witness = Witness::new(
            listing_id.to_string(),
            listing.claimed_by.clone().unwrap_or_default(),
            WitnessKind::Handover {
                meals_saved: meals,
                master_override: override_used,
            },
        );
        let listing = self
            .impact
            .credit(meals, |ledger| {
                self.listings.update_with(
                    listing_id,
                    &ListingPatch::expire(),
                    Commit {
                        impact: Some(ledger),
                        witness: Some(&witness),
                        ..Commit::default()
                    },
                )
            })
            .map_err(|e| Self::log_commit_failure(listing_id, e))?;
        self.release_lock(listing_id);

        self.feed.append(
            format!("Handover Successful: {}. Impact recorded!", listing.name),
            NotificationKind::Impact {
                listing_id: listing_id.to_string(),
                meals_saved: meals,
            },
        );

        if override_used {
            warn!(listing_id, "handover verified with the master override");
        }
        info!(listing_id, meals, "handover verified");
        Ok(listing)
    }

    #[cfg(test)]
    fn tracked_locks(&self) -> usize {
        self.locks.lock().map(|locks| locks.len()).unwrap_or_default()
    }

    /// Newest first.
    pub fn add_review(&self, review: Review) -> Result<Review, MarketError> {
        review.validate()?;

        let _guard = self.reviews_guard.lock().map_err(|_| StoreError::Poisoned)?;
        let mut reviews = self.store.get_reviews()?;
        reviews.insert(0, review.clone());
        self.store.save_reviews(&reviews)?;

        self.feed.append(
            "Review submitted! Thank you for the feedback.",
            NotificationKind::Success,
        );
        info!(review_id = %review.id, target = %review.target_id, "review submitted");
        Ok(review)
    }

    pub fn reviews(&self) -> Result<Vec<Review>, MarketError> {
        Ok(self.store.get_reviews()?)
    }

    pub fn impact(&self) -> Result<ImpactLedger, MarketError> {
        self.impact.snapshot()
    }

    /// Newest first.
    pub fn notifications(&self) -> Vec<Notification> {
        self.feed.list()
    }

    /// Lifecycle witnesses of a listing, oldest first.
    pub fn history(&self, listing_id: &str) -> Result<Vec<Witness>, MarketError> {
        self.listings.get(listing_id)?;
        Ok(self.store.witnesses(listing_id)?)
    }

    pub fn health(&self) -> Health {
        self.store.check_health()
    }
}
