//! Error types surfaced by the handover workflow and its store
use super::lifecycle::ListingStatus;

#[derive(thiserror::Error, Debug)]
pub enum MarketError {
    #[error("Listing {0} was not found")]
    NotFound(String),
    #[error("Listing {id} is {current:?}, expected {expected:?}")]
    InvalidState {
        id: String,
        current: ListingStatus,
        expected: ListingStatus,
    },
    #[error("A listing with id {0} already exists")]
    DuplicateId(String),
    #[error("Supplied code does not match the handover code for {0}")]
    WrongOtp(String),
    #[error("Store unavailable: {0}")]
    StoreUnavailable(#[from] StoreError),
    #[error(transparent)]
    Validation(#[from] ValidationError),
}

impl MarketError {
    /// Only a mismatched code is expected in normal use; the caller prompts
    /// for another attempt.
    pub fn is_recoverable(&self) -> bool {
        matches!(self, MarketError::WrongOtp(_))
    }
}

#[derive(thiserror::Error, Debug)]
pub enum StoreError {
    #[error("sled: {0}")]
    Sled(#[from] sled::Error),
    #[error("failed to encode {0}")]
    Encode(String),
    #[error("failed to decode {0}: {1}")]
    Decode(String, minicbor::decode::Error),
    #[error("seed dataset is malformed: {0}")]
    Seed(#[from] serde_json::Error),
    #[error("store lock was poisoned")]
    Poisoned,
}

#[derive(thiserror::Error, Debug, PartialEq, Eq)]
pub enum ValidationError {
    #[error("{0} is not set")]
    Missing(&'static str),
    #[error("Rating must be between 1 and 5, got {0}")]
    Rating(u8),
    #[error("Lifecycle fields are inconsistent with status {0:?}")]
    Lifecycle(ListingStatus),
}
