//! Default dataset written on first access to an empty store
use super::error::StoreError;
use super::impact::ImpactLedger;
use super::listing::Listing;
use super::review::Review;
use serde::Deserialize;

const SEED_JSON: &str = include_str!("../data/seed.json");

#[derive(Debug, Deserialize)]
pub struct Seed {
    pub listings: Vec<Listing>,
    pub reviews: Vec<Review>,
    pub impact: ImpactLedger,
}

impl Seed {
    pub fn load() -> Result<Self, StoreError> {
        Ok(serde_json::from_str(SEED_JSON)?)
    }
}

pub fn listings() -> Result<Vec<Listing>, StoreError> {
    Ok(Seed::load()?.listings)
}

pub fn reviews() -> Result<Vec<Review>, StoreError> {
    Ok(Seed::load()?.reviews)
}

pub fn impact() -> Result<ImpactLedger, StoreError> {
    Ok(Seed::load()?.impact)
}
