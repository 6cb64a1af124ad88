//! Listing records, the draft builder and partial updates
use super::error::ValidationError;
use super::lifecycle::{ListingStatus, claim_fields_consistent};
use super::otp::Otp;
use super::types::{
    DonorType, FoodCategory, FreshnessStatus, Location, NutritionInfo, RecipientGroup, TimeStamp,
};
use super::utils::{LISTING_HRP, new_uuid_to_bech32};
use serde::{Deserialize, Serialize};

#[derive(minicbor::Encode, minicbor::Decode, Serialize, Deserialize, Debug, Clone, PartialEq)]
#[serde(rename_all = "camelCase")]
pub struct Listing {
    #[n(0)]
    pub id: String,
    #[n(1)]
    pub name: String,
    #[n(2)]
    pub category: FoodCategory,
    #[n(3)]
    pub quantity: String, // free text, e.g. "12 Large Servings"
    #[n(4)]
    pub servings: Option<u32>,
    #[n(5)]
    pub donor_name: String,
    #[n(6)]
    pub donor_type: DonorType,
    #[n(7)]
    pub expiry_date: TimeStamp,
    #[n(8)]
    pub prepared_date: Option<TimeStamp>,
    #[n(9)]
    pub freshness: FreshnessStatus,
    #[n(10)]
    pub status: ListingStatus,
    #[n(11)]
    pub location: Location,
    #[n(12)]
    #[serde(default)]
    pub tags: Vec<String>,
    #[n(13)]
    #[serde(default)]
    pub nutrition: NutritionInfo,
    #[n(14)]
    pub image_url: Option<String>,
    #[n(15)]
    pub created_at: TimeStamp,
    #[n(16)]
    pub available_until: Option<String>,
    #[n(17)]
    #[serde(default)]
    pub verified: bool,
    #[n(18)]
    #[serde(default)]
    pub target_groups: Vec<RecipientGroup>,
    #[n(19)]
    #[serde(default)]
    pub otp: Option<Otp>,
    #[n(20)]
    #[serde(default)]
    pub claimed_by: Option<String>,
    #[n(21)]
    #[serde(default)]
    pub claimed_at: Option<TimeStamp>,
}

impl Listing {
    /// Meals credited on handover. Unset or zero servings count as one.
    pub fn meals_value(&self) -> u64 {
        u64::from(self.servings.unwrap_or(1).max(1))
    }

    pub fn validate(&self) -> Result<(), ValidationError> {
        if self.id.trim().is_empty() {
            return Err(ValidationError::Missing("id"));
        }
        if self.name.trim().is_empty() {
            return Err(ValidationError::Missing("name"));
        }
        if self.donor_name.trim().is_empty() {
            return Err(ValidationError::Missing("donor name"));
        }
        let present = [
            self.otp.is_some(),
            self.claimed_by.is_some(),
            self.claimed_at.is_some(),
        ];
        if !claim_fields_consistent(self.status, present) {
            return Err(ValidationError::Lifecycle(self.status));
        }
        Ok(())
    }
}

// used for constructing new listings before they are posted
#[derive(Debug, Default)]
pub struct ListingDraft {
    name: Option<String>,
    category: Option<FoodCategory>,
    quantity: Option<String>,
    servings: Option<u32>,
    donor_name: Option<String>,
    donor_type: Option<DonorType>,
    expiry_date: Option<TimeStamp>,
    prepared_date: Option<TimeStamp>,
    freshness: Option<FreshnessStatus>,
    location: Option<Location>,
    tags: Vec<String>,
    nutrition: NutritionInfo,
    image_url: Option<String>,
    available_until: Option<String>,
    target_groups: Vec<RecipientGroup>,
}

impl ListingDraft {
    pub fn new() -> Self {
        Self::default()
    }
    pub fn set_name(mut self, name: &str) -> Self {
        self.name = Some(name.to_string());
        self
    }
    pub fn set_category(mut self, category: FoodCategory) -> Self {
        self.category = Some(category);
        self
    }
    pub fn set_quantity(mut self, quantity: &str) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }
    pub fn set_servings(mut self, servings: u32) -> Self {
        self.servings = Some(servings);
        self
    }
    pub fn set_donor(mut self, name: &str, kind: DonorType) -> Self {
        self.donor_name = Some(name.to_string());
        self.donor_type = Some(kind);
        self
    }
    pub fn set_expiry_date(mut self, date: TimeStamp) -> Self {
        self.expiry_date = Some(date);
        self
    }
    pub fn set_prepared_date(mut self, date: TimeStamp) -> Self {
        self.prepared_date = Some(date);
        self
    }
    pub fn set_freshness(mut self, freshness: FreshnessStatus) -> Self {
        self.freshness = Some(freshness);
        self
    }
    pub fn set_location(mut self, address: &str, lat: f64, lng: f64) -> Self {
        self.location = Some(Location {
            address: address.to_string(),
            lat,
            lng,
        });
        self
    }
    pub fn add_tag(mut self, tag: &str) -> Self {
        self.tags.push(tag.to_string());
        self
    }
    pub fn set_nutrition(mut self, nutrition: NutritionInfo) -> Self {
        self.nutrition = nutrition;
        self
    }
    pub fn set_image_url(mut self, url: &str) -> Self {
        self.image_url = Some(url.to_string());
        self
    }
    pub fn set_available_until(mut self, until: &str) -> Self {
        self.available_until = Some(until.to_string());
        self
    }
    pub fn add_target_group(mut self, group: RecipientGroup) -> Self {
        if !self.target_groups.contains(&group) {
            self.target_groups.push(group);
        }
        self
    }

    /// Checks the required fields and produces an `Available` listing under
    /// the given id.
    pub fn finalise_with_id(self, id: String) -> Result<Listing, ValidationError> {
        let listing = Listing {
            id,
            name: self.name.ok_or(ValidationError::Missing("name"))?,
            category: self.category.ok_or(ValidationError::Missing("category"))?,
            quantity: self.quantity.ok_or(ValidationError::Missing("quantity"))?,
            servings: self.servings,
            donor_name: self.donor_name.ok_or(ValidationError::Missing("donor"))?,
            donor_type: self.donor_type.ok_or(ValidationError::Missing("donor"))?,
            expiry_date: self
                .expiry_date
                .ok_or(ValidationError::Missing("expiry date"))?,
            prepared_date: self.prepared_date,
            freshness: self.freshness.ok_or(ValidationError::Missing("freshness"))?,
            status: ListingStatus::Available,
            location: self.location.ok_or(ValidationError::Missing("location"))?,
            tags: self.tags,
            nutrition: self.nutrition,
            image_url: self.image_url,
            created_at: TimeStamp::new(),
            available_until: self.available_until,
            verified: false,
            target_groups: self.target_groups,
            otp: None,
            claimed_by: None,
            claimed_at: None,
        };
        listing.validate()?;
        Ok(listing)
    }

    /// Like [`finalise_with_id`](Self::finalise_with_id) with a freshly
    /// generated `listing_` id.
    pub fn validate_and_finalise(self) -> anyhow::Result<Listing> {
        let id = new_uuid_to_bech32(LISTING_HRP)?;
        Ok(self.finalise_with_id(id)?)
    }
}

/// Fields to change on an existing listing. Unset fields keep their value.
/// Claim fields are only set through [`ListingPatch::claim`].
#[derive(Debug, Default, Clone, PartialEq)]
pub struct ListingPatch {
    pub name: Option<String>,
    pub quantity: Option<String>,
    pub servings: Option<u32>,
    pub freshness: Option<FreshnessStatus>,
    pub expiry_date: Option<TimeStamp>,
    pub verified: Option<bool>,
    pub status: Option<ListingStatus>,
    pub(crate) otp: Option<Otp>,
    pub(crate) claimed_by: Option<String>,
    pub(crate) claimed_at: Option<TimeStamp>,
}

impl ListingPatch {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn claim(otp: Otp, claimed_by: String, claimed_at: TimeStamp) -> Self {
        Self {
            status: Some(ListingStatus::Claimed),
            otp: Some(otp),
            claimed_by: Some(claimed_by),
            claimed_at: Some(claimed_at),
            ..Self::default()
        }
    }

    pub fn expire() -> Self {
        Self {
            status: Some(ListingStatus::Expired),
            ..Self::default()
        }
    }

    pub fn set_servings(mut self, servings: u32) -> Self {
        self.servings = Some(servings);
        self
    }

    pub fn touches_claim(&self) -> bool {
        self.otp.is_some() || self.claimed_by.is_some() || self.claimed_at.is_some()
    }

    pub fn set_quantity(mut self, quantity: &str) -> Self {
        self.quantity = Some(quantity.to_string());
        self
    }

    pub fn set_freshness(mut self, freshness: FreshnessStatus) -> Self {
        self.freshness = Some(freshness);
        self
    }

    pub fn set_verified(mut self, verified: bool) -> Self {
        self.verified = Some(verified);
        self
    }

    pub fn apply(&self, listing: &Listing) -> Listing {
        let mut next = listing.clone();

        if let Some(name) = &self.name {
            next.name = name.clone();
        }
        if let Some(quantity) = &self.quantity {
            next.quantity = quantity.clone();
        }
        if let Some(servings) = self.servings {
            next.servings = Some(servings);
        }
        if let Some(freshness) = self.freshness {
            next.freshness = freshness;
        }
        if let Some(expiry) = self.expiry_date {
            next.expiry_date = expiry;
        }
        if let Some(verified) = self.verified {
            next.verified = verified;
        }
        if let Some(status) = self.status {
            next.status = status;
        }
        if let Some(otp) = &self.otp {
            next.otp = Some(otp.clone());
        }
        if let Some(claimed_by) = &self.claimed_by {
            next.claimed_by = Some(claimed_by.clone());
        }
        if let Some(claimed_at) = self.claimed_at {
            next.claimed_at = Some(claimed_at);
        }
        next
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;

    pub(crate) fn sample_draft() -> ListingDraft {
        ListingDraft::new()
            .set_name("Gourmet Vegetable Lasagna")
            .set_category(FoodCategory::Cooked)
            .set_quantity("12 Large Servings")
            .set_servings(12)
            .set_donor("Olive Garden Bistro", DonorType::Restaurant)
            .set_expiry_date(TimeStamp::new())
            .set_freshness(FreshnessStatus::Urgent)
            .set_location("452 Broadway, NY", 40.7128, -74.0060)
            .add_target_group(RecipientGroup::General)
    }

    #[test]
    fn draft_finalises_to_available_listing() {
        let listing = sample_draft().validate_and_finalise().unwrap();

        assert!(listing.id.starts_with("listing_1"));
        assert_eq!(listing.status, ListingStatus::Available);
        assert!(listing.otp.is_none());
        assert!(listing.claimed_by.is_none());
        assert!(listing.claimed_at.is_none());
    }

    #[test]
    fn draft_rejects_missing_fields() {
        let draft = ListingDraft::new().set_name("Bread");

        assert_eq!(
            draft.finalise_with_id("L1".into()),
            Err(ValidationError::Missing("category"))
        );
    }

    #[test]
    fn meals_value_defaults_to_one() {
        let mut listing = sample_draft().finalise_with_id("L1".into()).unwrap();
        assert_eq!(listing.meals_value(), 12);

        listing.servings = None;
        assert_eq!(listing.meals_value(), 1);

        listing.servings = Some(0);
        assert_eq!(listing.meals_value(), 1);
    }

    #[test]
    fn patch_only_touches_named_fields() {
        let listing = sample_draft().finalise_with_id("L1".into()).unwrap();
        let patched = ListingPatch::new()
            .set_quantity("10 Large Servings")
            .apply(&listing);

        assert_eq!(patched.quantity, "10 Large Servings");
        assert_eq!(patched.servings, listing.servings);
        assert_eq!(patched.name, listing.name);
        assert_eq!(patched.status, listing.status);
    }

    #[test]
    fn claimed_listing_without_otp_is_inconsistent() {
        let mut listing = sample_draft().finalise_with_id("L1".into()).unwrap();
        listing.status = ListingStatus::Claimed;
        listing.claimed_by = Some("City Harvest".into());

        assert_eq!(
            listing.validate(),
            Err(ValidationError::Lifecycle(ListingStatus::Claimed))
        );
    }
}
