use anyhow::Context;
use std::sync::Arc;
use zerocrumbs_handover::{
    config::Config,
    error::MarketError,
    lifecycle::ListingStatus,
    listing::ListingDraft,
    notification::NotificationKind,
    service::{Claimant, HandoverService},
    store::SledStore,
    types::{DonorType, FoodCategory, FreshnessStatus, TimeStamp, UserRole},
};

use tempfile::{TempDir, tempdir}; // Use for test db cleanup.

// Sled holds a file lock on its directory, so each test opens its own
// database under a temp dir that is removed on drop.
fn open_service(name: &str) -> anyhow::Result<(TempDir, HandoverService)> {
    let temp_dir = tempdir()?;
    let store = SledStore::open(temp_dir.path().join(name))?;
    let service = HandoverService::new(Arc::new(store), &Config::default());
    Ok((temp_dir, service))
}

fn post_l1(service: &HandoverService) -> anyhow::Result<()> {
    let listing = ListingDraft::new()
        .set_name("Gourmet Vegetable Lasagna")
        .set_category(FoodCategory::Cooked)
        .set_quantity("12 Large Servings")
        .set_servings(12)
        .set_donor("Olive Garden Bistro", DonorType::Restaurant)
        .set_expiry_date(TimeStamp::new())
        .set_freshness(FreshnessStatus::Urgent)
        .set_location("452 Broadway, NY", 40.7128, -74.0060)
        .finalise_with_id("L1".to_string())?;

    service.create_listing(listing).context("Listing failed on create: ")?;
    Ok(())
}

fn ngo_a() -> Claimant {
    Claimant::new("NGO_A", UserRole::Ngo)
}

// a six digit code that is neither the real one nor the override
fn wrong_code(real: &str) -> &'static str {
    if real == "000001" { "000002" } else { "000001" }
}

#[test]
fn claim_issues_six_digit_code() -> anyhow::Result<()> {
    let (_dir, service) = open_service("claim.db")?;
    post_l1(&service)?;

    let listing = service.claim("L1", &ngo_a())?;

    assert_eq!(listing.status, ListingStatus::Claimed);
    assert_eq!(listing.claimed_by.as_deref(), Some("NGO_A"));
    assert!(listing.claimed_at.is_some());

    let otp = listing.otp.context("claimed listing has no otp")?;
    assert_eq!(otp.as_str().len(), 6);
    assert!(otp.as_str().chars().all(|c| c.is_ascii_digit()));

    Ok(())
}

#[test]
fn wrong_code_leaves_listing_claimed() -> anyhow::Result<()> {
    let (_dir, service) = open_service("wrong_code.db")?;
    post_l1(&service)?;
    let claimed = service.claim("L1", &ngo_a())?;
    let real = claimed.otp.clone().context("missing otp")?;
    let before = service.impact()?;

    let result = service.verify_handover("L1", wrong_code(real.as_str()));

    match result {
        Err(e @ MarketError::WrongOtp(_)) => assert!(e.is_recoverable()),
        other => panic!("expected WrongOtp, got {other:?}"),
    }
    assert_eq!(service.listing("L1")?, claimed);
    assert_eq!(service.impact()?, before);

    Ok(())
}

#[test]
fn real_code_expires_listing_and_credits_meals() -> anyhow::Result<()> {
    let (_dir, service) = open_service("verify.db")?;
    post_l1(&service)?;
    let claimed = service.claim("L1", &ngo_a())?;
    let otp = claimed.otp.context("missing otp")?;
    let before = service.impact()?;

    let listing = service.verify_handover("L1", otp.as_str())?;

    assert_eq!(listing.status, ListingStatus::Expired);
    assert_eq!(service.impact()?.meals_saved, before.meals_saved + 12);

    // claim fields are kept once expired
    assert_eq!(listing.otp.as_ref(), Some(&otp));
    assert_eq!(listing.claimed_by.as_deref(), Some("NGO_A"));

    let latest = &service.notifications()[0];
    assert_eq!(
        latest.kind,
        NotificationKind::Impact {
            listing_id: "L1".into(),
            meals_saved: 12
        }
    );

    Ok(())
}

#[test]
fn repeated_verification_is_invalid_state() -> anyhow::Result<()> {
    let (_dir, service) = open_service("repeat.db")?;
    post_l1(&service)?;
    let otp = service.claim("L1", &ngo_a())?.otp.context("missing otp")?;
    service.verify_handover("L1", otp.as_str())?;
    let after_first = service.impact()?;
    let feed_len = service.notifications().len();

    let result = service.verify_handover("L1", otp.as_str());

    assert!(matches!(
        result,
        Err(MarketError::InvalidState {
            current: ListingStatus::Expired,
            expected: ListingStatus::Claimed,
            ..
        })
    ));
    assert_eq!(service.impact()?, after_first);
    assert_eq!(service.notifications().len(), feed_len);

    Ok(())
}

#[test]
fn claiming_a_claimed_listing_changes_nothing() -> anyhow::Result<()> {
    let (_dir, service) = open_service("double_claim.db")?;
    post_l1(&service)?;
    let first = service.claim("L1", &ngo_a())?;

    let result = service.claim("L1", &Claimant::new("NGO_B", UserRole::Ngo));

    assert!(matches!(
        result,
        Err(MarketError::InvalidState {
            current: ListingStatus::Claimed,
            ..
        })
    ));
    assert_eq!(service.listing("L1")?, first);

    Ok(())
}

#[test]
fn feed_holds_fifteen_entries() -> anyhow::Result<()> {
    let (_dir, service) = open_service("feed.db")?;

    // the welcome entry plus fifteen postings
    for i in 0..15 {
        let listing = ListingDraft::new()
            .set_name(&format!("Batch {i}"))
            .set_category(FoodCategory::Bakery)
            .set_quantity("4 Loaves")
            .set_donor("Hearth & Stone Bakery", DonorType::Restaurant)
            .set_expiry_date(TimeStamp::new())
            .set_freshness(FreshnessStatus::Fresh)
            .set_location("12 Bakery Ln, Brooklyn", 40.7306, -73.9352)
            .validate_and_finalise()?;
        service.create_listing(listing)?;
    }

    let feed = service.notifications();
    assert_eq!(feed.len(), 15);
    assert!(feed.iter().all(|n| !n.text.starts_with("Welcome")));
    assert_eq!(feed[0].text, "Surplus Food Posted: \"Batch 14\" is now live.");

    Ok(())
}

#[test]
fn seeded_listing_goes_through_handover() -> anyhow::Result<()> {
    let (_dir, service) = open_service("seeded.db")?;

    let listings = service.listings()?;
    assert_eq!(listings.len(), 3);

    let claimed = service.claim("2", &Claimant::new("Community Kitchen NY", UserRole::Ngo))?;
    service.verify_handover("2", "000000")?;

    assert_eq!(service.listing("2")?.status, ListingStatus::Expired);
    assert_eq!(service.impact()?.meals_saved, 14_280 + 16);
    assert_eq!(claimed.servings, Some(16));

    Ok(())
}

#[test]
fn state_survives_reopening_the_database() -> anyhow::Result<()> {
    let temp_dir = tempdir()?;
    let db_path = temp_dir.path().join("reopen.db");

    {
        let store = Arc::new(SledStore::open(&db_path)?);
        let service = HandoverService::new(store.clone(), &Config::default());
        post_l1(&service)?;
        service.claim("L1", &ngo_a())?;
        store.flush()?;
    }

    let service = HandoverService::new(Arc::new(SledStore::open(&db_path)?), &Config::default());
    let listing = service.listing("L1")?;
    assert_eq!(listing.status, ListingStatus::Claimed);
    assert_eq!(service.history("L1")?.len(), 2);

    Ok(())
}
