use tracing_subscriber::EnvFilter;
use zerocrumbs_handover::{
    config::Config,
    listing::ListingDraft,
    service::{Claimant, HandoverService},
    types::{DonorType, FoodCategory, FreshnessStatus, RecipientGroup, TimeStamp, UserRole},
};

fn main() -> anyhow::Result<()> {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    tracing_subscriber::fmt().with_env_filter(filter).init();

    let config = Config::load()?;
    let service = HandoverService::open(&config)?;

    let health = service.health();
    println!("{:?} via {} ({} ms)", health.status, health.engine, health.latency_ms);

    let listing = ListingDraft::new()
        .set_name("Vegetable Biryani")
        .set_category(FoodCategory::Cooked)
        .set_quantity("20 Boxes")
        .set_servings(20)
        .set_donor("Grand Plaza Hotel", DonorType::Hotel)
        .set_expiry_date(TimeStamp::new())
        .set_freshness(FreshnessStatus::Fresh)
        .set_location("1 Plaza Way, NY", 40.7614, -73.9776)
        .add_target_group(RecipientGroup::General)
        .validate_and_finalise()?;
    let listing = service.create_listing(listing)?;

    let claimed = service.claim(&listing.id, &Claimant::new("City Harvest NGO", UserRole::Ngo))?;
    let otp = claimed
        .otp
        .ok_or_else(|| anyhow::anyhow!("claimed listing has no pickup code"))?;

    service.verify_handover(&listing.id, otp.as_str())?;

    for note in service.notifications() {
        println!("[{:?}] {}", note.category(), note.text);
    }
    println!("{:#?}", service.impact()?);
    println!("{:#?}", service.history(&listing.id)?);

    Ok(())
}
