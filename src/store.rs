//! Persistence boundary: three keyed collections plus the witness trail
use super::error::StoreError;
use super::impact::ImpactLedger;
use super::listing::Listing;
use super::review::Review;
use super::seed;
use super::types::TimeStamp;
use super::witness::Witness;
use std::collections::BTreeMap;
use std::collections::btree_map::Entry;
use std::path::Path;
use std::sync::{Arc, Mutex};
use std::time::Instant;
use tracing::{debug, warn};

pub const LISTINGS_KEY: &str = "listings";
pub const REVIEWS_KEY: &str = "reviews";
pub const IMPACT_KEY: &str = "impact";
pub const HEALTH_KEY: &str = "health_last_ping";
pub const WITNESS_PREFIX: &str = "witness/";

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HealthStatus {
    Connected,
    Error,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Health {
    pub status: HealthStatus,
    pub latency_ms: u64,
    pub engine: String,
}

/// Writes that land together or not at all.
#[derive(Debug, Default, Clone, Copy)]
pub struct Commit<'a> {
    pub listings: Option<&'a [Listing]>,
    pub impact: Option<&'a ImpactLedger>,
    pub witness: Option<&'a Witness>,
}

/// Any backend that can hold the collections. Reads of a collection that was
/// never written return the default dataset and persist it.
pub trait Store: Send + Sync {
    fn get_listings(&self) -> Result<Vec<Listing>, StoreError>;
    fn save_listings(&self, listings: &[Listing]) -> Result<(), StoreError>;
    fn get_reviews(&self) -> Result<Vec<Review>, StoreError>;
    fn save_reviews(&self, reviews: &[Review]) -> Result<(), StoreError>;
    fn get_impact(&self) -> Result<ImpactLedger, StoreError>;
    fn save_impact(&self, impact: &ImpactLedger) -> Result<(), StoreError>;
    fn commit(&self, commit: &Commit<'_>) -> Result<(), StoreError>;
    /// Oldest first.
    fn witnesses(&self, listing_id: &str) -> Result<Vec<Witness>, StoreError>;
    fn check_health(&self) -> Health;
}

// raw byte access shared by the backends
trait KeyValue {
    fn engine(&self) -> &'static str;
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError>;
    /// Writes `value` only if `key` is absent. Returns the value already there.
    fn insert_if_absent(&self, key: &str, value: Vec<u8>)
    -> Result<Option<Vec<u8>>, StoreError>;
    /// All or nothing.
    fn apply(&self, writes: Vec<(String, Vec<u8>)>) -> Result<(), StoreError>;
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StoreError>;
}

fn encode<T: minicbor::Encode<()>>(what: &str, value: &T) -> Result<Vec<u8>, StoreError> {
    minicbor::to_vec(value).map_err(|e| StoreError::Encode(format!("{what}: {e}")))
}

fn decode<T: for<'b> minicbor::Decode<'b, ()>>(what: &str, bytes: &[u8]) -> Result<T, StoreError> {
    minicbor::decode(bytes).map_err(|e| StoreError::Decode(what.to_string(), e))
}

fn load_or_seed<T, F>(kv: &impl KeyValue, key: &str, seed: F) -> Result<T, StoreError>
where
    T: minicbor::Encode<()> + for<'b> minicbor::Decode<'b, ()>,
    F: FnOnce() -> Result<T, StoreError>,
{
    if let Some(bytes) = kv.get(key)? {
        return decode(key, &bytes);
    }

    let value = seed()?;
    match kv.insert_if_absent(key, encode(key, &value)?)? {
        None => {
            debug!(key, engine = kv.engine(), "collection absent, wrote default dataset");
            Ok(value)
        }
        Some(existing) => decode(key, &existing),
    }
}

fn save<T>(kv: &impl KeyValue, key: &str, value: &T) -> Result<(), StoreError>
where
    T: minicbor::Encode<()>,
{
    kv.apply(vec![(key.to_string(), encode(key, value)?)])?;
    debug!(key, engine = kv.engine(), "collection saved");
    Ok(())
}

// the length prefix keeps "a" from matching the witnesses of "a/b"
fn witness_prefix(listing_id: &str) -> String {
    format!("{WITNESS_PREFIX}{}:{listing_id}/", listing_id.len())
}

// keys sort by listing, then by time, so a prefix scan yields oldest first
fn witness_key(witness: &Witness, hash: &str) -> String {
    let nanos = witness
        .timestamp
        .to_datetime_utc()
        .timestamp_nanos_opt()
        .unwrap_or_default()
        .max(0);
    format!("{}{:020}/{}", witness_prefix(&witness.listing_id), nanos, hash)
}

fn apply_commit(kv: &impl KeyValue, commit: &Commit<'_>) -> Result<(), StoreError> {
    let mut writes = Vec::with_capacity(3);
    if let Some(listings) = commit.listings {
        writes.push((LISTINGS_KEY.to_string(), encode(LISTINGS_KEY, &listings)?));
    }
    if let Some(impact) = commit.impact {
        writes.push((IMPACT_KEY.to_string(), encode(IMPACT_KEY, impact)?));
    }
    if let Some(witness) = commit.witness {
        let (hash, cbor) = witness
            .build()
            .map_err(|e| StoreError::Encode(format!("witness: {e}")))?;
        writes.push((witness_key(witness, &hash), cbor));
    }

    let count = writes.len();
    kv.apply(writes)?;
    debug!(count, engine = kv.engine(), "commit applied");
    Ok(())
}

fn witnesses(kv: &impl KeyValue, listing_id: &str) -> Result<Vec<Witness>, StoreError> {
    kv.scan_prefix(&witness_prefix(listing_id))?
        .iter()
        .map(|bytes| decode(WITNESS_PREFIX, bytes))
        .collect()
}

fn check_health(kv: &impl KeyValue) -> Health {
    let start = Instant::now();
    let stamp = TimeStamp::new().to_datetime_utc().to_rfc3339();

    let probe = kv
        .apply(vec![(HEALTH_KEY.to_string(), stamp.clone().into_bytes())])
        .and_then(|_| kv.get(HEALTH_KEY));

    match probe {
        Ok(Some(read)) if read == stamp.as_bytes() => Health {
            status: HealthStatus::Connected,
            latency_ms: u64::try_from(start.elapsed().as_millis()).unwrap_or(u64::MAX),
            engine: kv.engine().to_string(),
        },
        Ok(_) => {
            warn!(engine = kv.engine(), "health probe read back a different value");
            unhealthy()
        }
        Err(e) => {
            warn!(engine = kv.engine(), error = %e, "health probe failed");
            unhealthy()
        }
    }
}

fn unhealthy() -> Health {
    Health {
        status: HealthStatus::Error,
        latency_ms: 0,
        engine: "None".to_string(),
    }
}

macro_rules! impl_store {
    ($backend:ty) => {
        impl Store for $backend {
            fn get_listings(&self) -> Result<Vec<Listing>, StoreError> {
                load_or_seed(self, LISTINGS_KEY, seed::listings)
            }
            fn save_listings(&self, listings: &[Listing]) -> Result<(), StoreError> {
                save(self, LISTINGS_KEY, &listings)
            }
            fn get_reviews(&self) -> Result<Vec<Review>, StoreError> {
                load_or_seed(self, REVIEWS_KEY, seed::reviews)
            }
            fn save_reviews(&self, reviews: &[Review]) -> Result<(), StoreError> {
                save(self, REVIEWS_KEY, &reviews)
            }
            fn get_impact(&self) -> Result<ImpactLedger, StoreError> {
                load_or_seed(self, IMPACT_KEY, seed::impact)
            }
            fn save_impact(&self, impact: &ImpactLedger) -> Result<(), StoreError> {
                save(self, IMPACT_KEY, impact)
            }
            fn commit(&self, commit: &Commit<'_>) -> Result<(), StoreError> {
                apply_commit(self, commit)
            }
            fn witnesses(&self, listing_id: &str) -> Result<Vec<Witness>, StoreError> {
                witnesses(self, listing_id)
            }
            fn check_health(&self) -> Health {
                check_health(self)
            }
        }
    };
}

/// Embedded on-disk store. Each collection is one CBOR value in the default
/// tree, next to the witness entries.
pub struct SledStore {
    db: Arc<sled::Db>,
}

impl SledStore {
    pub fn new(db: Arc<sled::Db>) -> Self {
        Self { db }
    }

    pub fn open(path: impl AsRef<Path>) -> Result<Self, StoreError> {
        Ok(Self::new(Arc::new(sled::open(path)?)))
    }

    pub fn flush(&self) -> Result<(), StoreError> {
        self.db.flush()?;
        Ok(())
    }
}

impl KeyValue for SledStore {
    fn engine(&self) -> &'static str {
        "Sled Embedded Engine"
    }
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        Ok(self.db.get(key.as_bytes())?.map(|value| value.to_vec()))
    }
    fn insert_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        match self
            .db
            .compare_and_swap(key.as_bytes(), None::<&[u8]>, Some(value))?
        {
            Ok(()) => Ok(None),
            Err(conflict) => Ok(conflict.current.map(|current| current.to_vec())),
        }
    }
    fn apply(&self, writes: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let mut batch = sled::Batch::default();
        for (key, value) in writes {
            batch.insert(key.as_bytes(), value);
        }
        self.db.apply_batch(batch)?;
        Ok(())
    }
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        self.db
            .scan_prefix(prefix.as_bytes())
            .values()
            .map(|value| value.map(|v| v.to_vec()).map_err(StoreError::from))
            .collect()
    }
}

impl_store!(SledStore);

/// In-process store holding the same encoded values as [`SledStore`].
#[derive(Default)]
pub struct MemoryStore {
    blobs: Mutex<BTreeMap<String, Vec<u8>>>,
}

impl MemoryStore {
    /// Seeds the default dataset on first access.
    pub fn new() -> Self {
        Self::default()
    }

    /// Starts with empty collections and zeroed counters instead of the
    /// default dataset.
    pub fn empty() -> Self {
        let mut blobs = BTreeMap::new();
        let empty_listings: Vec<Listing> = Vec::new();
        let empty_reviews: Vec<Review> = Vec::new();

        // encoding these values cannot fail
        if let (Ok(listings), Ok(reviews), Ok(impact)) = (
            encode(LISTINGS_KEY, &empty_listings),
            encode(REVIEWS_KEY, &empty_reviews),
            encode(IMPACT_KEY, &ImpactLedger::default()),
        ) {
            blobs.insert(LISTINGS_KEY.to_string(), listings);
            blobs.insert(REVIEWS_KEY.to_string(), reviews);
            blobs.insert(IMPACT_KEY.to_string(), impact);
        }
        Self {
            blobs: Mutex::new(blobs),
        }
    }
}

impl KeyValue for MemoryStore {
    fn engine(&self) -> &'static str {
        "In-Memory Engine"
    }
    fn get(&self, key: &str) -> Result<Option<Vec<u8>>, StoreError> {
        let blobs = self.blobs.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs.get(key).cloned())
    }
    fn insert_if_absent(
        &self,
        key: &str,
        value: Vec<u8>,
    ) -> Result<Option<Vec<u8>>, StoreError> {
        let mut blobs = self.blobs.lock().map_err(|_| StoreError::Poisoned)?;
        match blobs.entry(key.to_string()) {
            Entry::Occupied(existing) => Ok(Some(existing.get().clone())),
            Entry::Vacant(slot) => {
                slot.insert(value);
                Ok(None)
            }
        }
    }
    fn apply(&self, writes: Vec<(String, Vec<u8>)>) -> Result<(), StoreError> {
        let mut blobs = self.blobs.lock().map_err(|_| StoreError::Poisoned)?;
        blobs.extend(writes);
        Ok(())
    }
    fn scan_prefix(&self, prefix: &str) -> Result<Vec<Vec<u8>>, StoreError> {
        let blobs = self.blobs.lock().map_err(|_| StoreError::Poisoned)?;
        Ok(blobs
            .range(prefix.to_string()..)
            .take_while(|(key, _)| key.starts_with(prefix))
            .map(|(_, value)| value.clone())
            .collect())
    }
}

impl_store!(MemoryStore);
