//! Cumulative redistribution counters
use super::error::{MarketError, StoreError};
use super::store::Store;
use serde::{Deserialize, Serialize};
use std::sync::{Arc, Mutex};
use tracing::debug;

// Counters are independent. Only meals saved moves on handover.
#[derive(
    minicbor::Encode,
    minicbor::Decode,
    Serialize,
    Deserialize,
    Debug,
    Clone,
    Copy,
    Default,
    PartialEq,
    Eq,
)]
#[serde(rename_all = "camelCase")]
pub struct ImpactLedger {
    #[n(0)]
    pub meals_saved: u64,
    #[n(1)]
    pub co2_reduced: u64,
    #[n(2)]
    pub water_saved: u64,
    #[n(3)]
    pub people_served: u64,
}

pub struct ImpactService {
    store: Arc<dyn Store>,
    guard: Mutex<()>,
}

impl ImpactService {
    pub fn new(store: Arc<dyn Store>) -> Self {
        Self {
            store,
            guard: Mutex::new(()),
        }
    }

    pub fn snapshot(&self) -> Result<ImpactLedger, MarketError> {
        Ok(self.store.get_impact()?)
    }

    /// Adds to meals saved and returns the new ledger. Saturates rather than
    /// wrapping so the counter never decreases.
    pub fn increment(&self, meals_delta: u64) -> Result<ImpactLedger, MarketError> {
        self.credit(meals_delta, |ledger| {
            self.store.save_impact(ledger)?;
            Ok(*ledger)
        })
    }

    /// Computes the credited ledger and hands it to `write`, which must
    /// persist it. Nothing is counted if `write` fails.
    pub(crate) fn credit<T>(
        &self,
        meals_delta: u64,
        write: impl FnOnce(&ImpactLedger) -> Result<T, MarketError>,
    ) -> Result<T, MarketError> {
        let _guard = self.guard.lock().map_err(|_| StoreError::Poisoned)?;

        let mut ledger = self.store.get_impact()?;
        ledger.meals_saved = ledger.meals_saved.saturating_add(meals_delta);
        let written = write(&ledger)?;

        debug!(meals_delta, meals_saved = ledger.meals_saved, "impact ledger incremented");
        Ok(written)
    }
}
