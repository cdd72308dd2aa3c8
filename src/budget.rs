//! Daily call-budget tracking.
//!
//! The marketplace allows a fixed number of API calls per calendar day,
//! shared across every scan variant run that day. The counter is a
//! persisted (date, count) pair; a stored date other than today means the
//! quota has rolled over and the count restarts at zero.

use anyhow::Result;
use chrono::{NaiveDate, Utc};
use tracing::{debug, info};

use crate::storage::StateStore;
use crate::types::BudgetCounter;

/// Tracker over the persisted daily counter.
///
/// Pre-flight projections use a conservative static per-item estimate
/// (the exact spend is only known after a batch runs); `commit` records
/// the measured count from the data source.
pub struct DailyBudget<'a> {
    store: &'a dyn StateStore,
    limit: u32,
}

impl<'a> DailyBudget<'a> {
    pub fn new(store: &'a dyn StateStore, limit: u32) -> Self {
        Self { store, limit }
    }

    fn today() -> NaiveDate {
        Utc::now().date_naive()
    }

    /// Calls already spent today. Zero when no counter is stored or the
    /// stored date is not today.
    pub fn calls_today(&self) -> Result<u32> {
        let today = Self::today();
        Ok(match self.store.read_budget()? {
            Some(counter) if counter.date == today => counter.count,
            Some(counter) => {
                debug!(stored = %counter.date, %today, "Budget counter rolled over");
                0
            }
            None => 0,
        })
    }

    /// Whether `projected` additional calls fit under the daily limit.
    /// Pure check — nothing is persisted until `commit`.
    pub fn check_and_reserve(&self, projected: u32) -> Result<bool> {
        let spent = self.calls_today()?;
        let allowed = spent + projected <= self.limit;
        if !allowed {
            info!(
                spent,
                projected,
                limit = self.limit,
                "Projected batch would exceed daily call budget"
            );
        }
        Ok(allowed)
    }

    /// Add the measured call count for a finished run to today's total
    /// and persist it.
    pub fn commit(&self, actual: u32) -> Result<()> {
        let today = Self::today();
        let total = self.calls_today()? + actual;
        self.store.write_budget(BudgetCounter {
            date: today,
            count: total,
        })?;
        debug!(actual, total, "Budget counter committed");
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
