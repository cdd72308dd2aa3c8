//! Batch scanner and resumable cursor.
//!
//! Owns the scan-position state machine over the catalog: one invocation
//! processes a bounded batch starting at the persisted cursor, wraps
//! around the end of the catalog transparently, and persists the next
//! starting offset. Budget exhaustion — whether signalled by the API or
//! inferred from the projected spend — interrupts the batch with the
//! cursor parked on the interrupted item, so the next run resumes exactly
//! there. Any other per-item fault is logged and skipped.

use anyhow::{bail, Result};
use tracing::{info, warn};

use crate::budget::DailyBudget;
use crate::catalog::Catalog;
use crate::error::SourceError;
use crate::evaluator::{self, PartsParams, SimpleParams};
use crate::ledger::Ledger;
use crate::source::PriceDataSource;
use crate::storage::StateStore;
use crate::types::{BatchOutcome, Condition, PartsOpportunity, SimpleOpportunity};

// ---------------------------------------------------------------------------
// Scan variants
// ---------------------------------------------------------------------------

/// Which decision rules a scan runs, with their thresholds.
#[derive(Debug, Clone)]
pub enum ScanMode {
    Simple(SimpleParams),
    Parts(PartsParams),
}

impl ScanMode {
    /// Cursor key for this mode and catalog variant. Each (mode, variant)
    /// pair owns its own resume position; the ledger is shared per mode.
    pub fn cursor_key(&self, variant: &str) -> String {
        let stem = if variant == "all" {
            "minifig_last_index".to_string()
        } else {
            format!("{variant}_minifig_last_index")
        };
        match self {
            ScanMode::Simple(_) => stem,
            ScanMode::Parts(_) => format!("parts_{stem}"),
        }
    }

    pub fn ledger_key(&self) -> &'static str {
        match self {
            ScanMode::Simple(_) => "minifig_opportunities",
            ScanMode::Parts(_) => "parts_minifig_opportunities",
        }
    }
}

// ---------------------------------------------------------------------------
// Scanner
// ---------------------------------------------------------------------------

/// One configured scan over a catalog. The external driver invokes
/// `run_batch` repeatedly; invocations against the same state files must
/// be serialized by that driver.
pub struct BatchScanner<'a> {
    source: &'a dyn PriceDataSource,
    store: &'a dyn StateStore,
    catalog: &'a Catalog,
    mode: ScanMode,
    variant: String,
    batch_size: usize,
    /// Conservative static per-item call estimate for pre-flight and
    /// mid-batch projections.
    calls_per_item: u32,
    daily_call_limit: u32,
}

impl<'a> BatchScanner<'a> {
    #[allow(clippy::too_many_arguments)]
    pub fn new(
        source: &'a dyn PriceDataSource,
        store: &'a dyn StateStore,
        catalog: &'a Catalog,
        mode: ScanMode,
        variant: impl Into<String>,
        batch_size: usize,
        calls_per_item: u32,
        daily_call_limit: u32,
    ) -> Self {
        Self {
            source,
            store,
            catalog,
            mode,
            variant: variant.into(),
            batch_size,
            calls_per_item,
            daily_call_limit,
        }
    }

    /// Process one batch. See the module docs for the interruption and
    /// resume guarantees.
    pub async fn run_batch(&self) -> Result<BatchOutcome> {
        if self.catalog.is_empty() {
            bail!("Catalog is empty — nothing to scan");
        }
        let n = self.catalog.len();
        let cursor_key = self.mode.cursor_key(&self.variant);

        let budget = DailyBudget::new(self.store, self.daily_call_limit);
        let spent_before = budget.calls_today()?;

        // Pre-flight: abort without touching any state if the projected
        // spend would blow the daily limit.
        let projected = self.batch_size as u32 * self.calls_per_item;
        if !budget.check_and_reserve(projected)? {
            info!(
                spent = spent_before,
                projected,
                limit = self.daily_call_limit,
                "Pre-flight budget check failed — done for today"
            );
            return Ok(BatchOutcome {
                opportunities_found: 0,
                items_attempted: 0,
                calls_made: 0,
                interrupted: true,
            });
        }

        self.source.reset_calls();

        // Cursor arithmetic is modulo the *current* catalog length, so
        // catalog growth or shrinkage between runs never leaves us out
        // of range.
        let start = self.store.read_cursor(&cursor_key)?.unwrap_or(0) % n;
        info!(
            variant = %self.variant,
            ledger = self.mode.ledger_key(),
            start,
            batch_size = self.batch_size,
            catalog_len = n,
            "Starting batch"
        );

        let mut simple_hits: Vec<SimpleOpportunity> = Vec::new();
        let mut parts_hits: Vec<PartsOpportunity> = Vec::new();
        let mut items_attempted = 0usize;
        let mut interrupted = false;

        'batch: for offset in 0..self.batch_size {
            let index = (start + offset) % n;
            let item_id = self.catalog.get(index);

            for condition in Condition::ALL {
                let result: Result<(), SourceError> = match &self.mode {
                    ScanMode::Simple(params) => {
                        match evaluator::evaluate_simple(self.source, item_id, condition, params)
                            .await
                        {
                            Ok(Some(opp)) => {
                                simple_hits.push(opp);
                                Ok(())
                            }
                            Ok(None) => Ok(()),
                            Err(e) => Err(e),
                        }
                    }
                    ScanMode::Parts(params) => {
                        match evaluator::evaluate_parts(self.source, item_id, condition, params)
                            .await
                        {
                            Ok(mut found) => {
                                parts_hits.append(&mut found);
                                Ok(())
                            }
                            Err(e) => Err(e),
                        }
                    }
                };

                if let Err(e) = result {
                    if e.is_budget_exhaustion() {
                        // Park the cursor on this item so the next run
                        // retries it first; never advance past it.
                        warn!(index, item_id, "Budget exhausted mid-batch, saving progress");
                        self.store.write_cursor(&cursor_key, index)?;
                        interrupted = true;
                        items_attempted += 1;
                        break 'batch;
                    }
                    warn!(
                        item_id,
                        condition = %condition,
                        error = %e,
                        "Item evaluation failed, continuing"
                    );
                }
            }

            items_attempted += 1;

            // Projection check between items: the exact spend of the
            // remaining items is unknown, so estimate conservatively and
            // stop before the limit rather than after.
            let remaining = (self.batch_size - offset - 1) as u32 * self.calls_per_item;
            let projected_total = spent_before + self.source.calls_made() + remaining;
            if remaining > 0 && projected_total > self.daily_call_limit {
                info!(
                    index,
                    projected_total,
                    limit = self.daily_call_limit,
                    "Approaching daily call limit, saving progress"
                );
                self.store.write_cursor(&cursor_key, index)?;
                interrupted = true;
                break 'batch;
            }
        }

        if !interrupted {
            let next = (start + self.batch_size) % n;
            self.store.write_cursor(&cursor_key, next)?;
        }

        // The calls are spent whether or not the ledger write below
        // succeeds; commit them first so the next pre-flight sees them.
        let calls_made = self.source.calls_made();
        budget.commit(calls_made)?;

        let ledger = Ledger::new(self.store, self.mode.ledger_key());
        let opportunities_found = match &self.mode {
            ScanMode::Simple(_) => ledger.append(std::mem::take(&mut simple_hits))?,
            ScanMode::Parts(_) => ledger.append(std::mem::take(&mut parts_hits))?,
        };

        info!(
            found = opportunities_found,
            items = items_attempted,
            calls = calls_made,
            interrupted,
            "Batch finished"
        );

        Ok(BatchOutcome {
            opportunities_found,
            items_attempted,
            calls_made,
            interrupted,
        })
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
