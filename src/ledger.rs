//! Opportunity ledger.
//!
//! Append/merge-dedupe sink for scan findings. Each ledger is one flat
//! CSV table behind the state store, keyed on (item id, condition):
//! incoming records replace existing rows with the same key, surviving
//! rows are kept unchanged, and the result is written back whole.

use anyhow::{Context, Result};
use serde::de::DeserializeOwned;
use serde::Serialize;
use std::collections::HashSet;
use tracing::info;

use crate::storage::StateStore;
use crate::types::OpportunityRecord;

/// Merge `incoming` into `existing`: rows sharing a key with an incoming
/// record are superseded; the rest are retained, then incoming rows are
/// appended in order. A wrapped batch can evaluate the same item twice,
/// so duplicate keys within `incoming` collapse to the last record.
pub fn upsert<T: OpportunityRecord>(existing: Vec<T>, incoming: Vec<T>) -> Vec<T> {
    let mut latest: Vec<T> = Vec::with_capacity(incoming.len());
    for record in incoming {
        latest.retain(|r| r.key() != record.key());
        latest.push(record);
    }

    let superseded: HashSet<_> = latest.iter().map(|r| r.key()).collect();

    let mut merged: Vec<T> = existing
        .into_iter()
        .filter(|r| !superseded.contains(&r.key()))
        .collect();
    merged.extend(latest);
    merged
}

/// One persisted opportunity table (simple and parts mode each get their
/// own).
pub struct Ledger<'a> {
    store: &'a dyn StateStore,
    key: String,
}

impl<'a> Ledger<'a> {
    pub fn new(store: &'a dyn StateStore, key: impl Into<String>) -> Self {
        Self {
            store,
            key: key.into(),
        }
    }

    /// Load all rows. An absent table is an empty ledger; a corrupt row
    /// is an error — silently dropping rows here would lose findings on
    /// the next write-back.
    pub fn load<T: DeserializeOwned>(&self) -> Result<Vec<T>> {
        let Some(raw) = self.store.read_table(&self.key)? else {
            return Ok(Vec::new());
        };

        let mut reader = csv::Reader::from_reader(raw.as_bytes());
        let mut rows = Vec::new();
        for row in reader.deserialize() {
            rows.push(row.with_context(|| format!("Corrupt ledger row in {}", self.key))?);
        }
        Ok(rows)
    }

    /// Upsert `incoming` into the persisted table. Returns how many keys
    /// were merged in. An empty batch leaves the table untouched.
    pub fn append<T>(&self, incoming: Vec<T>) -> Result<usize>
    where
        T: OpportunityRecord + Serialize + DeserializeOwned,
    {
        if incoming.is_empty() {
            return Ok(0);
        }
        let count = incoming.iter().map(|r| r.key()).collect::<HashSet<_>>().len();

        let existing = self.load::<T>()?;
        let merged = upsert(existing, incoming);

        let mut writer = csv::Writer::from_writer(Vec::new());
        for row in &merged {
            writer.serialize(row)?;
        }
        let bytes = writer
            .into_inner()
            .context("Failed to flush ledger CSV")?;
        let contents =
            String::from_utf8(bytes).context("Ledger CSV was not valid UTF-8")?;

        self.store.write_table(&self.key, &contents)?;
        info!(ledger = %self.key, appended = count, "Opportunities upserted");
        Ok(count)
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
