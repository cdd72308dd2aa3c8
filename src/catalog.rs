//! Catalog input.
//!
//! The scan order is defined by an externally produced CSV with (at
//! minimum) an `item_id` column. The engine treats it as a read-only
//! ordered sequence; the ordering must be stable across runs or the
//! persisted cursor stops meaning anything.

use anyhow::{bail, Context, Result};
use std::path::Path;
use tracing::info;

/// Ordered, immutable list of catalog item identifiers.
#[derive(Debug, Clone)]
pub struct Catalog {
    items: Vec<String>,
}

impl Catalog {
    /// Load item ids from the `item_id` column of a CSV file, preserving
    /// file order.
    pub fn from_csv(path: &Path) -> Result<Self> {
        let mut reader = csv::Reader::from_path(path)
            .with_context(|| format!("Failed to open catalog {}", path.display()))?;

        let headers = reader.headers()?.clone();
        let Some(id_col) = headers.iter().position(|h| h == "item_id") else {
            bail!("Catalog {} has no item_id column", path.display());
        };

        let mut items = Vec::new();
        for record in reader.records() {
            let record = record?;
            if let Some(id) = record.get(id_col) {
                if !id.is_empty() {
                    items.push(id.to_string());
                }
            }
        }

        info!(path = %path.display(), items = items.len(), "Catalog loaded");
        Ok(Self { items })
    }

    /// Build a catalog from an in-memory sequence (tests, ad-hoc runs).
    pub fn from_items(items: Vec<String>) -> Self {
        Self { items }
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    /// The item at an absolute catalog index. Callers are expected to
    /// reduce indices modulo `len()` first.
    pub fn get(&self, index: usize) -> &str {
        &self.items[index]
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
