//! Persistence layer.
//!
//! All scan state goes through the `StateStore` trait so the engine can be
//! tested against an in-memory fake: the resumable cursor (one scalar per
//! scan variant), the shared daily call-budget counter, and the
//! opportunity ledgers (flat CSV tables).
//!
//! The file-backed store writes new-then-rename so an interrupted write
//! never corrupts previously persisted state.

use anyhow::{Context, Result};
use chrono::NaiveDate;
use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use tracing::{debug, warn};

use crate::types::BudgetCounter;

/// Read/write access to the small persisted scalars and tables the scan
/// engine depends on.
///
/// Readers treat missing or unreadable state as "no prior state" — a
/// corrupt cursor file must never be a fatal startup error. Writers
/// propagate failures, since losing a cursor update would double-spend
/// call budget on the next run.
pub trait StateStore: Send + Sync {
    /// Load the persisted scan cursor for one scan variant.
    fn read_cursor(&self, key: &str) -> Result<Option<usize>>;

    /// Persist the scan cursor for one scan variant.
    fn write_cursor(&self, key: &str, value: usize) -> Result<()>;

    /// Load the daily call-budget counter (shared across variants).
    fn read_budget(&self) -> Result<Option<BudgetCounter>>;

    /// Persist the daily call-budget counter.
    fn write_budget(&self, counter: BudgetCounter) -> Result<()>;

    /// Load a ledger table as raw CSV text. `None` when absent.
    fn read_table(&self, key: &str) -> Result<Option<String>>;

    /// Persist a ledger table as raw CSV text.
    fn write_table(&self, key: &str, contents: &str) -> Result<()>;
}

// ---------------------------------------------------------------------------
// File-backed store
// ---------------------------------------------------------------------------

/// Budget counter file name, shared by every scan variant run that day.
const BUDGET_FILE: &str = "api_call_count.txt";

/// `StateStore` backed by small files under a state directory.
///
/// Cursors are single-integer text files, the budget counter is a
/// two-line (date, count) file, and ledgers are CSV.
pub struct FileStore {
    dir: PathBuf,
}

impl FileStore {
    /// Create a store rooted at `dir`, creating the directory if needed.
    pub fn new(dir: impl Into<PathBuf>) -> Result<Self> {
        let dir = dir.into();
        std::fs::create_dir_all(&dir)
            .with_context(|| format!("Failed to create state dir {}", dir.display()))?;
        Ok(Self { dir })
    }

    fn cursor_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.txt"))
    }

    fn table_path(&self, key: &str) -> PathBuf {
        self.dir.join(format!("{key}.csv"))
    }

    /// Write `contents` to `path` via a temp file and rename, so readers
    /// never observe a half-written file.
    fn swap_write(path: &Path, contents: &str) -> Result<()> {
        let tmp = path.with_extension("tmp");
        std::fs::write(&tmp, contents)
            .with_context(|| format!("Failed to write {}", tmp.display()))?;
        std::fs::rename(&tmp, path)
            .with_context(|| format!("Failed to swap {} into place", path.display()))?;
        Ok(())
    }

    /// Read a file, mapping absence to `None`.
    fn read_optional(path: &Path) -> Option<String> {
        match std::fs::read_to_string(path) {
            Ok(s) => Some(s),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => None,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "Unreadable state file, treating as absent");
                None
            }
        }
    }
}

impl StateStore for FileStore {
    fn read_cursor(&self, key: &str) -> Result<Option<usize>> {
        let path = self.cursor_path(key);
        let Some(raw) = Self::read_optional(&path) else {
            return Ok(None);
        };
        match raw.trim().parse::<usize>() {
            Ok(v) => Ok(Some(v)),
            Err(_) => {
                warn!(path = %path.display(), "Corrupt cursor file, starting from 0");
                Ok(None)
            }
        }
    }

    fn write_cursor(&self, key: &str, value: usize) -> Result<()> {
        let path = self.cursor_path(key);
        Self::swap_write(&path, &value.to_string())?;
        debug!(key, value, "Cursor persisted");
        Ok(())
    }

    fn read_budget(&self) -> Result<Option<BudgetCounter>> {
        let path = self.dir.join(BUDGET_FILE);
        let Some(raw) = Self::read_optional(&path) else {
            return Ok(None);
        };
        let mut lines = raw.lines();
        let date = lines.next().and_then(|l| l.trim().parse::<NaiveDate>().ok());
        let count = lines.next().and_then(|l| l.trim().parse::<u32>().ok());
        match (date, count) {
            (Some(date), Some(count)) => Ok(Some(BudgetCounter { date, count })),
            _ => {
                warn!(path = %path.display(), "Corrupt budget file, treating as absent");
                Ok(None)
            }
        }
    }

    fn write_budget(&self, counter: BudgetCounter) -> Result<()> {
        let path = self.dir.join(BUDGET_FILE);
        Self::swap_write(&path, &format!("{}\n{}\n", counter.date, counter.count))?;
        debug!(date = %counter.date, count = counter.count, "Budget counter persisted");
        Ok(())
    }

    fn read_table(&self, key: &str) -> Result<Option<String>> {
        Ok(Self::read_optional(&self.table_path(key)))
    }

    fn write_table(&self, key: &str, contents: &str) -> Result<()> {
        Self::swap_write(&self.table_path(key), contents)
    }
}

// ---------------------------------------------------------------------------
// In-memory store (tests and dry runs)
// ---------------------------------------------------------------------------

/// HashMap-backed `StateStore`. State lives only as long as the value.
#[derive(Default)]
pub struct MemoryStore {
    cursors: Mutex<HashMap<String, usize>>,
    budget: Mutex<Option<BudgetCounter>>,
    tables: Mutex<HashMap<String, String>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }
}

impl StateStore for MemoryStore {
    fn read_cursor(&self, key: &str) -> Result<Option<usize>> {
        Ok(self.cursors.lock().unwrap().get(key).copied())
    }

    fn write_cursor(&self, key: &str, value: usize) -> Result<()> {
        self.cursors.lock().unwrap().insert(key.to_string(), value);
        Ok(())
    }

    fn read_budget(&self) -> Result<Option<BudgetCounter>> {
        Ok(*self.budget.lock().unwrap())
    }

    fn write_budget(&self, counter: BudgetCounter) -> Result<()> {
        *self.budget.lock().unwrap() = Some(counter);
        Ok(())
    }

    fn read_table(&self, key: &str) -> Result<Option<String>> {
        Ok(self.tables.lock().unwrap().get(key).cloned())
    }

    fn write_table(&self, key: &str, contents: &str) -> Result<()> {
        self.tables
            .lock()
            .unwrap()
            .insert(key.to_string(), contents.to_string());
        Ok(())
    }
}

// ---------------------------------------------------------------------------
// Tests
// ---------------------------------------------------------------------------
