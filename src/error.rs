//! Error taxonomy for the data source.
//!
//! The scanner's fault boundary only cares about one distinction: is this
//! fault the daily call budget running out (stop the batch, persist the
//! cursor) or anything else (log and move on)? `SourceError` makes that a
//! typed variant instead of string-matching on messages.

use thiserror::Error;

/// Failures raised by the rate-limited data source.
#[derive(Debug, Error)]
pub enum SourceError {
    /// The marketplace rejected the call because the daily request quota
    /// is spent. The only fault that halts a batch early.
    #[error("daily API call budget exceeded")]
    BudgetExceeded,

    /// The API answered with a non-success status. Transient for a single
    /// item/condition; the affected signal is treated as absent.
    #[error("API returned HTTP {status} for {context}")]
    Http { status: u16, context: String },

    /// Transport-level failure (connect, timeout, TLS). Also transient.
    #[error("request failed: {0}")]
    Request(#[from] reqwest::Error),

    /// The response decoded but did not have the expected shape.
    #[error("unexpected response shape: {0}")]
    Decode(String),
}

impl SourceError {
    /// Whether this fault must interrupt the running batch.
    pub fn is_budget_exhaustion(&self) -> bool {
        matches!(self, SourceError::BudgetExceeded)
    }
}
