//! Classification of batch results into successes and failures.
//!
//! The aggregator only classifies. Mapping a report to a transport status is
//! left to the caller.

use super::batch::BatchResult;
use std::fmt;

/// A successful item.
#[derive(Debug, Clone, PartialEq)]
pub struct Succeeded<T> {
    /// Index of the item in the input list.
    pub index: usize,
    /// Label of the item.
    pub label: String,
    /// Value produced by the item's operation.
    pub value: T,
}

/// A failed item, with the reason flattened to text.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FailureInfo {
    /// Index of the item in the input list.
    pub index: usize,
    /// Label of the item.
    pub label: String,
    /// Error message from the last attempt.
    pub reason: String,
    /// Attempts made before giving up.
    pub attempts: u32,
    /// `true` when retries ran out, `false` for a terminal error.
    pub exhausted: bool,
}

/// Summary of a batch run.
#[derive(Debug, Clone, PartialEq)]
pub struct AggregateReport<T> {
    /// Successful items in input order.
    pub succeeded: Vec<Succeeded<T>>,
    /// Failed items in input order.
    pub failed: Vec<FailureInfo>,
    /// Number of items in the batch.
    pub total: usize,
    /// No item succeeded.
    pub is_complete_failure: bool,
    /// Some, but not all, items failed.
    pub is_partial_failure: bool,
}

impl<T> AggregateReport<T> {
    /// Returns `true` when every item succeeded.
    #[must_use]
    pub fn is_complete_success(&self) -> bool {
        self.failed.is_empty() && !self.is_complete_failure
    }

    /// Successful values in input order, dropping the bookkeeping.
    #[must_use]
    pub fn into_values(self) -> Vec<T> {
        self.succeeded.into_iter().map(|s| s.value).collect()
    }
}

/// Partitions a [`BatchResult`] into an [`AggregateReport`].
///
/// `is_complete_failure` holds iff nothing succeeded, so an empty batch is
/// reported as a complete failure. `is_partial_failure` holds iff
/// `0 < failed < total`.
#[must_use]
pub fn aggregate<T, E: fmt::Display>(result: BatchResult<T, E>) -> AggregateReport<T> {
    let total = result.len();
    let mut succeeded = Vec::new();
    let mut failed = Vec::new();

    for entry in result.into_entries() {
        match entry.outcome {
            Ok(value) => succeeded.push(Succeeded {
                index: entry.index,
                label: entry.label,
                value,
            }),
            Err(failure) => failed.push(FailureInfo {
                index: entry.index,
                label: entry.label,
                reason: failure.last_error.to_string(),
                attempts: failure.attempts,
                exhausted: failure.exhausted,
            }),
        }
    }

    let is_complete_failure = succeeded.is_empty();
    let is_partial_failure = !failed.is_empty() && failed.len() < total;

    AggregateReport {
        succeeded,
        failed,
        total,
        is_complete_failure,
        is_partial_failure,
    }
}
