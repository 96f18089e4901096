//! Concurrency-limited batch execution.
//!
//! A [`BatchRunner`] drives a list of work items through a per-item async
//! operation with at most `max_concurrent` operations in flight. Items start
//! in input order; results are written back at each item's original index so
//! the output order never depends on completion order.

use super::retry::{RetryFailure, RetryPolicy, Retryable};
use futures::stream::{self, StreamExt};
use std::fmt;
use std::future::Future;
use tracing::{debug, info};

/// A unit of work scheduled by the [`BatchRunner`].
pub trait WorkItem {
    /// Human-readable identifier used in logs and failure reports.
    fn label(&self) -> String;
}

impl WorkItem for String {
    fn label(&self) -> String {
        self.clone()
    }
}

impl WorkItem for &str {
    fn label(&self) -> String {
        (*self).to_string()
    }
}

/// A slice of identifiers sent upstream in one request.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct IdChunk {
    /// Zero-based position of the chunk in the original list.
    pub ordinal: usize,
    /// Identifiers in this chunk.
    pub ids: Vec<String>,
}

impl WorkItem for IdChunk {
    fn label(&self) -> String {
        format!("chunk {} ({} ids)", self.ordinal + 1, self.ids.len())
    }
}

/// Splits `ids` into chunks of at most `chunk_size` entries.
///
/// A `chunk_size` of zero is treated as one.
#[must_use]
pub fn chunk_ids(ids: &[String], chunk_size: usize) -> Vec<IdChunk> {
    ids.chunks(chunk_size.max(1))
        .enumerate()
        .map(|(ordinal, ids)| IdChunk {
            ordinal,
            ids: ids.to_vec(),
        })
        .collect()
}

/// Outcome of one work item.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchEntry<T, E> {
    /// Index of the item in the input list.
    pub index: usize,
    /// Label of the item.
    pub label: String,
    /// Value, or the terminal failure after retries.
    pub outcome: Result<T, RetryFailure<E>>,
}

/// Ordered results of a batch, one entry per input item.
#[derive(Debug, Clone, PartialEq)]
pub struct BatchResult<T, E> {
    entries: Vec<BatchEntry<T, E>>,
}

impl<T, E> BatchResult<T, E> {
    /// Number of entries (always equal to the number of input items).
    #[must_use]
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Returns `true` if the batch had no items.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Entry for the item at `index`.
    #[must_use]
    pub fn get(&self, index: usize) -> Option<&BatchEntry<T, E>> {
        self.entries.get(index)
    }

    /// Iterates entries in input order.
    pub fn iter(&self) -> impl Iterator<Item = &BatchEntry<T, E>> {
        self.entries.iter()
    }

    /// Consumes the result, yielding entries in input order.
    #[must_use]
    pub fn into_entries(self) -> Vec<BatchEntry<T, E>> {
        self.entries
    }
}

/// Runs work items with bounded concurrency and per-item retries.
#[derive(Debug, Clone, Copy)]
pub struct BatchRunner {
    max_concurrent: usize,
    retry: RetryPolicy,
}

impl BatchRunner {
    /// Creates a runner. `max_concurrent` below 1 is treated as 1.
    #[must_use]
    pub fn new(max_concurrent: usize, retry: RetryPolicy) -> Self {
        Self {
            max_concurrent: max_concurrent.max(1),
            retry,
        }
    }

    /// Maximum number of operations in flight.
    #[must_use]
    pub fn max_concurrent(&self) -> usize {
        self.max_concurrent
    }

    /// Retry policy applied to each item.
    #[must_use]
    pub fn retry_policy(&self) -> &RetryPolicy {
        &self.retry
    }

    /// Runs `operation` for every item and returns results in input order.
    ///
    /// The operation is called once per attempt with a clone of the item.
    /// A failing item never cancels or delays the others.
    pub async fn run<I, T, E, F, Fut>(&self, items: Vec<I>, operation: F) -> BatchResult<T, E>
    where
        I: WorkItem + Clone,
        F: Fn(I) -> Fut,
        Fut: Future<Output = Result<T, E>>,
        E: Retryable + fmt::Display,
    {
        let total = items.len();
        info!(
            items = total,
            max_concurrent = self.max_concurrent,
            "starting batch"
        );

        let mut slots: Vec<Option<BatchEntry<T, E>>> = Vec::with_capacity(total);
        slots.resize_with(total, || None);

        let operation = &operation;
        let retry = &self.retry;

        let mut completions = stream::iter(items.into_iter().enumerate())
            .map(|(index, item)| async move {
                let label = item.label();
                let outcome = retry.run(&label, || operation(item.clone())).await;
                BatchEntry {
                    index,
                    label,
                    outcome,
                }
            })
            .buffer_unordered(self.max_concurrent);

        while let Some(entry) = completions.next().await {
            debug!(
                index = entry.index,
                label = %entry.label,
                ok = entry.outcome.is_ok(),
                "batch item finished"
            );
            let index = entry.index;
            slots[index] = Some(entry);
        }

        let entries: Vec<BatchEntry<T, E>> = slots.into_iter().flatten().collect();
        debug_assert_eq!(entries.len(), total);

        BatchResult { entries }
    }
}
