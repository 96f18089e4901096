//! Resilient batch fetching.
//!
//! The building blocks shared by every upstream call site:
//!
//! | Module | Role |
//! |--------|------|
//! | [`backoff`] | Exponential delay schedule with a ceiling |
//! | [`retry`] | Bounded retries around one call, with error classification |
//! | [`batch`] | Runs many calls with a concurrency limit, preserving order |
//! | [`aggregate`] | Splits batch results into successes and failures |
//! | [`cache`] | Optional TTL cache consulted before going upstream |
//!
//! ```text
//! items ──► BatchRunner ──► RetryPolicy ──► operation(item)
//!                │                 ▲            │
//!                │                 └─ backoff ◄─┘ (retryable error)
//!                ▼
//!           BatchResult ──► aggregate() ──► AggregateReport
//! ```

pub mod aggregate;
pub mod backoff;
pub mod batch;
pub mod cache;
pub mod retry;

pub use aggregate::{AggregateReport, FailureInfo, Succeeded, aggregate};
pub use backoff::BackoffPolicy;
pub use batch::{BatchEntry, BatchResult, BatchRunner, IdChunk, WorkItem, chunk_ids};
pub use cache::{CacheStats, ReadCache, TtlCache};
pub use retry::{AttemptOutcome, RetryFailure, RetryPolicy, Retryable};
