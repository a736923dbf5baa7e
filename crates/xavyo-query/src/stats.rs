//! Per-query counters for observability.
//!
//! Counters are atomics because enrichment for several rows updates them
//! concurrently.

use serde::Serialize;
use std::sync::atomic::{AtomicU64, Ordering};

/// Live counters of one query.
#[derive(Debug, Default)]
pub struct QueryStats {
    pages_fetched: AtomicU64,
    rows_emitted: AtomicU64,
    rows_filtered: AtomicU64,
    parents_visited: AtomicU64,
    parents_pruned: AtomicU64,
    unknown_variants: AtomicU64,
    ignored_errors: AtomicU64,
    enrichment_calls: AtomicU64,
    enrichment_skipped: AtomicU64,
}

/// Point-in-time copy of [`QueryStats`].
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
pub struct QueryStatsSnapshot {
    /// List pages successfully fetched (primary, parent and enrichment).
    pub pages_fetched: u64,
    /// Rows handed to the host.
    pub rows_emitted: u64,
    /// Candidate rows rejected by the qualifier post-filter.
    pub rows_filtered: u64,
    /// Parent rows considered.
    pub parents_visited: u64,
    /// Parent rows skipped because their key contradicts a qualifier.
    pub parents_pruned: u64,
    /// Items whose variant tag was missing or not declared.
    pub unknown_variants: u64,
    /// Failures classified as ignorable.
    pub ignored_errors: u64,
    /// Enrichment tasks started.
    pub enrichment_calls: u64,
    /// Enrichment tasks not started (column not requested or already set).
    pub enrichment_skipped: u64,
}

macro_rules! counter {
    ($inc:ident, $field:ident) => {
        #[doc = concat!("Increments `", stringify!($field), "`.")]
        pub fn $inc(&self) {
            self.$field.fetch_add(1, Ordering::Relaxed);
        }
    };
}

impl QueryStats {
    /// Creates zeroed counters.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    counter!(record_page, pages_fetched);
    counter!(record_emitted, rows_emitted);
    counter!(record_filtered, rows_filtered);
    counter!(record_parent, parents_visited);
    counter!(record_pruned, parents_pruned);
    counter!(record_unknown_variant, unknown_variants);
    counter!(record_ignored_error, ignored_errors);
    counter!(record_enrichment, enrichment_calls);
    counter!(record_enrichment_skipped, enrichment_skipped);

    /// Rows emitted so far.
    #[must_use]
    pub fn rows_emitted(&self) -> u64 {
        self.rows_emitted.load(Ordering::Relaxed)
    }

    /// Copy the current values.
    #[must_use]
    pub fn snapshot(&self) -> QueryStatsSnapshot {
        QueryStatsSnapshot {
            pages_fetched: self.pages_fetched.load(Ordering::Relaxed),
            rows_emitted: self.rows_emitted.load(Ordering::Relaxed),
            rows_filtered: self.rows_filtered.load(Ordering::Relaxed),
            parents_visited: self.parents_visited.load(Ordering::Relaxed),
            parents_pruned: self.parents_pruned.load(Ordering::Relaxed),
            unknown_variants: self.unknown_variants.load(Ordering::Relaxed),
            ignored_errors: self.ignored_errors.load(Ordering::Relaxed),
            enrichment_calls: self.enrichment_calls.load(Ordering::Relaxed),
            enrichment_skipped: self.enrichment_skipped.load(Ordering::Relaxed),
        }
    }
}
