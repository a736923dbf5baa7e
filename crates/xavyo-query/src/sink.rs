//! Row delivery to the host.

use async_trait::async_trait;
use tokio::sync::{mpsc, Mutex};
use tracing::{debug, trace};

use crate::budget::RowBudget;
use crate::stats::QueryStats;
use crate::value::NormalizedRow;

/// Host-side receiver of rows.
#[async_trait]
pub trait RowEmitter: Send + Sync {
    /// Hand one row to the host. Returns `false` once the host no longer
    /// accepts rows.
    async fn emit(&self, row: NormalizedRow) -> bool;
}

#[async_trait]
impl RowEmitter for mpsc::Sender<NormalizedRow> {
    async fn emit(&self, row: NormalizedRow) -> bool {
        self.send(row).await.is_ok()
    }
}

/// Emitter that keeps rows in memory.
#[derive(Debug, Default)]
pub struct CollectingEmitter {
    rows: Mutex<Vec<NormalizedRow>>,
    capacity: Option<usize>,
}

impl CollectingEmitter {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Accept at most `capacity` rows, then report the host as gone.
    #[must_use]
    pub fn with_capacity_limit(capacity: usize) -> Self {
        Self {
            rows: Mutex::default(),
            capacity: Some(capacity),
        }
    }

    /// Rows received so far.
    pub async fn rows(&self) -> Vec<NormalizedRow> {
        self.rows.lock().await.clone()
    }

    /// Take the received rows.
    pub async fn take(&self) -> Vec<NormalizedRow> {
        std::mem::take(&mut *self.rows.lock().await)
    }
}

#[async_trait]
impl RowEmitter for CollectingEmitter {
    async fn emit(&self, row: NormalizedRow) -> bool {
        let mut rows = self.rows.lock().await;
        if self.capacity.is_some_and(|cap| rows.len() >= cap) {
            return false;
        }
        rows.push(row);
        true
    }
}

/// Budget-gated path from the engine to the host.
pub struct RowSink<'a> {
    budget: &'a RowBudget,
    emitter: &'a dyn RowEmitter,
    stats: &'a QueryStats,
}

impl<'a> RowSink<'a> {
    pub fn new(budget: &'a RowBudget, emitter: &'a dyn RowEmitter, stats: &'a QueryStats) -> Self {
        Self {
            budget,
            emitter,
            stats,
        }
    }

    /// Emit a row if the budget allows it.
    ///
    /// Returns `false` when the row was not delivered; the caller must stop
    /// producing rows. A host that stops accepting rows cancels the query.
    pub async fn emit(&self, row: NormalizedRow) -> bool {
        if !self.budget.try_consume() {
            trace!("Row budget exhausted, row dropped");
            return false;
        }

        if !self.emitter.emit(row).await {
            debug!("Row emitter closed, cancelling query");
            self.budget.cancel();
            return false;
        }

        self.stats.record_emitted();
        true
    }

    /// Whether more rows may be produced.
    #[must_use]
    pub fn is_open(&self) -> bool {
        !self.budget.is_exhausted()
    }
}
