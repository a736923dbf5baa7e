//! Row budget shared by everything that emits rows in one query.

use std::sync::atomic::{AtomicU64, Ordering};
use tokio_util::sync::CancellationToken;

use crate::context::QueryContext;

/// How many more rows the caller wants.
///
/// The counter only ever goes down. Once [`RowBudget::try_consume`] has
/// returned `false` it keeps returning `false`. Cancellation of the query
/// token exhausts the budget as well.
#[derive(Debug)]
pub struct RowBudget {
    /// Remaining rows; ignored when unbounded.
    remaining: AtomicU64,
    unbounded: bool,
    cancel: CancellationToken,
}

impl RowBudget {
    /// Budget allowing `limit` rows.
    #[must_use]
    pub fn limited(limit: u64) -> Self {
        Self {
            remaining: AtomicU64::new(limit),
            unbounded: false,
            cancel: CancellationToken::new(),
        }
    }

    /// Budget without a row limit.
    #[must_use]
    pub fn unbounded() -> Self {
        Self {
            remaining: AtomicU64::new(u64::MAX),
            unbounded: true,
            cancel: CancellationToken::new(),
        }
    }

    /// Budget initialized from the query's remaining rows and bound to its
    /// cancellation token.
    #[must_use]
    pub fn from_context(ctx: &QueryContext) -> Self {
        let budget = match ctx.remaining_rows() {
            Some(limit) => Self::limited(limit),
            None => Self::unbounded(),
        };
        budget.with_cancellation(ctx.cancellation().clone())
    }

    /// Observe a cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Take one row from the budget.
    ///
    /// Returns `true` if the budget was positive before the call.
    pub fn try_consume(&self) -> bool {
        if self.cancel.is_cancelled() {
            return false;
        }
        if self.unbounded {
            return true;
        }

        loop {
            let current = self.remaining.load(Ordering::Acquire);
            if current == 0 {
                return false;
            }
            if self
                .remaining
                .compare_exchange(current, current - 1, Ordering::AcqRel, Ordering::Acquire)
                .is_ok()
            {
                return true;
            }
        }
    }

    /// Whether no further work for new rows may start.
    #[must_use]
    pub fn is_exhausted(&self) -> bool {
        self.cancel.is_cancelled()
            || (!self.unbounded && self.remaining.load(Ordering::Acquire) == 0)
    }

    /// Remaining rows, `None` when unbounded.
    #[must_use]
    pub fn remaining(&self) -> Option<u64> {
        if self.cancel.is_cancelled() {
            return Some(0);
        }
        (!self.unbounded).then(|| self.remaining.load(Ordering::Acquire))
    }

    /// Stop the query. Used when the host stops accepting rows.
    pub fn cancel(&self) {
        self.cancel.cancel();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_limited_budget_is_monotonic() {
        let budget = RowBudget::limited(2);
        assert!(budget.try_consume());
        assert!(budget.try_consume());
        assert!(!budget.try_consume());
        assert!(!budget.try_consume());
        assert!(budget.is_exhausted());
        assert_eq!(budget.remaining(), Some(0));
    }

    #[test]
    fn test_zero_limit() {
        let budget = RowBudget::limited(0);
        assert!(budget.is_exhausted());
        assert!(!budget.try_consume());
    }

    #[test]
    fn test_unbounded_never_decrements() {
        let budget = RowBudget::unbounded();
        for _ in 0..1000 {
            assert!(budget.try_consume());
        }
        assert!(!budget.is_exhausted());
        assert_eq!(budget.remaining(), None);
    }

    #[test]
    fn test_cancellation_exhausts() {
        let token = CancellationToken::new();
        let budget = RowBudget::unbounded().with_cancellation(token.clone());
        assert!(budget.try_consume());
        token.cancel();
        assert!(!budget.try_consume());
        assert!(budget.is_exhausted());
    }

    #[test]
    fn test_from_context() {
        let ctx = QueryContext::new().with_limit(3);
        let budget = RowBudget::from_context(&ctx);
        assert_eq!(budget.remaining(), Some(3));

        let budget = RowBudget::from_context(&QueryContext::new());
        assert_eq!(budget.remaining(), None);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_consumers_never_overdraw() {
        let budget = Arc::new(RowBudget::limited(100));
        let mut handles = Vec::new();

        for _ in 0..8 {
            let budget = Arc::clone(&budget);
            handles.push(tokio::spawn(async move {
                let mut taken = 0u64;
                for _ in 0..50 {
                    if budget.try_consume() {
                        taken += 1;
                    }
                    tokio::task::yield_now().await;
                }
                taken
            }));
        }

        let mut total = 0;
        for handle in handles {
            total += handle.await.unwrap();
        }
        assert_eq!(total, 100);
        assert!(budget.is_exhausted());
    }
}
