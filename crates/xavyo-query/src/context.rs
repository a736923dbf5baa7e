//! Per-query context supplied by the host query engine.

use std::collections::BTreeSet;
use tokio_util::sync::CancellationToken;

use crate::qualifier::{Qualifier, QualifierMap};

/// Requested columns, qualifiers, row limit and cancellation for one query.
///
/// Created once per query and read-only to the engine.
#[derive(Debug, Clone, Default)]
pub struct QueryContext {
    columns: BTreeSet<String>,
    qualifiers: QualifierMap,
    limit: Option<u64>,
    cancel: CancellationToken,
}

impl QueryContext {
    /// Create a context with no columns, qualifiers or limit.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the requested columns.
    #[must_use]
    pub fn with_columns<I, S>(mut self, columns: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.columns = columns.into_iter().map(Into::into).collect();
        self
    }

    /// Add a qualifier.
    #[must_use]
    pub fn with_qualifier(mut self, column: impl Into<String>, qualifier: Qualifier) -> Self {
        self.qualifiers.insert(column, qualifier);
        self
    }

    /// Replace all qualifiers.
    #[must_use]
    pub fn with_qualifiers(mut self, qualifiers: QualifierMap) -> Self {
        self.qualifiers = qualifiers;
        self
    }

    /// Set the row limit.
    #[must_use]
    pub fn with_limit(mut self, limit: u64) -> Self {
        self.limit = Some(limit);
        self
    }

    /// Use a caller-owned cancellation token.
    #[must_use]
    pub fn with_cancellation(mut self, token: CancellationToken) -> Self {
        self.cancel = token;
        self
    }

    /// Whether the caller requested a column.
    #[must_use]
    pub fn is_requested(&self, column: &str) -> bool {
        self.columns.contains(column)
    }

    /// Whether a column's value is needed: requested, or constrained by a
    /// qualifier the post-filter must check.
    #[must_use]
    pub fn needs(&self, column: &str) -> bool {
        self.is_requested(column) || self.qualifiers.has(column)
    }

    /// The requested columns.
    pub fn columns(&self) -> impl Iterator<Item = &str> {
        self.columns.iter().map(String::as_str)
    }

    /// The qualifiers.
    #[must_use]
    pub fn qualifiers(&self) -> &QualifierMap {
        &self.qualifiers
    }

    /// The row limit, if any.
    #[must_use]
    pub fn limit(&self) -> Option<u64> {
        self.limit
    }

    /// The cancellation token observed at suspension points.
    #[must_use]
    pub fn cancellation(&self) -> &CancellationToken {
        &self.cancel
    }

    /// Rows the caller still wants before any have been emitted.
    ///
    /// `None` means unbounded. A cancelled query wants nothing.
    #[must_use]
    pub fn remaining_rows(&self) -> Option<u64> {
        if self.cancel.is_cancelled() {
            return Some(0);
        }
        self.limit
    }
}
