//! Caller-supplied column predicates.
//!
//! A qualifier is a hint for server-side filtering and a mandatory
//! client-side post-filter. Rows are always re-checked against every
//! qualifier, whether or not it was pushed down.

use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

use crate::value::{ColumnValue, NormalizedRow};

/// A predicate on one column.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "op", content = "value", rename_all = "snake_case")]
pub enum Qualifier {
    /// Column equals this value.
    Equals(ColumnValue),
    /// Column equals one of these values.
    In(Vec<ColumnValue>),
}

impl Qualifier {
    /// Create an exact-match qualifier.
    pub fn eq(value: impl Into<ColumnValue>) -> Self {
        Qualifier::Equals(value.into())
    }

    /// Create a set-membership qualifier.
    pub fn one_of<I, V>(values: I) -> Self
    where
        I: IntoIterator<Item = V>,
        V: Into<ColumnValue>,
    {
        Qualifier::In(values.into_iter().map(Into::into).collect())
    }

    /// Key form of an exact-match value, usable for pushdown and endpoint
    /// rendering. `None` for set-membership qualifiers.
    #[must_use]
    pub fn single_key(&self) -> Option<String> {
        match self {
            Qualifier::Equals(value) => value.as_key(),
            Qualifier::In(_) => None,
        }
    }

    /// Whether a key satisfies this qualifier.
    #[must_use]
    pub fn accepts_key(&self, key: &str) -> bool {
        match self {
            Qualifier::Equals(value) => value.as_key().as_deref() == Some(key),
            Qualifier::In(values) => values.iter().any(|v| v.as_key().as_deref() == Some(key)),
        }
    }

    /// Whether a cell value satisfies this qualifier. Missing values never do.
    #[must_use]
    pub fn accepts(&self, value: Option<&ColumnValue>) -> bool {
        let Some(value) = value else {
            return false;
        };
        match self {
            Qualifier::Equals(expected) => values_match(expected, value),
            Qualifier::In(expected) => expected.iter().any(|e| values_match(e, value)),
        }
    }
}

fn values_match(expected: &ColumnValue, actual: &ColumnValue) -> bool {
    if expected == actual {
        return true;
    }
    match (expected.as_key(), actual.as_key()) {
        (Some(a), Some(b)) => a == b,
        _ => false,
    }
}

/// Qualifiers of a query, keyed by column, in a stable order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct QualifierMap {
    #[serde(flatten)]
    qualifiers: BTreeMap<String, Qualifier>,
}

impl QualifierMap {
    /// Create an empty map.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a qualifier using builder pattern.
    #[must_use]
    pub fn with(mut self, column: impl Into<String>, qualifier: Qualifier) -> Self {
        self.insert(column, qualifier);
        self
    }

    /// Add or replace a qualifier.
    pub fn insert(&mut self, column: impl Into<String>, qualifier: Qualifier) {
        self.qualifiers.insert(column.into(), qualifier);
    }

    /// Get the qualifier on a column.
    #[must_use]
    pub fn get(&self, column: &str) -> Option<&Qualifier> {
        self.qualifiers.get(column)
    }

    /// Key of an exact-match qualifier on a column.
    #[must_use]
    pub fn equals_key(&self, column: &str) -> Option<String> {
        self.get(column).and_then(Qualifier::single_key)
    }

    /// Check if the map has a qualifier on a column.
    #[must_use]
    pub fn has(&self, column: &str) -> bool {
        self.qualifiers.contains_key(column)
    }

    /// Check if the map is empty.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.qualifiers.is_empty()
    }

    /// Iterate over all qualifiers.
    pub fn iter(&self) -> impl Iterator<Item = (&String, &Qualifier)> {
        self.qualifiers.iter()
    }

    /// Whether a row satisfies every qualifier.
    #[must_use]
    pub fn matches(&self, row: &NormalizedRow) -> bool {
        self.qualifiers
            .iter()
            .all(|(column, q)| q.accepts(row.get(column)))
    }

    /// Whether a row satisfies every qualifier whose column it already
    /// carries. Used to reject rows before paying for enrichment.
    #[must_use]
    pub fn matches_populated(&self, row: &NormalizedRow) -> bool {
        self.qualifiers
            .iter()
            .filter(|(column, _)| row.is_populated(column))
            .all(|(column, q)| q.accepts(row.get(column)))
    }
}

impl FromIterator<(String, Qualifier)> for QualifierMap {
    fn from_iter<T: IntoIterator<Item = (String, Qualifier)>>(iter: T) -> Self {
        Self {
            qualifiers: iter.into_iter().collect(),
        }
    }
}
