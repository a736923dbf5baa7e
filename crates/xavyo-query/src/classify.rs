//! Error classification
//!
//! Every resource family declares one [`ErrorTable`] listing the conditions
//! under which a failed remote call means "the referenced entity does not
//! exist" rather than "the query is broken". Call sites never match on error
//! strings themselves; they ask the table.

use serde::Serialize;

use crate::error::QueryError;

/// Outcome of classifying a failure.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ErrorClass {
    /// The referenced entity does not exist; treat as an empty result.
    Ignorable,
    /// Abort the query and surface the error.
    Fatal,
}

impl ErrorClass {
    /// Whether this classification lets the query continue.
    #[must_use]
    pub fn is_ignorable(self) -> bool {
        matches!(self, ErrorClass::Ignorable)
    }
}

/// A single recognizable "does not exist" condition.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IgnoreRule {
    /// The API answered with this HTTP status.
    Status(u16),
    /// The API error code equals this value.
    Code(&'static str),
    /// The API error message contains this substring (case-sensitive).
    MessageContains(&'static str),
    /// The API error message contains this substring, ignoring ASCII case.
    MessageContainsIgnoreCase(&'static str),
}

impl IgnoreRule {
    fn matches(&self, status: Option<u16>, code: Option<&str>, message: &str) -> bool {
        match self {
            IgnoreRule::Status(expected) => status == Some(*expected),
            IgnoreRule::Code(expected) => code == Some(*expected),
            IgnoreRule::MessageContains(needle) => message.contains(needle),
            IgnoreRule::MessageContainsIgnoreCase(needle) => message
                .to_ascii_lowercase()
                .contains(&needle.to_ascii_lowercase()),
        }
    }
}

/// Declarative classification table for one resource family.
#[derive(Debug, Clone, Copy)]
pub struct ErrorTable {
    family: &'static str,
    rules: &'static [IgnoreRule],
}

/// Table for callers that must never swallow an error.
pub const FATAL_ONLY: ErrorTable = ErrorTable::new("fatal_only", &[]);

/// Table recognizing only the HTTP not-found status.
pub const NOT_FOUND: ErrorTable = ErrorTable::new("not_found", &[IgnoreRule::Status(404)]);

impl ErrorTable {
    /// Declare a table for a family.
    #[must_use]
    pub const fn new(family: &'static str, rules: &'static [IgnoreRule]) -> Self {
        Self { family, rules }
    }

    /// Family this table belongs to.
    #[must_use]
    pub fn family(&self) -> &'static str {
        self.family
    }

    /// The declared rules, in declaration order.
    #[must_use]
    pub fn rules(&self) -> &'static [IgnoreRule] {
        self.rules
    }

    /// Classify a failure.
    ///
    /// Only errors reported by the remote API can be ignorable. Transport
    /// failures, malformed responses and configuration errors are always
    /// fatal regardless of their text.
    #[must_use]
    pub fn classify(&self, error: &QueryError) -> ErrorClass {
        let QueryError::Api {
            status,
            code,
            message,
        } = error
        else {
            return ErrorClass::Fatal;
        };

        if self
            .rules
            .iter()
            .any(|rule| rule.matches(*status, code.as_deref(), message))
        {
            ErrorClass::Ignorable
        } else {
            ErrorClass::Fatal
        }
    }
}
