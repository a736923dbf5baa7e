//! Remote resource client abstraction.
//!
//! The engine never speaks HTTP itself. A connector supplies a
//! [`ResourceClient`] with list/get semantics and cursor continuation; the
//! engine only ever hands back cursors the client produced.

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::fmt;

use crate::error::QueryResult;
use crate::value::{NormalizedRow, RawItem};

/// A resolved API path relative to the client's base URL.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Endpoint(String);

impl Endpoint {
    /// Create an endpoint from a path.
    pub fn new(path: impl Into<String>) -> Self {
        Self(path.into())
    }

    /// The path.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for Endpoint {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for Endpoint {
    fn from(path: &str) -> Self {
        Self::new(path)
    }
}

/// Endpoint path with `{column}` placeholders, e.g.
/// `/api/v1/users/{user_id}/factors`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EndpointTemplate(&'static str);

impl EndpointTemplate {
    /// Declare a template.
    #[must_use]
    pub const fn new(template: &'static str) -> Self {
        Self(template)
    }

    /// The raw template.
    #[must_use]
    pub fn as_str(&self) -> &'static str {
        self.0
    }

    /// Placeholder names in order of appearance.
    pub fn placeholders(&self) -> impl Iterator<Item = &'static str> {
        self.0.split('{').skip(1).filter_map(|s| s.split_once('}')).map(|(name, _)| name)
    }

    /// Render the template, percent-encoding each substituted value.
    ///
    /// Returns `None` if any placeholder has no value or an empty one; the
    /// call must then not be made.
    pub fn render<F>(&self, mut lookup: F) -> Option<Endpoint>
    where
        F: FnMut(&str) -> Option<String>,
    {
        let mut out = String::with_capacity(self.0.len());
        let mut rest = self.0;

        while let Some(start) = rest.find('{') {
            out.push_str(&rest[..start]);
            let after = &rest[start + 1..];
            let end = after.find('}')?;
            let value = lookup(&after[..end]).filter(|v| !v.is_empty())?;
            out.push_str(&urlencoding::encode(&value));
            rest = &after[end + 1..];
        }
        out.push_str(rest);

        Some(Endpoint(out))
    }

    /// Render using a row's key values.
    #[must_use]
    pub fn render_row(&self, row: &NormalizedRow) -> Option<Endpoint> {
        self.render(|name| row.key(name))
    }

    /// Render a template with no placeholders.
    #[must_use]
    pub fn fixed(&self) -> Option<Endpoint> {
        self.render(|_| None)
    }
}

/// Server-side filter parameters. A hint only; results are always
/// post-filtered.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct ServerFilter {
    params: Vec<(String, String)>,
}

impl ServerFilter {
    /// Create an empty filter.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a parameter using builder pattern.
    #[must_use]
    pub fn with(mut self, name: impl Into<String>, value: impl Into<String>) -> Self {
        self.set(name, value);
        self
    }

    /// Add or replace a parameter.
    pub fn set(&mut self, name: impl Into<String>, value: impl Into<String>) {
        let name = name.into();
        let value = value.into();
        if let Some(slot) = self.params.iter_mut().find(|(n, _)| *n == name) {
            slot.1 = value;
        } else {
            self.params.push((name, value));
        }
    }

    /// Get a parameter.
    #[must_use]
    pub fn get(&self, name: &str) -> Option<&str> {
        self.params
            .iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v.as_str())
    }

    /// Check if no parameter is set.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.params.is_empty()
    }

    /// Parameters in insertion order.
    #[must_use]
    pub fn params(&self) -> &[(String, String)] {
        &self.params
    }
}

/// One list call: where to go and what to ask the server for.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListRequest {
    pub endpoint: Endpoint,
    pub filter: ServerFilter,
}

impl ListRequest {
    /// Create an unfiltered list request.
    pub fn new(endpoint: impl Into<Endpoint>) -> Self {
        Self {
            endpoint: endpoint.into(),
            filter: ServerFilter::new(),
        }
    }

    /// Set the server filter.
    #[must_use]
    pub fn with_filter(mut self, filter: ServerFilter) -> Self {
        self.filter = filter;
        self
    }
}

impl From<Endpoint> for ListRequest {
    fn from(endpoint: Endpoint) -> Self {
        Self::new(endpoint)
    }
}

/// Opaque continuation token produced by a [`ResourceClient`].
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct PageCursor(String);

impl PageCursor {
    /// Wrap a token.
    pub fn new(token: impl Into<String>) -> Self {
        Self(token.into())
    }

    /// The token as minted by the client.
    #[must_use]
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

/// One page of a list call.
#[derive(Debug, Clone, Default)]
pub struct Page {
    pub items: Vec<RawItem>,
    /// Continuation, `None` on the last page.
    pub next: Option<PageCursor>,
}

impl Page {
    /// A page with no continuation.
    #[must_use]
    pub fn last(items: Vec<RawItem>) -> Self {
        Self { items, next: None }
    }

    /// A page followed by more.
    #[must_use]
    pub fn with_next(items: Vec<RawItem>, next: PageCursor) -> Self {
        Self {
            items,
            next: Some(next),
        }
    }
}

/// List/get access to a remote API. Shared by all concurrent units of a
/// query.
#[async_trait]
pub trait ResourceClient: Send + Sync {
    /// Fetch one page. `cursor` is `None` for the first page.
    async fn list(&self, request: &ListRequest, cursor: Option<&PageCursor>) -> QueryResult<Page>;

    /// Fetch a single item.
    async fn get(&self, endpoint: &Endpoint) -> QueryResult<RawItem>;
}

#[cfg(test)]
mod tests {
    use super::*;

    const FACTORS: EndpointTemplate = EndpointTemplate::new("/api/v1/users/{user_id}/factors");

    #[test]
    fn test_render_template() {
        let row = NormalizedRow::new().with("user_id", "00u1");
        assert_eq!(
            FACTORS.render_row(&row),
            Some(Endpoint::new("/api/v1/users/00u1/factors"))
        );
    }

    #[test]
    fn test_render_encodes_values() {
        let template = EndpointTemplate::new("/api/v1/apps/{app_id}/users/{id}");
        let endpoint = template.render(|name| match name {
            "app_id" => Some("a b".to_string()),
            "id" => Some("x/y".to_string()),
            _ => None,
        });
        assert_eq!(
            endpoint,
            Some(Endpoint::new("/api/v1/apps/a%20b/users/x%2Fy"))
        );
    }

    #[test]
    fn test_render_missing_or_empty_value() {
        assert_eq!(FACTORS.render_row(&NormalizedRow::new()), None);
        let row = NormalizedRow::new().with("user_id", "");
        assert_eq!(FACTORS.render_row(&row), None);
    }

    #[test]
    fn test_placeholders() {
        let template = EndpointTemplate::new("/api/v1/apps/{app_id}/users/{id}");
        assert_eq!(template.placeholders().collect::<Vec<_>>(), vec!["app_id", "id"]);
        assert_eq!(
            EndpointTemplate::new("/api/v1/policies").fixed(),
            Some(Endpoint::new("/api/v1/policies"))
        );
    }

    #[test]
    fn test_server_filter_replaces() {
        let filter = ServerFilter::new()
            .with("type", "PASSWORD")
            .with("q", "jane")
            .with("q", "john");
        assert_eq!(filter.get("q"), Some("john"));
        assert_eq!(filter.params().len(), 2);
        assert!(!filter.is_empty());
    }
}
