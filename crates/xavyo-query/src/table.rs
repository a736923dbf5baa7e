//! Declarative table definitions
//!
//! A [`TableDefinition`] describes how one queryable resource is fetched:
//! an optional keyed Get, a List with an optional parent fan-out, and the
//! enrichment tasks that populate expensive columns. The engine interprets
//! the definition; connectors only declare it.

use serde::Serialize;
use std::fmt;
use std::sync::Arc;

use crate::classify::ErrorTable;
use crate::client::{EndpointTemplate, ServerFilter};
use crate::error::{QueryError, QueryResult};
use crate::hydrate::HydrateTask;
use crate::qualifier::QualifierMap;
use crate::union::{UnionResolver, IDENTITY_COLUMN};
use crate::value::{ColumnType, ColumnValue, NormalizedRow};

/// A column exposed to the host.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ColumnDefinition {
    pub name: &'static str,
    pub kind: ColumnType,
    pub description: &'static str,
}

impl ColumnDefinition {
    #[must_use]
    pub const fn new(name: &'static str, kind: ColumnType, description: &'static str) -> Self {
        Self {
            name,
            kind,
            description,
        }
    }
}

/// A column the List path understands as a qualifier.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct KeyColumn {
    pub name: &'static str,
    /// Without an exact-match qualifier on this column nothing is fetched.
    pub required: bool,
}

impl KeyColumn {
    #[must_use]
    pub const fn optional(name: &'static str) -> Self {
        Self {
            name,
            required: false,
        }
    }

    #[must_use]
    pub const fn required(name: &'static str) -> Self {
        Self {
            name,
            required: true,
        }
    }
}

/// Maps an exact-match qualifier to a server query parameter.
///
/// Several columns may share a parameter; the first declared one with a
/// qualifier wins.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Pushdown {
    pub column: &'static str,
    pub param: &'static str,
}

/// Page size parameter of a list endpoint.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PageSizeHint {
    pub param: &'static str,
    pub max: u64,
}

impl PageSizeHint {
    /// Page size to request given the rows still wanted.
    #[must_use]
    pub fn size_for(&self, remaining: Option<u64>) -> u64 {
        remaining.map_or(self.max, |rows| rows.clamp(1, self.max))
    }
}

/// Parent resource whose rows drive one primary fetch each.
pub struct ParentSpec {
    /// List endpoint of the parent.
    pub endpoint: EndpointTemplate,
    /// Optional single-item endpoint with an `{id}` placeholder, used when
    /// the join column has an exact-match qualifier.
    pub get: Option<EndpointTemplate>,
    pub resolver: Arc<dyn UnionResolver>,
    pub errors: ErrorTable,
    /// Child column holding the parent's identity.
    pub join_column: &'static str,
    /// Further `(parent column, child column)` pairs copied into each child.
    pub carry: Vec<(&'static str, &'static str)>,
}

impl ParentSpec {
    pub fn new(
        endpoint: EndpointTemplate,
        resolver: Arc<dyn UnionResolver>,
        errors: ErrorTable,
        join_column: &'static str,
    ) -> Self {
        Self {
            endpoint,
            get: None,
            resolver,
            errors,
            join_column,
            carry: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_get(mut self, endpoint: EndpointTemplate) -> Self {
        self.get = Some(endpoint);
        self
    }

    #[must_use]
    pub fn with_carry(mut self, parent_column: &'static str, child_column: &'static str) -> Self {
        self.carry.push((parent_column, child_column));
        self
    }

    /// Columns a child of this parent starts with.
    #[must_use]
    pub fn scope(&self, parent: &NormalizedRow) -> NormalizedRow {
        let mut scope = NormalizedRow::new();
        if let Some(id) = parent.get(IDENTITY_COLUMN) {
            scope.set(self.join_column, id.clone());
        }
        for (from, to) in &self.carry {
            if let Some(value) = parent.get(from) {
                scope.set(*to, value.clone());
            }
        }
        scope
    }
}

impl fmt::Debug for ParentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ParentSpec")
            .field("endpoint", &self.endpoint)
            .field("get", &self.get)
            .field("family", &self.resolver.family())
            .field("join_column", &self.join_column)
            .field("carry", &self.carry)
            .finish()
    }
}

/// The List path of a table.
pub struct ListSpec {
    /// Primary endpoint; placeholders are filled from the parent scope.
    pub endpoint: EndpointTemplate,
    pub resolver: Arc<dyn UnionResolver>,
    pub errors: ErrorTable,
    pub parent: Option<ParentSpec>,
    pub static_params: Vec<(&'static str, &'static str)>,
    pub pushdown: Vec<Pushdown>,
    pub page_size: Option<PageSizeHint>,
    pub key_columns: Vec<KeyColumn>,
}

impl ListSpec {
    pub fn new(
        endpoint: EndpointTemplate,
        resolver: Arc<dyn UnionResolver>,
        errors: ErrorTable,
    ) -> Self {
        Self {
            endpoint,
            resolver,
            errors,
            parent: None,
            static_params: Vec::new(),
            pushdown: Vec::new(),
            page_size: None,
            key_columns: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_parent(mut self, parent: ParentSpec) -> Self {
        self.parent = Some(parent);
        self
    }

    #[must_use]
    pub fn with_static_param(mut self, name: &'static str, value: &'static str) -> Self {
        self.static_params.push((name, value));
        self
    }

    #[must_use]
    pub fn with_pushdown(mut self, column: &'static str, param: &'static str) -> Self {
        self.pushdown.push(Pushdown { column, param });
        self
    }

    #[must_use]
    pub fn with_page_size(mut self, param: &'static str, max: u64) -> Self {
        self.page_size = Some(PageSizeHint { param, max });
        self
    }

    #[must_use]
    pub fn with_key_column(mut self, key: KeyColumn) -> Self {
        self.key_columns.push(key);
        self
    }

    /// First required key column without an exact-match qualifier.
    #[must_use]
    pub fn missing_required(&self, qualifiers: &QualifierMap) -> Option<&'static str> {
        self.key_columns
            .iter()
            .filter(|k| k.required)
            .find(|k| qualifiers.equals_key(k.name).is_none())
            .map(|k| k.name)
    }

    /// Server parameters for the primary list call.
    ///
    /// Only single exact-match qualifiers are pushed down; set-membership
    /// qualifiers stay client-side.
    #[must_use]
    pub fn server_filter(&self, qualifiers: &QualifierMap, remaining: Option<u64>) -> ServerFilter {
        let mut filter = ServerFilter::new();
        for (name, value) in &self.static_params {
            filter.set(*name, *value);
        }
        for pushdown in &self.pushdown {
            if filter.get(pushdown.param).is_some() {
                continue;
            }
            if let Some(value) = qualifiers.equals_key(pushdown.column) {
                filter.set(pushdown.param, value);
            }
        }
        if let Some(hint) = self.page_size {
            filter.set(hint.param, hint.size_for(remaining).to_string());
        }
        filter
    }
}

impl fmt::Debug for ListSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ListSpec")
            .field("endpoint", &self.endpoint)
            .field("family", &self.resolver.family())
            .field("parent", &self.parent)
            .field("static_params", &self.static_params)
            .field("pushdown", &self.pushdown)
            .field("page_size", &self.page_size)
            .field("key_columns", &self.key_columns)
            .finish()
    }
}

/// The keyed single-item path of a table.
pub struct GetSpec {
    /// Endpoint whose placeholders are the key columns.
    pub endpoint: EndpointTemplate,
    pub key_columns: Vec<&'static str>,
    pub resolver: Arc<dyn UnionResolver>,
    pub errors: ErrorTable,
}

impl GetSpec {
    pub fn new(
        endpoint: EndpointTemplate,
        key_columns: Vec<&'static str>,
        resolver: Arc<dyn UnionResolver>,
        errors: ErrorTable,
    ) -> Self {
        Self {
            endpoint,
            key_columns,
            resolver,
            errors,
        }
    }

    /// Key values when every key column has an exact-match qualifier.
    #[must_use]
    pub fn keys(&self, qualifiers: &QualifierMap) -> Option<NormalizedRow> {
        self.key_columns
            .iter()
            .map(|column| {
                qualifiers
                    .equals_key(column)
                    .map(|key| ((*column).to_string(), ColumnValue::from(key)))
            })
            .collect()
    }
}

impl fmt::Debug for GetSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("GetSpec")
            .field("endpoint", &self.endpoint)
            .field("key_columns", &self.key_columns)
            .field("family", &self.resolver.family())
            .finish()
    }
}

/// An enrichment-backed column.
pub struct EnrichmentSpec {
    pub column: &'static str,
    pub task: Arc<dyn HydrateTask>,
    pub errors: ErrorTable,
}

impl fmt::Debug for EnrichmentSpec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("EnrichmentSpec")
            .field("column", &self.column)
            .field("task", &self.task.name())
            .field("errors", &self.errors.family())
            .finish()
    }
}

/// One queryable table.
#[derive(Debug)]
pub struct TableDefinition {
    pub name: &'static str,
    pub description: &'static str,
    pub columns: Vec<ColumnDefinition>,
    pub list: Option<ListSpec>,
    pub get: Option<GetSpec>,
    pub enrichments: Vec<EnrichmentSpec>,
}

impl TableDefinition {
    pub fn new(name: &'static str, description: &'static str) -> Self {
        Self {
            name,
            description,
            columns: Vec::new(),
            list: None,
            get: None,
            enrichments: Vec::new(),
        }
    }

    #[must_use]
    pub fn with_columns(mut self, columns: impl IntoIterator<Item = ColumnDefinition>) -> Self {
        self.columns.extend(columns);
        self
    }

    #[must_use]
    pub fn with_list(mut self, list: ListSpec) -> Self {
        self.list = Some(list);
        self
    }

    #[must_use]
    pub fn with_get(mut self, get: GetSpec) -> Self {
        self.get = Some(get);
        self
    }

    #[must_use]
    pub fn with_enrichment(
        mut self,
        column: &'static str,
        task: Arc<dyn HydrateTask>,
        errors: ErrorTable,
    ) -> Self {
        self.enrichments.push(EnrichmentSpec {
            column,
            task,
            errors,
        });
        self
    }

    /// Find a column by name.
    #[must_use]
    pub fn column(&self, name: &str) -> Option<&ColumnDefinition> {
        self.columns.iter().find(|c| c.name == name)
    }

    /// Check the definition is internally consistent.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the table has no fetch path or
    /// refers to a column it does not declare.
    pub fn validate(&self) -> QueryResult<()> {
        if self.list.is_none() && self.get.is_none() {
            return Err(QueryError::invalid_configuration(format!(
                "table {} declares neither a list nor a get",
                self.name
            )));
        }

        let mut referenced: Vec<&str> = self.enrichments.iter().map(|e| e.column).collect();
        if let Some(get) = &self.get {
            referenced.extend(get.key_columns.iter().copied());
        }
        if let Some(list) = &self.list {
            referenced.extend(list.key_columns.iter().map(|k| k.name));
            referenced.extend(list.pushdown.iter().map(|p| p.column));
            if let Some(parent) = &list.parent {
                referenced.push(parent.join_column);
                referenced.extend(parent.carry.iter().map(|(_, to)| *to));
            }
        }

        match referenced.into_iter().find(|name| self.column(name).is_none()) {
            Some(name) => Err(QueryError::invalid_configuration(format!(
                "table {} refers to undeclared column {name}",
                self.name
            ))),
            None => Ok(()),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::classify::NOT_FOUND;
    use crate::qualifier::Qualifier;
    use crate::union::PlainResolver;

    fn resolver() -> Arc<dyn UnionResolver> {
        Arc::new(PlainResolver::new("app_user", &[]))
    }

    fn app_users() -> ListSpec {
        ListSpec::new(
            EndpointTemplate::new("/api/v1/apps/{app_id}/users"),
            resolver(),
            NOT_FOUND,
        )
        .with_pushdown("user_name", "q")
        .with_pushdown("first_name", "q")
        .with_pushdown("email", "q")
        .with_page_size("limit", 500)
    }

    #[test]
    fn test_search_pushdown_precedence() {
        let quals = QualifierMap::new()
            .with("email", Qualifier::eq("jane@example.com"))
            .with("first_name", Qualifier::eq("Jane"));
        let filter = app_users().server_filter(&quals, None);
        assert_eq!(filter.get("q"), Some("Jane"));
        assert_eq!(filter.get("limit"), Some("500"));
    }

    #[test]
    fn test_in_lists_are_not_pushed_down() {
        let quals = QualifierMap::new().with("user_name", Qualifier::one_of(["a", "b"]));
        let filter = app_users().server_filter(&quals, Some(20));
        assert_eq!(filter.get("q"), None);
        assert_eq!(filter.get("limit"), Some("20"));
    }

    #[test]
    fn test_page_size_hint() {
        let hint = PageSizeHint {
            param: "limit",
            max: 500,
        };
        assert_eq!(hint.size_for(None), 500);
        assert_eq!(hint.size_for(Some(10)), 10);
        assert_eq!(hint.size_for(Some(10_000)), 500);
        assert_eq!(hint.size_for(Some(0)), 1);
    }

    #[test]
    fn test_static_params() {
        let list = ListSpec::new(EndpointTemplate::new("/api/v1/policies"), resolver(), NOT_FOUND)
            .with_static_param("type", "PASSWORD");
        let filter = list.server_filter(&QualifierMap::new(), None);
        assert_eq!(filter.params(), &[("type".to_string(), "PASSWORD".to_string())]);
    }

    #[test]
    fn test_required_key_columns() {
        let list = app_users()
            .with_key_column(KeyColumn::required("app_id"))
            .with_key_column(KeyColumn::optional("user_name"));
        assert_eq!(list.missing_required(&QualifierMap::new()), Some("app_id"));

        let quals = QualifierMap::new().with("app_id", Qualifier::one_of(["a1"]));
        assert_eq!(list.missing_required(&quals), Some("app_id"));

        let quals = QualifierMap::new().with("app_id", Qualifier::eq("a1"));
        assert_eq!(list.missing_required(&quals), None);
    }

    #[test]
    fn test_parent_scope() {
        let parent = ParentSpec::new(
            EndpointTemplate::new("/api/v1/users"),
            resolver(),
            NOT_FOUND,
            "user_id",
        )
        .with_carry("login", "user_name");

        let user = NormalizedRow::new().with("id", "u1").with("login", "jane");
        let scope = parent.scope(&user);
        assert_eq!(scope.get_str("user_id"), Some("u1"));
        assert_eq!(scope.get_str("user_name"), Some("jane"));
        assert!(scope.get("id").is_none());
    }

    #[test]
    fn test_get_keys() {
        let get = GetSpec::new(
            EndpointTemplate::new("/api/v1/users/{user_id}/factors/{id}"),
            vec!["id", "user_id"],
            resolver(),
            NOT_FOUND,
        );
        let quals = QualifierMap::new().with("id", Qualifier::eq("f1"));
        assert!(get.keys(&quals).is_none());

        let quals = quals.with("user_id", Qualifier::eq("u1"));
        let keys = get.keys(&quals).unwrap();
        assert_eq!(keys.get_str("user_id"), Some("u1"));
        assert_eq!(keys.get_str("id"), Some("f1"));
    }

    #[test]
    fn test_validate() {
        let table = TableDefinition::new("t", "test");
        assert!(table.validate().is_err());

        let table = TableDefinition::new("t", "test")
            .with_columns([ColumnDefinition::new("id", ColumnType::String, "id")])
            .with_list(app_users());
        let err = table.validate().unwrap_err();
        assert!(err.to_string().contains("user_name"));
    }
}
