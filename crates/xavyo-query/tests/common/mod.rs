//! Shared fixtures for engine integration tests.

#![allow(dead_code)]

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, Once};

use serde_json::{json, Value};
use xavyo_query::async_trait;
use xavyo_query::prelude::*;

/// Error a mocked endpoint answers with.
#[derive(Debug, Clone, Copy)]
pub struct MockError {
    pub status: Option<u16>,
    pub code: Option<&'static str>,
    pub message: &'static str,
}

impl MockError {
    pub const fn status(status: u16, message: &'static str) -> Self {
        Self {
            status: Some(status),
            code: None,
            message,
        }
    }

    pub fn to_error(self) -> QueryError {
        QueryError::api(self.status, self.code.map(String::from), self.message)
    }
}

#[derive(Debug, Clone, Default)]
struct MockList {
    pages: Vec<Vec<Value>>,
    fail_at: Option<(usize, MockError)>,
}

/// In-memory [`ResourceClient`] that counts every call per endpoint.
#[derive(Debug, Default)]
pub struct MockClient {
    lists: HashMap<String, MockList>,
    items: HashMap<String, Result<Value, MockError>>,
    list_calls: Mutex<Vec<ListRequest>>,
    get_calls: Mutex<Vec<String>>,
    total: AtomicUsize,
}

impl MockClient {
    pub fn new() -> Self {
        Self::default()
    }

    /// Serve `pages` for a list endpoint, in cursor order.
    pub fn with_pages(mut self, endpoint: &str, pages: Vec<Vec<Value>>) -> Self {
        self.lists.entry(endpoint.to_string()).or_default().pages = pages;
        self
    }

    /// Serve a single page.
    pub fn with_list(self, endpoint: &str, items: Vec<Value>) -> Self {
        self.with_pages(endpoint, vec![items])
    }

    /// Fail the page at `index` (0 = first call).
    pub fn with_list_error_at(mut self, endpoint: &str, index: usize, error: MockError) -> Self {
        self.lists.entry(endpoint.to_string()).or_default().fail_at = Some((index, error));
        self
    }

    /// Fail every call to a list endpoint.
    pub fn with_list_error(self, endpoint: &str, error: MockError) -> Self {
        self.with_list_error_at(endpoint, 0, error)
    }

    pub fn with_item(mut self, endpoint: &str, item: Value) -> Self {
        self.items.insert(endpoint.to_string(), Ok(item));
        self
    }

    pub fn with_get_error(mut self, endpoint: &str, error: MockError) -> Self {
        self.items.insert(endpoint.to_string(), Err(error));
        self
    }

    /// List calls (all pages) made to an endpoint.
    pub fn list_calls(&self, endpoint: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.endpoint.as_str() == endpoint)
            .count()
    }

    /// Get calls made to an endpoint.
    pub fn get_calls(&self, endpoint: &str) -> usize {
        self.get_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|e| *e == endpoint)
            .count()
    }

    /// List calls whose endpoint starts with `prefix`.
    pub fn list_calls_with_prefix(&self, prefix: &str) -> usize {
        self.list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.endpoint.as_str().starts_with(prefix))
            .count()
    }

    /// The requests made to a list endpoint, in order.
    pub fn requests(&self, endpoint: &str) -> Vec<ListRequest> {
        self.list_calls
            .lock()
            .unwrap()
            .iter()
            .filter(|r| r.endpoint.as_str() == endpoint)
            .cloned()
            .collect()
    }

    pub fn total_calls(&self) -> usize {
        self.total.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl ResourceClient for MockClient {
    async fn list(&self, request: &ListRequest, cursor: Option<&PageCursor>) -> QueryResult<Page> {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.list_calls.lock().unwrap().push(request.clone());

        let endpoint = request.endpoint.as_str();
        let Some(list) = self.lists.get(endpoint) else {
            return Err(QueryError::status_only(404, "Not found: Resource not found"));
        };

        let index = cursor.map_or(0, |c| {
            c.as_str()
                .rsplit('#')
                .next()
                .and_then(|i| i.parse().ok())
                .expect("cursor minted by this client")
        });

        if let Some((fail_at, error)) = list.fail_at {
            if fail_at == index {
                return Err(error.to_error());
            }
        }

        let items = list
            .pages
            .get(index)
            .cloned()
            .unwrap_or_default()
            .into_iter()
            .map(RawItem::new)
            .collect();
        let next = (index + 1 < list.pages.len())
            .then(|| PageCursor::new(format!("{endpoint}#{}", index + 1)));

        Ok(Page { items, next })
    }

    async fn get(&self, endpoint: &Endpoint) -> QueryResult<RawItem> {
        self.total.fetch_add(1, Ordering::SeqCst);
        self.get_calls
            .lock()
            .unwrap()
            .push(endpoint.as_str().to_string());

        match self.items.get(endpoint.as_str()) {
            Some(Ok(item)) => Ok(RawItem::new(item.clone())),
            Some(Err(error)) => Err(error.to_error()),
            None => Err(QueryError::status_only(404, "Not found: Resource not found")),
        }
    }
}

static INIT: Once = Once::new();

/// Initialize logging for tests (once). Set `RUST_LOG` to see engine events.
pub fn init_test_logging() {
    INIT.call_once(|| {
        if std::env::var("RUST_LOG").is_ok() {
            tracing_subscriber::fmt()
                .with_test_writer()
                .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
                .try_init()
                .ok();
        }
    });
}

pub fn engine(client: Arc<MockClient>) -> QueryEngine {
    init_test_logging();
    QueryEngine::new(client, EngineConfig::default()).unwrap()
}

pub fn ids(rows: &[NormalizedRow]) -> Vec<String> {
    rows.iter().filter_map(|r| r.key("id")).collect()
}

// ---------------------------------------------------------------------------
// Test resource families
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TestPolicy {
    Password,
    MfaEnroll,
}

impl Variant for TestPolicy {
    const FAMILY: &'static str = "policy";
    const DISCRIMINANT: &'static str = "type";

    fn all() -> &'static [Self] {
        &[TestPolicy::Password, TestPolicy::MfaEnroll]
    }

    fn tag(self) -> &'static str {
        match self {
            TestPolicy::Password => "PASSWORD",
            TestPolicy::MfaEnroll => "MFA_ENROLL",
        }
    }

    fn common_fields() -> &'static [FieldMapping] {
        const COMMON: &[FieldMapping] = &[
            FieldMapping::string("name", "name"),
            FieldMapping::string("type", "type"),
        ];
        COMMON
    }

    fn fields(self) -> &'static [FieldMapping] {
        const SETTINGS: &[FieldMapping] = &[FieldMapping::json("settings", "settings")];
        SETTINGS
    }
}

pub const POLICY_ERRORS: ErrorTable = ErrorTable::new("policy", &[IgnoreRule::Status(404)]);
pub const USER_ERRORS: ErrorTable = ErrorTable::new("user", &[IgnoreRule::Status(404)]);
pub const FACTOR_ERRORS: ErrorTable = ErrorTable::new(
    "factor",
    &[
        IgnoreRule::Status(404),
        IgnoreRule::MessageContains("Invalid Factor"),
    ],
);

/// `policy`: plain list of polymorphic policies with a `rules` enrichment.
pub fn policy_table() -> TableDefinition {
    TableDefinition::new("policy", "Test policies")
        .with_columns([
            ColumnDefinition::new("id", ColumnType::String, "Identifier"),
            ColumnDefinition::new("name", ColumnType::String, "Name"),
            ColumnDefinition::new("type", ColumnType::String, "Policy type"),
            ColumnDefinition::new("settings", ColumnType::Json, "Settings"),
            ColumnDefinition::new("rules", ColumnType::Json, "Rules"),
        ])
        .with_list(ListSpec::new(
            EndpointTemplate::new("/policies"),
            Arc::new(TaggedUnion::<TestPolicy>::new()),
            POLICY_ERRORS,
        ))
        .with_enrichment(
            "rules",
            Arc::new(CollectListTask::new(
                "policy_rules",
                EndpointTemplate::new("/policies/{id}/rules"),
            )),
            POLICY_ERRORS,
        )
}

const USER_FIELDS: &[FieldMapping] = &[FieldMapping::string("login", "profile.login")];
const FACTOR_FIELDS: &[FieldMapping] = &[
    FieldMapping::string("factor_type", "factorType"),
    FieldMapping::string("status", "status"),
];

/// `factor`: per-user factors under a user parent, with a Get path and
/// `user_name` / `owner_email` lookup enrichments.
pub fn factor_table() -> TableDefinition {
    factor_table_opts(true)
}

/// `factor` whose parent is always listed, never fetched by key.
pub fn factor_table_listing_users() -> TableDefinition {
    factor_table_opts(false)
}

fn factor_table_opts(parent_get: bool) -> TableDefinition {
    let mut users = ParentSpec::new(
        EndpointTemplate::new("/users"),
        Arc::new(PlainResolver::new("user", USER_FIELDS)),
        USER_ERRORS,
        "user_id",
    )
    .with_carry("login", "user_name");
    if parent_get {
        users = users.with_get(EndpointTemplate::new("/users/{id}"));
    }

    TableDefinition::new("factor", "Test factors")
        .with_columns([
            ColumnDefinition::new("id", ColumnType::String, "Identifier"),
            ColumnDefinition::new("user_id", ColumnType::String, "Owner"),
            ColumnDefinition::new("user_name", ColumnType::String, "Owner login"),
            ColumnDefinition::new("factor_type", ColumnType::String, "Factor type"),
            ColumnDefinition::new("status", ColumnType::String, "Status"),
            ColumnDefinition::new("owner_email", ColumnType::String, "Owner email"),
        ])
        .with_list(
            ListSpec::new(
                EndpointTemplate::new("/users/{user_id}/factors"),
                Arc::new(PlainResolver::new("factor", FACTOR_FIELDS)),
                FACTOR_ERRORS,
            )
            .with_parent(users)
            .with_key_column(KeyColumn::optional("user_id")),
        )
        .with_get(GetSpec::new(
            EndpointTemplate::new("/users/{user_id}/factors/{id}"),
            vec!["id", "user_id"],
            Arc::new(PlainResolver::new("factor", FACTOR_FIELDS)),
            FACTOR_ERRORS,
        ))
        .with_enrichment(
            "user_name",
            Arc::new(LookupFieldTask::new(
                "user_login",
                EndpointTemplate::new("/users/{user_id}"),
                "profile.login",
                ColumnType::String,
            )),
            USER_ERRORS,
        )
        .with_enrichment(
            "owner_email",
            Arc::new(LookupFieldTask::new(
                "owner_email",
                EndpointTemplate::new("/users/{user_id}"),
                "profile.email",
                ColumnType::String,
            )),
            USER_ERRORS,
        )
}

pub fn policy(id: &str, kind: &str) -> Value {
    json!({ "id": id, "type": kind, "name": format!("Policy {id}"), "settings": {} })
}

pub fn user(id: &str, login: &str) -> Value {
    json!({ "id": id, "profile": { "login": login, "email": format!("{login}@example.com") } })
}

pub fn factor(id: &str, kind: &str) -> Value {
    json!({ "id": id, "factorType": kind, "status": "ACTIVE" })
}

/// `pages` pages of `per_page` PASSWORD policies with ids `p0`, `p1`, ...
pub fn policy_pages(pages: usize, per_page: usize) -> Vec<Vec<Value>> {
    (0..pages)
        .map(|page| {
            (0..per_page)
                .map(|i| policy(&format!("p{}", page * per_page + i), "PASSWORD"))
                .collect()
        })
        .collect()
}

/// Users `u1`, `u2`, `u3` (logins ann, bob, cat), each with one factor
/// and fetchable by id.
pub fn three_users() -> MockClient {
    MockClient::new()
        .with_list(
            "/users",
            vec![user("u1", "ann"), user("u2", "bob"), user("u3", "cat")],
        )
        .with_item("/users/u1", user("u1", "ann"))
        .with_item("/users/u2", user("u2", "bob"))
        .with_item("/users/u3", user("u3", "cat"))
        .with_list("/users/u1/factors", vec![factor("f1", "sms")])
        .with_list("/users/u2/factors", vec![factor("f2", "push")])
        .with_list("/users/u3/factors", vec![factor("f3", "email")])
}
