//! Common test utilities for xavyo-connector-okta integration tests.

#![allow(dead_code)]

use serde_json::{json, Value};
use std::sync::Once;
use wiremock::matchers::{method, path, query_param, query_param_is_missing};
use wiremock::{Mock, MockServer, ResponseTemplate};
use xavyo_connector_okta::{OktaConfig, OktaConnector};
use xavyo_query::prelude::*;

pub const TEST_TOKEN: &str = "test-token";

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

/// Connector pointed at a mock server.
pub fn connector(server: &MockServer) -> OktaConnector {
    init_test_logging();
    OktaConnector::new(
        OktaConfig::new(server.uri(), TEST_TOKEN),
        EngineConfig::default(),
    )
    .unwrap()
}

/// `Link` header value announcing the next page.
pub fn next_link(server: &MockServer, endpoint: &str, after: &str) -> String {
    format!(
        "<{}{endpoint}?after={after}&limit=200>; rel=\"next\"",
        server.uri()
    )
}

/// Serve `pages` of a list endpoint, chained by `after=<page index>` cursors.
///
/// Each page is expected exactly once.
pub async fn mount_pages(server: &MockServer, endpoint: &str, pages: Vec<Vec<Value>>) {
    let count = pages.len();
    for (index, items) in pages.into_iter().enumerate() {
        let mut response = ResponseTemplate::new(200).set_body_json(Value::Array(items));
        if index + 1 < count {
            response = response.insert_header(
                "link",
                next_link(server, endpoint, &(index + 1).to_string()).as_str(),
            );
        }

        let mock = Mock::given(method("GET")).and(path(endpoint));
        let mock = if index == 0 {
            mock.and(query_param_is_missing("after"))
        } else {
            mock.and(query_param("after", index.to_string()))
        };
        mock.respond_with(response).expect(1).mount(server).await;
    }
}

/// Okta error response.
pub fn okta_error(status: u16, code: &str, summary: &str) -> ResponseTemplate {
    ResponseTemplate::new(status).set_body_json(json!({
        "errorCode": code,
        "errorSummary": summary,
        "errorLink": code,
        "errorId": "oaeTest",
        "errorCauses": []
    }))
}

pub fn not_found(kind: &str) -> ResponseTemplate {
    okta_error(
        404,
        "E0000007",
        &format!("Not found: Resource not found: missing ({kind})"),
    )
}

pub fn create_policy(id: &str, policy_type: &str) -> Value {
    json!({
        "id": id,
        "type": policy_type,
        "name": format!("Policy {id}"),
        "description": "Test policy",
        "status": "ACTIVE",
        "priority": 1,
        "system": false,
        "created": "2024-01-15T10:30:00.000Z",
        "lastUpdated": "2024-02-01T08:00:00.000Z",
        "conditions": {"people": {"groups": {"include": ["00g1"]}}},
        "settings": {"factors": {}}
    })
}

pub fn create_user(id: &str, login: &str) -> Value {
    json!({
        "id": id,
        "status": "ACTIVE",
        "profile": {
            "login": login,
            "email": login,
            "firstName": "Test",
            "lastName": "User"
        }
    })
}

pub fn create_factor(id: &str, factor_type: &str) -> Value {
    json!({
        "id": id,
        "factorType": factor_type,
        "provider": "OKTA",
        "status": "ACTIVE",
        "created": "2024-03-01T12:00:00.000Z",
        "lastUpdated": "2024-03-01T12:00:00.000Z",
        "profile": {"credentialId": "dev@example.com"}
    })
}

pub fn create_app(id: &str, sign_on_mode: &str) -> Value {
    json!({
        "id": id,
        "name": "test_app",
        "label": "Test App",
        "status": "ACTIVE",
        "signOnMode": sign_on_mode
    })
}

pub fn create_app_user(id: &str, user_name: &str) -> Value {
    json!({
        "id": id,
        "externalId": null,
        "created": "2024-01-01T00:00:00.000Z",
        "status": "PROVISIONED",
        "scope": "USER",
        "syncState": "DISABLED",
        "credentials": {"userName": user_name},
        "profile": {
            "email": format!("{user_name}@example.com"),
            "given_name": "Test",
            "family_name": "User"
        },
        "_links": {"user": {"href": format!("/api/v1/users/{id}")}}
    })
}
