//! Okta management API HTTP client.
//!
//! Lists follow the `Link: <...>; rel="next"` header; the continuation cursor
//! is the absolute URL of the next page. Calls are not retried: rate limits
//! and server errors surface as API errors for the caller to classify.

use async_trait::async_trait;
use reqwest::header::{HeaderMap, ACCEPT, AUTHORIZATION, LINK};
use reqwest::{Method, StatusCode};
use serde::Deserialize;
use serde_json::Value;
use std::time::Duration;
use tracing::{debug, instrument};
use url::Url;
use xavyo_query::prelude::*;

use crate::config::OktaConfig;

/// Okta error response body.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaErrorBody {
    pub error_code: String,
    pub error_summary: String,
    #[serde(default)]
    pub error_id: Option<String>,
    #[serde(default)]
    pub error_causes: Vec<OktaErrorCause>,
}

/// One entry of `errorCauses`.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct OktaErrorCause {
    pub error_summary: String,
}

impl OktaErrorBody {
    /// Summary followed by any causes, e.g.
    /// `"Api validation failed: factorId (Invalid Factor)"`.
    fn message(&self) -> String {
        if self.error_causes.is_empty() {
            return self.error_summary.clone();
        }
        let causes: Vec<&str> = self
            .error_causes
            .iter()
            .map(|c| c.error_summary.as_str())
            .collect();
        format!("{} ({})", self.error_summary, causes.join("; "))
    }
}

/// [`ResourceClient`] for one Okta organization.
#[derive(Debug, Clone)]
pub struct OktaClient {
    http_client: reqwest::Client,
    base_url: Url,
    api_token: String,
    page_size: u32,
}

impl OktaClient {
    /// Creates a client from a validated configuration.
    ///
    /// # Errors
    ///
    /// Returns `InvalidConfiguration` if the configuration is invalid or the
    /// HTTP client cannot be built.
    pub fn new(config: &OktaConfig) -> QueryResult<Self> {
        config.validate()?;

        let http_client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.request_timeout_secs))
            .connect_timeout(Duration::from_secs(config.connect_timeout_secs))
            .user_agent(config.user_agent.clone())
            .build()
            .map_err(|e| {
                QueryError::invalid_configuration(format!("Failed to create HTTP client: {e}"))
            })?;

        Ok(Self {
            http_client,
            base_url: config.base_url()?,
            api_token: config.api_token.clone(),
            page_size: config.page_size,
        })
    }

    /// The organization URL requests are sent to.
    #[must_use]
    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    fn resolve(&self, endpoint: &Endpoint) -> QueryResult<Url> {
        self.base_url
            .join(endpoint.as_str())
            .map_err(|e| QueryError::internal(format!("invalid endpoint {endpoint}: {e}")))
    }

    /// URL of a first page: endpoint, server filter and default page size.
    fn first_page_url(&self, request: &ListRequest) -> QueryResult<Url> {
        let mut url = self.resolve(&request.endpoint)?;
        {
            let mut query = url.query_pairs_mut();
            for (name, value) in request.filter.params() {
                query.append_pair(name, value);
            }
            if request.filter.get("limit").is_none() {
                query.append_pair("limit", &self.page_size.to_string());
            }
        }
        Ok(url)
    }

    /// URL of a continuation page. Cursors pointing at another origin are
    /// refused so the token is never sent elsewhere.
    fn next_page_url(&self, cursor: &PageCursor) -> QueryResult<Url> {
        let url = Url::parse(cursor.as_str())
            .map_err(|e| QueryError::malformed(format!("invalid next link: {e}")))?;
        if url.origin() != self.base_url.origin() {
            return Err(QueryError::malformed(format!(
                "next link leaves the organization: {url}"
            )));
        }
        Ok(url)
    }

    async fn send(&self, url: Url) -> QueryResult<(HeaderMap, Value)> {
        let response = self
            .http_client
            .request(Method::GET, url.clone())
            .header(AUTHORIZATION, format!("SSWS {}", self.api_token))
            .header(ACCEPT, "application/json")
            .send()
            .await
            .map_err(|e| QueryError::transport_with_source(format!("GET {}", url.path()), e))?;

        let status = response.status();
        debug!(method = "GET", path = url.path(), status = status.as_u16(), "Okta request");

        let headers = response.headers().clone();
        let body = response
            .text()
            .await
            .map_err(|e| QueryError::transport_with_source("failed to read response body", e))?;

        if status.is_success() {
            let value: Value = serde_json::from_str(&body)?;
            return Ok((headers, value));
        }

        Err(api_error(status, &body))
    }
}

/// Map an error response to an API error, preferring Okta's error body.
fn api_error(status: StatusCode, body: &str) -> QueryError {
    match serde_json::from_str::<OktaErrorBody>(body) {
        Ok(okta) => QueryError::api(
            Some(status.as_u16()),
            Some(okta.error_code.clone()),
            okta.message(),
        ),
        Err(_) => {
            let reason = status.canonical_reason().unwrap_or("error");
            let message = if body.is_empty() {
                format!("{} {reason}", status.as_u16())
            } else {
                format!("{} {reason}: {body}", status.as_u16())
            };
            QueryError::status_only(status.as_u16(), message)
        }
    }
}

/// The `rel="next"` target of the `Link` headers, if any.
///
/// Okta sends one header per relation but combined headers are accepted too.
#[must_use]
pub fn next_link(headers: &HeaderMap) -> Option<String> {
    headers
        .get_all(LINK)
        .iter()
        .filter_map(|value| value.to_str().ok())
        .flat_map(|value| value.split(','))
        .find_map(|link| {
            let (target, params) = link.trim().split_once(';')?;
            let is_next = params.split(';').any(|param| {
                param
                    .trim()
                    .strip_prefix("rel=")
                    .is_some_and(|rel| rel.trim_matches('"') == "next")
            });
            is_next.then(|| {
                target
                    .trim()
                    .trim_start_matches('<')
                    .trim_end_matches('>')
                    .to_string()
            })
        })
}

#[async_trait]
impl ResourceClient for OktaClient {
    #[instrument(skip(self, request, cursor), fields(endpoint = %request.endpoint))]
    async fn list(&self, request: &ListRequest, cursor: Option<&PageCursor>) -> QueryResult<Page> {
        let url = match cursor {
            Some(cursor) => self.next_page_url(cursor)?,
            None => self.first_page_url(request)?,
        };

        let (headers, body) = self.send(url).await?;
        let Value::Array(values) = body else {
            return Err(QueryError::malformed(format!(
                "expected a JSON array from {}",
                request.endpoint
            )));
        };

        Ok(Page {
            items: values.into_iter().map(RawItem::new).collect(),
            next: next_link(&headers).map(PageCursor::new),
        })
    }

    #[instrument(skip(self, endpoint), fields(endpoint = %endpoint))]
    async fn get(&self, endpoint: &Endpoint) -> QueryResult<RawItem> {
        let url = self.resolve(endpoint)?;
        let (_, body) = self.send(url).await?;
        if !body.is_object() {
            return Err(QueryError::malformed(format!(
                "expected a JSON object from {endpoint}"
            )));
        }
        Ok(RawItem::new(body))
    }
}
